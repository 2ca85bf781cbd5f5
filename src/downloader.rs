use std::sync::Arc;

use tracing::info;

use crate::context::Context;
use crate::coordinator::{self, terminated};
use crate::error::{Error, Result};
use crate::fallback;
use crate::fetcher::RangeFetcher;
use crate::options::Options;
use crate::plan::DownloadPlan;
use crate::probe::ResourceDescriptor;
use crate::stitch::Stitched;
use crate::session::Session;
use crate::storage;

/// Downloads `url` and opens it for sequential reading.
///
/// Runs under a private context that is cancelled when this returns.
pub async fn open(url: &str, options: Options) -> Result<Session> {
    let ctx = Context::new();
    let _cancel = ctx.cancel_on_drop();
    open_with_context(&ctx, url, options).await
}

/// Like [`open`], but stops with [`Error::Canceled`] or [`Error::DeadlineExceeded`]
/// when `ctx` ends first.
///
/// Servers that answer `Accept-Ranges: bytes` are fetched in concurrent ranges
/// into a directory named after the URL, so an interrupted run can be resumed
/// by opening the same URL again. Anything else is fetched in one request.
pub async fn open_with_context(ctx: &Context, url: &str, options: Options) -> Result<Session> {
    let client = options.resolved_client();
    let descriptor = tokio::select! {
        biased;
        reason = ctx.done() => return Err(terminated(reason, url)),
        descriptor = ResourceDescriptor::probe(&client, url) => descriptor?,
    };

    match descriptor.size {
        Some(size) if descriptor.accepts_ranges && size > 0 => {
            open_ranged(ctx, client, url, size, &options).await
        }
        None if descriptor.accepts_ranges => Err(Error::InvalidContentLength {
            url: url.to_string(),
        }),
        _ => {
            let root = options.resolved_root();
            let whole = fallback::fetch_whole(ctx, &client, url, &root).await?;
            info!(url, size = whole.size, "opened without ranges");
            Ok(Session::ready(url, whole.dir, whole.size, Stitched::single(whole.file)))
        }
    }
}

async fn open_ranged(
    ctx: &Context,
    client: reqwest::Client,
    url: &str,
    size: u64,
    options: &Options,
) -> Result<Session> {
    let dir = storage::resume_dir(&options.resolved_root(), url);
    let resume = storage::prepare_resume_dir(&dir).await?;

    let workers = options.concurrency.workers(size);
    let plan = DownloadPlan::new(size, workers, &dir);
    info!(url, size, chunks = plan.len(), resume, dir = %dir.display(), "starting ranged download");

    let fetcher = Arc::new(RangeFetcher::new(client, url, options.proxy.clone()));
    let files = coordinator::fetch_all(ctx, fetcher, url, &plan, resume).await?;

    let parts = files
        .into_iter()
        .zip(plan.chunks.iter().map(|c| c.len()))
        .collect();
    info!(url, size, "all chunks ready");
    Ok(Session::ready(url, dir, size, Stitched::new(parts)))
}
