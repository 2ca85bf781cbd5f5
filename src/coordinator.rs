use std::sync::Arc;

use tokio::fs::File;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::context::{Context, Termination};
use crate::error::{Error, Result};
use crate::fetcher::{ChunkResult, RangeFetcher};
use crate::plan::DownloadPlan;

/// Runs one fetcher per chunk and collects their files in chunk order.
///
/// Returns on the first failure, or as soon as `ctx` ends. Fetchers run in a
/// child of `ctx` that is cancelled when this returns, so stragglers stop
/// instead of finishing work nobody will read.
pub(crate) async fn fetch_all(
    ctx: &Context,
    fetcher: Arc<RangeFetcher>,
    url: &str,
    plan: &DownloadPlan,
    resume: bool,
) -> Result<Vec<File>> {
    let scope = ctx.child();
    let _stop = scope.cancel_on_drop();

    let (tx, mut rx) = mpsc::channel::<ChunkResult>(plan.len());
    let mut handles = Vec::with_capacity(plan.len());
    for spec in plan.chunks.iter().cloned() {
        let fetcher = Arc::clone(&fetcher);
        let task_scope = scope.clone();
        let tx = tx.clone();
        handles.push(scope.spawn(async move {
            fetcher.run(task_scope, spec, resume, tx).await;
        }));
    }
    drop(tx);

    scope.spawn(drain(scope.clone(), handles));

    let mut slots: Vec<Option<File>> = (0..plan.len()).map(|_| None).collect();
    let mut received = 0;

    while received < slots.len() {
        tokio::select! {
            biased;
            reason = scope.done() => return Err(terminated(reason, url)),
            msg = rx.recv() => {
                let Some(ChunkResult { index, outcome }) = msg else {
                    let index = slots.iter().position(Option::is_none).unwrap_or_default();
                    return Err(Error::FetcherLost { index });
                };
                let file = outcome?;
                if slots[index].replace(file).is_none() {
                    received += 1;
                }
                debug!(chunk = index, received, total = slots.len(), "chunk reported");
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Waits for the session to end, then for every fetcher to exit.
async fn drain(scope: Context, handles: Vec<JoinHandle<()>>) {
    scope.done().await;
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "chunk fetcher panicked");
        }
    }
    debug!("all chunk fetchers exited");
}

pub(crate) fn terminated(reason: Termination, url: &str) -> Error {
    let url = url.to_string();
    match reason {
        Termination::Canceled => Error::Canceled { url },
        Termination::DeadlineExceeded => Error::DeadlineExceeded { url },
    }
}
