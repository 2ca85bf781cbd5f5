use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressFinish, ProgressStyle};
use splitfetch::utils::{name_from_url, sanitize_filename};
use splitfetch::{BodyReader, Concurrency, Context, Options, Session};
use tokio::fs;
use tracing::{info, warn};

use crate::cli::Args;

pub async fn run_single_download(args: Args) -> Result<()> {
    let output = output_path(&args);
    let ctx = match args.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::new(),
    };

    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, chunks downloaded so far are kept for the next run");
            interrupt.cancel();
        }
    });

    let options = build_options(&args)?;
    let mut session = splitfetch::open_with_context(&ctx, &args.url, options)
        .await
        .with_context(|| format!("Failed to download {}", args.url))?;

    let written = save(&mut session, &output).await?;
    let meta = session.stat()?;
    println!(
        "{:>12} {} {:o} {} -> {}",
        HumanBytes(written),
        meta.modified.format("%Y-%m-%d %H:%M:%S"),
        meta.permissions,
        meta.name,
        output.display()
    );

    if args.keep_chunks {
        info!(dir = %session.storage_dir().display(), "keeping chunk directory");
    } else {
        session.close().await.context("Failed to clean up chunk directory")?;
    }
    Ok(())
}

fn output_path(args: &Args) -> PathBuf {
    if let Some(path) = &args.output {
        return path.clone();
    }
    let name = name_from_url(&args.url)
        .map(|n| sanitize_filename(&n))
        .unwrap_or_else(|| format!("download_{}", uuid::Uuid::new_v4()));
    PathBuf::from(name)
}

fn build_options(args: &Args) -> Result<Options> {
    let mut options = Options::new();
    if let Some(n) = args.concurrency {
        options = options.concurrency(Concurrency::Fixed(n));
    }
    if let Some(chunk) = args.chunk_size {
        options = options.concurrency(Concurrency::dynamic(move |size| size / chunk));
    }
    if let Some(dir) = &args.storage_dir {
        options = options.storage_root(dir);
    }

    if args.progress.enabled() {
        let multi_progress = MultiProgress::new();
        multi_progress.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4}")
            .context("Invalid progress template")?
            .progress_chars("=>-");

        options = options.proxy(move |size, reader: BodyReader| -> BodyReader {
            let pb = ProgressBar::new(size)
                .with_style(style.clone())
                .with_finish(ProgressFinish::AndLeave);
            let pb = multi_progress.add(pb);
            Box::new(pb.wrap_async_read(reader))
        });
    }
    Ok(options)
}

/// Copies the session into `output` through a `.part` file, renamed once complete.
async fn save(session: &mut Session, output: &Path) -> Result<u64> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.context("Failed to create output directory")?;
    }

    let mut part_path = output.as_os_str().to_owned();
    part_path.push(".part");
    let part_path = PathBuf::from(part_path);

    let mut file = fs::File::create(&part_path)
        .await
        .context("Failed to open partial file")?;
    let written = tokio::io::copy(session, &mut file)
        .await
        .context("Error while writing to file")?;
    tokio::io::AsyncWriteExt::flush(&mut file)
        .await
        .context("Failed to flush file")?;
    drop(file);

    fs::rename(&part_path, output)
        .await
        .context("Failed to rename partial file")?;
    Ok(written)
}
