use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::context::Context;
use crate::coordinator::terminated;
use crate::error::{Error, Result};
use crate::storage;

/// A resource fetched in one plain GET.
pub(crate) struct WholeBody {
    pub dir: PathBuf,
    pub file: File,
    pub size: u64,
}

/// Single sequential download for servers that do not accept ranges.
///
/// Uses a fresh directory every time; nothing here can be resumed.
pub(crate) async fn fetch_whole(ctx: &Context, client: &Client, url: &str, root: &Path) -> Result<WholeBody> {
    let response = tokio::select! {
        biased;
        reason = ctx.done() => return Err(terminated(reason, url)),
        response = client.get(url).send() => response?,
    };
    if response.status() != StatusCode::OK {
        return Err(Error::invalid_response(StatusCode::OK, response).await);
    }

    let dir = storage::scratch_dir(root).await?;
    let result = tokio::select! {
        biased;
        reason = ctx.done() => Err(terminated(reason, url)),
        result = write_body(response, &dir) => result,
    };

    match result {
        Ok((file, size)) => {
            debug!(url, size, dir = %dir.display(), "sequential download complete");
            Ok(WholeBody { dir, file, size })
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = %cleanup, "failed to remove scratch directory");
            }
            Err(e)
        }
    }
}

async fn write_body(response: reqwest::Response, dir: &Path) -> Result<(File, u64)> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(dir.join("body"))
        .await?;

    let body = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let mut reader = StreamReader::new(Box::pin(body));

    let size = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok((file, size))
}
