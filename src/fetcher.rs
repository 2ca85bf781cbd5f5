use std::io::{self, SeekFrom};

use futures::TryStreamExt;
use reqwest::{header, Client, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::options::{BodyReader, ProxyFn};
use crate::plan::ChunkSpec;
use crate::resume;

/// What a fetcher sends back to the coordinator, exactly once.
#[derive(Debug)]
pub(crate) struct ChunkResult {
    pub index: usize,
    pub outcome: Result<File>,
}

/// Per-session state shared by every chunk fetcher.
pub(crate) struct RangeFetcher {
    client: Client,
    url: String,
    proxy: Option<ProxyFn>,
}

impl RangeFetcher {
    pub fn new(client: Client, url: impl Into<String>, proxy: Option<ProxyFn>) -> Self {
        Self {
            client,
            url: url.into(),
            proxy,
        }
    }

    /// Brings one chunk to completion and reports the rewound file.
    ///
    /// Nothing is reported once `ctx` has ended; the coordinator has stopped
    /// listening by then.
    pub async fn run(&self, ctx: Context, spec: ChunkSpec, resume: bool, tx: mpsc::Sender<ChunkResult>) {
        let outcome = tokio::select! {
            biased;
            reason = ctx.done() => {
                debug!(chunk = spec.index, ?reason, "fetch abandoned");
                return;
            }
            outcome = self.fetch(&spec, resume) => outcome,
        };

        if let Err(e) = &outcome {
            warn!(chunk = spec.index, error = %e, "chunk failed");
        }

        let result = ChunkResult {
            index: spec.index,
            outcome,
        };
        tokio::select! {
            biased;
            _ = ctx.done() => debug!(chunk = spec.index, "context done, dropping result"),
            sent = tx.send(result) => {
                if sent.is_err() {
                    debug!(chunk = spec.index, "coordinator gone, dropping result");
                }
            }
        }
    }

    async fn fetch(&self, spec: &ChunkSpec, resume: bool) -> Result<File> {
        let found = resume::inspect(spec, resume).await?;
        if !found.needs_fetch() {
            debug!(chunk = spec.index, "chunk already on disk");
            return Ok(found.file);
        }
        self.download_range(spec.index, found.file, found.start, found.end).await
    }

    async fn download_range(&self, index: usize, mut file: File, start: u64, end: u64) -> Result<File> {
        debug!(chunk = index, start, end, "requesting range");
        let response = self
            .client
            .get(&self.url)
            .header(header::RANGE, format!("bytes={}-{}", start, end))
            .send()
            .await?;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(Error::invalid_response(StatusCode::PARTIAL_CONTENT, response).await);
        }

        let expected = end - start + 1;
        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut reader: BodyReader = Box::new(StreamReader::new(Box::pin(body)));
        if let Some(proxy) = &self.proxy {
            reader = proxy(expected, reader);
        }

        let copied = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        if copied < expected {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("chunk {}: expected {} bytes, received {}", index, expected, copied),
            )));
        }

        file.seek(SeekFrom::Start(0)).await?;
        debug!(chunk = index, bytes = copied, "chunk complete");
        Ok(file)
    }
}
