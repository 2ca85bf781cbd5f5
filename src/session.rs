use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::stitch::Stitched;
use crate::storage::DIR_MODE;
use crate::utils::name_from_url;

/// File-like description of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub size: u64,
    pub permissions: u32,
    pub modified: DateTime<Utc>,
}

/// A fully fetched resource, read sequentially from its first byte.
///
/// Owns every chunk file and the directory holding them. [`Session::close`]
/// releases both; a session dropped without closing leaves its directory in
/// place, where the next open of the same URL finds the chunks complete.
#[derive(Debug)]
pub struct Session {
    url: String,
    dir: PathBuf,
    size: u64,
    modified: Option<DateTime<Utc>>,
    reader: Stitched,
}

impl Session {
    pub(crate) fn ready(url: &str, dir: PathBuf, size: u64, reader: Stitched) -> Self {
        Self {
            url: url.to_string(),
            dir,
            size,
            modified: Some(Utc::now()),
            reader,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn storage_dir(&self) -> &Path {
        &self.dir
    }

    fn name(&self) -> String {
        name_from_url(&self.url).unwrap_or_else(|| self.url.clone())
    }

    pub fn stat(&self) -> Result<Metadata> {
        let Some(modified) = self.modified else {
            return Err(Error::BadDescriptor {
                op: "stat",
                path: self.name(),
            });
        };
        Ok(Metadata {
            name: self.name(),
            size: self.size,
            permissions: DIR_MODE,
            modified,
        })
    }

    /// Closes every chunk file and removes the storage directory.
    ///
    /// Calling it again is harmless: there is nothing left to close and a missing
    /// directory is not an error.
    pub async fn close(&mut self) -> Result<()> {
        let parts = std::mem::take(&mut self.reader).into_parts();
        let open = parts.iter().filter(|p| p.is_some()).count();
        drop(parts);
        self.modified = None;

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!(url = %self.url, handles = open, dir = %self.dir.display(), "session closed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to remove storage directory");
                Err(e.into())
            }
        }
    }
}

impl AsyncRead for Session {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}
