use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::{self, DirBuilder};
use uuid::Uuid;

pub const DIR_PREFIX: &str = "splitfetch-";

/// Owner and group only.
pub const DIR_MODE: u32 = 0o770;

/// Hex SHA-256 of the URL; names the storage directory so reruns find their chunks.
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

pub fn resume_dir(root: &Path, url: &str) -> PathBuf {
    root.join(format!("{}{}", DIR_PREFIX, url_digest(url)))
}

/// Creates the per-URL directory. Returns `true` when it already existed,
/// meaning chunk files from an earlier run may be reused.
pub async fn prepare_resume_dir(dir: &Path) -> io::Result<bool> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).await?;
    }
    match dir_builder().create(dir).await {
        Ok(()) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(true),
        Err(e) => Err(e),
    }
}

/// Creates a fresh, uniquely named directory for a transfer that cannot resume.
pub async fn scratch_dir(root: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(root).await?;
    let dir = root.join(format!("{}{}", DIR_PREFIX, Uuid::new_v4()));
    dir_builder().create(&dir).await?;
    Ok(dir)
}

fn dir_builder() -> DirBuilder {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder
}
