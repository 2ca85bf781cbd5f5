use std::io;

use tokio::fs::{File, OpenOptions};
use tracing::debug;

use crate::plan::ChunkSpec;

/// What is already on disk for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Absent,
    Partial { have: u64 },
    Complete,
}

impl ChunkStatus {
    /// Classifies a chunk from the length of its local file, if any.
    pub fn classify(local_len: Option<u64>, expected: u64) -> Self {
        match local_len {
            None => ChunkStatus::Absent,
            Some(len) if len >= expected => ChunkStatus::Complete,
            Some(0) => ChunkStatus::Absent,
            Some(have) => ChunkStatus::Partial { have },
        }
    }
}

/// An opened chunk file plus the byte range still missing from it.
#[derive(Debug)]
pub struct Inspection {
    pub status: ChunkStatus,
    pub file: File,
    /// Absolute offset of the first byte still to fetch. Meaningless when complete.
    pub start: u64,
    pub end: u64,
}

impl Inspection {
    pub fn needs_fetch(&self) -> bool {
        self.status != ChunkStatus::Complete
    }
}

/// Opens the chunk's file and works out what still has to be fetched.
///
/// Outside a resume the file is always truncated. While resuming, a complete file
/// is reopened read-only at offset zero and a partial one is reopened for append.
pub async fn inspect(spec: &ChunkSpec, resume: bool) -> io::Result<Inspection> {
    let local_len = if resume {
        match tokio::fs::metadata(&spec.path).await {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        }
    } else {
        None
    };

    let status = ChunkStatus::classify(local_len, spec.len());
    debug!(chunk = spec.index, ?status, "inspected chunk file");

    let (file, start) = match status {
        ChunkStatus::Complete => (File::open(&spec.path).await?, spec.end + 1),
        ChunkStatus::Partial { have } => {
            let file = OpenOptions::new()
                .read(true)
                .append(true)
                .open(&spec.path)
                .await?;
            (file, spec.start + have)
        }
        ChunkStatus::Absent => {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&spec.path)
                .await?;
            (file, spec.start)
        }
    };

    Ok(Inspection {
        status,
        file,
        start,
        end: spec.end,
    })
}
