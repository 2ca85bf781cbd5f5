//! Fetch one remote file as a single sequential stream.
//!
//! When the server accepts byte ranges the transfer is split into concurrent
//! range requests, each persisted to its own chunk file so that an interrupted
//! download resumes where it stopped. The chunks are stitched back together in
//! order and exposed through [`Session`], which implements
//! [`tokio::io::AsyncRead`].
//!
//! ```no_run
//! # async fn demo() -> splitfetch::Result<()> {
//! use splitfetch::{Concurrency, Options};
//! use tokio::io::AsyncReadExt;
//!
//! let options = Options::new().concurrency(Concurrency::dynamic(|size| size / 1_000_000));
//! let mut session = splitfetch::open("https://example.com/big.tar.gz", options).await?;
//! let mut bytes = Vec::new();
//! session.read_to_end(&mut bytes).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod context;
mod coordinator;
mod downloader;
pub mod error;
mod fallback;
mod fetcher;
pub mod options;
pub mod plan;
pub mod probe;
pub mod resume;
mod session;
mod stitch;
pub mod storage;
pub mod utils;

pub use context::{Context, Termination};
pub use downloader::{open, open_with_context};
pub use error::{Error, Result};
pub use options::{BodyReader, Concurrency, Options, ProxyFn, DEFAULT_CONCURRENCY};
pub use plan::{ChunkSpec, DownloadPlan};
pub use probe::ResourceDescriptor;
pub use session::{Metadata, Session};
