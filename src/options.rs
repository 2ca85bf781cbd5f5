use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncRead;

pub const DEFAULT_CONCURRENCY: u64 = 10;

/// Reader handed to a [`ProxyFn`] and expected back from it.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// Wraps each chunk's network body, e.g. to display progress.
/// Receives the number of bytes that chunk request is expected to deliver.
pub type ProxyFn = Arc<dyn Fn(u64, BodyReader) -> BodyReader + Send + Sync>;

/// How many range requests to split a resource of a given size into.
#[derive(Clone)]
pub enum Concurrency {
    Fixed(u64),
    Dynamic(Arc<dyn Fn(u64) -> u64 + Send + Sync>),
}

impl Concurrency {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(u64) -> u64 + Send + Sync + 'static,
    {
        Concurrency::Dynamic(Arc::new(f))
    }

    /// Worker count for `size` bytes, never below one.
    pub fn workers(&self, size: u64) -> u64 {
        let n = match self {
            Concurrency::Fixed(n) => *n,
            Concurrency::Dynamic(f) => f(size),
        };
        n.max(1)
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency::Fixed(DEFAULT_CONCURRENCY)
    }
}

impl fmt::Debug for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Concurrency::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Clone, Default)]
pub struct Options {
    pub concurrency: Concurrency,
    pub proxy: Option<ProxyFn>,
    /// Parent of the per-URL storage directories. Defaults to the system temp dir.
    pub storage_root: Option<PathBuf>,
    pub client: Option<Client>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn proxy<F>(mut self, proxy: F) -> Self
    where
        F: Fn(u64, BodyReader) -> BodyReader + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(proxy));
        self
    }

    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub(crate) fn resolved_root(&self) -> PathBuf {
        self.storage_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub(crate) fn resolved_client(&self) -> Client {
        match &self.client {
            Some(client) => client.clone(),
            None => Client::builder()
                .user_agent(concat!("splitfetch/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("concurrency", &self.concurrency)
            .field("proxy", &self.proxy.is_some())
            .field("storage_root", &self.storage_root)
            .finish_non_exhaustive()
    }
}
