use reqwest::{header, Client, StatusCode};
use tracing::debug;

use crate::error::{Error, Result};

/// What a HEAD request tells us about the remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub url: String,
    /// `None` when the server did not send a usable `Content-Length`.
    pub size: Option<u64>,
    pub accepts_ranges: bool,
}

impl ResourceDescriptor {
    pub async fn probe(client: &Client, url: &str) -> Result<Self> {
        let response = client.head(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::invalid_response(StatusCode::OK, response).await);
        }

        // Read the header directly: the body of a HEAD response is always empty,
        // so the transport's own length hint is not the resource size.
        let size = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let accepts_ranges = response
            .headers()
            .get(header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));

        debug!(url, ?size, accepts_ranges, "probed resource");

        Ok(Self {
            url: url.to_string(),
            size,
            accepts_ranges,
        })
    }
}
