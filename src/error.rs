use std::io;

use futures::StreamExt;
use reqwest::StatusCode;

/// Most bytes of an unexpected response body kept for diagnostics.
pub const MAX_ERROR_BODY: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid response code, received '{got}' expected '{expected}'{}", body_suffix(.body))]
    InvalidResponseCode {
        expected: u16,
        got: u16,
        body: Option<String>,
    },

    #[error("Download canceled for '{url}'")]
    Canceled { url: String },

    #[error("Download timeout exceeded for '{url}'")]
    DeadlineExceeded { url: String },

    #[error("Invalid content length for '{url}': server accepts ranges but reported no size")]
    InvalidContentLength { url: String },

    #[error("{op} {path}: bad file descriptor")]
    BadDescriptor { op: &'static str, path: String },

    #[error("chunk {index} fetcher exited without reporting a result")]
    FetcherLost { index: usize },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Builds an `InvalidResponseCode`, keeping at most [`MAX_ERROR_BODY`] bytes of the body.
    ///
    /// The rest of the body is never read; dropping the stream closes the connection.
    pub(crate) async fn invalid_response(expected: StatusCode, response: reqwest::Response) -> Self {
        let got = response.status().as_u16();
        let mut stream = response.bytes_stream();
        let mut captured = Vec::new();
        let mut failure = None;
        while captured.len() < MAX_ERROR_BODY {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    let take = chunk.len().min(MAX_ERROR_BODY - captured.len());
                    captured.extend_from_slice(&chunk[..take]);
                }
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                None => break,
            }
        }
        let body = match failure {
            Some(e) => Some(format!("read body failed: {}", e)),
            None if captured.is_empty() => None,
            None => Some(String::from_utf8_lossy(&captured).into_owned()),
        };
        Error::InvalidResponseCode {
            expected: expected.as_u16(),
            got,
            body,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled { .. })
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Error::DeadlineExceeded { .. })
    }
}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(text) => format!(", body:[{}]", text),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_response_code_display_without_body() {
        let err = Error::InvalidResponseCode {
            expected: 206,
            got: 200,
            body: None,
        };
        assert_eq!(err.to_string(), "Invalid response code, received '200' expected '206'");
    }

    #[test]
    fn invalid_response_code_display_with_body() {
        let err = Error::InvalidResponseCode {
            expected: 200,
            got: 404,
            body: Some("no such object".into()),
        };
        assert_eq!(
            err.to_string(),
            "Invalid response code, received '404' expected '200', body:[no such object]"
        );
    }

    #[test]
    fn termination_errors_name_the_url() {
        let canceled = Error::Canceled { url: "http://x/a".into() };
        let deadline = Error::DeadlineExceeded { url: "http://x/a".into() };
        assert!(canceled.is_canceled());
        assert!(deadline.is_deadline_exceeded());
        assert_eq!(canceled.to_string(), "Download canceled for 'http://x/a'");
        assert_eq!(deadline.to_string(), "Download timeout exceeded for 'http://x/a'");
    }
}
