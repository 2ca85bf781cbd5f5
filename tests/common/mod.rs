#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

/// A local origin serving one deterministic resource at `/file`.
pub struct Origin {
    pub body: Vec<u8>,
    pub ranges: bool,
    partial_gets: bool,
    fail_range_at: Mutex<Option<u64>>,
    delay: Mutex<Option<Duration>>,
    range_requests: AtomicUsize,
    full_requests: AtomicUsize,
    requested: Mutex<Vec<(u64, u64)>>,
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

impl Origin {
    pub fn new(len: usize) -> Self {
        Self {
            body: pattern(len),
            ranges: true,
            partial_gets: true,
            fail_range_at: Mutex::new(None),
            delay: Mutex::new(None),
            range_requests: AtomicUsize::new(0),
            full_requests: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn without_ranges(mut self) -> Self {
        self.ranges = false;
        self
    }

    /// Advertises `Accept-Ranges: bytes` but answers every GET with 200 and the whole body.
    pub fn ignoring_range_requests(mut self) -> Self {
        self.partial_gets = false;
        self
    }

    /// Range requests starting at `offset` answer 500 instead of 206.
    pub fn fail_range_at(self, offset: u64) -> Self {
        self.set_fail_range_at(Some(offset));
        self
    }

    pub fn set_fail_range_at(&self, offset: Option<u64>) {
        *self.fail_range_at.lock().unwrap() = offset;
    }

    /// Every GET except a failing range waits this long before answering.
    pub fn delay(self, delay: Duration) -> Self {
        self.set_delay(Some(delay));
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn range_requests(&self) -> usize {
        self.range_requests.load(Ordering::SeqCst)
    }

    pub fn full_requests(&self) -> usize {
        self.full_requests.load(Ordering::SeqCst)
    }

    /// Requested ranges, sorted by start offset.
    pub fn requested(&self) -> Vec<(u64, u64)> {
        let mut ranges = self.requested.lock().unwrap().clone();
        ranges.sort();
        ranges
    }

    pub fn clear_requested(&self) {
        self.requested.lock().unwrap().clear();
    }
}

fn parse_range(headers: &HeaderMap, total: u64) -> Option<(u64, u64)> {
    let value = headers.get(header::RANGE)?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end: u64 = if end.is_empty() { total - 1 } else { end.parse().ok()? };
    Some((start, end.min(total - 1)))
}

async fn get_file(State(origin): State<Arc<Origin>>, headers: HeaderMap) -> Response {
    let total = origin.body.len() as u64;
    let range = parse_range(&headers, total).filter(|_| origin.ranges && origin.partial_gets);

    // A failing range answers straight away; everything else waits out the delay.
    let fail_at = *origin.fail_range_at.lock().unwrap();
    if let Some((start, end)) = range.filter(|(start, _)| fail_at == Some(*start)) {
        origin.range_requests.fetch_add(1, Ordering::SeqCst);
        origin.requested.lock().unwrap().push((start, end));
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let delay = *origin.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if let Some((start, end)) = range {
        origin.range_requests.fetch_add(1, Ordering::SeqCst);
        origin.requested.lock().unwrap().push((start, end));

        let slice = origin.body[start as usize..=end as usize].to_vec();
        return (
            StatusCode::PARTIAL_CONTENT,
            [(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, total))],
            slice,
        )
            .into_response();
    }

    origin.full_requests.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, origin.body.clone()).into_response()
}

async fn head_file(State(origin): State<Arc<Origin>>) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, origin.body.len().to_string());
    if origin.ranges {
        builder = builder.header(header::ACCEPT_RANGES, "bytes");
    }
    builder.body(Body::empty()).unwrap()
}

/// Serves `origin` on an ephemeral port and returns the resource URL.
pub async fn serve(origin: Origin) -> (String, Arc<Origin>) {
    let origin = Arc::new(origin);
    let app = Router::new()
        .route("/file", get(get_file).head(head_file))
        .with_state(Arc::clone(&origin));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/file", addr), origin)
}
