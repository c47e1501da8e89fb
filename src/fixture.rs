//! A dummy HTTP server that serves one resource in byte ranges.
//!
//! Used by the integration tests and by the `dummy_server` binary for manual
//! testing. It can inject `500 Internal Server Error` responses on GET and a
//! random delay before answering. All randomness comes from the `StdRng`
//! handed to [`router`], so a fixed seed gives a reproducible run.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::Rng;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct FixtureConfig {
    /// Request path the resource is served under, e.g. `/foo.png`.
    pub path: String,
    pub contents: Bytes,
    /// Percentage (0-100) of GET requests answered with a 500.
    pub failure_rate: u8,
    /// Upper bound (exclusive) of the random delay applied to non-HEAD requests.
    pub max_delay: Duration,
}

impl FixtureConfig {
    pub fn new(path: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            failure_rate: 0,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_failure_rate(mut self, percent: u8) -> Self {
        self.failure_rate = percent.min(100);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

struct FixtureState {
    config: FixtureConfig,
    rng: Mutex<StdRng>,
}

pub fn router(config: FixtureConfig, rng: StdRng) -> Router {
    let path = config.path.clone();
    let state = Arc::new(FixtureState {
        config,
        rng: Mutex::new(rng),
    });
    Router::new()
        .route(&path, get(serve).head(serve))
        .with_state(state)
}

/// Bind to an ephemeral port on localhost and serve in the background.
pub async fn spawn(config: FixtureConfig, rng: StdRng) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    let app = router(config, rng);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "dummy server stopped");
        }
    });
    Ok((addr, handle))
}

async fn serve(
    State(state): State<Arc<FixtureState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let config = &state.config;
    let (delay, fail) = roll(&state, &method);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (status, body, content_range) = if fail {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"Internal Server Error"),
            None,
        )
    } else {
        match range_header.as_deref() {
            None => (StatusCode::PARTIAL_CONTENT, config.contents.clone(), None),
            Some(value) => match parse_range(value, config.contents.len()) {
                Some((start, end)) => (
                    StatusCode::PARTIAL_CONTENT,
                    config.contents.slice(start..=end),
                    Some(format!("bytes {}-{}/{}", start, end, config.contents.len())),
                ),
                None => (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    Bytes::new(),
                    Some(format!("bytes */{}", config.contents.len())),
                ),
            },
        }
    };

    info!(
        %method,
        %uri,
        status = status.as_u16(),
        range = range_header.as_deref().unwrap_or(""),
        "dummy server request"
    );

    let mut response = Response::new(Body::from(body.clone()));
    *response.status_mut() = status;
    let response_headers = response.headers_mut();
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
        response_headers.insert(header::CONTENT_RANGE, value);
    }
    response
}

/// Draw the delay and the failure decision for one request.
fn roll(state: &FixtureState, method: &Method) -> (Duration, bool) {
    let config = &state.config;
    let mut rng = match state.rng.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let delay = if *method != Method::HEAD && !config.max_delay.is_zero() {
        let max_ms = config.max_delay.as_millis().max(1) as u64;
        Duration::from_millis(rng.gen_range(0..max_ms))
    } else {
        Duration::ZERO
    };
    let fail = *method == Method::GET && rng.gen_range(0..100u8) < config.failure_rate;
    (delay, fail)
}

/// Parse `bytes=<start>-<end>` against a resource of `len` bytes into an
/// inclusive index pair. The end is clamped to the resource.
fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: usize = start.trim().parse().ok()?;
    let end: usize = match end.trim() {
        "" => len.checked_sub(1)?,
        s => s.parse().ok()?,
    };
    if start > end || start >= len {
        return None;
    }
    Some((start, end.min(len - 1)))
}
