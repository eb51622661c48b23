//! In-process mock WMS upstream.
//!
//! Binds an ephemeral port and answers every GET like a WMS GetMap
//! endpoint, with a configurable body and optional leading failures for
//! retry tests. Request query strings are recorded for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;

use crate::images::solid_png;

/// What the mock returns once it stops failing.
#[derive(Clone)]
pub enum MockBody {
    /// A fixed byte body (e.g. a pre-encoded PNG).
    Fixed(Vec<u8>),
    /// A solid PNG of exactly the WIDTH×HEIGHT the request asked for.
    EchoSize([u8; 4]),
    /// Arbitrary non-image bytes, for decode-failure tests.
    Garbage,
}

struct MockState {
    body: MockBody,
    fail_first: AtomicUsize,
    hits: AtomicUsize,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

/// Handle to a running mock upstream.
pub struct MockWms {
    state: Arc<MockState>,
    addr: std::net::SocketAddr,
}

impl MockWms {
    /// Start a mock that always answers 200 with `body`.
    pub async fn start(body: MockBody) -> Self {
        Self::start_with_failures(body, 0).await
    }

    /// Start a mock whose first `fail_first` requests answer 500.
    pub async fn start_with_failures(body: MockBody, fail_first: usize) -> Self {
        let state = Arc::new(MockState {
            body,
            fail_first: AtomicUsize::new(fail_first),
            hits: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(any(handle_get_map))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock wms serve");
        });

        Self { state, addr }
    }

    /// Base URL of the mock, usable as a WMS backend URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Query parameters of every request received so far.
    pub fn queries(&self) -> Vec<HashMap<String, String>> {
        self.state.queries.lock().unwrap().clone()
    }
}

async fn handle_get_map(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.queries.lock().unwrap().push(params.clone());

    let should_fail = state
        .fail_first
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if should_fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, Vec::new()).into_response();
    }

    let body = match &state.body {
        MockBody::Fixed(bytes) => bytes.clone(),
        MockBody::EchoSize(color) => {
            let width = dimension(&params, "WIDTH");
            let height = dimension(&params, "HEIGHT");
            solid_png(width, height, *color)
        }
        MockBody::Garbage => b"this is not a png".to_vec(),
    };

    ([(header::CONTENT_TYPE, "image/png")], body).into_response()
}

fn dimension(params: &HashMap<String, String>, key: &str) -> u32 {
    params
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(256)
}
