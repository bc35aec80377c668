//! In-process stand-in for the integrations backend, for tests
//!
//! Serves canned responses per path and records every form request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::http_client::build_backend_client;
use crate::model::config::Config;

use super::backend::BackendClient;

/// A request received by the fake backend
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub form: HashMap<String, String>,
}

impl RecordedCall {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct Inner {
    responses: HashMap<String, (u16, String)>,
    calls: Vec<RecordedCall>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` as JSON with `status` for POSTs to `path`
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.inner
            .lock()
            .responses
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    /// Bind to an ephemeral port and return the origin
    pub async fn spawn(&self) -> String {
        let app = Router::new().fallback(record).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Spawn and build a client pointed at this backend
    pub async fn client(&self) -> BackendClient {
        let origin = self.spawn().await;
        let client = build_backend_client(&Config::default()).unwrap();
        BackendClient::new(client, origin)
    }
}

async fn record(
    State(fake): State<FakeBackend>,
    uri: Uri,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let path = uri.path().to_string();
    let mut inner = fake.inner.lock();
    inner.calls.push(RecordedCall {
        path: path.clone(),
        form,
    });

    let (status, body) = inner
        .responses
        .get(&path)
        .cloned()
        .unwrap_or_else(|| (404, json!({"detail": "Not Found"}).to_string()));

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
