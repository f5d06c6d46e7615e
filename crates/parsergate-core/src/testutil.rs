//! Test helpers shared by the `#[cfg(test)]` modules of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::api::{ApiError, Transport};

/// Permits handed out by [`ScriptedTransport::release`]; enough for any test.
const RELEASE_PERMITS: usize = 1024;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// In-memory `Transport` that replays queued responses per path.
///
/// A path with nothing queued answers with a network error. A gated
/// transport records each request immediately but holds the response until
/// [`release`](Self::release) is called, which keeps calls in flight.
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn respond(&self, path: &str, result: Result<Value, ApiError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn ok(&self, path: &str, payload: Value) {
        self.respond(path, Ok(payload));
    }

    /// Queue a non-2xx reply, classified exactly as the real client would.
    pub fn fail(&self, path: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.respond(path, Err(ApiError::from_status(status, body)));
    }

    pub fn release(&self) {
        if let Some(ref gate) = self.gate {
            gate.add_permits(RELEASE_PERMITS);
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.path == path).count()
    }
}

impl Transport for ScriptedTransport {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<Value>,
    ) -> BoxFuture<'a, Result<Value, ApiError>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.to_string(),
                body,
            });

            if let Some(ref gate) = self.gate {
                let _permit = gate.acquire().await;
            }

            self.responses
                .lock()
                .unwrap()
                .get_mut(path)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(ApiError::Network(format!("no scripted response for {}", path))))
        })
    }
}
