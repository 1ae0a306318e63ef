//! Scripted in-memory transport for tests. Records every call at issue time.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ApiRequest, Endpoint, Transport, TransportError};

type Scripted = Result<Value, TransportError>;

#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<Endpoint, VecDeque<Scripted>>>,
    fallback: Mutex<HashMap<Endpoint, Scripted>>,
    delays: Mutex<HashMap<Endpoint, Duration>>,
    calls: Mutex<Vec<ApiRequest>>,
}

/// Wraps `data` in a successful backend envelope.
pub fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a one-shot response. Queued responses are served in order.
    pub fn push(&self, endpoint: Endpoint, response: Scripted) {
        self.queued
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(response);
    }

    /// Response served whenever the queue for `endpoint` is empty.
    pub fn always(&self, endpoint: Endpoint, response: Scripted) {
        self.fallback.lock().unwrap().insert(endpoint, response);
    }

    pub fn delay(&self, endpoint: Endpoint, delay: Duration) {
        self.delays.lock().unwrap().insert(endpoint, delay);
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        let delay = self.delays.lock().unwrap().get(&request.endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&request.endpoint)
            .and_then(VecDeque::pop_front);

        queued
            .or_else(|| self.fallback.lock().unwrap().get(&request.endpoint).cloned())
            .unwrap_or_else(|| {
                Err(TransportError::Http {
                    status: 404,
                    body: format!("unscripted endpoint {:?}", request.endpoint),
                })
            })
    }
}
