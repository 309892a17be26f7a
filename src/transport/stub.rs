//! Scripted in-process transport.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Transport, TransportError};
use crate::types::SensorKind;

/// Canned reply for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubResponse {
    /// Answer with this status code
    Status(u16),
    /// Fail before any response, like a refused connection
    Refuse,
}

/// Transport that answers from a per-endpoint script and records every call.
pub struct StubTransport {
    default: StubResponse,
    responses: HashMap<String, StubResponse>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    /// Accept every POST with `201 Created`.
    pub fn accepting() -> Self {
        Self {
            default: StubResponse::Status(201),
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, endpoint: &str, response: StubResponse) -> Self {
        self.responses.insert(endpoint.to_string(), response);
        self
    }

    /// Make the endpoint of `kind` answer `500`.
    pub fn failing_for(self, kind: SensorKind) -> Self {
        self.with_response(kind.endpoint(), StubResponse::Status(500))
    }

    /// Endpoints called so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn post(&self, endpoint: &str, _body: Vec<u8>) -> Result<u16, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(endpoint.to_string());

        match self.responses.get(endpoint).copied().unwrap_or(self.default) {
            StubResponse::Status(code) => Ok(code),
            StubResponse::Refuse => Err(TransportError::Connection(format!(
                "stub refused connection to {endpoint}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}
