//! Transport abstraction for the first pipeline hop.
//!
//! A worker hands its encoded payload to a [`Transport`] and only looks at
//! the outcome: an HTTP-like status code, or a connection-level failure.
//! Two implementations ship with the crate:
//!
//! - [`HttpTransport`]: real POSTs via `reqwest`
//! - [`StubTransport`]: scripted in-process responses for tests and offline runs

mod http;
mod stub;

pub use http::HttpTransport;
pub use stub::{StubResponse, StubTransport};

use async_trait::async_trait;

/// Lowest status code treated as a failure.
pub const FAILURE_STATUS: u16 = 400;

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (refused, timed out, DNS, ...)
    #[error("connection failed: {0}")]
    Connection(String),
    /// The endpoint answered with a failure status
    #[error("endpoint returned status {0}")]
    Status(u16),
    #[error("transport setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    /// Classify a response status, mapping `>= 400` to [`TransportError::Status`].
    pub fn check_status(status: u16) -> Result<u16, Self> {
        if status >= FAILURE_STATUS {
            Err(Self::Status(status))
        } else {
            Ok(status)
        }
    }
}

/// Where a worker's payload goes.
///
/// Implementations must be cheap to share: one instance serves every worker
/// of every batch concurrently.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// POST `body` (JSON) to `endpoint` and return the response status.
    ///
    /// Any status is `Ok`; callers classify it with
    /// [`TransportError::check_status`].
    async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<u16, TransportError>;

    /// Human-readable name for logging (e.g. "http", "stub").
    fn name(&self) -> &str;
}
