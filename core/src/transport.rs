//! The seam between a `Request` and the network.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::{TransportError, TransportErrorCode};
use crate::request::Request;
use crate::response::Response;

/// Executes one request against one connection.
///
/// Implementations must not retry; every failure goes back to the caller.
pub trait Transport: Send + Sync + fmt::Debug {
    fn execute(&self, request: &Request, connection: &Connection) -> Result<Response, TransportError>;
}

/// Settings fixed when a transport is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Attach query time and transfer info to every response.
    pub debug: bool,
}

/// A low-level failure reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
    pub code: TransportErrorCode,
    pub message: String,
}

impl ExchangeFailure {
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Turn the outcome of an exchange into the caller-facing result.
///
/// An application error in the response takes precedence over a
/// simultaneous low-level failure.
pub fn classify(
    request: &Request,
    response: Response,
    failure: Option<ExchangeFailure>,
) -> Result<Response, TransportError> {
    if response.has_error() {
        log::debug!("{request} failed: {}", response.error_summary());
        return Err(TransportError::Response(Box::new(response)));
    }
    if let Some(failure) = failure {
        log::debug!("{request} failed: {} ({})", failure.code, failure.message);
        return Err(TransportError::Transport {
            code: failure.code,
            message: failure.message,
            request: Box::new(request.clone()),
            response: Box::new(response),
        });
    }
    Ok(response)
}
