//! Error types for request dispatch.
//!
//! # Design
//! Three failure kinds reach the caller. `Configuration` is raised before any
//! network activity. `Response` means the server answered but the body or
//! status signals an application error. `Transport` means the exchange itself
//! failed below HTTP and carries a numeric code. When both an application
//! error and a low-level code are present, `Response` wins.

use std::fmt;

use crate::request::Request;
use crate::response::Response;

/// Problems with how a request or connection is set up.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no connection bound to request")]
    MissingConnection,

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection host must not be empty")]
    EmptyHost,

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid connection config: {0}")]
    InvalidConfig(String),
}

/// Low-level exchange failure codes.
///
/// Numbering follows libcurl's `CURLcode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    UnsupportedProtocol,
    Other,
    UrlMalformed,
    CouldntResolveHost,
    CouldntConnect,
    WeirdServerReply,
    TimedOut,
    TlsConnect,
    BadArgument,
    TooManyRedirects,
    SendError,
    RecvError,
    ResponseTooLarge,
}

impl TransportErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            TransportErrorCode::UnsupportedProtocol => 1,
            TransportErrorCode::Other => 2,
            TransportErrorCode::UrlMalformed => 3,
            TransportErrorCode::CouldntResolveHost => 6,
            TransportErrorCode::CouldntConnect => 7,
            TransportErrorCode::WeirdServerReply => 8,
            TransportErrorCode::TimedOut => 28,
            TransportErrorCode::TlsConnect => 35,
            TransportErrorCode::BadArgument => 43,
            TransportErrorCode::TooManyRedirects => 47,
            TransportErrorCode::SendError => 55,
            TransportErrorCode::RecvError => 56,
            TransportErrorCode::ResponseTooLarge => 63,
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorCode::UnsupportedProtocol => "unsupported protocol",
            TransportErrorCode::Other => "transport error",
            TransportErrorCode::UrlMalformed => "malformed url",
            TransportErrorCode::CouldntResolveHost => "could not resolve host",
            TransportErrorCode::CouldntConnect => "could not connect",
            TransportErrorCode::WeirdServerReply => "invalid server reply",
            TransportErrorCode::TimedOut => "operation timed out",
            TransportErrorCode::TlsConnect => "tls connect error",
            TransportErrorCode::BadArgument => "bad transport option",
            TransportErrorCode::TooManyRedirects => "too many redirects",
            TransportErrorCode::SendError => "send error",
            TransportErrorCode::RecvError => "receive error",
            TransportErrorCode::ResponseTooLarge => "response too large",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Errors returned by `Request::send` and `Transport::execute`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The server answered with an application-level error.
    #[error("response error: {}", .0.error_summary())]
    Response(Box<Response>),

    /// The exchange failed below the application layer.
    #[error("{code}: {message} ({request})")]
    Transport {
        code: TransportErrorCode,
        message: String,
        request: Box<Request>,
        response: Box<Response>,
    },
}

impl TransportError {
    /// The response carried by a `Response` or `Transport` failure.
    pub fn response(&self) -> Option<&Response> {
        match self {
            TransportError::Configuration(_) => None,
            TransportError::Response(response) => Some(response),
            TransportError::Transport { response, .. } => Some(response),
        }
    }

    /// The low-level code of a `Transport` failure.
    pub fn code(&self) -> Option<TransportErrorCode> {
        match self {
            TransportError::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, TransportError::Configuration(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, TransportError::Response(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, TransportError::Transport { .. })
    }
}
