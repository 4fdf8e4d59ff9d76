//! Blocking HTTP transport for a search-engine cluster client.
//!
//! # Overview
//! A `Request` describes one call (path, method, payload, query) and is
//! bound to a `Connection`. `Request::send` hands it to the connection's
//! `Transport`, which performs a single HTTP exchange and classifies the
//! outcome as a `Response`, an application-level failure, or a
//! transport-level failure.
//!
//! # Design
//! - `HttpTransport` splits each call into pure request assembly
//!   (`build_request`) and the network exchange, so URL, header and body
//!   construction are testable without I/O.
//! - Persistent handles are cached per connection inside the transport the
//!   caller owns; there is no global state.
//! - Debug instrumentation is a `TransportConfig` flag, not ambient state.
//! - Nothing is retried. Retry and backoff belong to higher layers.
//!
//! ```no_run
//! use search_transport::{Connection, ConnectionConfig, HttpMethod, Request};
//! use serde_json::json;
//!
//! let connection = Connection::new(ConnectionConfig::default())?;
//! let response = Request::new("/logs/_search")
//!     .with_method(HttpMethod::Post)
//!     .with_data(json!({"query": {"match": {"path": "/var/log"}}}))
//!     .with_query([("size", "10")])
//!     .with_connection(connection)
//!     .send()?;
//! println!("took {:?} ms", response.engine_time());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod connection;
pub mod error;
pub mod http;
pub mod http_transport;
pub mod request;
pub mod response;
pub mod transport;

pub use connection::{Connection, ConnectionConfig, Scheme};
pub use error::{ConfigError, TransportError, TransportErrorCode};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use http_transport::HttpTransport;
pub use request::{Request, RequestData};
pub use response::{Response, TransferInfo};
pub use transport::{classify, ExchangeFailure, Transport, TransportConfig};
