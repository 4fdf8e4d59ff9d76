//! Blocking HTTP transport backed by `ureq`.
//!
//! # Design
//! `execute` is a straight pipeline: `build_request` assembles an
//! `HttpRequest` as plain data, a handle performs the exchange, and
//! `transport::classify` decides the outcome. Nothing is retried.
//!
//! A handle wraps a `ureq::Agent`, which owns the keep-alive pool. Handles
//! for persistent connections are cached per connection id inside the
//! transport, behind a mutex, so concurrent sends through one transport are
//! safe. Non-persistent connections get a fresh handle on every call.
//! A cached handle is evicted once every clone of its connection has been
//! dropped; `release` and `close` evict eagerly.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use serde_json::Value;
use ureq::Agent;
use uuid::Uuid;

use crate::connection::{Connection, ConnectionConfig};
use crate::error::{TransportError, TransportErrorCode};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::request::Request;
use crate::response::{Response, TransferInfo};
use crate::transport::{classify, ExchangeFailure, Transport, TransportConfig};

#[derive(Debug, Default)]
pub struct HttpTransport {
    config: TransportConfig,
    handles: Mutex<HashMap<Uuid, CachedHandle>>,
}

/// A persistent handle and the connection config it was opened for.
#[derive(Debug)]
struct CachedHandle {
    owner: Weak<ConnectionConfig>,
    handle: Arc<Handle>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> TransportConfig {
        self.config
    }

    /// Assemble the wire request without performing any I/O.
    pub fn build_request(&self, request: &Request, connection: &Connection) -> HttpRequest {
        let mut url = join_url(&connection.base_url(), request.path());
        if !request.query().is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(request.query())
                .finish();
            url.push('?');
            url.push_str(&query);
        }

        let mut headers: Vec<(String, String)> = connection
            .headers()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let body = request.data().to_body();
        let has_content_type = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
        if body.is_some() && request.data().is_json() && !has_content_type {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        HttpRequest {
            method: request.method(),
            url,
            headers,
            body,
            timeout: connection.timeout(),
        }
    }

    /// Drop the cached handle of one connection.
    pub fn release(&self, connection: &Connection) -> bool {
        self.lock_handles().remove(&connection.id()).is_some()
    }

    /// Drop every cached handle.
    pub fn close(&self) {
        self.lock_handles().clear();
    }

    /// Number of live cached handles.
    pub fn cached_handles(&self) -> usize {
        let mut handles = self.lock_handles();
        evict_orphans(&mut handles);
        handles.len()
    }

    fn lock_handles(&self) -> MutexGuard<'_, HashMap<Uuid, CachedHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the handle and whether it came from the cache.
    fn acquire_handle(&self, connection: &Connection) -> Result<(Arc<Handle>, bool), ExchangeFailure> {
        if !connection.is_persistent() {
            return Ok((Arc::new(Handle::open(connection)?), false));
        }

        let mut handles = self.lock_handles();
        evict_orphans(&mut handles);
        if let Some(cached) = handles.get(&connection.id()) {
            log::trace!("reusing handle for connection {}", connection.id());
            return Ok((Arc::clone(&cached.handle), true));
        }
        let handle = Arc::new(Handle::open(connection)?);
        handles.insert(
            connection.id(),
            CachedHandle {
                owner: Arc::downgrade(connection.shared_config()),
                handle: Arc::clone(&handle),
            },
        );
        Ok((handle, false))
    }
}

fn evict_orphans(handles: &mut HashMap<Uuid, CachedHandle>) {
    handles.retain(|id, cached| {
        let alive = cached.owner.strong_count() > 0;
        if !alive {
            log::trace!("evicting handle of dropped connection {id}");
        }
        alive
    });
}

impl Transport for HttpTransport {
    fn execute(&self, request: &Request, connection: &Connection) -> Result<Response, TransportError> {
        let http_request = self.build_request(request, connection);
        log::debug!("{} {}", http_request.method, http_request.url);
        if let Some(body) = &http_request.body {
            log::trace!("request body: {} bytes", body.len());
        }

        let (handle, reused) = match self.acquire_handle(connection) {
            Ok(acquired) => acquired,
            Err(failure) => return classify(request, Response::new(Vec::new()), Some(failure)),
        };

        let start = Instant::now();
        let outcome = handle.exchange(&http_request);
        let elapsed = start.elapsed();

        let (http_response, failure) = match outcome {
            Ok(http_response) => (http_response, None),
            Err(failure) => (HttpResponse::default(), Some(failure)),
        };
        log::debug!(
            "{} {} -> {} in {:?}",
            http_request.method,
            http_request.url,
            http_response.status,
            elapsed
        );

        let content_type = http_response.header("content-type").map(str::to_string);
        let size_download = http_response.body.len();
        let mut response = Response::new(http_response.body).with_status(http_response.status);

        if self.config.debug {
            response.set_query_time(elapsed).set_transfer_info(TransferInfo {
                url: http_request.url.clone(),
                method: http_request.method,
                http_code: http_response.status,
                total_time: elapsed.as_secs_f64(),
                size_upload: http_request.body.as_ref().map_or(0, Vec::len),
                size_download,
                content_type,
                handle_reused: reused,
            });
        }

        classify(request, response, failure)
    }
}

/// A reusable connection handle.
pub(crate) struct Handle {
    agent: Agent,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").finish_non_exhaustive()
    }
}

impl Handle {
    /// Build an agent from the connection's timeout and transport options.
    fn open(connection: &Connection) -> Result<Self, ExchangeFailure> {
        let mut config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(connection.timeout());

        for (name, value) in connection.transport_options() {
            config = match name.as_str() {
                "max_redirects" => config.max_redirects(option_u32(name, value)?),
                "user_agent" => config.user_agent(option_str(name, value)?),
                "accept" => config.accept(option_str(name, value)?),
                "https_only" => config.https_only(option_bool(name, value)?),
                "timeout_connect" => config.timeout_connect(Some(option_secs(name, value)?)),
                "timeout_resolve" => config.timeout_resolve(Some(option_secs(name, value)?)),
                "max_response_header_size" => {
                    config.max_response_header_size(option_u32(name, value)? as usize)
                }
                _ => {
                    log::warn!("ignoring unknown transport option {name:?}");
                    config
                }
            };
        }

        Ok(Self {
            agent: config.build().new_agent(),
        })
    }

    fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeFailure> {
        let agent = &self.agent;
        let url = request.url.as_str();

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, None) => prepare(agent.get(url), request).call(),
            (HttpMethod::Get, Some(body)) => prepare(agent.get(url), request).force_send_body().send(body),
            (HttpMethod::Delete, None) => prepare(agent.delete(url), request).call(),
            (HttpMethod::Delete, Some(body)) => prepare(agent.delete(url), request).force_send_body().send(body),
            (HttpMethod::Post, Some(body)) => prepare(agent.post(url), request).send(body),
            (HttpMethod::Post, None) => prepare(agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => prepare(agent.put(url), request).send(body),
            (HttpMethod::Put, None) => prepare(agent.put(url), request).send_empty(),
        };
        let mut response = result.map_err(failure_from)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        // No cap on the body size.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(failure_from)?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Apply the request's headers and its per-call timeout.
fn prepare<B>(builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    let mut builder = builder.config().timeout_global(request.timeout).build();
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Join base and path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn bad_option(name: &str, expected: &str, value: &Value) -> ExchangeFailure {
    ExchangeFailure::new(
        TransportErrorCode::BadArgument,
        format!("transport option {name:?} expects {expected}, got {value}"),
    )
}

fn option_u32(name: &str, value: &Value) -> Result<u32, ExchangeFailure> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| bad_option(name, "an unsigned integer", value))
}

fn option_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, ExchangeFailure> {
    value.as_str().ok_or_else(|| bad_option(name, "a string", value))
}

fn option_bool(name: &str, value: &Value) -> Result<bool, ExchangeFailure> {
    value.as_bool().ok_or_else(|| bad_option(name, "a boolean", value))
}

fn option_secs(name: &str, value: &Value) -> Result<Duration, ExchangeFailure> {
    value
        .as_f64()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| bad_option(name, "a number of seconds", value))
}

fn failure_from(err: ureq::Error) -> ExchangeFailure {
    let code = match &err {
        ureq::Error::Timeout(_) => TransportErrorCode::TimedOut,
        ureq::Error::HostNotFound => TransportErrorCode::CouldntResolveHost,
        ureq::Error::ConnectionFailed => TransportErrorCode::CouldntConnect,
        ureq::Error::Io(io_err) => code_for_io(io_err),
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => TransportErrorCode::UrlMalformed,
        ureq::Error::RequireHttpsOnly(_) => TransportErrorCode::UnsupportedProtocol,
        ureq::Error::TooManyRedirects => TransportErrorCode::TooManyRedirects,
        ureq::Error::BodyExceedsLimit(_) | ureq::Error::LargeResponseHeader(..) => {
            TransportErrorCode::ResponseTooLarge
        }
        ureq::Error::Protocol(_) => TransportErrorCode::WeirdServerReply,
        ureq::Error::Tls(_) => TransportErrorCode::TlsConnect,
        _ => TransportErrorCode::Other,
    };
    ExchangeFailure::new(code, err.to_string())
}

fn code_for_io(err: &io::Error) -> TransportErrorCode {
    match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => TransportErrorCode::CouldntConnect,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorCode::TimedOut,
        io::ErrorKind::BrokenPipe => TransportErrorCode::SendError,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::UnexpectedEof => {
            TransportErrorCode::RecvError
        }
        _ => TransportErrorCode::Other,
    }
}
