//! Addressing and configuration for one cluster endpoint.
//!
//! # Design
//! `ConnectionConfig` is plain serde data with defaults for every field, so
//! it can be loaded from JSON or built in code. The fields the transport
//! relies on (`url`, `host`, `headers`, `timeout`) are typed and checked by
//! `validate`. `transport_options` is the escape hatch for low-level tuning
//! and is not checked here. Unknown keys are kept in `extra` and stay
//! readable through `Connection::config`.
//!
//! A `Connection` is immutable once built. Clones share the same id, config
//! and transport, so the transport treats them as one logical connection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ureq::http::{HeaderName, HeaderValue};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::http_transport::HttpTransport;
use crate::transport::Transport;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9200;
/// Seconds.
pub const DEFAULT_TIMEOUT: u64 = 300;

/// URL scheme used when composing the base URI from host and port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    #[serde(alias = "Http")]
    Http,
    #[serde(alias = "Https")]
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Base path prepended to every request path.
    pub path: String,
    /// Explicit base URL. Takes precedence over host, port and path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Per-call timeout in seconds. `0` disables it.
    pub timeout: u64,
    pub persistent: bool,
    #[serde(rename = "transport")]
    pub scheme: Scheme,
    pub headers: BTreeMap<String, String>,
    /// Low-level tuning options, applied in order.
    #[serde(alias = "curl")]
    pub transport_options: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: String::new(),
            url: None,
            timeout: DEFAULT_TIMEOUT,
            persistent: true,
            scheme: Scheme::Http,
            headers: BTreeMap::new(),
            transport_options: Map::new(),
            extra: Map::new(),
        }
    }
}

impl ConnectionConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_transport_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.transport_options.insert(name.into(), value.into());
        self
    }

    /// The explicit `url`, ignoring an empty string.
    pub fn explicit_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.explicit_url() {
            Some(raw) => {
                let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidUrl {
                        url: raw.to_string(),
                        reason: format!("unsupported scheme {:?}", parsed.scheme()),
                    });
                }
            }
            None if self.host.trim().is_empty() => return Err(ConfigError::EmptyHost),
            None => {}
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// One cluster endpoint plus the transport that talks to it.
#[derive(Debug, Clone)]
pub struct Connection {
    id: Uuid,
    config: Arc<ConnectionConfig>,
    transport: Arc<dyn Transport>,
}

impl Connection {
    /// Validate `config` and bind a default `HttpTransport`.
    pub fn new(config: ConnectionConfig) -> Result<Self, ConfigError> {
        Self::with_transport(config, Arc::new(HttpTransport::default()))
    }

    pub fn with_transport(
        config: ConnectionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            config: Arc::new(config),
            transport,
        })
    }

    /// Parse a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ConnectionConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        Self::new(config)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    pub fn url(&self) -> Option<&str> {
        self.config.explicit_url()
    }

    pub fn scheme(&self) -> Scheme {
        self.config.scheme
    }

    /// `None` when the timeout is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.config.timeout {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.config.persistent
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.config.headers
    }

    pub fn transport_options(&self) -> &Map<String, Value> {
        &self.config.transport_options
    }

    /// The shared config; it lives exactly as long as some clone of this
    /// connection does.
    pub(crate) fn shared_config(&self) -> &Arc<ConnectionConfig> {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Base URI requests are resolved against.
    pub fn base_url(&self) -> String {
        match self.config.explicit_url() {
            Some(url) => url.to_string(),
            None => format!(
                "{}://{}:{}/{}",
                self.config.scheme,
                self.config.host,
                self.config.port,
                self.config.path.trim_start_matches('/')
            ),
        }
    }

    /// Look up any configuration key, typed or free-form, as JSON.
    ///
    /// Null and empty-string values count as unset. `curl` reads the
    /// transport options.
    pub fn config(&self, key: &str) -> Option<Value> {
        let key = match key {
            "curl" => "transport_options",
            other => other,
        };
        if let Some(value) = self.config.extra.get(key) {
            return Some(value.clone());
        }
        let Ok(Value::Object(mut map)) = serde_json::to_value(&*self.config) else {
            return None;
        };
        map.remove(key)
            .filter(|value| !value.is_null() && value.as_str() != Some(""))
    }

    pub fn has_config(&self, key: &str) -> bool {
        self.config(key).is_some()
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            config: Arc::new(ConnectionConfig::default()),
            transport: Arc::new(HttpTransport::default()),
        }
    }
}
