//! The description of one outbound call.
//!
//! # Design
//! `Request` is a value object: setters return `&mut Self` so calls chain,
//! and the `with_*` variants consume and return `self` for one-expression
//! construction. The only precondition it enforces itself is the bound
//! connection, checked in `send` before any transport is touched.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::error::{ConfigError, TransportError};
use crate::http::HttpMethod;
use crate::response::Response;

/// Payload of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestData {
    #[default]
    None,
    /// Serialized to JSON when sent.
    Json(Value),
    /// Sent byte-for-byte.
    Raw(Vec<u8>),
}

impl RequestData {
    /// Empty payloads send no body at all.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestData::None => true,
            RequestData::Json(Value::Null) => true,
            RequestData::Json(Value::Object(map)) => map.is_empty(),
            RequestData::Json(Value::Array(items)) => items.is_empty(),
            RequestData::Json(Value::String(s)) => s.is_empty(),
            RequestData::Json(_) => false,
            RequestData::Raw(bytes) => bytes.is_empty(),
        }
    }

    /// Wire bytes for this payload, `None` when there is nothing to send.
    ///
    /// serde_json never escapes `/`, so URLs and base64 content stay readable.
    pub fn to_body(&self) -> Option<Vec<u8>> {
        if self.is_empty() {
            return None;
        }
        match self {
            RequestData::Json(value) => Some(value.to_string().into_bytes()),
            RequestData::Raw(bytes) => Some(bytes.clone()),
            RequestData::None => None,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, RequestData::Json(_))
    }
}

impl From<Value> for RequestData {
    fn from(value: Value) -> Self {
        RequestData::Json(value)
    }
}

impl From<Map<String, Value>> for RequestData {
    fn from(map: Map<String, Value>) -> Self {
        RequestData::Json(Value::Object(map))
    }
}

impl From<String> for RequestData {
    fn from(raw: String) -> Self {
        RequestData::Raw(raw.into_bytes())
    }
}

impl From<&str> for RequestData {
    fn from(raw: &str) -> Self {
        RequestData::Raw(raw.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for RequestData {
    fn from(raw: Vec<u8>) -> Self {
        RequestData::Raw(raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Request {
    path: String,
    method: HttpMethod,
    data: RequestData,
    query: BTreeMap<String, String>,
    connection: Option<Connection>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = path.into();
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = method;
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn data(&self) -> &RequestData {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<RequestData>) -> &mut Self {
        self.data = data.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = data.into();
        self
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Replace all query parameters.
    pub fn set_query<K, V>(&mut self, query: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = query.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn with_query<K, V>(mut self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_query(query);
        self
    }

    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn set_connection(&mut self, connection: Connection) -> &mut Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn connection(&self) -> Result<&Connection, ConfigError> {
        self.connection.as_ref().ok_or(ConfigError::MissingConnection)
    }

    /// Dispatch through the bound connection's transport.
    pub fn send(&self) -> Result<Response, TransportError> {
        let connection = self.connection()?;
        connection.transport().execute(self, connection)
    }

    /// JSON rendering of path, method, data and query, for logs.
    pub fn to_json(&self) -> Value {
        let data = match &self.data {
            RequestData::None => Value::Null,
            RequestData::Json(value) => value.clone(),
            RequestData::Raw(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        };
        let query: Map<String, Value> = self
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let mut map = Map::new();
        map.insert("path".to_string(), Value::String(self.path.clone()));
        map.insert("method".to_string(), Value::String(self.method.to_string()));
        map.insert("data".to_string(), data);
        map.insert("query".to_string(), Value::Object(query));
        Value::Object(map)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::transport::Transport;

    #[derive(Debug, Default)]
    struct SpyTransport {
        calls: AtomicUsize,
        paths: Mutex<Vec<String>>,
    }

    impl Transport for SpyTransport {
        fn execute(&self, request: &Request, connection: &Connection) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.paths
                .lock()
                .unwrap()
                .push(format!("{}{}", connection.host(), request.path()));
            Ok(Response::new(r#"{"acknowledged":true}"#).with_status(200))
        }
    }

    #[test]
    fn defaults() {
        let request = Request::new("/_stats");
        assert_eq!(request.path(), "/_stats");
        assert_eq!(request.method(), HttpMethod::Get);
        assert_eq!(request.data(), &RequestData::None);
        assert!(request.query().is_empty());
    }

    #[test]
    fn setters_chain() {
        let mut request = Request::new("/");
        request
            .set_path("/logs/_search")
            .set_method(HttpMethod::Post)
            .set_data(json!({"query": {"match_all": {}}}))
            .add_query_param("size", "10");
        assert_eq!(request.path(), "/logs/_search");
        assert_eq!(request.method(), HttpMethod::Post);
        assert!(request.data().is_json());
        assert_eq!(request.query()["size"], "10");
    }

    #[test]
    fn set_query_replaces_existing_params() {
        let mut request = Request::new("/").with_query([("scroll", "1m")]);
        request.set_query([("size", "5")]);
        assert_eq!(request.query().len(), 1);
        assert!(!request.query().contains_key("scroll"));
    }

    #[test]
    fn missing_connection_is_reported() {
        let request = Request::new("/_cluster/health");
        assert!(matches!(request.connection(), Err(ConfigError::MissingConnection)));
    }

    #[test]
    fn send_without_connection_never_reaches_transport() {
        let spy = Arc::new(SpyTransport::default());
        let connection = Connection::with_transport(ConnectionConfig::default(), spy.clone()).unwrap();
        let mut request = Request::new("/_cluster/health").with_connection(connection);
        request.send().unwrap();
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);

        request.connection = None;
        let err = request.send().unwrap_err();

        assert!(matches!(err, TransportError::Configuration(ConfigError::MissingConnection)));
        assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn send_delegates_to_bound_transport() {
        let spy = Arc::new(SpyTransport::default());
        let connection =
            Connection::with_transport(ConnectionConfig::default().with_host("es1"), spy.clone()).unwrap();
        let request = Request::new("/logs/_refresh")
            .with_method(HttpMethod::Post)
            .with_connection(connection);

        let response = request.send().unwrap();
        request.send().unwrap();

        assert!(response.is_ok());
        assert_eq!(spy.calls.load(Ordering::SeqCst), 2);
        assert_eq!(spy.paths.lock().unwrap()[0], "es1/logs/_refresh");
    }

    #[test]
    fn json_body_keeps_slashes_literal() {
        let data = RequestData::from(json!({"field": "a/b"}));
        assert_eq!(data.to_body().unwrap(), br#"{"field":"a/b"}"#.to_vec());
    }

    #[test]
    fn raw_body_is_untouched() {
        let raw = "{\"index\":{}}\n{\"url\":\"http:\\/\\/x\"}\n";
        let data = RequestData::from(raw);
        assert_eq!(data.to_body().unwrap(), raw.as_bytes().to_vec());
    }

    #[test]
    fn empty_payloads_send_no_body() {
        assert_eq!(RequestData::None.to_body(), None);
        assert_eq!(RequestData::from(json!({})).to_body(), None);
        assert_eq!(RequestData::from(json!([])).to_body(), None);
        assert_eq!(RequestData::from(Value::Null).to_body(), None);
        assert_eq!(RequestData::from("").to_body(), None);
        assert!(RequestData::from(json!(0)).to_body().is_some());
    }

    #[test]
    fn renders_as_json_and_text() {
        let request = Request::new("/logs/_doc")
            .with_method(HttpMethod::Put)
            .with_data(json!({"msg": "hi"}))
            .with_query([("refresh", "true")]);
        assert_eq!(
            request.to_json(),
            json!({
                "path": "/logs/_doc",
                "method": "PUT",
                "data": {"msg": "hi"},
                "query": {"refresh": "true"}
            })
        );
        assert_eq!(request.to_string(), "PUT /logs/_doc");
    }
}
