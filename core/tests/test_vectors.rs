//! Verify request assembly against JSON test vectors stored in `test-vectors/`.
//!
//! Each URL vector describes a connection config, a request, and the URL the
//! transport must put on the wire. Body vectors pair a JSON payload with the
//! exact bytes expected, or `null` when no body should be sent.

use std::collections::BTreeMap;

use search_transport::{Connection, ConnectionConfig, HttpMethod, HttpTransport, Request};

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

#[test]
fn url_test_vectors() {
    let raw = include_str!("../../test-vectors/urls.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let transport = HttpTransport::default();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let config: ConnectionConfig = serde_json::from_value(case["connection"].clone()).unwrap();
        let connection = Connection::new(config).unwrap();

        let spec = &case["request"];
        let method: HttpMethod = spec["method"].as_str().unwrap().parse().unwrap();
        let query: BTreeMap<String, String> = serde_json::from_value(spec["query"].clone()).unwrap();
        let request = Request::new(spec["path"].as_str().unwrap())
            .with_method(method)
            .with_query(query);

        let http = transport.build_request(&request, &connection);
        assert_eq!(http.method, method, "{name}: method");
        assert_eq!(http.url, case["expected_url"].as_str().unwrap(), "{name}: url");
        assert_eq!(http.url.contains('?'), !request.query().is_empty(), "{name}: query marker");
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[test]
fn body_test_vectors() {
    let raw = include_str!("../../test-vectors/bodies.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let transport = HttpTransport::default();
    let connection = Connection::new(ConnectionConfig::default()).unwrap();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let request = Request::new("/index/_doc")
            .with_method(HttpMethod::Post)
            .with_data(case["data"].clone());

        let http = transport.build_request(&request, &connection);
        match case["expected_body"].as_str() {
            Some(expected) => {
                let body = http.body_str().unwrap();
                assert_eq!(body, expected, "{name}: body");
                assert!(!body.contains("\\/"), "{name}: escaped slash");
            }
            None => assert!(http.body.is_none(), "{name}: body should be None"),
        }
    }
}
