//! In-memory stand-in for a search cluster node.
//!
//! Implements just enough of the document and search endpoints to exercise
//! the transport over real HTTP, plus a few diagnostic routes: `/_echo`
//! reflects the request back, `/_slow` delays its answer, and `/_fail`
//! answers like a broken gateway.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// index name -> document id -> source
pub type Db = Arc<RwLock<HashMap<String, HashMap<String, Value>>>>;

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/", get(cluster_info))
        .route("/_echo", any(echo))
        .route("/_echo/{*rest}", any(echo))
        .route("/_slow", get(slow))
        .route("/_fail", any(fail))
        .route("/{index}", axum::routing::delete(delete_index))
        .route("/{index}/_doc", post(create_doc))
        .route("/{index}/_doc/{id}", get(get_doc).put(put_doc).delete(delete_doc))
        .route("/{index}/_search", get(search).post(search))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn cluster_info() -> Json<Value> {
    Json(json!({
        "name": "mock-node",
        "cluster_name": "mock-cluster",
        "version": {"number": "8.0.0"},
        "tagline": "You Know, for Search"
    }))
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), json!(value.to_str().ok()?))))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": query,
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

#[derive(Deserialize)]
struct SlowParams {
    #[serde(default = "default_delay_ms")]
    ms: u64,
}

fn default_delay_ms() -> u64 {
    2000
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({"ok": true}))
}

async fn fail() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "<html><body>502 Bad Gateway</body></html>")
}

fn error_reply(status: StatusCode, kind: &str, reason: String) -> Reply {
    (
        status,
        Json(json!({
            "error": {"type": kind, "reason": reason},
            "status": status.as_u16()
        })),
    )
}

fn parse_source(body: &Bytes) -> Result<Value, Reply> {
    serde_json::from_slice(body)
        .map_err(|e| error_reply(StatusCode::BAD_REQUEST, "parse_exception", e.to_string()))
}

fn shards() -> Value {
    json!({"total": 1, "successful": 1, "failed": 0})
}

async fn create_doc(State(db): State<Db>, Path(index): Path<String>, body: Bytes) -> Reply {
    let source = match parse_source(&body) {
        Ok(source) => source,
        Err(reply) => return reply,
    };
    let id = Uuid::new_v4().to_string();
    db.write()
        .await
        .entry(index.clone())
        .or_default()
        .insert(id.clone(), source);
    (
        StatusCode::CREATED,
        Json(json!({"_index": index, "_id": id, "result": "created", "_shards": shards()})),
    )
}

async fn put_doc(
    State(db): State<Db>,
    Path((index, id)): Path<(String, String)>,
    body: Bytes,
) -> Reply {
    let source = match parse_source(&body) {
        Ok(source) => source,
        Err(reply) => return reply,
    };
    let previous = db
        .write()
        .await
        .entry(index.clone())
        .or_default()
        .insert(id.clone(), source);
    let (status, result) = match previous {
        Some(_) => (StatusCode::OK, "updated"),
        None => (StatusCode::CREATED, "created"),
    };
    (
        status,
        Json(json!({"_index": index, "_id": id, "result": result, "_shards": shards()})),
    )
}

async fn get_doc(State(db): State<Db>, Path((index, id)): Path<(String, String)>) -> Reply {
    let db = db.read().await;
    match db.get(&index).and_then(|docs| docs.get(&id)) {
        Some(source) => (
            StatusCode::OK,
            Json(json!({"_index": index, "_id": id, "found": true, "_source": source})),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"_index": index, "_id": id, "found": false})),
        ),
    }
}

async fn delete_doc(State(db): State<Db>, Path((index, id)): Path<(String, String)>) -> Reply {
    let mut db = db.write().await;
    let removed = db.get_mut(&index).and_then(|docs| docs.remove(&id));
    let (status, result) = match removed {
        Some(_) => (StatusCode::OK, "deleted"),
        None => (StatusCode::NOT_FOUND, "not_found"),
    };
    (
        status,
        Json(json!({"_index": index, "_id": id, "result": result})),
    )
}

async fn delete_index(State(db): State<Db>, Path(index): Path<String>) -> Reply {
    match db.write().await.remove(&index) {
        Some(_) => (StatusCode::OK, Json(json!({"acknowledged": true}))),
        None => error_reply(
            StatusCode::NOT_FOUND,
            "index_not_found_exception",
            format!("no such index [{index}]"),
        ),
    }
}

async fn search(
    State(db): State<Db>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let db = db.read().await;
    let Some(docs) = db.get(&index) else {
        return error_reply(
            StatusCode::NOT_FOUND,
            "index_not_found_exception",
            format!("no such index [{index}]"),
        );
    };

    let size = match params.get("size").map(|s| s.parse::<usize>()) {
        None => 10,
        Some(Ok(size)) => size,
        Some(Err(_)) => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                "illegal_argument_exception",
                "size must be a non-negative integer".to_string(),
            )
        }
    };

    let hits: Vec<Value> = docs
        .iter()
        .take(size)
        .map(|(id, source)| json!({"_index": index, "_id": id, "_source": source}))
        .collect();
    let mut reply = json!({
        "took": 1,
        "timed_out": false,
        "_shards": shards(),
        "hits": {"total": {"value": docs.len()}, "hits": hits}
    });
    if params.contains_key("scroll") {
        reply["_scroll_id"] = json!(format!("scroll-{index}"));
    }
    (StatusCode::OK, Json(reply))
}
