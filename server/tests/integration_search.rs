use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use semsearch::persist::{load_graph, load_meta, save_docs, save_graph, save_index, save_meta, IndexPaths, MetaFile};
use semsearch::{build_graph, DocumentStore, Embeddings, GraphConfig, SearchEngine};
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let embeddings: Embeddings = [
        ("park", vec![0.05, 0.90, 0.10]),
        ("garden", vec![0.08, 0.86, 0.14]),
        ("jazz", vec![0.02, 0.08, 0.89]),
        ("music", vec![0.03, 0.10, 0.92]),
    ]
    .into_iter()
    .map(|(w, v)| (w.to_string(), v))
    .collect();
    let graph = build_graph(&embeddings, &GraphConfig { top_n: 1 }).unwrap();
    let docs: DocumentStore = [
        (11, "Guide to Central Park activities"),
        (39, "New York Botanical Garden highlights"),
        (35, "Music venues in Brooklyn"),
        (92, "Guide to jazz clubs"),
    ]
    .into_iter()
    .collect();
    let engine = SearchEngine::new(graph, docs);

    let paths = IndexPaths::new(dir);
    save_graph(&paths, engine.graph()).unwrap();
    save_index(&paths, engine.index()).unwrap();
    save_docs(&paths, engine.documents()).unwrap();
    save_meta(&paths, &MetaFile::describe(engine.graph(), engine.documents().len(), "2024-01-01T00:00:00Z".into()).unwrap()).unwrap();
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn app(dir: &std::path::Path, token: Option<&str>) -> Router {
    server::build_app_with_token(dir.to_string_lossy().to_string(), token.map(str::to_string)).unwrap()
}

#[tokio::test]
async fn search_expands_and_ranks() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, json) = get(app(dir.path(), None), "/search?q=Park&k=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["strategy"], "ranked");
    assert_eq!(json["expanded"], serde_json::json!(["garden", "park"]));
    let ids: Vec<u64> = json["results"].as_array().unwrap().iter().map(|r| r["doc_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![11, 39]);
    assert_eq!(json["results"][0]["score"], 1);
    assert_eq!(json["results"][0]["snippet"], "Guide to Central <em>Park</em> activities");
}

#[tokio::test]
async fn search_truncates_to_k_but_reports_total() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (_, json) = get(app(dir.path(), None), "/search?q=jazz&k=1").await;
    assert_eq!(json["total_hits"], 2);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["results"][0]["doc_id"], 35);
}

#[tokio::test]
async fn unmatched_query_uses_partial_match() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (_, json) = get(app(dir.path(), None), "/search?q=opera").await;
    assert_eq!(json["strategy"], "partial_match");
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn expand_doc_and_neighbors() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (_, json) = get(app(dir.path(), None), "/expand?q=jazz").await;
    assert_eq!(json["expanded"], serde_json::json!(["jazz", "music"]));

    let (_, json) = get(app(dir.path(), None), "/doc/92").await;
    assert_eq!(json["text"], "Guide to jazz clubs");
    let (_, json) = get(app(dir.path(), None), "/doc/7").await;
    assert_eq!(json["error"], "not found");

    let (status, json) = get(app(dir.path(), None), "/graph/word/garden").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["neighbors"][0]["word"], "park");
    let (status, _) = get(app(dir.path(), None), "/graph/word/zebra").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rebuild_requires_token_and_persists() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, _) = send(app(dir.path(), None), Request::post("/graph/rebuild").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let secured = app(dir.path(), Some("s3cret"));
    let wrong = Request::post("/graph/rebuild").header("X-ADMIN-TOKEN", "nope").body(Body::empty()).unwrap();
    let (status, _) = send(secured.clone(), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/graph/rebuild")
        .header("X-ADMIN-TOKEN", "s3cret")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"top_n": 3}"#))
        .unwrap();
    let (status, json) = send(secured.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["vocab_size"], 4);
    assert_eq!(json["top_n"], 3);

    // the live engine uses the new graph
    let (_, json) = get(secured, "/graph/word/park").await;
    assert_eq!(json["neighbors"].as_array().unwrap().len(), 3);

    // and so does a fresh load from disk
    let (_, json) = get(app(dir.path(), None), "/graph/word/park").await;
    assert_eq!(json["neighbors"].as_array().unwrap().len(), 3);
}

fn rebuild_request(top_n: usize) -> Request<Body> {
    Request::post("/graph/rebuild")
        .header("X-ADMIN-TOKEN", "s3cret")
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"top_n": {top_n}}}"#)))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rebuilds_leave_disk_and_memory_in_agreement() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let secured = app(dir.path(), Some("s3cret"));

    let handles: Vec<_> = (1..=3)
        .flat_map(|_| 1..=3)
        .map(|top_n| tokio::spawn(send(secured.clone(), rebuild_request(top_n))))
        .collect();
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let (_, json) = get(secured, "/graph/word/park").await;
    let live = json["neighbors"].as_array().unwrap().len();
    let paths = IndexPaths::new(dir.path());
    let on_disk = load_graph(&paths).unwrap();
    assert_eq!(on_disk.top_n(), live);
    assert_eq!(on_disk.neighbors("park").unwrap().len(), live);
    let meta = load_meta(&paths).unwrap();
    assert_eq!(meta.top_n as usize, live);
    assert_eq!(meta.created_at, "2024-01-01T00:00:00Z");
}
