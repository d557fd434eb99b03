use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use semsearch::persist::{commit_graph, load_artifacts, load_meta, IndexPaths, MetaFile};
use semsearch::{build_graph, DocId, ExpandedQuery, GraphConfig, MatchStrategy, SearchEngine, SimilarWord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub expanded: Vec<String>,
    pub strategy: MatchStrategy,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: Option<u32>,
    pub text: String,
    pub snippet: String,
}

#[derive(Deserialize)]
pub struct ExpandParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct ExpandResponse {
    pub query: String,
    pub expanded: Vec<String>,
}

#[derive(Serialize)]
pub struct NeighborsResponse {
    pub word: String,
    pub neighbors: Vec<SimilarWord>,
}

#[derive(Deserialize, Default)]
pub struct RebuildRequest {
    pub top_n: Option<usize>,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub vocab_size: usize,
    pub top_n: usize,
    pub took_s: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    pub engine: Arc<RwLock<SearchEngine>>,
    /// Held by a rebuild from reading embeddings until the new graph is live.
    pub rebuild_lock: Arc<Mutex<()>>,
    pub admin_token: Option<String>,
}

/// Admin endpoints are enabled by the `ADMIN_TOKEN` environment variable.
pub fn build_app(index_dir: String) -> Result<Router> {
    build_app_with_token(index_dir, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with_token(index_dir: String, admin_token: Option<String>) -> Result<Router> {
    let (graph, index, docs, meta) = load_artifacts(&IndexPaths::new(&index_dir))?;
    tracing::info!(num_docs = meta.num_docs, vocab_size = meta.vocab_size, top_n = meta.top_n, "index loaded");
    let app_state = AppState {
        index_paths_root: PathBuf::from(&index_dir),
        engine: Arc::new(RwLock::new(SearchEngine::from_parts(graph, index, docs))),
        rebuild_lock: Arc::new(Mutex::new(())),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/expand", get(expand_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/graph/word/:word", get(neighbors_handler))
        .route("/graph/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let outcome = state.engine.read().run(&params.q);

    let total_hits = outcome.hits.len();
    let k = params.k.clamp(1, 100);
    let highlighter = highlighter_for(&outcome.expanded);
    let results = outcome
        .hits
        .into_iter()
        .take(k)
        .map(|hit| {
            let snippet = highlight_terms(&hit.text, highlighter.as_ref());
            SearchResult { doc_id: hit.doc_id, score: hit.score, text: hit.text, snippet }
        })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse {
        query: params.q,
        expanded: tokens(&outcome.expanded),
        strategy: outcome.strategy,
        took_s: elapsed.as_secs_f64(),
        total_hits,
        results,
    })
}

pub async fn expand_handler(State(state): State<AppState>, Query(params): Query<ExpandParams>) -> Json<ExpandResponse> {
    let expanded = state.engine.read().reformulate(&params.q);
    Json(ExpandResponse { query: params.q, expanded: tokens(&expanded) })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Json<serde_json::Value> {
    let engine = state.engine.read();
    match engine.documents().get(doc_id) {
        Some(text) => Json(serde_json::json!({ "doc_id": doc_id, "text": text })),
        None => Json(serde_json::json!({ "error": "not found" })),
    }
}

pub async fn neighbors_handler(State(state): State<AppState>, Path(word): Path<String>) -> Result<Json<NeighborsResponse>, (StatusCode, String)> {
    let engine = state.engine.read();
    let neighbors = engine
        .graph()
        .neighbors(&word)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("{word:?} is not in the vocabulary")))?
        .to_vec();
    Ok(Json(NeighborsResponse { word, neighbors }))
}

/// Rebuild the graph from its own embeddings, persist it, then swap it in.
/// Queries keep running against the old graph until the swap. Rebuilds run
/// one at a time, so disk and memory always end on the same graph.
async fn rebuild_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RebuildRequest>>,
) -> Result<Json<RebuildResponse>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let start = std::time::Instant::now();
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let _rebuilding = state.rebuild_lock.lock().await;

    let (embeddings, current_top_n, num_docs) = {
        let engine = state.engine.read();
        (engine.graph().embeddings(), engine.graph().top_n(), engine.documents().len())
    };
    let config = GraphConfig { top_n: request.top_n.unwrap_or(current_top_n) };
    let graph = tokio::task::spawn_blocking(move || build_graph(&embeddings, &config))
        .await
        .map_err(internal)?
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let paths = IndexPaths::new(&state.index_paths_root);
    let created_at = load_meta(&paths).map(|m| m.created_at).map_err(internal)?;
    let meta = MetaFile::describe(&graph, num_docs, created_at).map_err(internal)?;
    commit_graph(&paths, &graph, &meta).map_err(internal)?;

    let response = RebuildResponse { vocab_size: graph.len(), top_n: graph.top_n(), took_s: start.elapsed().as_secs_f64() };
    state.engine.write().replace_graph(graph);
    tracing::info!(vocab_size = response.vocab_size, top_n = response.top_n, "graph rebuilt");
    Ok(Json(response))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!(error = %e, "rebuild failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

fn tokens(expanded: &ExpandedQuery) -> Vec<String> {
    expanded.iter().map(str::to_string).collect()
}

/// One case-insensitive whole-word pattern over every expanded token.
fn highlighter_for(expanded: &ExpandedQuery) -> Option<regex::Regex> {
    if expanded.is_empty() {
        return None;
    }
    let alternation = expanded.iter().map(regex::escape).collect::<Vec<_>>().join("|");
    regex::RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .ok()
}

fn highlight_terms(text: &str, highlighter: Option<&regex::Regex>) -> String {
    match highlighter {
        Some(pat) => pat.replace_all(text, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).into_owned(),
        None => text.to_string(),
    }
}
