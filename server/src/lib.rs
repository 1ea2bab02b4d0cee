use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sift_core::{Document, DocumentId, DocumentStatus, ExecutionPolicy, RequestQueue, SearchError, SearchServer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Space-separated stop words
    pub stop_words: String,
    /// Token required in `X-ADMIN-TOKEN` for mutating endpoints; unset disables them
    pub admin_token: Option<String>,
    /// Comma-separated CORS origins; unset allows any origin
    pub cors_allow_origin: Option<String>,
    /// How many recent searches the request log keeps
    pub request_window: usize,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: f64,
    pub total_hits: usize,
    pub results: Vec<Document>,
}

#[derive(Deserialize)]
pub struct MatchParams {
    pub q: String,
    pub id: DocumentId,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub document_id: DocumentId,
    pub words: Vec<String>,
    pub status: DocumentStatus,
}

#[derive(Deserialize)]
pub struct NewDocument {
    pub id: DocumentId,
    pub text: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub ratings: Vec<i32>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub document_count: usize,
    pub requests: usize,
    pub no_result_requests: usize,
}

/// The engine is single-writer, so mutations take the write lock and
/// searches share the read lock.
pub struct AppState {
    pub server: RwLock<SearchServer>,
    pub requests: Mutex<RequestQueue>,
    pub admin_token: Option<String>,
}

pub type SharedState = Arc<AppState>;

pub fn build_app(config: &AppConfig) -> Result<Router> {
    let server = SearchServer::new(&config.stop_words)?;
    let requests = if config.request_window > 0 {
        RequestQueue::with_window(config.request_window)
    } else {
        RequestQueue::new()
    };
    let state: SharedState = Arc::new(AppState {
        server: RwLock::new(server),
        requests: Mutex::new(requests),
        admin_token: config.admin_token.clone(),
    });

    let cors = match &config.cors_allow_origin {
        Some(val) => {
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
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/match", get(match_handler))
        .route("/documents", get(list_documents).post(add_document))
        .route("/documents/:id", axum::routing::delete(remove_document))
        .route("/documents/:id/words", get(word_frequencies))
        .route("/stats", get(stats_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let policy = if params.parallel { ExecutionPolicy::Parallel } else { ExecutionPolicy::Sequential };
    let status = params.status;
    let results = {
        let server = state.server.read();
        let mut requests = state.requests.lock();
        requests
            .add_find_request_with_policy(&server, policy, &params.q, move |_, document_status, _| {
                document_status == status
            })
            .map_err(search_error)?
    };
    let took_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(query = %params.q, hits = results.len(), took_ms, "search");
    Ok(Json(SearchResponse { query: params.q, took_ms, total_hits: results.len(), results }))
}

pub async fn match_handler(
    State(state): State<SharedState>,
    Query(params): Query<MatchParams>,
) -> Result<Json<MatchResponse>, (StatusCode, String)> {
    let server = state.server.read();
    let (words, status) = server.match_document(&params.q, params.id).map_err(search_error)?;
    Ok(Json(MatchResponse {
        document_id: params.id,
        words: words.into_iter().map(str::to_string).collect(),
        status,
    }))
}

pub async fn list_documents(State(state): State<SharedState>) -> Json<Vec<DocumentId>> {
    let ids = state.server.read().iter().collect();
    Json(ids)
}

/// Unknown ids yield an empty map.
pub async fn word_frequencies(
    State(state): State<SharedState>,
    Path(document_id): Path<DocumentId>,
) -> Json<BTreeMap<String, f64>> {
    let server = state.server.read();
    let freqs = server
        .get_word_frequencies(document_id)
        .iter()
        .map(|(word, freq)| (word.to_string(), *freq))
        .collect();
    Json(freqs)
}

pub async fn add_document(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(doc): Json<NewDocument>,
) -> Result<StatusCode, (StatusCode, String)> {
    authorize(&state, &headers)?;
    state
        .server
        .write()
        .add_document(doc.id, &doc.text, doc.status, &doc.ratings)
        .map_err(search_error)?;
    tracing::info!(document_id = doc.id, "document added");
    Ok(StatusCode::CREATED)
}

pub async fn remove_document(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(document_id): Path<DocumentId>,
) -> Result<StatusCode, (StatusCode, String)> {
    authorize(&state, &headers)?;
    state.server.write().remove_document(document_id);
    tracing::info!(document_id, "document removed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats_handler(State(state): State<SharedState>) -> Json<StatsResponse> {
    let document_count = state.server.read().get_document_count();
    let requests = state.requests.lock();
    Json(StatsResponse {
        document_count,
        requests: requests.len(),
        no_result_requests: requests.no_result_requests(),
    })
}

fn search_error(err: SearchError) -> (StatusCode, String) {
    let status = match err {
        SearchError::OutOfRange(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
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
