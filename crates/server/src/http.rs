//! HTTP endpoints: Query API, Answer API, health/readiness.

use axum::{
    extract::State,
    http::Method,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use legal_rag_core::{AnswerContract, QueryAnalysis, SearchResult, TemporalContext};
use legal_rag_retrieval::{analyze_query, clarifying_question, should_refuse, AnswerMode};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ServerError;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.server.cors_origins, state.settings.server.cors_enabled);

    Router::new()
        .route("/api/query", post(query))
        .route("/api/answer", post(answer))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (not for production)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(AllowOrigin::list(["http://localhost:3000".parse().unwrap()]))
            .allow_methods([Method::GET, Method::POST]);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST])
}

#[derive(Debug, Deserialize)]
struct Filters {
    act: Option<String>,
    court_prefix: Option<String>,
    as_on_date: Option<NaiveDate>,
    decision_date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default = "default_k")]
    statute_k: usize,
    #[serde(default = "default_k")]
    case_k: usize,
    filters: Option<Filters>,
}

fn default_k() -> usize {
    8
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    #[serde(flatten)]
    query: QueryRequest,
    #[serde(default)]
    mode: AnswerMode,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    temporal_context: TemporalContext,
    query_analysis: QueryAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    clarifying_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refusal_reason: Option<String>,
    statutes: Vec<SearchResult>,
    cases: Vec<SearchResult>,
    total_retrieved: usize,
}

/// Applies the request's `act`/`court_prefix`/`decision_date_to` filters
/// to an already-ranked result set (`as_on_date` is instead threaded into
/// the engine's as-on override before search runs).
fn apply_filters(results: Vec<SearchResult>, filters: &Filters) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| {
            if let Some(act) = &filters.act {
                if r.is_statute() && !r.doc_id().starts_with(act.as_str()) {
                    return false;
                }
            }
            if let Some(prefix) = &filters.court_prefix {
                if r.is_case() && !r.doc_id().starts_with(prefix.as_str()) {
                    return false;
                }
            }
            if let Some(cutoff) = filters.decision_date_to {
                if let Some(decided) = r.metadata().decision_date {
                    if decided > cutoff {
                        return false;
                    }
                }
            }
            true
        })
        .collect()
}

async fn run_query(state: &AppState, req: &QueryRequest) -> Result<QueryResponse, ServerError> {
    if req.query.trim().is_empty() {
        return Err(ServerError::BadRequest("query must not be empty".into()));
    }

    let analysis = analyze_query(&req.query);
    let as_on_override = req.filters.as_ref().and_then(|f| f.as_on_date);
    let temporal = legal_rag_retrieval::temporal::resolve_temporal_context(
        &req.query,
        legal_rag_retrieval::temporal::today(),
    );
    let temporal = as_on_override
        .map(|d| TemporalContext {
            as_on_date: d,
            date_source: legal_rag_core::DateSource::Explicit,
            confidence: temporal.confidence,
        })
        .unwrap_or(temporal);

    if should_refuse(&analysis) {
        return Ok(QueryResponse {
            temporal_context: temporal,
            query_analysis: analysis,
            clarifying_question: None,
            refusal_reason: Some(
                "query is too short to retrieve against and carries no legal signal".into(),
            ),
            statutes: Vec::new(),
            cases: Vec::new(),
            total_retrieved: 0,
        });
    }

    let clarification = clarifying_question(&analysis);

    let outcome = state
        .engine
        .search(&req.query, as_on_override)
        .await
        .map_err(ServerError::from)?;

    let total_retrieved = outcome.results.len();
    let mut statutes: Vec<SearchResult> =
        outcome.results.iter().filter(|r| r.is_statute()).cloned().collect();
    let mut cases: Vec<SearchResult> =
        outcome.results.into_iter().filter(|r| r.is_case()).collect();

    if let Some(filters) = &req.filters {
        statutes = apply_filters(statutes, filters);
        cases = apply_filters(cases, filters);
    }

    statutes.truncate(req.statute_k);
    cases.truncate(req.case_k);

    Ok(QueryResponse {
        temporal_context: temporal,
        query_analysis: analysis,
        clarifying_question: clarification,
        refusal_reason: None,
        statutes,
        cases,
        total_retrieved,
    })
}

async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ServerError> {
    let started = std::time::Instant::now();
    let result = run_query(&state, &req).await;
    crate::metrics::record_request("query", status_of(&result));
    crate::metrics::record_query_latency("query", started.elapsed().as_secs_f64() * 1000.0);
    Ok(Json(result?))
}

async fn answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerContract>, ServerError> {
    let started = std::time::Instant::now();
    let result = run_answer(&state, &req).await;
    crate::metrics::record_request("answer", status_of(&result));
    crate::metrics::record_query_latency("answer", started.elapsed().as_secs_f64() * 1000.0);
    Ok(Json(result?))
}

fn status_of<T>(result: &Result<T, ServerError>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(err) => err.status_code().as_u16(),
    }
}

async fn run_answer(state: &AppState, req: &AnswerRequest) -> Result<AnswerContract, ServerError> {
    if req.query.query.trim().is_empty() {
        return Err(ServerError::BadRequest("query must not be empty".into()));
    }
    let as_on_override = req.query.filters.as_ref().and_then(|f| f.as_on_date);
    let contract = state
        .engine
        .answer(&req.query.query, as_on_override, req.mode)
        .await
        .map_err(ServerError::from)?;
    Ok(contract)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn readiness_check(State(_state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ready" }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_config::Settings;

    #[test]
    fn router_builds_from_default_state() {
        let state = AppState::new(Settings::default());
        let _ = create_router(state);
    }

    #[tokio::test]
    async fn refuses_short_signal_free_query() {
        let state = AppState::new(Settings::default());
        let req = QueryRequest {
            query: "help me".into(),
            statute_k: 8,
            case_k: 8,
            filters: None,
        };
        let response = run_query(&state, &req).await.unwrap();
        assert!(response.refusal_reason.is_some());
        assert!(response.statutes.is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_query() {
        let state = AppState::new(Settings::default());
        let req = QueryRequest {
            query: "   ".into(),
            statute_k: 8,
            case_k: 8,
            filters: None,
        };
        assert!(run_query(&state, &req).await.is_err());
    }
}
