//! HTTP route definitions

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::app::AppState;
use crate::store::{LeaderboardEntry, LedgerError};
use crate::ws::handler::ws_handler;

/// Upper bound for `/leaderboard?limit=`
const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.client_origin.as_deref());
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Supports multiple origins (comma-separated in CLIENT_ORIGIN)
fn cors_layer(client_origin: Option<&str>) -> CorsLayer {
    let Some(origins) = client_origin else {
        return CorsLayer::permissive();
    };

    let allowed_origins: Vec<header::HeaderValue> = origins
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    uptime_secs: u64,
    generation: u64,
    players: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
        generation: state.game.generation(),
        players: state.game.player_count(),
        connections: state.hub.connection_count(),
    })
}

// ============================================================================
// Leaderboard endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LeaderboardResponse {
    entries: Vec<LeaderboardEntry>,
}

async fn leaderboard_handler(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let limit = query.limit.unwrap_or(state.leaderboard.size());
    if limit == 0 || limit > MAX_LEADERBOARD_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LEADERBOARD_LIMIT
        )));
    }

    let entries = state.leaderboard.ledger().fetch_top(limit).await?;
    Ok(Json(LeaderboardResponse { entries }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Score ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Ledger(e) => {
                warn!(error = %e, "Leaderboard request failed");
                (StatusCode::SERVICE_UNAVAILABLE, "score ledger unavailable".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::game::RoomsAndCorridors;
    use crate::store::ledger::tests::FailingLedger;
    use crate::store::{MemoryLedger, ScoreLedger};

    fn state_with_ledger(ledger: Arc<dyn ScoreLedger>) -> AppState {
        AppState::new(
            Config::default(),
            Box::new(RoomsAndCorridors::seeded(11)),
            ledger,
        )
        .unwrap()
    }

    async fn fetch(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_reports_world_and_players() {
        let state = state_with_ledger(Arc::new(MemoryLedger::new()));
        state.game.admit(Uuid::new_v4()).unwrap();

        let (status, body) = fetch(build_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["generation"], 1);
        assert_eq!(body["players"], 1);
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn test_leaderboard_uses_configured_size_by_default() {
        let ledger = Arc::new(MemoryLedger::new());
        for score in [10, 50, 30, 20] {
            ledger.upsert(Uuid::new_v4(), score).await.unwrap();
        }
        let state = state_with_ledger(ledger);

        let (status, body) = fetch(build_router(state), "/leaderboard").await;
        assert_eq!(status, StatusCode::OK);
        let scores: Vec<u64> = body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["score"].as_u64().unwrap())
            .collect();
        assert_eq!(scores, vec![50, 30, 20]);
    }

    #[tokio::test]
    async fn test_leaderboard_honours_limit() {
        let ledger = Arc::new(MemoryLedger::new());
        for score in [10, 50, 30] {
            ledger.upsert(Uuid::new_v4(), score).await.unwrap();
        }
        let state = state_with_ledger(ledger);

        let (status, body) = fetch(build_router(state), "/leaderboard?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"].as_array().unwrap().len(), 1);
        assert_eq!(body["entries"][0]["score"], 50);
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_bad_limit() {
        let state = state_with_ledger(Arc::new(MemoryLedger::new()));

        let (status, _) = fetch(build_router(state.clone()), "/leaderboard?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = fetch(build_router(state), "/leaderboard?limit=101").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_leaderboard_ledger_down_is_unavailable() {
        let state = state_with_ledger(Arc::new(FailingLedger));

        let (status, body) = fetch(build_router(state), "/leaderboard").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "score ledger unavailable");
    }

    #[tokio::test]
    async fn test_missing_static_asset_is_not_found() {
        let state = state_with_ledger(Arc::new(MemoryLedger::new()));

        let (status, _) = fetch(build_router(state), "/no-such-asset.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let mut config = Config::default();
        config.client_origin = Some("http://localhost:3000, http://example.com".to_string());
        let state = AppState::new(
            config,
            Box::new(RoomsAndCorridors::seeded(11)),
            Arc::new(MemoryLedger::new()),
        )
        .unwrap();

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://example.com"
        );
    }
}
