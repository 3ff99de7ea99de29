use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use spicebite_core::SessionTable;
use spicebite_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    sessions: Arc<SessionTable>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub order_store: HealthCheck,
    pub sessions_in_progress: usize,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, sessions: Arc<SessionTable>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, sessions })
}

/// Readiness is gated on the order store being reachable; the in-progress
/// session count rides along as an operational gauge.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let order_store = store_check(&state.db_pool).await;
    let ready = order_store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "spicebite-server runtime initialized".to_string(),
        },
        order_store,
        sessions_in_progress: state.sessions.len().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "order store query succeeded".to_string() },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("order store query failed: {error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use spicebite_core::SessionTable;
    use spicebite_db::connect_with_settings;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_ready_and_counts_in_progress_sessions() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        let sessions = Arc::new(SessionTable::new());
        sessions.merge_items("s-1", vec![("pizza".to_string(), 1)]).await;

        let state = HealthState { db_pool: pool.clone(), sessions };
        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.order_store.status, "ready");
        assert_eq!(payload.sessions_in_progress, 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn health_degrades_when_the_order_store_is_unreachable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        pool.close().await;

        let state = HealthState { db_pool: pool, sessions: Arc::new(SessionTable::new()) };
        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.order_store.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
