use aura_db::DbPool;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub model: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let model = model_check(&state.db_pool).await;
    let ready = database.status == "ready" && model.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        model,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

// The parameter row is seeded by the baseline migration, so a missing row means
// the schema is not in place.
async fn model_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, String>("SELECT updated_at FROM model_weights WHERE id = 1")
        .fetch_optional(pool)
        .await
    {
        Ok(Some(updated_at)) => {
            HealthCheck { status: "ready", detail: format!("parameters last updated {updated_at}") }
        }
        Ok(None) => HealthCheck {
            status: "degraded",
            detail: "model parameter row is missing".to_string(),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("model lookup failed: {error}") }
        }
    }
}
