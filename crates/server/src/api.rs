//! Storefront JSON API.
//!
//! - `POST /api/login`: check a username/password pair
//! - `GET  /api/products`: full catalog
//! - `GET  /api/recommend`: ranked catalog for `?userId=`
//! - `POST /api/track`: append a view/click/buy action on a catalog product
//! - `POST /api/score`: purchase probability for a loosely typed counts record
//! - `POST /api/order`: capture a customer order
//! - `GET  /api/admin/status`: live parameters and recent training runs
//! - `POST /api/admin/train`: retrain from the whole action log

use std::sync::Arc;

use aura_core::domain::action::{ActionKind, TrackedAction, UserId};
use aura_core::domain::order::Order;
use aura_core::domain::product::Product;
use aura_core::domain::user::{Credentials, User};
use aura_core::errors::{ApplicationError, DomainError, InterfaceError};
use aura_core::ml::counts::{coerce_count, InteractionCounts};
use aura_core::ml::log::TrainingLogEntry;
use aura_core::ml::model::ModelParameters;
use aura_core::ml::recommend::{to_percent, Recommendation};
use aura_core::ml::service::{RecommendationEngine, TrainingOutcome};
use aura_core::ml::training::Hyperparameters;
use aura_db::{
    DbPool, OrderRepository, ProductRepository, SqlEventLog, SqlModelStore, SqlOrderRepository,
    SqlProductRepository, SqlTrainingLogStore, SqlUserRepository, UserRepository,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub type SqlEngine = RecommendationEngine<SqlEventLog, SqlModelStore, SqlTrainingLogStore>;

#[derive(Clone)]
pub struct ApiState {
    engine: Arc<SqlEngine>,
    products: Arc<SqlProductRepository>,
    users: Arc<SqlUserRepository>,
    orders: Arc<SqlOrderRepository>,
    /// Held for the duration of a training run so concurrent requests queue.
    training_gate: Arc<Mutex<()>>,
    status_log_limit: u32,
}

impl ApiState {
    pub fn new(db_pool: DbPool, hyperparameters: Hyperparameters, status_log_limit: u32) -> Self {
        let engine = RecommendationEngine::new(
            SqlEventLog::new(db_pool.clone()),
            SqlModelStore::new(db_pool.clone()),
            SqlTrainingLogStore::new(db_pool.clone()),
        )
        .with_hyperparameters(hyperparameters);

        Self {
            engine: Arc::new(engine),
            products: Arc::new(SqlProductRepository::new(db_pool.clone())),
            users: Arc::new(SqlUserRepository::new(db_pool.clone())),
            orders: Arc::new(SqlOrderRepository::new(db_pool)),
            training_gate: Arc::new(Mutex::new(())),
            status_log_limit,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/products", get(list_products))
        .route("/api/recommend", get(recommend))
        .route("/api/track", post(track))
        .route("/api/score", post(score))
        .route("/api/order", post(place_order))
        .route("/api/admin/status", get(admin_status))
        .route("/api/admin/train", post(admin_train))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub success: bool,
    pub user_id: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub user_id: Option<String>,
    pub action_type: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub success: bool,
    pub actions: InteractionCounts,
    /// Whole percent, matching the `probability` field of a recommendation.
    pub probability: u8,
    pub score: f64,
}

/// `quantity` stays untyped so numeric strings like `"2"` are accepted.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    pub order_id: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub weights: ModelParameters,
    pub logs: Vec<TrainingLogEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub correlation_id: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

fn reject(error: InterfaceError) -> ApiFailure {
    let (status, message) = match &error {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, error.user_message().to_string())
        }
        InterfaceError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, error.user_message().to_string())
        }
    };

    warn!(
        event_name = "api.request.rejected",
        correlation_id = %error.correlation_id(),
        status = status.as_u16(),
        error = %error,
        "request rejected"
    );

    (
        status,
        Json(ApiError {
            success: false,
            error: message,
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

fn reject_application(error: impl Into<ApplicationError>) -> ApiFailure {
    reject(error.into().into_interface(correlation_id()))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ApiFailure> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| reject_application(DomainError::MissingField(field)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn login(
    State(state): State<ApiState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiFailure> {
    let credentials = Credentials::new(request.username, request.password);
    let user = state.users.verify(&credentials).await.map_err(reject_application)?;

    match user {
        Some(user) => {
            info!(event_name = "api.login.accepted", username = %user.username, "login accepted");
            Ok(Json(LoginResponse { success: true, user }))
        }
        None => {
            let correlation_id = correlation_id();
            warn!(
                event_name = "api.login.rejected",
                correlation_id = %correlation_id,
                username = %credentials.username,
                "login rejected"
            );
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError {
                    success: false,
                    error: "Invalid credentials".to_string(),
                    correlation_id,
                }),
            ))
        }
    }
}

async fn list_products(State(state): State<ApiState>) -> Result<Json<Vec<Product>>, ApiFailure> {
    let products = state.products.list().await.map_err(reject_application)?;
    Ok(Json(products))
}

async fn recommend(
    State(state): State<ApiState>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<RecommendResponse>, ApiFailure> {
    let user_id = required(query.user_id, "userId")?.trim().to_string();

    let catalog = state.products.list().await.map_err(reject_application)?;
    let recommendations = state
        .engine
        .recommend(&UserId(user_id.clone()), &catalog)
        .await
        .map_err(reject_application)?;

    Ok(Json(RecommendResponse { success: true, user_id, recommendations }))
}

async fn track(
    State(state): State<ApiState>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<TrackResponse>, ApiFailure> {
    let user_id = required(request.user_id, "userId")?;
    let action_type = required(request.action_type, "actionType")?;
    let product_id = required(request.product_id, "productId")?;

    let kind = action_type.parse::<ActionKind>().map_err(reject_application)?;
    let action = TrackedAction::new(&user_id, kind, &product_id).map_err(reject_application)?;

    let known = state.products.find_by_id(&action.product_id).await.map_err(reject_application)?;
    if known.is_none() {
        return Err(reject_application(DomainError::UnknownProduct(action.product_id.0)));
    }
    state.engine.track(action).await.map_err(reject_application)?;

    Ok(Json(TrackResponse { success: true }))
}

async fn score(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<Json<ScoreResponse>, ApiFailure> {
    let record = body.as_object().ok_or_else(|| {
        reject_application(DomainError::InvariantViolation(
            "score body must be a JSON object of counts".to_string(),
        ))
    })?;
    let actions = InteractionCounts::from_record(record);

    let probability = state.engine.score_counts(&actions).await.map_err(reject_application)?;
    Ok(Json(ScoreResponse {
        success: true,
        actions,
        probability: to_percent(probability),
        score: probability,
    }))
}

async fn place_order(
    State(state): State<ApiState>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<OrderResponse>, ApiFailure> {
    let name = required(request.name, "name")?;
    let phone = required(request.phone, "phone")?;
    let product = required(request.product, "product")?;
    let quantity = request
        .quantity
        .filter(|value| !value.is_null())
        .ok_or_else(|| reject_application(DomainError::MissingField("quantity")))?;

    let order = Order::new(&name, &phone, &product, coerce_count(Some(&quantity)))
        .map_err(reject_application)?;
    let order_id = state.orders.place(&order).await.map_err(reject_application)?;

    info!(
        event_name = "api.order.placed",
        order_id,
        product = %order.product,
        quantity = order.quantity,
        "order captured"
    );
    Ok(Json(OrderResponse { success: true, order_id }))
}

async fn admin_status(State(state): State<ApiState>) -> Result<Json<StatusResponse>, ApiFailure> {
    let weights = state.engine.current_parameters().await.map_err(reject_application)?;
    let logs =
        state.engine.training_log(state.status_log_limit).await.map_err(reject_application)?;
    Ok(Json(StatusResponse { weights, logs }))
}

async fn admin_train(State(state): State<ApiState>) -> Json<TrainingOutcome> {
    let _running = state.training_gate.lock().await;
    Json(state.engine.train().await)
}

#[cfg(test)]
mod tests {
    use aura_core::ml::training::Hyperparameters;
    use aura_db::fixtures::{DemoSeedDataset, DEFAULT_SEED};
    use aura_db::{connect_with_settings, migrations, DbPool};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, ApiState};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoSeedDataset::load(&pool, DEFAULT_SEED).await.expect("seed");
        pool
    }

    fn app(pool: DbPool) -> Router {
        router(ApiState::new(pool, Hyperparameters::default(), 10))
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(payload) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(payload.to_string())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(builder.body(body).expect("request")).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    #[tokio::test]
    async fn login_accepts_matching_password_only() {
        let pool = seeded_pool().await;

        let (status, body) = send(
            app(pool.clone()),
            Method::POST,
            "/api/login",
            Some(json!({ "username": "test", "password": "1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["username"], "test");

        let (status, body) = send(
            app(pool),
            Method::POST,
            "/api/login",
            Some(json!({ "username": "test", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn products_list_full_catalog() {
        let (status, body) =
            send(app(seeded_pool().await), Method::GET, "/api/products", None).await;

        assert_eq!(status, StatusCode::OK);
        let products = body.as_array().expect("array");
        assert_eq!(products.len(), 6);
        assert_eq!(products[0]["id"], "p1");
        assert_eq!(products[0]["longDescription"].as_str().map(str::is_empty), Some(false));
        assert_eq!(products[0]["features"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn recommend_requires_user_id() {
        let (status, body) =
            send(app(seeded_pool().await), Method::GET, "/api/recommend", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap_or_default().contains("userId"));
        assert!(body["correlationId"].as_str().unwrap_or_default().starts_with("req-"));
    }

    #[tokio::test]
    async fn tracked_clicks_lift_product_to_the_top() {
        let pool = seeded_pool().await;

        for _ in 0..4 {
            let (status, body) = send(
                app(pool.clone()),
                Method::POST,
                "/api/track",
                Some(json!({ "userId": "test", "actionType": "click", "productId": "p4" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "success": true }));
        }

        let (status, body) =
            send(app(pool), Method::GET, "/api/recommend?userId=test", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], "test");
        let ranked = body["recommendations"].as_array().expect("recommendations");
        assert_eq!(ranked.len(), 6);
        assert_eq!(ranked[0]["id"], "p4");
        assert_eq!(ranked[0]["actions"]["click_count"], 4);
        assert_eq!(ranked[0]["probability"], 99);
        assert_eq!(ranked[1]["probability"], 27);
    }

    #[tokio::test]
    async fn track_rejects_missing_fields_and_unknown_kinds() {
        let pool = seeded_pool().await;

        let (status, body) = send(
            app(pool.clone()),
            Method::POST,
            "/api/track",
            Some(json!({ "userId": "test", "productId": "p1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("actionType"));

        let (status, body) = send(
            app(pool),
            Method::POST,
            "/api/track",
            Some(json!({ "userId": "test", "actionType": "like", "productId": "p1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("like"));
    }

    #[tokio::test]
    async fn track_rejects_products_outside_the_catalog() {
        let pool = seeded_pool().await;

        let (status, body) = send(
            app(pool.clone()),
            Method::POST,
            "/api/track",
            Some(json!({ "userId": "test", "actionType": "view", "productId": "p404" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("p404"));

        let (_, body) = send(app(pool), Method::GET, "/api/recommend?userId=test", None).await;
        let ranked = body["recommendations"].as_array().expect("recommendations");
        assert!(ranked.iter().all(|entry| entry["id"] != "p404"));
    }

    #[tokio::test]
    async fn score_coerces_loosely_typed_counts() {
        let (status, body) = send(
            app(seeded_pool().await),
            Method::POST,
            "/api/score",
            Some(json!({ "view_count": "2", "click_count": null, "buy_count": 1.7 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["actions"], json!({ "view_count": 2, "click_count": 0, "buy_count": 1 }));
        // Default weights: sigmoid(-1 + 0.5 * 2 + 3 * 1) = sigmoid(3).
        assert_eq!(body["probability"], 95);
        let score = body["score"].as_f64().unwrap_or_default();
        assert!((score - 0.952_574_1).abs() < 1e-6, "unexpected score {score}");
    }

    #[tokio::test]
    async fn score_rejects_non_object_bodies() {
        let (status, body) =
            send(app(seeded_pool().await), Method::POST, "/api/score", Some(json!([1, 2, 3])))
                .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn order_is_captured_and_acknowledged() {
        let pool = seeded_pool().await;

        let (status, body) = send(
            app(pool.clone()),
            Method::POST,
            "/api/order",
            Some(json!({
                "name": "HTTP Test User",
                "phone": "010-9999-8888",
                "product": "Test Product via HTTP",
                "quantity": "2"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["orderId"].as_i64().is_some());

        let (product, quantity): (String, i64) =
            sqlx::query_as("SELECT product, quantity FROM orders ORDER BY id DESC LIMIT 1")
                .fetch_one(&pool)
                .await
                .expect("stored order");
        assert_eq!(product, "Test Product via HTTP");
        assert_eq!(quantity, 2);
    }

    #[tokio::test]
    async fn order_requires_every_field_and_a_positive_quantity() {
        let pool = seeded_pool().await;

        let (status, body) = send(
            app(pool.clone()),
            Method::POST,
            "/api/order",
            Some(json!({ "name": "Kim", "product": "Aura Beam", "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("phone"));

        let (status, body) = send(
            app(pool.clone()),
            Method::POST,
            "/api/order",
            Some(json!({ "name": "Kim", "phone": "010", "product": "Aura Beam" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("quantity"));

        let (status, _) = send(
            app(pool.clone()),
            Method::POST,
            "/api/order",
            Some(json!({ "name": "Kim", "phone": "010", "product": "Aura Beam", "quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .expect("order count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn train_then_status_reports_the_run() {
        let pool = seeded_pool().await;

        let (status, body) = send(app(pool.clone()), Method::POST, "/api/admin/train", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["weights"]["w_click"].as_f64().unwrap_or_default() >= 0.5);

        let (status, body) = send(app(pool), Method::GET, "/api/admin/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["weights"]["accuracy"].as_f64().is_some());
        assert!(body["weights"]["updated_at"].as_str().is_some());
        let logs = body["logs"].as_array().expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["status"], "SUCCESS");
    }

    #[tokio::test]
    async fn training_an_empty_log_reports_skip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let (status, body) = send(app(pool), Method::POST, "/api/admin/train", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "message": "No training data available." }));
    }
}
