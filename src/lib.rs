pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::middleware::jwt_auth_middleware;

pub use crate::config::AppConfig;
pub use crate::state::{AppRegistry, AppState};

/// Full HTTP surface: public routes, then everything under `/api` behind the JWT layer
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.server.max_request_size_bytes;
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/password/forgot", post(auth::forgot_post))
        .route("/auth/password/reset", post(auth::reset_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, bookings, leases, listings};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami_get))
        .route("/api/listings", get(listings::listings_get).post(listings::listings_post))
        .route(
            "/api/listings/:id",
            get(listings::listing_get)
                .patch(listings::listing_patch)
                .delete(listings::listing_delete),
        )
        .route("/api/bookings", get(bookings::bookings_get).post(bookings::bookings_post))
        .route(
            "/api/bookings/:id",
            get(bookings::booking_get)
                .patch(bookings::booking_patch)
                .delete(bookings::booking_delete),
        )
        .route("/api/leases", get(leases::leases_get).post(leases::leases_post))
        .route("/api/leases/refresh", post(leases::leases_refresh_post))
        .route(
            "/api/leases/:id",
            get(leases::lease_get).patch(leases::lease_patch).delete(leases::lease_delete),
        )
        .route("/api/leases/:id/transition", post(leases::lease_transition_post))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// Empty origin list means any origin, which suits local development
fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS];
    let base = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE]);

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(parsed)
    }
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "Property Management API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "endpoints": {
            "public": ["/", "/health", "/auth/register", "/auth/login", "/auth/password/forgot", "/auth/password/reset"],
            "protected": ["/api/auth/whoami", "/api/listings", "/api/bookings", "/api/leases"]
        }
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let repo = state.registry.health_check_repository();
    repo.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Storage is unreachable")
    })?;
    Ok(Json(json!({
        "status": "ok",
        "store": repo.backend(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
