use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: registration and login (the entry
/// points that mint tokens in the first place) plus the banner and health
/// probe.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Informational banner, also handy as a smoke check.
        .route("/", get(|| async { "Blog API running" }))
        // GET /health
        // Unauthenticated liveness probe for monitors and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /users/register
        // Account creation; responds with the first token pair.
        .route("/users/register", post(handlers::register_user))
        // POST /users/login
        // Credential verification; responds with a fresh token pair.
        .route("/users/login", post(handlers::login_user))
}
