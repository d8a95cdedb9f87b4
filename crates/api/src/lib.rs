pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes (no tenant prefix)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me));

    // Public invitation routes (preview needs no auth; accept/decline do)
    let public_invitation_routes = Router::new()
        .route("/{token}", get(routes::invitation::preview))
        .route("/{token}/accept", post(routes::invitation::accept))
        .route("/{token}/decline", post(routes::invitation::decline));

    // Tenant routes
    let tenant_routes = Router::new()
        .route("/", get(routes::tenant::list).post(routes::tenant::create))
        .route("/{tenant_id}", get(routes::tenant::get))
        .route("/{tenant_id}/leave", post(routes::member::leave));

    // Member routes (under tenant)
    let member_routes = Router::new()
        .route("/", get(routes::member::list))
        .route("/{user_id}", patch(routes::member::update_role))
        .route("/{user_id}", delete(routes::member::remove))
        .route("/{user_id}/make-owner", post(routes::member::make_owner));

    // Invitation management routes (under tenant)
    let invitation_routes = Router::new()
        .route(
            "/",
            get(routes::invitation::list).post(routes::invitation::create),
        )
        .route("/{invitation_id}", delete(routes::invitation::revoke))
        .route("/{invitation_id}/resend", post(routes::invitation::resend));

    // Project routes (under tenant)
    let project_routes = Router::new()
        .route(
            "/",
            get(routes::project::list).post(routes::project::create),
        )
        .route("/{project_id}", get(routes::project::get))
        .route("/{project_id}", patch(routes::project::update))
        .route("/{project_id}", delete(routes::project::delete));

    // Compose API
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/invitation", public_invitation_routes)
        .nest("/tenant", tenant_routes)
        .nest("/tenant/{tenant_id}/member", member_routes)
        .nest("/tenant/{tenant_id}/invitation", invitation_routes)
        .nest("/tenant/{tenant_id}/project", project_routes);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
