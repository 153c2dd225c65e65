pub mod handlers;
pub mod middleware;
pub mod response;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    Router,
    routing::{delete, get, patch, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
    web::uploads::MAX_FILE_SIZE,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let uploads_dir = settings.uploads.dir.clone();
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        .nest("/api/v1", api_routes(app_state.clone()))

        // Uploaded payment documents
        .nest_service("/uploads", ServeDir::new(uploads_dir))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/donations", donation_routes(state.clone()))
        .nest("/members", member_routes(state))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
}

fn donation_routes(state: AppState) -> Router<AppState> {
    let require_admin = from_fn_with_state(state.clone(), middleware::auth::require_admin);
    let require_auth = from_fn_with_state(state, middleware::auth::require_auth);

    Router::new()
        // Anyone may donate; only admins browse
        .route(
            "/",
            post(handlers::donations::create)
                .merge(get(handlers::donations::list).route_layer(require_admin.clone())),
        )
        .route("/my", get(handlers::donations::my).route_layer(require_auth))
        .route("/:id", get(handlers::donations::get).route_layer(require_admin))
        // Gateway callbacks (no auth)
        .route("/payment/success", post(handlers::callbacks::donation_success))
        .route("/payment/fail", post(handlers::callbacks::donation_fail))
        .route("/payment/cancel", post(handlers::callbacks::donation_cancel))
}

fn member_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/online-payment", post(handlers::members::online_payment))
        .route("/complete-payment", post(handlers::members::complete_payment))
        .route(
            "/apply",
            post(handlers::members::apply)
                .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024)),
        )
        // Gateway callbacks (no auth)
        .route("/payment/success", post(handlers::callbacks::member_success))
        .route("/payment/fail", post(handlers::callbacks::member_fail))
        .route("/payment/cancel", post(handlers::callbacks::member_cancel))
        .merge(member_admin_routes(state))
}

fn member_admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::members::list))
        .route("/:id", get(handlers::members::get))
        .route("/:id", delete(handlers::members::delete))
        .route("/:id/status", patch(handlers::members::update_status))
        .route("/:id/payment-status", patch(handlers::members::update_payment_status))
        .route_layer(from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}
