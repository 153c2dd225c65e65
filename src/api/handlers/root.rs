use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Fundline API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Donation and membership payment intake",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "api": "/api/v1",
            "auth": "/api/v1/auth/login",
            "donations": "/api/v1/donations",
            "members": "/api/v1/members"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
