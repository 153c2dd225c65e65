use axum::{
    extract::State,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        response::{ok_with_message, ApiResponse},
        state::AppState,
    },
    auth::{AuthService, SESSION_COOKIE},
    domain::Role,
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address or phone number.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    if req.identifier.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Identifier and password are required".to_string()));
    }

    let auth_service = &state.service_context.auth_service;
    let user = auth_service.authenticate(&req.identifier, &req.password).await?;

    let (_session, token) = auth_service.create_session(user.id).await?;
    let cookie = auth_service.create_session_cookie(&token, state.settings.auth.secure_cookies);

    tracing::info!("User {} logged in", user.id);

    Ok((
        jar.add(cookie),
        ok_with_message(
            LoginResponse {
                id: user.id,
                full_name: user.full_name,
                role: user.role,
            },
            "Login successful",
        ),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state
            .service_context
            .auth_service
            .invalidate_session(cookie.value())
            .await?;
    }

    Ok((
        jar.add(AuthService::create_logout_cookie()),
        ok_with_message((), "Logged out"),
    ))
}
