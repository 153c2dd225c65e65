use axum::Json;
use serde::Serialize;

/// Success envelope shared by every JSON endpoint. Errors use the matching
/// `{ "success": false, ... }` shape produced by `AppError`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
    })
}

pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: Some(message.into()),
    })
}
