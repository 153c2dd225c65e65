use std::collections::HashMap;

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        middleware::auth::CurrentUser,
        response::{ok, ok_with_message, ApiResponse},
        state::AppState,
    },
    domain::*,
    error::{AppError, Result},
    service::{
        initiation_service::MemberPaymentInitiated,
        member_service::{BankApplication, PaymentDocument},
        reconciliation_service::CompletePaymentRequest,
        PageMeta,
    },
};

const DOCUMENT_FIELD: &str = "paymentDocument";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    id: Uuid,
    #[serde(rename = "type")]
    member_type: MemberType,
    amount: f64,
    name: String,
    father_name: String,
    gender: Gender,
    mobile: String,
    is_overseas: bool,
    email: Option<String>,
    occupation: String,
    reference: Option<String>,
    address: String,
    payment_method: MemberPaymentMethod,
    transaction_id: Option<String>,
    payment_document_url: Option<String>,
    payment_status: PaymentStatus,
    application_status: ApplicationStatus,
    created_at: String,
    updated_at: String,
}

impl From<MemberApplication> for MemberDto {
    fn from(application: MemberApplication) -> Self {
        let form = application.form;
        Self {
            id: application.id,
            member_type: form.member_type,
            amount: to_major_units(form.amount_minor),
            name: form.name,
            father_name: form.father_name,
            gender: form.gender,
            mobile: form.mobile,
            is_overseas: form.is_overseas,
            email: form.email,
            occupation: form.occupation,
            reference: form.reference,
            address: form.address,
            payment_method: application.payment_method,
            transaction_id: application.transaction_id,
            payment_document_url: application.payment_document_url,
            payment_status: application.payment_status,
            application_status: application.application_status,
            created_at: application.created_at.to_rfc3339(),
            updated_at: application.updated_at.to_rfc3339(),
        }
    }
}

/// What the completion call hands back to the website.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedApplication {
    id: Uuid,
    #[serde(rename = "type")]
    member_type: MemberType,
    status: ApplicationStatus,
    transaction_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<String>,
    payment_status: Option<String>,
    #[serde(rename = "type")]
    member_type: Option<String>,
    search_term: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    members: Vec<MemberDto>,
    pagination: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    payment_status: String,
}

fn parse_filter<T: std::str::FromStr<Err = String>>(value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().map_err(AppError::Validation))
        .transpose()
}

pub async fn online_payment(
    State(state): State<AppState>,
    Json(request): Json<MemberFormRequest>,
) -> Result<Json<ApiResponse<MemberPaymentInitiated>>> {
    let initiated = state
        .service_context
        .initiation_service
        .initiate_member_payment(request)
        .await?;

    Ok(ok(initiated))
}

pub async fn complete_payment(
    State(state): State<AppState>,
    Json(request): Json<CompletePaymentRequest>,
) -> Result<Json<ApiResponse<CompletedApplication>>> {
    let application = state
        .service_context
        .reconciliation_service
        .complete_member_payment(request)
        .await?;

    Ok(ok_with_message(
        CompletedApplication {
            id: application.id,
            member_type: application.form.member_type,
            status: application.application_status,
            transaction_id: application.transaction_id,
        },
        "Payment completed and application submitted",
    ))
}

/// Multipart membership application for payments made at the bank.
pub async fn apply(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<MemberDto>>)> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut document = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == DOCUMENT_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
            if !filename.is_empty() && !data.is_empty() {
                document = Some(PaymentDocument {
                    filename,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid field {}: {}", name, e)))?;
        if !value.trim().is_empty() {
            fields.insert(name, value);
        }
    }

    let payment_method = fields
        .get("paymentMethod")
        .ok_or_else(|| AppError::Validation("Payment method is required".to_string()))?
        .trim()
        .parse::<MemberPaymentMethod>()
        .map_err(AppError::Validation)?;
    let transaction_id = fields.get("transactionId").cloned();

    // Text parts are untyped; route them through the urlencoded deserializer
    // so numbers, booleans and enums parse the same way as a form post.
    let encoded = serde_urlencoded::to_string(&fields)
        .map_err(|e| AppError::Internal(format!("Failed to encode form: {}", e)))?;
    let form: MemberFormRequest = serde_urlencoded::from_str(&encoded)
        .map_err(|e| AppError::Validation(format!("Invalid application form: {}", e)))?;

    let application = state
        .service_context
        .member_service
        .submit_bank_application(BankApplication {
            form,
            payment_method,
            transaction_id,
            document,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ok_with_message(application.into(), "Application submitted successfully"),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<ListResponse>>> {
    let filters = MemberApplicationFilters {
        application_status: parse_filter(params.status)?,
        payment_status: parse_filter(params.payment_status)?,
        member_type: parse_filter(params.member_type)?,
        search_term: params.search_term.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
    };

    let (members, pagination) = state
        .service_context
        .member_service
        .list(&filters, params.page, params.limit)
        .await?;

    Ok(ok(ListResponse {
        members: members.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MemberDto>>> {
    let application = state.service_context.member_service.get(id).await?;
    Ok(ok(application.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.service_context.member_service.delete(id).await?;
    Ok(ok_with_message((), "Member deleted successfully"))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<MemberDto>>> {
    let status = request
        .status
        .trim()
        .parse::<ApplicationStatus>()
        .map_err(AppError::Validation)?;

    tracing::debug!("User {} sets application {} to {}", current.user.id, id, status);

    let application = state
        .service_context
        .member_service
        .set_application_status(id, status)
        .await?;

    Ok(ok(application.into()))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<ApiResponse<MemberDto>>> {
    let status = request
        .payment_status
        .trim()
        .parse::<PaymentStatus>()
        .map_err(AppError::Validation)?;

    tracing::debug!("User {} sets payment of application {} to {}", current.user.id, id, status);

    let application = state
        .service_context
        .member_service
        .set_payment_status(id, status)
        .await?;

    Ok(ok(application.into()))
}
