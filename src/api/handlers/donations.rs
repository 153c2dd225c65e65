use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        middleware::auth::CurrentUser,
        response::{ok, ApiResponse},
        state::AppState,
    },
    domain::{to_major_units, CreateDonationRequest, Donation, DonationFilters, PaymentStatus},
    error::{AppError, Result},
    service::{initiation_service::DonationInitiated, PageMeta},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationDto {
    id: Uuid,
    transaction_id: String,
    purpose: String,
    contact: String,
    name: Option<String>,
    behalf: Option<String>,
    amount: f64,
    status: PaymentStatus,
    created_at: String,
    updated_at: String,
}

impl From<Donation> for DonationDto {
    fn from(donation: Donation) -> Self {
        Self {
            id: donation.id,
            transaction_id: donation.transaction_id,
            purpose: donation.purpose,
            contact: donation.contact,
            name: donation.name,
            behalf: donation.behalf,
            amount: to_major_units(donation.amount_minor),
            status: donation.status,
            created_at: donation.created_at.to_rfc3339(),
            updated_at: donation.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
    tran_id: Option<String>,
    purpose: Option<String>,
    contact: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    donations: Vec<DonationDto>,
    pagination: PageMeta,
    total_donation_amount: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates. A plain end date
/// covers the whole day.
fn parse_date_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", value)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| AppError::Internal("Invalid time of day".to_string()))?;

    Ok(DateTime::from_naive_utc_and_offset(date.and_time(time), Utc))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateDonationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DonationInitiated>>)> {
    let initiated = state
        .service_context
        .initiation_service
        .initiate_donation(request)
        .await?;

    Ok((StatusCode::CREATED, ok(initiated)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<ListResponse>>> {
    let filters = DonationFilters {
        status: None,
        transaction_id: non_empty(params.tran_id),
        purpose: non_empty(params.purpose),
        contact: non_empty(params.contact),
        start_date: non_empty(params.start_date)
            .map(|d| parse_date_bound(&d, false))
            .transpose()?,
        end_date: non_empty(params.end_date)
            .map(|d| parse_date_bound(&d, true))
            .transpose()?,
    };

    let page = state
        .service_context
        .donation_service
        .list_completed(filters, params.page, params.limit)
        .await?;

    Ok(ok(ListResponse {
        donations: page.donations.into_iter().map(Into::into).collect(),
        pagination: page.meta,
        total_donation_amount: to_major_units(page.total_amount_minor),
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DonationDto>>> {
    let donation = state.service_context.donation_service.get(id).await?;
    Ok(ok(donation.into()))
}

pub async fn my(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<DonationDto>>>> {
    let donations = state
        .service_context
        .donation_service
        .list_for_user(&current.user)
        .await?;

    Ok(ok(donations.into_iter().map(Into::into).collect()))
}
