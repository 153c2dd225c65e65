use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    Form,
};

use crate::{
    api::state::AppState,
    domain::{CallbackOutcome, PaymentFlow},
    error::Result,
    service::reconciliation_service::{CallbackAck, GatewayCallback},
    web::templates::{HtmlTemplate, PaymentRedirectPage},
};

type CallbackResponse = (StatusCode, HtmlTemplate<PaymentRedirectPage>);

type CallbackBody = std::result::Result<Form<GatewayCallback>, FormRejection>;

/// An unreadable body becomes an empty callback, which is then refused and
/// answered with the fail redirect like any other rejection.
fn callback_fields(body: CallbackBody) -> GatewayCallback {
    match body {
        Ok(Form(callback)) => callback,
        Err(rejection) => {
            tracing::warn!("Unreadable gateway callback body: {}", rejection);
            GatewayCallback::default()
        }
    }
}

/// The gateway forwards the shopper's browser along with its POST, so even a
/// rejected callback answers with a page that moves them to the frontend.
fn redirect_response(
    state: &AppState,
    flow: PaymentFlow,
    outcome: CallbackOutcome,
    callback: &GatewayCallback,
    result: Result<CallbackAck>,
) -> CallbackResponse {
    let frontend_url = &state.settings.frontend.url;
    let tran_id = callback.transaction_id();

    match result {
        Ok(ack) => {
            tracing::debug!(
                "{:?} callback '{}' for {} acknowledged as {} (changed: {})",
                flow,
                outcome.as_str(),
                ack.transaction_id,
                ack.status,
                ack.changed
            );
            (
                StatusCode::OK,
                HtmlTemplate(PaymentRedirectPage::new(frontend_url, outcome, tran_id)),
            )
        }
        Err(e) => {
            tracing::warn!(
                "{:?} callback '{}' for {} rejected: {}",
                flow,
                outcome.as_str(),
                tran_id.unwrap_or("<missing>"),
                e
            );
            (
                e.status_code(),
                HtmlTemplate(PaymentRedirectPage::new(frontend_url, CallbackOutcome::Fail, tran_id)),
            )
        }
    }
}

async fn donation_callback(state: AppState, outcome: CallbackOutcome, callback: GatewayCallback) -> CallbackResponse {
    let result = state
        .service_context
        .reconciliation_service
        .handle_donation_callback(outcome, &callback)
        .await;
    redirect_response(&state, PaymentFlow::Donation, outcome, &callback, result)
}

async fn member_callback(state: AppState, outcome: CallbackOutcome, callback: GatewayCallback) -> CallbackResponse {
    let result = state
        .service_context
        .reconciliation_service
        .handle_member_callback(outcome, &callback)
        .await;
    redirect_response(&state, PaymentFlow::Member, outcome, &callback, result)
}

pub async fn donation_success(State(state): State<AppState>, body: CallbackBody) -> CallbackResponse {
    donation_callback(state, CallbackOutcome::Success, callback_fields(body)).await
}

pub async fn donation_fail(State(state): State<AppState>, body: CallbackBody) -> CallbackResponse {
    donation_callback(state, CallbackOutcome::Fail, callback_fields(body)).await
}

pub async fn donation_cancel(State(state): State<AppState>, body: CallbackBody) -> CallbackResponse {
    donation_callback(state, CallbackOutcome::Cancel, callback_fields(body)).await
}

pub async fn member_success(State(state): State<AppState>, body: CallbackBody) -> CallbackResponse {
    member_callback(state, CallbackOutcome::Success, callback_fields(body)).await
}

pub async fn member_fail(State(state): State<AppState>, body: CallbackBody) -> CallbackResponse {
    member_callback(state, CallbackOutcome::Fail, callback_fields(body)).await
}

pub async fn member_cancel(State(state): State<AppState>, body: CallbackBody) -> CallbackResponse {
    member_callback(state, CallbackOutcome::Cancel, callback_fields(body)).await
}
