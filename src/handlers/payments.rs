use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::payment_service::WebhookOutcome;
use crate::domain::payment::WebhookPayload;
use crate::errors::AppError;
use crate::AppState;

use super::blocking;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// `settled` or `already_settled`
    pub status: String,
    pub payment_status: String,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Settled { payment_status, .. } => WebhookResponse {
                status: "settled".to_string(),
                payment_status: payment_status.as_str().to_string(),
            },
            WebhookOutcome::AlreadySettled { payment_status } => WebhookResponse {
                status: "already_settled".to_string(),
                payment_status: payment_status.as_str().to_string(),
            },
        }
    }
}

/// POST /payments/payu/webhook
///
/// Form-encoded PayU callback. The reverse hash is checked before anything is
/// read from the store; replays of a settled payment are acknowledged.
#[utoipa::path(
    post,
    path = "/payments/payu/webhook",
    responses(
        (status = 200, description = "Callback processed", body = WebhookResponse),
        (status = 400, description = "Malformed callback or amount mismatch"),
        (status = 401, description = "Signature mismatch"),
        (status = 404, description = "Unknown transaction"),
        (status = 503, description = "Online payments are not configured"),
    ),
    tag = "payments"
)]
pub async fn payu_webhook(
    state: web::Data<AppState>,
    form: web::Form<BTreeMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let raw = serde_json::to_value(form.into_inner())
        .map_err(|e| AppError::BadRequest(format!("unreadable callback: {e}")))?;
    let payload: WebhookPayload = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::BadRequest(format!("incomplete callback: {e}")))?;

    log::info!("payu callback for {} ({})", payload.txnid, payload.status);
    let payments = state.payments.clone();
    let outcome = blocking(move || payments.handle_webhook(&payload, raw)).await?;
    Ok(HttpResponse::Ok().json(WebhookResponse::from(outcome)))
}
