//! `/api/stripe_webhook`
//!
//! Anything other than a malformed request or an unknown event answers 200,
//! so the gateway stops redelivering events we cannot use.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::domains::billing::actions::handle_webhook_event;
use crate::domains::billing::BillingError;
use crate::kernel::GatewayError;
use crate::server::app::AppState;
use crate::server::error::{ApiError, JsonInput};

#[derive(Debug, Deserialize)]
pub struct WebhookInput {
    #[serde(default)]
    pub id: Option<String>,
}

pub async fn stripe_webhook(
    Extension(state): Extension<AppState>,
    JsonInput(input): JsonInput<WebhookInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let event_id = input
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Invalid stripe event.".to_string()))?;

    match handle_webhook_event(&event_id, &state.deps).await {
        Ok(_) => Ok((StatusCode::OK, Json(json!({ "success": true })))),
        Err(BillingError::Gateway(GatewayError::InvalidRequest(message))) => {
            Err(ApiError::Unprocessable(message))
        }
        Err(e) => {
            warn!(event_id = %event_id, error = %e, "webhook event not processed");
            Ok((StatusCode::OK, Json(json!({ "error": e.to_string() }))))
        }
    }
}
