use crate::dto::contact_dto::ContactRequest;
use crate::dto::quote_dto::ApiResponse;
use crate::util::email::QuoteNotifier;
use crate::util::error::HandlerError;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

/// Contact messages are not persisted; the emails are the whole effect, so a
/// dispatch failure is surfaced to the caller here.
pub async fn send_contact_handler(
    State(notifier): State<Arc<dyn QuoteNotifier>>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload
        .validate()
        .map_err(|e| HandlerError::bad_request(format!("Validation error: {}", e)))?;

    info!(contact_email = %payload.email, "Contact form submission received");
    notifier.send_contact_emails(&payload).await.map_err(|e| {
        error!("Error sending contact message: {}", e);
        HandlerError::internal("Failed to send message")
    })?;

    Ok(Json(ApiResponse::message("Mensaje enviado exitosamente.")))
}
