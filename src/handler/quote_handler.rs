use crate::dto::quote_dto::{
    ApiResponse, CreateQuoteRequest, ListQuotesQuery, Pagination, QuoteSubmissionResponse,
    RequestProvenance, UpdateQuoteStatusRequest,
};
use crate::model::quote::QuoteStatus;
use crate::service::quote_service::QuoteService;
use crate::util::error::{HandlerError, ServiceError};
use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bson::oid::ObjectId;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 20;

/// Client IP: first hop of x-forwarded-for when present, else the socket
/// peer.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| Some(addr.ip().to_string()))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn map_service_error(err: ServiceError) -> HandlerError {
    match err {
        ServiceError::NotFound(_) => HandlerError::not_found("Cotización no encontrada"),
        ServiceError::InvalidInput(msg) => HandlerError::bad_request(msg),
        ServiceError::InternalError(msg) => HandlerError::internal(msg),
    }
}

pub async fn create_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload
        .validate_all()
        .map_err(|e| HandlerError::bad_request(format!("Validation error: {}", e)))?;

    let provenance = RequestProvenance::website(client_ip(&headers, addr), user_agent(&headers));
    let outcome = service
        .submit_quote(payload, provenance)
        .await
        .map_err(map_service_error)?;

    info!(quote_id = %outcome.quote.id_hex(), "Quote created");
    let body = ApiResponse::data(QuoteSubmissionResponse {
        id: outcome.quote.id_hex(),
        status: outcome.quote.status,
        created_at: outcome.quote.createdAt.clone(),
    })
    .with_message("Cotización creada exitosamente");
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn list_quotes_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Query(params): Query<ListQuotesQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<QuoteStatus>()
                .map_err(|_| HandlerError::bad_request("Estado inválido"))?,
        ),
        None => None,
    };
    let page = params.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let (quotes, total) = service
        .list_quotes(status, page, limit)
        .await
        .map_err(map_service_error)?;

    let body = ApiResponse::data(quotes).with_pagination(Pagination::new(page, limit, total));
    Ok(Json(body))
}

pub async fn get_quote_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = ObjectId::parse_str(&id)
        .map_err(|_| HandlerError::bad_request("Identificador de cotización inválido"))?;
    let quote = service.get_quote(id).await.map_err(map_service_error)?;
    Ok(Json(ApiResponse::data(quote)))
}

pub async fn update_quote_status_handler(
    State(service): State<Arc<dyn QuoteService>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateQuoteStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = ObjectId::parse_str(&id)
        .map_err(|_| HandlerError::bad_request("Identificador de cotización inválido"))?;
    payload
        .validate()
        .map_err(|_| HandlerError::bad_request("Estado inválido"))?;
    let status = payload
        .status
        .parse::<QuoteStatus>()
        .map_err(|_| HandlerError::bad_request("Estado inválido"))?;

    let quote = service
        .update_quote_status(id, status)
        .await
        .map_err(map_service_error)?;
    Ok(Json(ApiResponse::data(quote)))
}
