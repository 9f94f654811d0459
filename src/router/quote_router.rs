use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::handler::contact_handler::send_contact_handler;
use crate::handler::quote_handler::{
    create_quote_handler, get_quote_handler, list_quotes_handler, update_quote_status_handler,
};
use crate::service::quote_service::QuoteService;
use crate::util::email::QuoteNotifier;

pub fn quote_router(service: Arc<dyn QuoteService>) -> Router {
    Router::new()
        .route(
            "/quotes",
            post(create_quote_handler).get(list_quotes_handler),
        )
        .route("/quotes/{id}", get(get_quote_handler))
        .route("/quotes/{id}/status", patch(update_quote_status_handler))
        .with_state(service)
}

pub fn contact_router(notifier: Arc<dyn QuoteNotifier>) -> Router {
    Router::new()
        .route("/contact", post(send_contact_handler))
        .with_state(notifier)
}

/// Every route is exposed both at the root and under the legacy `/api/qi`
/// prefix.
pub fn api_router(service: Arc<dyn QuoteService>, notifier: Arc<dyn QuoteNotifier>) -> Router {
    let routes = quote_router(service).merge(contact_router(notifier));
    Router::new()
        .merge(routes.clone())
        .nest("/api/qi", routes)
}
