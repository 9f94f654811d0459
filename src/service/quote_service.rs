use crate::dto::quote_dto::{CreateQuoteRequest, RequestProvenance};
use crate::model::quote::{
    ClientType, PurchaseFrequency, Quote, QuoteItem, QuoteStatus,
};
use crate::repository::product_repo::ProductCatalog;
use crate::repository::quote_repo::QuoteRepository;
use crate::util::email::QuoteNotifier;
use crate::util::error::ServiceError;
use crate::util::pdf::QuoteRenderer;
use async_trait::async_trait;
use bson::oid::ObjectId;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Substituted display name when a catalog lookup fails. Catalog
/// inconsistency must never block quote capture.
pub const UNKNOWN_PRODUCT_NAME: &str = "unknown product";

/// What actually happened during a submission. Persistence is implied (the
/// outcome only exists once the record is durably stored); the render and
/// notify stages degrade silently from the caller's perspective.
#[derive(Debug, Clone)]
pub struct QuoteSubmissionOutcome {
    pub quote: Quote,
    pub rendered: bool,
    pub notified: bool,
}

#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn submit_quote(
        &self,
        request: CreateQuoteRequest,
        provenance: RequestProvenance,
    ) -> Result<QuoteSubmissionOutcome, ServiceError>;
    async fn get_quote(&self, id: ObjectId) -> Result<Quote, ServiceError>;
    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Quote>, u64), ServiceError>;
    async fn update_quote_status(
        &self,
        id: ObjectId,
        status: QuoteStatus,
    ) -> Result<Quote, ServiceError>;
}

pub struct QuoteServiceImpl {
    quote_repo: Arc<dyn QuoteRepository>,
    catalog: Arc<dyn ProductCatalog>,
    renderer: Arc<dyn QuoteRenderer>,
    notifier: Arc<dyn QuoteNotifier>,
}

impl QuoteServiceImpl {
    pub fn new(
        quote_repo: Arc<dyn QuoteRepository>,
        catalog: Arc<dyn ProductCatalog>,
        renderer: Arc<dyn QuoteRenderer>,
        notifier: Arc<dyn QuoteNotifier>,
    ) -> Self {
        QuoteServiceImpl {
            quote_repo,
            catalog,
            renderer,
            notifier,
        }
    }

    /// Resolve display names for every requested item. Lookups run
    /// concurrently; a failed lookup substitutes the placeholder name.
    async fn enrich_items(
        &self,
        request: &CreateQuoteRequest,
    ) -> Result<Vec<QuoteItem>, ServiceError> {
        let lookups = request.products.iter().map(|item| {
            let catalog = Arc::clone(&self.catalog);
            async move {
                match catalog.display_name(&item.product_id).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!(
                            product_id = %item.product_id,
                            "Catalog lookup failed, using placeholder name: {}", e
                        );
                        UNKNOWN_PRODUCT_NAME.to_string()
                    }
                }
            }
        });
        let names = join_all(lookups).await;

        request
            .products
            .iter()
            .zip(names)
            .map(|(item, product_name)| {
                let frequency = item
                    .frequency
                    .parse::<PurchaseFrequency>()
                    .map_err(|_| ServiceError::InvalidInput("Frecuencia inválida".to_string()))?;
                Ok(QuoteItem {
                    productId: ObjectId::parse_str(&item.product_id).ok(),
                    productName: product_name,
                    presentationId: item.presentation_id.clone(),
                    presentationLabel: item.presentation_label.clone(),
                    quantity: item.quantity,
                    frequency,
                })
            })
            .collect()
    }
}

#[async_trait]
impl QuoteService for QuoteServiceImpl {
    /// Enrichment, persistence, then best-effort render and notify. Only the
    /// persistence step can fail the request; once the record is stored the
    /// submission succeeds regardless of the later stages.
    #[instrument(skip(self, request, provenance), fields(email = %request.email))]
    async fn submit_quote(
        &self,
        request: CreateQuoteRequest,
        provenance: RequestProvenance,
    ) -> Result<QuoteSubmissionOutcome, ServiceError> {
        info!("Submitting new quote");

        let client_type = request
            .client_type
            .parse::<ClientType>()
            .map_err(|_| ServiceError::InvalidInput("Tipo de cliente inválido".to_string()))?;

        let products = self.enrich_items(&request).await?;

        let quote = Quote {
            id: None,
            clientType: client_type,
            firstName: request.first_name,
            lastName: request.last_name,
            dni: request.dni,
            phone: request.phone,
            email: request.email,
            companyName: request.company_name,
            ruc: request.ruc,
            products,
            contactPreferences: request.contact_preferences,
            observations: request.observations,
            status: QuoteStatus::Pending,
            source: provenance.source,
            ipAddress: provenance.ip_address,
            userAgent: provenance.user_agent,
            createdAt: None,
            updatedAt: None,
        };

        // Durability boundary
        let stored = self
            .quote_repo
            .create(quote)
            .await
            .map_err(ServiceError::from)?;

        let pdf = match self.renderer.render(&stored).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!(quote_id = %stored.id_hex(), "PDF rendering failed: {}", e);
                None
            }
        };
        let rendered = pdf.is_some();

        // No PDF means no emails are attempted at all.
        let notified = match &pdf {
            Some(bytes) => match self
                .notifier
                .send_quote_emails(&stored, Some(bytes.as_slice()))
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    error!(quote_id = %stored.id_hex(), "Notification dispatch failed: {}", e);
                    false
                }
            },
            None => false,
        };

        info!(
            quote_id = %stored.id_hex(),
            rendered = rendered,
            notified = notified,
            "Quote submission pipeline finished"
        );
        Ok(QuoteSubmissionOutcome {
            quote: stored,
            rendered,
            notified,
        })
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_quote(&self, id: ObjectId) -> Result<Quote, ServiceError> {
        info!("Getting quote by id");
        let res = self.quote_repo.get_by_id(id).await;
        match &res {
            Ok(_) => info!("Quote fetched successfully"),
            Err(e) => error!("Failed to fetch quote: {e}"),
        }
        res.map_err(ServiceError::from)
    }

    #[instrument(skip(self), fields(status = ?status, page, limit))]
    async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Quote>, u64), ServiceError> {
        info!("Listing quotes");
        let res = self.quote_repo.list(status, page, limit).await;
        match &res {
            Ok((quotes, total)) => info!("Fetched {} quotes of {}", quotes.len(), total),
            Err(e) => error!("Failed to list quotes: {e}"),
        }
        res.map_err(ServiceError::from)
    }

    #[instrument(skip(self), fields(id = %id, status = %status))]
    async fn update_quote_status(
        &self,
        id: ObjectId,
        status: QuoteStatus,
    ) -> Result<Quote, ServiceError> {
        info!("Updating quote status");
        let res = self.quote_repo.update_status(id, status).await;
        match &res {
            Ok(_) => info!("Quote status updated successfully"),
            Err(e) => error!("Failed to update quote status: {e}"),
        }
        res.map_err(ServiceError::from)
    }
}
