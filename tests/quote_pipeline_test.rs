use async_trait::async_trait;
use bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use quimica_backend::dto::contact_dto::ContactRequest;
use quimica_backend::dto::quote_dto::{CreateQuoteRequest, QuoteItemRequest, RequestProvenance};
use quimica_backend::model::quote::{ContactPreferences, Quote, QuoteStatus};
use quimica_backend::repository::product_repo::ProductCatalog;
use quimica_backend::repository::quote_repo::QuoteRepository;
use quimica_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use quimica_backend::service::quote_service::{
    QuoteService, QuoteServiceImpl, UNKNOWN_PRODUCT_NAME,
};
use quimica_backend::util::email::{EmailError, QuoteNotifier};
use quimica_backend::util::error::ServiceError;
use quimica_backend::util::pdf::{PdfError, QuoteRenderer};

// --- Fakes wired through the collaborator traits ---

#[derive(Default)]
struct InMemoryQuoteRepository {
    quotes: Mutex<Vec<Quote>>,
    fail_create: bool,
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote> {
        if self.fail_create {
            return Err(RepositoryError::database("write failed"));
        }
        let mut stored = quote;
        stored.id = Some(ObjectId::new());
        let seq = self.quotes.lock().unwrap().len().min(59);
        let time = format!("2025-01-15T10:00:{:02}+00:00", seq);
        stored.createdAt = Some(time.clone());
        stored.updatedAt = Some(time);
        self.quotes.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote> {
        self.quotes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found for ID: {}", id)))
    }

    async fn list(
        &self,
        status: Option<QuoteStatus>,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<(Vec<Quote>, u64)> {
        let quotes = self.quotes.lock().unwrap();
        let mut matching: Vec<Quote> = quotes
            .iter()
            .filter(|q| status.map(|s| q.status == s).unwrap_or(true))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.createdAt.cmp(&a.createdAt));
        let total = matching.len() as u64;
        let skip = ((page.saturating_sub(1)) * limit) as usize;
        let pageful = matching
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect();
        Ok((pageful, total))
    }

    async fn update_status(&self, id: ObjectId, status: QuoteStatus) -> RepositoryResult<Quote> {
        let mut quotes = self.quotes.lock().unwrap();
        let quote = quotes
            .iter_mut()
            .find(|q| q.id == Some(id))
            .ok_or_else(|| {
                RepositoryError::not_found(format!("No quote found to update status for ID: {}", id))
            })?;
        quote.status = status;
        quote.updatedAt = Some("2025-01-15T12:00:00+00:00".to_string());
        Ok(quote.clone())
    }
}

struct StaticCatalog {
    names: HashMap<String, String>,
}

impl StaticCatalog {
    fn with_products(entries: &[(&str, &str)]) -> Self {
        StaticCatalog {
            names: entries
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ProductCatalog for StaticCatalog {
    async fn display_name(&self, product_id: &str) -> RepositoryResult<String> {
        self.names
            .get(product_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Product not found: {}", product_id)))
    }
}

struct StubRenderer {
    fail: bool,
}

#[async_trait]
impl QuoteRenderer for StubRenderer {
    async fn render(&self, _quote: &Quote) -> Result<Vec<u8>, PdfError> {
        if self.fail {
            Err(PdfError::RenderError("layout failed".to_string()))
        } else {
            Ok(b"%PDF-1.4 stub".to_vec())
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl QuoteNotifier for RecordingNotifier {
    async fn send_quote_emails(
        &self,
        quote: &Quote,
        pdf: Option<&[u8]>,
    ) -> Result<(), EmailError> {
        self.sent
            .lock()
            .unwrap()
            .push((quote.id_hex(), pdf.is_some()));
        if self.fail {
            Err(EmailError::SmtpError("invalid credentials".to_string()))
        } else {
            Ok(())
        }
    }

    async fn send_contact_emails(&self, _contact: &ContactRequest) -> Result<(), EmailError> {
        Ok(())
    }
}

struct Pipeline {
    repo: Arc<InMemoryQuoteRepository>,
    notifier: Arc<RecordingNotifier>,
    service: QuoteServiceImpl,
}

fn build_pipeline(
    repo: InMemoryQuoteRepository,
    catalog: StaticCatalog,
    renderer: StubRenderer,
    notifier: RecordingNotifier,
) -> Pipeline {
    let repo = Arc::new(repo);
    let notifier = Arc::new(notifier);
    let service = QuoteServiceImpl::new(
        repo.clone(),
        Arc::new(catalog),
        Arc::new(renderer),
        notifier.clone(),
    );
    Pipeline {
        repo,
        notifier,
        service,
    }
}

const KNOWN_ID: &str = "64b1f0c2a1b2c3d4e5f60718";
const OTHER_ID: &str = "64b1f0c2a1b2c3d4e5f60719";

fn submission(product_ids: &[&str]) -> CreateQuoteRequest {
    CreateQuoteRequest {
        client_type: "natural".to_string(),
        first_name: "Ana".to_string(),
        last_name: "Lopez".to_string(),
        dni: "12345678".to_string(),
        phone: "999999999".to_string(),
        email: "ana@example.com".to_string(),
        company_name: None,
        ruc: None,
        products: product_ids
            .iter()
            .map(|id| QuoteItemRequest {
                product_id: id.to_string(),
                presentation_id: None,
                presentation_label: Some("Saco 25kg".to_string()),
                quantity: 5,
                frequency: "mensual".to_string(),
            })
            .collect(),
        contact_preferences: ContactPreferences {
            email: true,
            ..Default::default()
        },
        observations: Some("Entrega en Lima".to_string()),
    }
}

fn provenance() -> RequestProvenance {
    RequestProvenance::website(Some("203.0.113.9".to_string()), Some("test-agent".to_string()))
}

#[tokio::test]
async fn test_submission_persists_pending_quote_and_resolves_by_id() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: false },
        RecordingNotifier::default(),
    );

    let outcome = pipeline
        .service
        .submit_quote(submission(&[KNOWN_ID]), provenance())
        .await
        .expect("submission should succeed");

    assert_eq!(outcome.quote.status, QuoteStatus::Pending);
    assert!(outcome.rendered);
    assert!(outcome.notified);
    assert_eq!(outcome.quote.products[0].productName, "Soda Cáustica");
    assert_eq!(outcome.quote.ipAddress.as_deref(), Some("203.0.113.9"));
    assert_eq!(outcome.quote.source, "website");

    let id = outcome.quote.id.expect("id assigned");
    let fetched = pipeline.service.get_quote(id).await.unwrap();
    assert_eq!(fetched.status, QuoteStatus::Pending);
    assert_eq!(fetched.email, "ana@example.com");

    let sent = pipeline.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1, "notifier should have received the PDF");
}

#[tokio::test]
async fn test_unknown_product_gets_placeholder_and_request_succeeds() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: false },
        RecordingNotifier::default(),
    );

    let outcome = pipeline
        .service
        .submit_quote(submission(&[KNOWN_ID, OTHER_ID]), provenance())
        .await
        .expect("catalog inconsistency must not block quote capture");

    assert_eq!(outcome.quote.products[0].productName, "Soda Cáustica");
    assert_eq!(outcome.quote.products[1].productName, UNKNOWN_PRODUCT_NAME);
    assert!(outcome.quote.products[1].productId.is_some());
}

#[tokio::test]
async fn test_malformed_product_id_keeps_weak_reference_empty() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[]),
        StubRenderer { fail: false },
        RecordingNotifier::default(),
    );

    let outcome = pipeline
        .service
        .submit_quote(submission(&["not-an-object-id"]), provenance())
        .await
        .unwrap();

    assert_eq!(outcome.quote.products[0].productName, UNKNOWN_PRODUCT_NAME);
    assert!(outcome.quote.products[0].productId.is_none());
}

#[tokio::test]
async fn test_render_failure_degrades_silently_and_skips_notification() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: true },
        RecordingNotifier::default(),
    );

    let outcome = pipeline
        .service
        .submit_quote(submission(&[KNOWN_ID]), provenance())
        .await
        .expect("render failure must not fail the request");

    assert!(!outcome.rendered);
    assert!(!outcome.notified);
    // No PDF means no emails attempted at all.
    assert!(pipeline.notifier.sent.lock().unwrap().is_empty());
    // Quote is still durably stored.
    assert_eq!(pipeline.repo.quotes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_notify_failure_degrades_silently() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: false },
        RecordingNotifier {
            fail: true,
            ..Default::default()
        },
    );

    let outcome = pipeline
        .service
        .submit_quote(submission(&[KNOWN_ID]), provenance())
        .await
        .expect("dispatch failure must not fail the request");

    assert!(outcome.rendered);
    assert!(!outcome.notified);
    assert_eq!(pipeline.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_persistence_failure_is_fatal() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository {
            fail_create: true,
            ..Default::default()
        },
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: false },
        RecordingNotifier::default(),
    );

    let result = pipeline
        .service
        .submit_quote(submission(&[KNOWN_ID]), provenance())
        .await;

    assert!(matches!(result, Err(ServiceError::InternalError(_))));
    assert!(pipeline.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_update_round_trip() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: false },
        RecordingNotifier::default(),
    );

    let outcome = pipeline
        .service
        .submit_quote(submission(&[KNOWN_ID]), provenance())
        .await
        .unwrap();
    let id = outcome.quote.id.unwrap();

    let updated = pipeline
        .service
        .update_quote_status(id, QuoteStatus::Completed)
        .await
        .unwrap();
    assert_eq!(updated.status, QuoteStatus::Completed);

    let fetched = pipeline.service.get_quote(id).await.unwrap();
    assert_eq!(fetched.status, QuoteStatus::Completed);

    let missing = pipeline
        .service
        .update_quote_status(ObjectId::new(), QuoteStatus::Cancelled)
        .await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_list_filters_by_status_and_paginates() {
    let pipeline = build_pipeline(
        InMemoryQuoteRepository::default(),
        StaticCatalog::with_products(&[(KNOWN_ID, "Soda Cáustica")]),
        StubRenderer { fail: false },
        RecordingNotifier::default(),
    );

    let mut ids = Vec::new();
    for _ in 0..3 {
        let outcome = pipeline
            .service
            .submit_quote(submission(&[KNOWN_ID]), provenance())
            .await
            .unwrap();
        ids.push(outcome.quote.id.unwrap());
    }
    pipeline
        .service
        .update_quote_status(ids[0], QuoteStatus::Completed)
        .await
        .unwrap();

    let (pending, pending_total) = pipeline
        .service
        .list_quotes(Some(QuoteStatus::Pending), 1, 10)
        .await
        .unwrap();
    assert_eq!(pending_total, 2);
    assert!(pending.iter().all(|q| q.status == QuoteStatus::Pending));

    let (first_page, total) = pipeline.service.list_quotes(None, 1, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(first_page.len(), 2);
    // Newest first
    assert!(first_page[0].createdAt >= first_page[1].createdAt);

    let (second_page, _) = pipeline.service.list_quotes(None, 2, 2).await.unwrap();
    assert_eq!(second_page.len(), 1);
}
