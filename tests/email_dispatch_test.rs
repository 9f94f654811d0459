use async_trait::async_trait;
use bson::oid::ObjectId;
use lettre::Message;
use std::sync::{Arc, Mutex};

use quimica_backend::config::email_conf::DEFAULT_COMPANY_TO;
use quimica_backend::config::{CompanyConfig, EmailConfig};
use quimica_backend::dto::contact_dto::ContactRequest;
use quimica_backend::model::quote::{
    ClientType, ContactPreferences, PurchaseFrequency, Quote, QuoteItem, QuoteStatus,
};
use quimica_backend::util::email::{EmailError, MailTransport, QuoteMailer, QuoteNotifier};

/// Records outbound envelopes instead of speaking SMTP.
#[derive(Default)]
struct FakeTransport {
    fail: bool,
    sent: Mutex<Vec<Message>>,
    attempts: Mutex<u32>,
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send_message(&self, message: Message) -> Result<(), EmailError> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail {
            return Err(EmailError::SmtpError("invalid credentials".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

fn sample_quote() -> Quote {
    Quote {
        id: Some(ObjectId::new()),
        clientType: ClientType::Natural,
        firstName: "Ana".to_string(),
        lastName: "Lopez".to_string(),
        dni: "12345678".to_string(),
        phone: "999999999".to_string(),
        email: "ana@example.com".to_string(),
        companyName: None,
        ruc: None,
        products: vec![QuoteItem {
            productId: Some(ObjectId::new()),
            productName: "Ácido Cítrico <anhidro>".to_string(),
            presentationId: None,
            presentationLabel: Some("Saco 25kg".to_string()),
            quantity: 5,
            frequency: PurchaseFrequency::Mensual,
        }],
        contactPreferences: ContactPreferences {
            email: true,
            whatsapp: true,
            phone: false,
        },
        observations: Some("Primera línea\nSegunda línea".to_string()),
        status: QuoteStatus::Pending,
        source: "website".to_string(),
        ipAddress: None,
        userAgent: None,
        createdAt: Some("2025-01-15T10:30:05+00:00".to_string()),
        updatedAt: Some("2025-01-15T10:30:05+00:00".to_string()),
    }
}

fn mailer_with(
    config: EmailConfig,
    is_production: bool,
    fail: bool,
) -> (QuoteMailer, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport {
        fail,
        ..Default::default()
    });
    let mailer = QuoteMailer::new(
        transport.clone(),
        config,
        CompanyConfig::from_test_env(),
        is_production,
    )
    .expect("mailer should build from embedded templates");
    (mailer, transport)
}

fn envelope_to(message: &Message) -> Vec<String> {
    message
        .envelope()
        .to()
        .iter()
        .map(|a| a.to_string())
        .collect()
}

#[tokio::test]
async fn test_quote_fan_out_sends_company_then_client() {
    let (mailer, transport) = mailer_with(EmailConfig::from_test_env(), false, false);

    mailer
        .send_quote_emails(&sample_quote(), Some(b"%PDF-1.4 stub"))
        .await
        .expect("both sends should succeed");

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(envelope_to(&sent[0]), vec![DEFAULT_COMPANY_TO.to_string()]);
    assert_eq!(envelope_to(&sent[1]), vec!["ana@example.com".to_string()]);
}

#[tokio::test]
async fn test_redirect_overrides_both_recipients_outside_production() {
    let mut config = EmailConfig::from_test_env();
    config.redirect_all_to = Some("qa@example.com".to_string());
    let (mailer, transport) = mailer_with(config, false, false);

    mailer
        .send_quote_emails(&sample_quote(), Some(b"%PDF"))
        .await
        .unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(envelope_to(&sent[0]), vec!["qa@example.com".to_string()]);
    assert_eq!(envelope_to(&sent[1]), vec!["qa@example.com".to_string()]);
}

#[tokio::test]
async fn test_redirect_ignored_in_production_without_opt_in() {
    let mut config = EmailConfig::from_test_env();
    config.redirect_all_to = Some("qa@example.com".to_string());
    let (mailer, transport) = mailer_with(config, true, false);

    mailer
        .send_quote_emails(&sample_quote(), Some(b"%PDF"))
        .await
        .unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(envelope_to(&sent[0]), vec![DEFAULT_COMPANY_TO.to_string()]);
    assert_eq!(envelope_to(&sent[1]), vec!["ana@example.com".to_string()]);
}

#[tokio::test]
async fn test_transport_failure_still_attempts_both_sends() {
    let (mailer, transport) = mailer_with(EmailConfig::from_test_env(), false, true);

    let result = mailer.send_quote_emails(&sample_quote(), Some(b"%PDF")).await;
    assert!(result.is_err());
    assert_eq!(*transport.attempts.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_company_notification_body() {
    let (mailer, _) = mailer_with(EmailConfig::from_test_env(), false, false);
    let html = mailer
        .render_company_notification(&sample_quote(), "cid:logo")
        .unwrap();

    // Product names are escaped, newlines become visual breaks.
    assert!(html.contains("&lt;anhidro&gt;"));
    assert!(html.contains("Primera línea<br/>Segunda línea"));
    assert!(html.contains("Email, WhatsApp"));
    assert!(html.contains("cid:logo"));
    assert!(html.contains("Test Chem Co"));
    assert!(!html.contains("{{"));
}

#[tokio::test]
async fn test_company_notification_without_observations() {
    let (mailer, _) = mailer_with(EmailConfig::from_test_env(), false, false);
    let mut quote = sample_quote();
    quote.observations = None;
    let html = mailer.render_company_notification(&quote, "cid:logo").unwrap();
    assert!(html.contains("Sin observaciones"));
}

#[tokio::test]
async fn test_client_confirmation_omits_empty_observations() {
    let (mailer, _) = mailer_with(EmailConfig::from_test_env(), false, false);

    let mut quote = sample_quote();
    quote.observations = None;
    let html = mailer.render_client_confirmation(&quote, "cid:logo").unwrap();
    assert!(!html.contains("Observaciones"));

    let html = mailer
        .render_client_confirmation(&sample_quote(), "cid:logo")
        .unwrap();
    assert!(html.contains("Observaciones"));
    assert!(html.contains("Primera línea<br/>Segunda línea"));
}

#[tokio::test]
async fn test_contact_fan_out_recipients_and_content() {
    let (mailer, transport) = mailer_with(EmailConfig::from_test_env(), false, false);

    let contact = ContactRequest {
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        phone: None,
        message: "Hola\nNecesito información".to_string(),
    };
    mailer.send_contact_emails(&contact).await.unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(envelope_to(&sent[0]), vec![DEFAULT_COMPANY_TO.to_string()]);
    assert_eq!(envelope_to(&sent[1]), vec!["ana@example.com".to_string()]);
}
