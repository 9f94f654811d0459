use crate::config::{CompanyConfig, ConfigError, EmailConfig};
use crate::dto::contact_dto::ContactRequest;
use crate::model::quote::{Quote, QuoteItem};
use crate::util::logo::resolve_logo;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tera::Tera;
use tracing::{error, info, instrument};

/// Content id of the inlined logo attachment.
const LOGO_CID: &str = "logo";

/// Image reference used in the email body when no logo buffer resolved.
const DEFAULT_LOGO_REMOTE_URL: &str = "https://quimicaindustrial.pe/logo.png";

/// Email service errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message building error: {0}")]
    MessageError(String),

    #[error("Address error: {0}")]
    AddressError(String),

    #[error("Template error: {0}")]
    TemplateError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Outbound transport seam; the SMTP implementation is swapped for a fake in
/// tests.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_message(&self, message: Message) -> Result<(), EmailError>;
}

/// lettre-backed SMTP transport
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        info!("Initializing SMTP transport");

        config.validate().map_err(EmailError::from)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .timeout(Some(std::time::Duration::from_secs(
                    config.connection_timeout_secs,
                )));

        let tls_parameters = TlsParameters::new(config.smtp_host.clone())
            .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;
        if config.smtp_secure {
            transport_builder = transport_builder.tls(Tls::Wrapper(tls_parameters));
        } else {
            transport_builder = transport_builder.tls(Tls::Opportunistic(tls_parameters));
        }

        if !config.smtp_username.is_empty() && !config.smtp_password.is_empty() {
            let credentials = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            transport_builder = transport_builder.credentials(credentials);
        }

        info!("SMTP transport initialized successfully");
        Ok(Self {
            transport: transport_builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send_message(&self, message: Message) -> Result<(), EmailError> {
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| EmailError::SmtpError(format!("Failed to send email: {}", e)))
    }
}

/// Dispatches the two-audience notification fan-outs for quotes and contact
/// messages.
#[async_trait]
pub trait QuoteNotifier: Send + Sync {
    /// Company notification (with PDF attachment when available) plus client
    /// confirmation. Both sends are attempted; success requires both.
    async fn send_quote_emails(&self, quote: &Quote, pdf: Option<&[u8]>)
        -> Result<(), EmailError>;

    /// Company notification plus client acknowledgment for a contact
    /// message. No attachments.
    async fn send_contact_emails(&self, contact: &ContactRequest) -> Result<(), EmailError>;
}

/// HTML-escape free text and turn newlines into `<br/>`.
pub fn html_multiline(text: &str) -> String {
    html_escape::encode_text(text.trim())
        .replace("\r\n", "\n")
        .replace('\n', "<br/>")
}

/// Per-item blocks inserted verbatim into both templates.
pub fn format_product_blocks(products: &[QuoteItem]) -> String {
    products
        .iter()
        .enumerate()
        .map(|(index, item)| {
            format!(
                concat!(
                    "<div class=\"product-item\" style=\"margin-bottom: 15px; padding: 10px; background: #f9f9f9; border-radius: 5px;\">",
                    "<p style=\"margin: 5px 0;\"><strong>Producto {}:</strong> {}</p>",
                    "<p style=\"margin: 5px 0;\"><strong>Presentación:</strong> {}</p>",
                    "<p style=\"margin: 5px 0;\"><strong>Cantidad:</strong> {}</p>",
                    "<p style=\"margin: 5px 0;\"><strong>Frecuencia:</strong> {}</p>",
                    "</div>"
                ),
                index + 1,
                html_escape::encode_text(&item.productName),
                html_escape::encode_text(item.presentationLabel.as_deref().unwrap_or("N/A")),
                item.quantity,
                item.frequency.label(),
            )
        })
        .collect()
}

fn logo_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

pub struct QuoteMailer {
    transport: std::sync::Arc<dyn MailTransport>,
    config: EmailConfig,
    company: CompanyConfig,
    is_production: bool,
    templates: Tera,
}

impl QuoteMailer {
    pub fn new(
        transport: std::sync::Arc<dyn MailTransport>,
        config: EmailConfig,
        company: CompanyConfig,
        is_production: bool,
    ) -> Result<Self, EmailError> {
        let mut templates = Tera::default();
        templates
            .add_raw_template(
                "company-notification.html",
                include_str!("../../templates/company-notification.html"),
            )
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;
        templates
            .add_raw_template(
                "client-confirmation.html",
                include_str!("../../templates/client-confirmation.html"),
            )
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(QuoteMailer {
            transport,
            config,
            company,
            is_production,
            templates,
        })
    }

    fn quote_context(&self, quote: &Quote, logo_ref: &str) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("logo", logo_ref);
        context.insert("quote_id", &quote.id_hex());
        context.insert("date", &quote.created_date());
        context.insert("client_name", &quote.client_name());
        context.insert("client_type", quote.clientType.label());
        context.insert("dni", &quote.dni);
        context.insert("email", &quote.email);
        context.insert("phone", &quote.phone);
        context.insert("client_company", quote.companyName.as_deref().unwrap_or("-"));
        context.insert("client_ruc", quote.ruc.as_deref().unwrap_or("-"));
        context.insert("contact_method", &quote.contactPreferences.summary());
        context.insert("products", &format_product_blocks(&quote.products));
        context.insert("company_name", &self.company.name);
        context.insert("company_address", &self.company.address);
        context.insert("company_phone", &self.company.phone);
        context.insert("company_email", &self.company.email);
        context
    }

    pub fn render_company_notification(
        &self,
        quote: &Quote,
        logo_ref: &str,
    ) -> Result<String, EmailError> {
        let mut context = self.quote_context(quote, logo_ref);
        let observations = quote.observations.as_deref().unwrap_or("").trim();
        if observations.is_empty() {
            context.insert("observations", "Sin observaciones");
        } else {
            context.insert("observations", &html_multiline(observations));
        }
        self.templates
            .render("company-notification.html", &context)
            .map_err(|e| EmailError::TemplateError(e.to_string()))
    }

    pub fn render_client_confirmation(
        &self,
        quote: &Quote,
        logo_ref: &str,
    ) -> Result<String, EmailError> {
        let mut context = self.quote_context(quote, logo_ref);
        let observations = quote.observations.as_deref().unwrap_or("").trim();
        context.insert("observations", &html_multiline(observations));
        self.templates
            .render("client-confirmation.html", &context)
            .map_err(|e| EmailError::TemplateError(e.to_string()))
    }

    fn from_mailbox(&self) -> Result<Mailbox, EmailError> {
        format!("{} <{}>", self.company.name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))
    }

    fn validate_email_address(&self, email: &str) -> Result<(), EmailError> {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(EmailError::AddressError(format!(
                "Invalid email format: {}",
                email
            )));
        }
        Ok(())
    }

    fn build_html_message(
        &self,
        to: &str,
        subject: &str,
        html: String,
        reply_to: Option<Mailbox>,
        inline_logo: Option<&[u8]>,
        pdf: Option<(&str, &[u8])>,
    ) -> Result<Message, EmailError> {
        self.validate_email_address(to)?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        let mut builder = Message::builder()
            .from(self.from_mailbox()?)
            .to(to_mailbox)
            .subject(subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }

        let mut related = MultiPart::related().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html),
        );
        if let Some(logo) = inline_logo {
            let content_type = ContentType::parse(logo_content_type(logo))
                .map_err(|e| EmailError::MessageError(format!("Invalid content type: {}", e)))?;
            related = related
                .singlepart(Attachment::new_inline(LOGO_CID.to_string()).body(logo.to_vec(), content_type));
        }

        let message = if let Some((filename, bytes)) = pdf {
            let content_type = ContentType::parse("application/pdf")
                .map_err(|e| EmailError::MessageError(format!("Invalid content type: {}", e)))?;
            builder.multipart(
                MultiPart::mixed()
                    .multipart(related)
                    .singlepart(Attachment::new(filename.to_string()).body(bytes.to_vec(), content_type)),
            )
        } else {
            builder.multipart(related)
        };

        message.map_err(|e| EmailError::MessageError(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl QuoteNotifier for QuoteMailer {
    #[instrument(skip(self, quote, pdf), fields(quote_id = %quote.id_hex(), has_pdf = pdf.is_some()))]
    async fn send_quote_emails(
        &self,
        quote: &Quote,
        pdf: Option<&[u8]>,
    ) -> Result<(), EmailError> {
        let recipients = self
            .config
            .quote_recipients(&quote.email, self.is_production);
        info!(
            company_to = %recipients.company_to,
            client_to = %recipients.client_to,
            "Dispatching quote notifications"
        );

        let logo = resolve_logo(&self.company).await;
        let logo_ref = match &logo {
            Some(_) => format!("cid:{}", LOGO_CID),
            None => self
                .company
                .logo_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LOGO_REMOTE_URL.to_string()),
        };

        let company_html = self.render_company_notification(quote, &logo_ref)?;
        let client_html = self.render_client_confirmation(quote, &logo_ref)?;

        let pdf_name = format!("cotizacion-{}.pdf", quote.id_hex());
        let company_message = self.build_html_message(
            &recipients.company_to,
            &format!("Nueva Cotización - {}", quote.client_name()),
            company_html,
            None,
            logo.as_deref(),
            pdf.map(|bytes| (pdf_name.as_str(), bytes)),
        )?;
        let client_message = self.build_html_message(
            &recipients.client_to,
            &format!("Confirmación de Cotización - {}", self.company.name),
            client_html,
            None,
            logo.as_deref(),
            None,
        )?;

        // Both sends are attempted regardless of the other's outcome.
        let company_result = self.transport.send_message(company_message).await;
        match &company_result {
            Ok(_) => info!("Company notification sent"),
            Err(e) => error!("Failed to send company notification: {}", e),
        }
        let client_result = self.transport.send_message(client_message).await;
        match &client_result {
            Ok(_) => info!("Client confirmation sent"),
            Err(e) => error!("Failed to send client confirmation: {}", e),
        }

        company_result.and(client_result)
    }

    #[instrument(skip(self, contact), fields(contact_email = %contact.email))]
    async fn send_contact_emails(&self, contact: &ContactRequest) -> Result<(), EmailError> {
        let recipients = self
            .config
            .contact_recipients(&contact.email, self.is_production);
        info!(
            company_to = %recipients.company_to,
            client_to = %recipients.client_to,
            "Dispatching contact notifications"
        );

        let name = html_escape::encode_text(&contact.name).to_string();
        let email = html_escape::encode_text(&contact.email).to_string();
        let phone = html_escape::encode_text(contact.phone.as_deref().unwrap_or("-")).to_string();
        let message_html = html_multiline(&contact.message);

        let company_html = format!(
            concat!(
                "<h2>Nuevo mensaje de contacto</h2>",
                "<p><strong>Nombre:</strong> {}</p>",
                "<p><strong>Email:</strong> {}</p>",
                "<p><strong>Teléfono:</strong> {}</p>",
                "<p><strong>Mensaje:</strong></p>",
                "<p>{}</p>"
            ),
            name, email, phone, message_html
        );
        let client_html = format!(
            concat!(
                "<p>Hola {},</p>",
                "<p>Gracias por contactarnos. Hemos recibido tu mensaje y te responderemos pronto.</p>",
                "<hr/>",
                "<p><strong>Tu mensaje:</strong></p>",
                "<p>{}</p>",
                "<hr/>",
                "<p>{}</p>",
                "<p>{}</p>"
            ),
            name,
            message_html,
            html_escape::encode_text(&self.company.name),
            html_escape::encode_text(&self.company.email),
        );

        let reply_to: Option<Mailbox> = contact.email.parse().ok();
        let company_message = self.build_html_message(
            &recipients.company_to,
            &format!("Nuevo mensaje de contacto - {}", contact.name),
            company_html,
            reply_to,
            None,
            None,
        )?;
        let client_message = self.build_html_message(
            &recipients.client_to,
            &format!("Confirmación de contacto - {}", self.company.name),
            client_html,
            None,
            None,
            None,
        )?;

        let company_result = self.transport.send_message(company_message).await;
        if let Err(e) = &company_result {
            error!("Failed to send contact notification: {}", e);
        }
        let client_result = self.transport.send_message(client_message).await;
        if let Err(e) = &client_result {
            error!("Failed to send contact acknowledgment: {}", e);
        }

        company_result.and(client_result)
    }
}
