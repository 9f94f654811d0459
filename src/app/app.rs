use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::app_conf::AppConfig;
use crate::config::{CompanyConfig, EmailConfig, MongoConfig};
use crate::repository::product_repo::MongoProductCatalog;
use crate::repository::quote_repo::MongoQuoteRepository;
use crate::router::quote_router::api_router;
use crate::service::quote_service::{QuoteService, QuoteServiceImpl};
use crate::util::email::{QuoteMailer, QuoteNotifier, SmtpMailTransport};
use crate::util::pdf::{QuotePdfRenderer, QuoteRenderer};

pub struct App {
    config: AppConfig,
    router: Router,
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();
        let mongo_config = MongoConfig::from_env().expect("Mongo config error");
        let email_config = EmailConfig::from_env().expect("Email config error");
        let company_config = CompanyConfig::from_env();

        let quote_repo = Arc::new(
            MongoQuoteRepository::new(&mongo_config)
                .await
                .expect("Quote repo error"),
        );
        let catalog = Arc::new(
            MongoProductCatalog::new(&mongo_config)
                .await
                .expect("Product catalog error"),
        );
        let renderer: Arc<dyn QuoteRenderer> =
            Arc::new(QuotePdfRenderer::new(company_config.clone()));
        let transport = Arc::new(SmtpMailTransport::new(&email_config).expect("SMTP transport error"));
        let notifier: Arc<dyn QuoteNotifier> = Arc::new(
            QuoteMailer::new(
                transport,
                email_config,
                company_config,
                config.is_production(),
            )
            .expect("Mailer error"),
        );

        let quote_service: Arc<dyn QuoteService> = Arc::new(QuoteServiceImpl::new(
            quote_repo,
            catalog,
            renderer,
            notifier.clone(),
        ));

        let router = api_router(quote_service, notifier).route("/health", get(|| async { "OK" }));
        App { config, router }
    }

    pub async fn start(self) {
        let addr = SocketAddr::new(
            self.config.host.parse().expect("Invalid host"),
            self.config.port,
        );
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind address");
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Failed to start server");
    }
}
