use crate::config::mongo_conf::MongoConfig;
use crate::model::product::Product;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use tracing::{info, warn};

/// Read-only view of the product catalog used to enrich quote line items.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolve a product identifier to its display name. Not-found and
    /// malformed identifiers are errors; the pipeline decides how to recover.
    async fn display_name(&self, product_id: &str) -> RepositoryResult<String>;
}

pub struct MongoProductCatalog {
    collection: mongodb::Collection<Product>,
}

impl MongoProductCatalog {
    /// Create a new MongoProductCatalog using MongoConfig
    pub async fn new(config: &MongoConfig) -> Result<Self, mongodb::error::Error> {
        use mongodb::{
            options::{ClientOptions, Credential, ResolverConfig},
            Client,
        };

        let mut client_options =
            ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare())
                .await?;
        client_options.app_name = Some("QuimicaBackend".to_string());
        client_options.max_pool_size = Some(config.pool_size);
        client_options.connect_timeout = Some(std::time::Duration::from_secs(
            config.connection_timeout_secs,
        ));

        if let (Some(ref username), Some(ref password)) = (&config.username, &config.password) {
            client_options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(password.clone())
                    .build(),
            );
        }

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database);
        let collection_name = config.product_collection.as_deref().unwrap_or("products");
        let collection = db.collection::<Product>(collection_name);
        Ok(MongoProductCatalog { collection })
    }
}

#[async_trait]
impl ProductCatalog for MongoProductCatalog {
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    async fn display_name(&self, product_id: &str) -> RepositoryResult<String> {
        let oid = ObjectId::parse_str(product_id).map_err(|_| {
            warn!("Malformed product id: {}", product_id);
            RepositoryError::validation(format!("Malformed product id: {}", product_id))
        })?;

        let result = self.collection.find_one(doc! { "_id": oid }, None).await;
        match result {
            Ok(Some(product)) => {
                info!("Product found: {}", product.title);
                Ok(product.title)
            }
            Ok(None) => Err(RepositoryError::not_found(format!(
                "Product not found for ID: {}",
                product_id
            ))),
            Err(e) => Err(RepositoryError::database(format!(
                "Failed to fetch product: {}",
                e
            ))),
        }
    }
}
