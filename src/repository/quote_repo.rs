use crate::config::mongo_conf::MongoConfig;
use crate::model::quote::{Quote, QuoteStatus};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::stream::StreamExt;
use mongodb::options::FindOptions;
use tracing::{error, info};

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote>;
    /// Newest first, server-side skip/limit. Returns the page plus the total
    /// matching count.
    async fn list(
        &self,
        status: Option<QuoteStatus>,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<(Vec<Quote>, u64)>;
    async fn update_status(&self, id: ObjectId, status: QuoteStatus) -> RepositoryResult<Quote>;
}

pub struct MongoQuoteRepository {
    collection: mongodb::Collection<Quote>,
}

impl MongoQuoteRepository {
    /// Create a new MongoQuoteRepository using MongoConfig
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
        let collection_name = config.quote_collection.as_deref().unwrap_or("quotes");
        let collection = db.collection::<Quote>(collection_name);
        Ok(MongoQuoteRepository { collection })
    }

    fn status_filter(status: Option<QuoteStatus>) -> Document {
        match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        }
    }
}

#[async_trait]
impl QuoteRepository for MongoQuoteRepository {
    #[tracing::instrument(skip(self, quote), fields(email = %quote.email))]
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote> {
        info!("Creating new quote");
        let mut new_quote = quote;
        new_quote.id = Some(ObjectId::new());
        let time = chrono::Utc::now().to_rfc3339();
        new_quote.createdAt = Some(time.clone());
        new_quote.updatedAt = Some(time);

        let result = self.collection.insert_one(new_quote.clone(), None).await;
        match result {
            Ok(_) => {
                info!(quote_id = ?new_quote.id, "Quote created successfully");
                Ok(new_quote)
            }
            Err(e) => {
                error!("Failed to create quote: {}", e);
                Err(RepositoryError::database(format!(
                    "Failed to create quote: {}",
                    e
                )))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote> {
        info!("Fetching quote by ID: {}", id);
        let filter = doc! { "_id": id };
        let result = self.collection.find_one(filter, None).await;
        match result {
            Ok(Some(quote)) => {
                info!("Quote found");
                Ok(quote)
            }
            Ok(None) => {
                error!("Quote not found for ID: {}", id);
                Err(RepositoryError::not_found(format!(
                    "Quote not found for ID: {}",
                    id
                )))
            }
            Err(e) => {
                error!("Failed to fetch quote by ID: {}", e);
                Err(RepositoryError::database(format!(
                    "Failed to fetch quote by ID: {}",
                    e
                )))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(status = ?status, page = page, limit = limit))]
    async fn list(
        &self,
        status: Option<QuoteStatus>,
        page: u32,
        limit: u32,
    ) -> RepositoryResult<(Vec<Quote>, u64)> {
        info!("Listing quotes");
        let filter = Self::status_filter(status);
        let skip = (page.saturating_sub(1) as u64) * limit as u64;

        let total = self
            .collection
            .count_documents(filter.clone(), None)
            .await
            .map_err(|e| {
                error!("Failed to count quotes: {}", e);
                RepositoryError::database(format!("Failed to count quotes: {}", e))
            })?;

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(limit as i64)
            .build();

        let mut cursor = self.collection.find(filter, options).await.map_err(|e| {
            error!("Failed to list quotes: {}", e);
            RepositoryError::database(format!("Failed to list quotes: {}", e))
        })?;

        let mut quotes = Vec::new();
        while let Some(quote) = cursor.next().await {
            match quote {
                Ok(q) => quotes.push(q),
                Err(e) => {
                    error!("Failed to deserialize quote: {}", e);
                    return Err(RepositoryError::serialization(format!(
                        "Failed to deserialize quote: {}",
                        e
                    )));
                }
            }
        }
        info!("Fetched {} quotes of {}", quotes.len(), total);
        Ok((quotes, total))
    }

    #[tracing::instrument(skip(self), fields(id = %id, status = %status))]
    async fn update_status(&self, id: ObjectId, status: QuoteStatus) -> RepositoryResult<Quote> {
        info!(quote_id = %id, status = %status, "Updating quote status");
        let filter = doc! { "_id": id };
        let update = doc! { "$set": {
            "status": status.as_str(),
            "updatedAt": chrono::Utc::now().to_rfc3339(),
        } };
        let result = self.collection.update_one(filter, update, None).await;
        match result {
            // matched rather than modified: re-asserting the current status
            // is not an error.
            Ok(update_result) if update_result.matched_count > 0 => {
                info!("Quote status updated successfully for ID: {}", id);
                self.get_by_id(id).await
            }
            Ok(_) => {
                error!("No quote found to update status for ID: {}", id);
                Err(RepositoryError::not_found(format!(
                    "No quote found to update status for ID: {}",
                    id
                )))
            }
            Err(e) => {
                error!("Failed to update quote status: {}", e);
                Err(RepositoryError::database(format!(
                    "Failed to update quote status: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        assert_eq!(MongoQuoteRepository::status_filter(None), doc! {});
        assert_eq!(
            MongoQuoteRepository::status_filter(Some(QuoteStatus::Pending)),
            doc! { "status": "pending" }
        );
    }
}
