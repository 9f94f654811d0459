use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::model::quote::{ClientType, ContactPreferences, PurchaseFrequency, QuoteStatus};

/// One requested line item as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItemRequest {
    #[validate(length(min = 1, message = "productId es requerido"))]
    pub product_id: String,

    pub presentation_id: Option<String>,

    pub presentation_label: Option<String>,

    #[validate(range(min = 1, message = "La cantidad debe ser mayor a 0"))]
    pub quantity: u32,

    #[validate(custom = "validate_frequency")]
    pub frequency: String,
}

/// Quote submission payload. `observations` also accepts the legacy
/// `comments` key; the alias is resolved here and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[validate(custom = "validate_client_type")]
    pub client_type: String,

    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    pub last_name: String,

    #[validate(length(min = 1, max = 20))]
    pub dni: String,

    #[validate(length(min = 6, max = 20))]
    pub phone: String,

    #[validate(email)]
    pub email: String,

    pub company_name: Option<String>,

    pub ruc: Option<String>,

    #[validate(length(min = 1, message = "Debe solicitar al menos un producto"))]
    pub products: Vec<QuoteItemRequest>,

    #[serde(default)]
    pub contact_preferences: ContactPreferences,

    #[serde(default, alias = "comments")]
    pub observations: Option<String>,
}

impl CreateQuoteRequest {
    /// Field rules plus per-item rules; the derive does not descend into the
    /// items of a Vec.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        for item in &self.products {
            item.validate()?;
        }
        Ok(())
    }
}

fn validate_client_type(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<ClientType>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_client_type"))
}

fn validate_frequency(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<PurchaseFrequency>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_frequency"))
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<QuoteStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_status"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuoteStatusRequest {
    #[validate(custom = "validate_status")]
    pub status: String,
}

/// Query parameters of the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuotesQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Request context captured for provenance fields.
#[derive(Debug, Clone)]
pub struct RequestProvenance {
    pub source: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestProvenance {
    pub fn website(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        RequestProvenance {
            source: "website".to_string(),
            ip_address,
            user_agent,
        }
    }
}

/// Echoed back to the submitter; the rest of the pipeline outcome is not
/// client-visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSubmissionResponse {
    pub id: String,
    pub status: QuoteStatus,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Pagination {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Uniform response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: None,
            error: Some(message.into()),
            pagination: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
            pagination: None,
        }
    }
}
