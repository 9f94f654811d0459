use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

/// Company identity used in the rendered PDF and the notification emails,
/// plus the inputs of the logo resolution chain. Every field has a hardcoded
/// default and is independently overridable through the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    /// Local logo file, tried first.
    pub logo_path: Option<String>,
    /// Remote logo, tried when the local file does not resolve. Also used as
    /// the image reference in emails when no logo buffer could be inlined.
    pub logo_url: Option<String>,
}

impl CompanyConfig {
    /// Load company identity from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - COMPANY_NAME, COMPANY_ADDRESS, COMPANY_PHONE, COMPANY_EMAIL
    /// - COMPANY_LOGO_PATH: local logo file path
    /// - COMPANY_LOGO_URL: remote logo URL
    pub fn from_env() -> Self {
        info!("Loading company configuration from environment variables");

        let config = CompanyConfig {
            name: env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "Química Industrial Perú".to_string()),
            address: env::var("COMPANY_ADDRESS")
                .unwrap_or_else(|_| "Av. Industrial 123, Lima, Perú".to_string()),
            phone: env::var("COMPANY_PHONE").unwrap_or_else(|_| "+51 1 123 4567".to_string()),
            email: env::var("COMPANY_EMAIL")
                .unwrap_or_else(|_| "contacto@quimicaindustrial.pe".to_string()),
            logo_path: env::var("COMPANY_LOGO_PATH").ok(),
            logo_url: env::var("COMPANY_LOGO_URL").ok(),
        };

        debug!("Company name: {}", config.name);
        config
    }

    /// Create CompanyConfig for testing
    pub fn from_test_env() -> Self {
        CompanyConfig {
            name: "Test Chem Co".to_string(),
            address: "Calle Falsa 123, Lima".to_string(),
            phone: "+51 1 000 0000".to_string(),
            email: "test@chem.example".to_string(),
            logo_path: None,
            logo_url: None,
        }
    }
}

impl Default for CompanyConfig {
    fn default() -> Self {
        CompanyConfig {
            name: "Química Industrial Perú".to_string(),
            address: "Av. Industrial 123, Lima, Perú".to_string(),
            phone: "+51 1 123 4567".to_string(),
            email: "contacto@quimicaindustrial.pe".to_string(),
            logo_path: None,
            logo_url: None,
        }
    }
}
