use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Fallback company inbox used when no override is configured.
pub const DEFAULT_COMPANY_TO: &str = "contacto@quimicaindustrial.pe";

/// Resolved destination addresses for one notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    pub company_to: String,
    pub client_to: String,
}

/// Email configuration for SMTP settings and recipient resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// Whether the connection is TLS-wrapped from the start
    pub smtp_secure: bool,
    /// SMTP username for authentication (may be empty for open relays)
    pub smtp_username: String,
    /// SMTP password for authentication
    pub smtp_password: String,
    /// From email address
    pub from_email: String,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
    /// Redirect every outbound mail to this address (non-production safety valve)
    pub redirect_all_to: Option<String>,
    /// Explicit opt-in required for the redirect to apply in production
    pub allow_redirect_in_prod: bool,
    /// Company inbox override for quote notifications
    pub quote_company_to: Option<String>,
    /// Client address override for quote confirmations
    pub quote_client_to: Option<String>,
    /// Company inbox override for contact messages
    pub contact_company_to: Option<String>,
    /// Client address override for contact acknowledgments
    pub contact_client_to: Option<String>,
}

impl EmailConfig {
    /// Load email configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SMTP_HOST: SMTP server hostname (required)
    /// - SMTP_PORT: SMTP server port (defaults to 587)
    /// - SMTP_SECURE: TLS-wrapped connection (defaults to false)
    /// - SMTP_USER / SMTP_PASS: credentials (optional)
    /// - SMTP_FROM: sender address (defaults to the company inbox)
    /// - SMTP_CONNECTION_TIMEOUT: timeout in seconds (defaults to 30)
    /// - EMAIL_REDIRECT_ALL_TO / ALLOW_EMAIL_REDIRECT_IN_PROD: redirect valve
    /// - QUOTE_COMPANY_TO / QUOTE_CLIENT_TO: quote recipient overrides
    /// - CONTACT_COMPANY_TO / CONTACT_CLIENT_TO: contact recipient overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading email configuration from environment variables");

        let smtp_host = env::var("SMTP_HOST").map_err(|_| {
            error!("SMTP_HOST environment variable not found");
            ConfigError::EnvVarNotFound("SMTP_HOST".to_string())
        })?;
        debug!("SMTP host: {}", smtp_host);

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| {
                warn!("SMTP_PORT not set, defaulting to 587");
                "587".to_string()
            })
            .parse::<u16>()
            .map_err(|_| {
                error!("Invalid SMTP_PORT value");
                ConfigError::InvalidValue("Invalid SMTP_PORT value".to_string())
            })?;
        debug!("SMTP port: {}", smtp_port);

        let smtp_secure = env::var("SMTP_SECURE")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        debug!("SMTP secure: {}", smtp_secure);

        let smtp_username = env::var("SMTP_USER").unwrap_or_else(|_| {
            warn!("SMTP_USER not set, sending without authentication");
            String::new()
        });
        let smtp_password = env::var("SMTP_PASS").unwrap_or_default();

        let from_email =
            env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_COMPANY_TO.to_string());
        debug!("From email: {}", from_email);

        let connection_timeout_secs = env::var("SMTP_CONNECTION_TIMEOUT")
            .unwrap_or_else(|_| {
                warn!("SMTP_CONNECTION_TIMEOUT not set, defaulting to 30 seconds");
                "30".to_string()
            })
            .parse::<u64>()
            .unwrap_or(30);

        let redirect_all_to = env::var("EMAIL_REDIRECT_ALL_TO")
            .ok()
            .filter(|v| !v.is_empty());
        let allow_redirect_in_prod = env::var("ALLOW_EMAIL_REDIRECT_IN_PROD")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if redirect_all_to.is_some() {
            warn!("EMAIL_REDIRECT_ALL_TO is set, outbound mail may be redirected");
        }

        let config = EmailConfig {
            smtp_host,
            smtp_port,
            smtp_secure,
            smtp_username,
            smtp_password,
            from_email,
            connection_timeout_secs,
            redirect_all_to,
            allow_redirect_in_prod,
            quote_company_to: env::var("QUOTE_COMPANY_TO").ok(),
            quote_client_to: env::var("QUOTE_CLIENT_TO").ok(),
            contact_company_to: env::var("CONTACT_COMPANY_TO").ok(),
            contact_client_to: env::var("CONTACT_CLIENT_TO").ok(),
        };

        config.validate()?;
        info!("Email configuration loaded successfully");
        Ok(config)
    }

    /// Create EmailConfig for testing
    pub fn from_test_env() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_secure: false,
            smtp_username: "test".to_string(),
            smtp_password: "test".to_string(),
            from_email: "test@example.com".to_string(),
            connection_timeout_secs: 10,
            redirect_all_to: None,
            allow_redirect_in_prod: false,
            quote_company_to: None,
            quote_client_to: None,
            contact_company_to: None,
            contact_client_to: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp_host.is_empty() {
            error!("SMTP host is empty");
            return Err(ConfigError::ValidationError(
                "SMTP host cannot be empty".to_string(),
            ));
        }

        if self.smtp_port == 0 {
            error!("SMTP port is 0");
            return Err(ConfigError::ValidationError(
                "SMTP port cannot be 0".to_string(),
            ));
        }

        if !self.from_email.contains('@') {
            error!("Invalid from email format");
            return Err(ConfigError::ValidationError(
                "Invalid from email format".to_string(),
            ));
        }

        if self.connection_timeout_secs == 0 {
            error!("Connection timeout is 0");
            return Err(ConfigError::ValidationError(
                "Connection timeout cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get SMTP server URL
    pub fn get_smtp_url(&self) -> String {
        format!("{}:{}", self.smtp_host, self.smtp_port)
    }

    /// The redirect address, when the redirect applies. Outside production
    /// the address is honored unconditionally; in production it additionally
    /// requires the explicit opt-in flag.
    pub fn redirect_target(&self, is_production: bool) -> Option<&str> {
        let target = self.redirect_all_to.as_deref()?;
        if !is_production {
            return Some(target);
        }
        if self.allow_redirect_in_prod {
            Some(target)
        } else {
            None
        }
    }

    /// Destination addresses for a quote fan-out. Evaluated per send.
    pub fn quote_recipients(&self, quote_email: &str, is_production: bool) -> Recipients {
        if let Some(target) = self.redirect_target(is_production) {
            return Recipients {
                company_to: target.to_string(),
                client_to: target.to_string(),
            };
        }
        Recipients {
            company_to: self
                .quote_company_to
                .clone()
                .unwrap_or_else(|| DEFAULT_COMPANY_TO.to_string()),
            client_to: self
                .quote_client_to
                .clone()
                .unwrap_or_else(|| quote_email.to_string()),
        }
    }

    /// Destination addresses for a contact-message fan-out.
    pub fn contact_recipients(&self, contact_email: &str, is_production: bool) -> Recipients {
        if let Some(target) = self.redirect_target(is_production) {
            return Recipients {
                company_to: target.to_string(),
                client_to: target.to_string(),
            };
        }
        Recipients {
            company_to: self
                .contact_company_to
                .clone()
                .unwrap_or_else(|| DEFAULT_COMPANY_TO.to_string()),
            client_to: self
                .contact_client_to
                .clone()
                .unwrap_or_else(|| contact_email.to_string()),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_secure: false,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: DEFAULT_COMPANY_TO.to_string(),
            connection_timeout_secs: 30,
            redirect_all_to: None,
            allow_redirect_in_prod: false,
            quote_company_to: None,
            quote_client_to: None,
            contact_company_to: None,
            contact_client_to: None,
        }
    }
}
