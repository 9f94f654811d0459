use crate::config::CompanyConfig;
use tracing::{debug, warn};

/// Bundled fallback asset, last in the resolution chain.
pub const BUNDLED_LOGO_PATH: &str = "assets/logo.png";

/// Resolve the company logo bytes: configured local path, then remote URL,
/// then the bundled asset. First success wins; None when nothing resolves.
pub async fn resolve_logo(config: &CompanyConfig) -> Option<Vec<u8>> {
    if let Some(path) = &config.logo_path {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                debug!(path = %path, "Logo resolved from local file");
                return Some(bytes);
            }
            Err(e) => warn!(path = %path, "Failed to read logo file: {}", e),
        }
    }

    if let Some(url) = &config.logo_url {
        match fetch_remote_logo(url).await {
            Ok(bytes) => {
                debug!(url = %url, "Logo resolved from remote URL");
                return Some(bytes);
            }
            Err(e) => warn!(url = %url, "Failed to fetch remote logo: {}", e),
        }
    }

    match tokio::fs::read(BUNDLED_LOGO_PATH).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Bundled logo asset not available: {}", e);
            None
        }
    }
}

async fn fetch_remote_logo(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_local_path_falls_through() {
        let config = CompanyConfig {
            logo_path: Some("/nonexistent/logo.png".to_string()),
            ..CompanyConfig::from_test_env()
        };
        // No URL configured, so resolution lands on the bundled asset (when
        // present) or None; either way it must not error out.
        let _ = resolve_logo(&config).await;
    }
}
