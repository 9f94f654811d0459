use serde::{Deserialize, Serialize};
use validator::Validate;

/// Contact form submission. Not persisted; only fanned out as two emails.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}
