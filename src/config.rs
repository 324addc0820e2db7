//! Client configuration: subscription names, remote function names, and
//! transaction limits.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the query subscription covering the book catalog.
    pub catalog_subscription: String,
    /// Name of the query subscription covering the signed-in user record.
    pub user_subscription: String,
    /// Remote function that writes `{color, fullImage}` into custom data.
    pub update_custom_data_function: String,
    /// Accent color used until custom data says otherwise.
    pub default_color: String,
    /// How many times a favorites transaction re-reads after a conflicting commit.
    pub max_transaction_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_subscription: "all-books".into(),
            user_subscription: "user-realm".into(),
            update_custom_data_function: "updateCustomData".into(),
            default_color: "#1AA7ECFF".into(),
            max_transaction_attempts: 3,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ServiceError> {
        Ok(serde_json::from_str(json)?)
    }
}
