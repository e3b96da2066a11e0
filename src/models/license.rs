use serde::{Deserialize, Serialize};

/// Fixed key of the persisted license row in the `settings` table.
pub const LICENSE_SETTING_KEY: &str = "license";

/// Claims carried in the signed payload segment of a license token.
///
/// `expiry` stays a `YYYY-MM-DD` string end to end: lexicographic
/// comparison on that format is equivalent to date comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseClaims {
    pub expiry: String,
    pub customer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

/// Outcome of verifying a license token.
///
/// Expired tokens still disclose their claims so the UI can show who the
/// license belonged to and prompt for renewal instead of alleging tampering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub expiry: Option<String>,
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// A rejection carrying no claims (format or signature failure).
    pub fn rejected(error: &str) -> Self {
        Self {
            valid: false,
            expiry: None,
            customer: None,
            error: Some(error.to_string()),
        }
    }
}

/// JSON value stored under [`LICENSE_SETTING_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLicense {
    pub token: String,
}
