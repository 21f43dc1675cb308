use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored financing application. The full form lives in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingApplication {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub applicant_email: String,
    pub applicant_name: String,
    pub vehicle: String,
    pub details: serde_json::Value,
}

impl FinancingApplication {
    /// Last eight hex digits of the id, upper-cased.
    pub fn reference(&self) -> String {
        let simple = self.id.simple().to_string();
        simple[simple.len() - 8..].to_uppercase()
    }
}
