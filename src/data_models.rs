use crate::db::Vehicle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSummary {
    pub brands: Vec<BrandCount>,
    pub models_by_brand: BTreeMap<String, Vec<String>>,
    pub latest: Vec<Vehicle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub gas: u64,
    pub electric: u64,
    pub staff: u64,
    pub financing_applications: u64,
}

/// Answer to a successfully handled public form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl Receipt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reference: None,
            redirect: None,
        }
    }

    pub fn with_reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_redirect(mut self, redirect: &str) -> Self {
        self.redirect = Some(redirect.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_omits_empty_fields() {
        let value = serde_json::to_value(Receipt::new("Thanks")).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "Thanks" }));

        let value =
            serde_json::to_value(Receipt::new("Sent").with_redirect("/message-sent")).unwrap();
        assert_eq!(value["redirect"], "/message-sent");
    }
}
