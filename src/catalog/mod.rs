pub mod detail;
pub mod facets;
pub mod filter;
pub mod home;
pub mod listing;
pub mod pagination;
pub mod sort;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw query string of a catalog request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// First present key among aliases.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Who is looking at the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Public,
    Admin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_absent() {
        let params = QueryParams::from_pairs(&[("brand", "  "), ("make", " Ford ")]);
        assert_eq!(params.get("brand"), None);
        assert_eq!(params.first_of(&["brand", "make"]), Some("Ford"));
        assert_eq!(params.get("model"), None);
    }
}
