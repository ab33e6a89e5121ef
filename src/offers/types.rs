use serde::{Deserialize, Serialize};

/// Content-addressed offer ID (blake3 hex hash of the serialized record).
pub type OfferId = String;

/// A dealership offer row, populated out-of-band by the ingestion binary.
/// Immutable once stored; the scorer only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    /// e.g. "vehicle", "service", "finance"
    pub category: String,
    pub title: String,
    pub description: String,
    pub url: String,
}

impl OfferRecord {
    pub fn new(category: &str, title: &str, description: &str, url: &str) -> Self {
        Self {
            category: category.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            url: url.to_string(),
        }
    }
}
