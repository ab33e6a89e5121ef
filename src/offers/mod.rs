pub mod ingest;
pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use cnidarium::{StateDelta, StateWrite, Storage};
use futures::StreamExt;
use regex::Regex;
use tracing::{debug, warn};

use types::{OfferId, OfferRecord};

// Key prefixes (no trailing slashes — cnidarium convention)
const RECORD_PREFIX: &str = "offer/record";
const CATEGORY_PREFIX: &str = "offer/category";

/// Returned when no record overlaps the query at all.
pub const NO_MATCH_MESSAGE: &str = "No current specials matched your query.";

const DEFAULT_LIMIT: usize = 3;

fn record_key(id: &str) -> String {
    format!("{}/{}", RECORD_PREFIX, id)
}
fn category_key(category: &str, id: &str) -> String {
    format!("{}/{}:{}", CATEGORY_PREFIX, category, id)
}

/// Read side of the dealership specials table. The chat process only ever
/// enumerates and scores records; writes happen in the ingestion binary.
pub struct OfferStore {
    storage: Storage,
}

impl OfferStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![RECORD_PREFIX.to_string(), CATEGORY_PREFIX.to_string()];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }

    /// Store an offer record. Returns its content-addressed OfferId.
    /// Idempotent: same content = same ID.
    pub async fn put(&self, record: &OfferRecord) -> Result<OfferId> {
        let bytes = serde_json::to_vec(record).context("serialize offer record")?;
        let id = blake3::hash(&bytes).to_hex().to_string();

        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);

        delta.put_raw(record_key(&id), bytes);
        // Category index entry (empty value — presence is the index)
        delta.put_raw(category_key(&record.category, &id), vec![]);

        self.storage.commit(delta).await?;
        debug!(offer_id = %id, title = %record.title, category = %record.category, "offer stored");
        Ok(id)
    }

    /// Enumerate every stored record. Storage failure is a hard error.
    pub async fn all(&self) -> Result<Vec<OfferRecord>> {
        let snapshot = self.storage.latest_snapshot();
        use cnidarium::StateRead;
        let mut stream = snapshot.prefix_raw(RECORD_PREFIX);
        let mut records = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((_key, value)) => {
                    if let Ok(record) = serde_json::from_slice::<OfferRecord>(&value) {
                        records.push(record);
                    }
                }
                // Storage failure is a hard error for the interaction, no retry.
                Err(e) => return Err(e).context("offer store scan failed"),
            }
        }

        Ok(records)
    }

    /// List records under a single category.
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<OfferRecord>> {
        let snapshot = self.storage.latest_snapshot();
        use cnidarium::StateRead;
        let prefix = format!("{}/{}:", CATEGORY_PREFIX, category);
        let mut stream = snapshot.prefix_raw(&prefix);
        let mut records = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((key, _)) => {
                    // Key format: "offer/category/{category}:{offer_id}"
                    let key_str = String::from_utf8_lossy(key.as_bytes());
                    if let Some(id) = key_str.strip_prefix(&prefix) {
                        match self.get(id).await {
                            Ok(Some(record)) => records.push(record),
                            Ok(None) => warn!(offer_id = id, "dangling category index entry"),
                            Err(e) => warn!("Failed to load offer {}: {}", id, e),
                        }
                    }
                }
                Err(e) => {
                    warn!("Error reading category index: {}", e);
                }
            }
        }

        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<Option<OfferRecord>> {
        let snapshot = self.storage.latest_snapshot();
        use cnidarium::StateRead;
        let Some(bytes) = snapshot.get_raw(&record_key(id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Unique categories currently in the store.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let snapshot = self.storage.latest_snapshot();
        use cnidarium::StateRead;
        let mut stream = snapshot.prefix_raw(CATEGORY_PREFIX);
        let mut categories = std::collections::BTreeSet::new();

        while let Some(entry) = stream.next().await {
            if let Ok((key, _)) = entry {
                let key_str = String::from_utf8_lossy(key.as_bytes());
                // Key format: "offer/category/{category}:{offer_id}"
                if let Some(rest) = key_str.strip_prefix(&format!("{}/", CATEGORY_PREFIX)) {
                    if let Some(category) = rest.split(':').next() {
                        categories.insert(category.to_string());
                    }
                }
            }
        }

        Ok(categories.into_iter().collect())
    }

    /// Keyword search over the whole specials table, rendered for prompt
    /// injection. Errors only on storage failure; an empty table or a query
    /// with no overlap yields the no-match sentinel.
    pub async fn search(&self, query: &str, limit: usize) -> Result<String> {
        let records = self.all().await?;
        Ok(rank(query, &records, limit))
    }

    pub async fn search_default(&self, query: &str) -> Result<String> {
        self.search(query, DEFAULT_LIMIT).await
    }
}

/// Rank records by keyword overlap with the query and render the top `limit`.
///
/// Query terms are `\w+` runs, lowercased, deduplicated. A record scores one
/// point per distinct term appearing as a substring of its lowercased
/// `title + " " + description`. Zero-score records are dropped; the sort is
/// stable, so equal scores keep their original row order.
pub fn rank(query: &str, records: &[OfferRecord], limit: usize) -> String {
    let word = Regex::new(r"\w+").expect("static regex");
    let terms: std::collections::HashSet<String> = word
        .find_iter(&query.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect();

    let mut scored: Vec<(usize, &OfferRecord)> = records
        .iter()
        .filter_map(|record| {
            let text = format!("{} {}", record.title, record.description).to_lowercase();
            let overlap = terms.iter().filter(|t| text.contains(t.as_str())).count();
            (overlap > 0).then_some((overlap, record))
        })
        .collect();

    // sort_by is stable: ties keep row order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let rendered: Vec<String> = scored
        .iter()
        .take(limit)
        .map(|(_, r)| format!("{}\n{}\nMore info: {}", r.title, r.description, r.url))
        .collect();

    if rendered.is_empty() {
        NO_MATCH_MESSAGE.to_string()
    } else {
        rendered.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, description: &str, url: &str) -> OfferRecord {
        OfferRecord::new("vehicle", title, description, url)
    }

    #[test]
    fn test_rank_single_match() {
        let records = vec![record("oil change", "save 20%", "url1")];
        let out = rank("oil change special", &records, 3);
        assert_eq!(out, "oil change\nsave 20%\nMore info: url1");
    }

    #[test]
    fn test_rank_no_overlap_returns_sentinel() {
        let records = vec![
            record("oil change", "save 20%", "url1"),
            record("tire rotation", "free with service", "url2"),
        ];
        assert_eq!(rank("quantum physics", &records, 3), NO_MATCH_MESSAGE);
    }

    #[test]
    fn test_rank_empty_table_returns_sentinel() {
        assert_eq!(rank("anything", &[], 3), NO_MATCH_MESSAGE);
    }

    #[test]
    fn test_rank_orders_by_overlap_desc() {
        let records = vec![
            record("tire rotation", "free rotation with any service", "url1"),
            record("oil change special", "oil change, save 20% this month", "url2"),
        ];
        let out = rank("oil change special", &records, 3);
        // Three overlapping terms beat zero; only the oil record survives.
        assert_eq!(out, "oil change special\noil change, save 20% this month\nMore info: url2");
    }

    #[test]
    fn test_rank_ties_keep_row_order() {
        let records = vec![
            record("lease deal A", "great lease", "a"),
            record("lease deal B", "great lease", "b"),
            record("lease deal C", "great lease", "c"),
        ];
        let out = rank("lease", &records, 3);
        let titles: Vec<&str> = out
            .split("\n\n")
            .map(|block| block.lines().next().unwrap())
            .collect();
        assert_eq!(titles, vec!["lease deal A", "lease deal B", "lease deal C"]);
    }

    #[test]
    fn test_rank_respects_limit() {
        let records = vec![
            record("truck month", "truck deals", "a"),
            record("truck clearance", "truck deals", "b"),
            record("truck trade-in", "truck deals", "c"),
        ];
        let out = rank("truck", &records, 2);
        assert_eq!(out.split("\n\n").count(), 2);
    }

    #[test]
    fn test_rank_terms_deduplicate() {
        // "truck truck truck" is one distinct term; a single-term overlap
        // must not outrank a two-term overlap.
        let records = vec![
            record("truck month", "big discounts", "a"),
            record("truck savings", "big savings event", "b"),
        ];
        let out = rank("truck truck savings", &records, 3);
        let first = out.split("\n\n").next().unwrap();
        assert!(first.starts_with("truck savings"));
    }

    #[test]
    fn test_rank_is_case_insensitive() {
        let records = vec![record("Oil Change", "Save 20%", "url1")];
        let out = rank("OIL CHANGE", &records, 3);
        assert!(out.contains("Oil Change"));
    }

    #[test]
    fn test_rank_substring_containment() {
        // "change" matches inside "changes" — containment, not token equality.
        let records = vec![record("service menu", "oil changes and more", "url1")];
        assert!(rank("change", &records, 3).contains("service menu"));
    }
}
