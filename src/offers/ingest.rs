use anyhow::{Context, Result};
use tracing::info;

use super::types::{OfferId, OfferRecord};
use super::OfferStore;

/// Fetch a dealership listing page and store its offer blocks.
/// Returns the ids of the stored records.
///
/// The page is flattened to text and split on blank lines; each block becomes
/// one record with the first line as title and the rest as description. Real
/// listing markup varies, so this stays deliberately dumb — curation happens
/// by re-running ingestion, not by editing records in place.
pub async fn ingest_listing_page(
    store: &OfferStore,
    url: &str,
    category: &str,
) -> Result<Vec<OfferId>> {
    let resp = reqwest::get(url).await.context("Failed to fetch URL")?;

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = resp.bytes().await.context("Failed to read response body")?;

    let text = if content_type.contains("html") {
        html2text::from_read(&body[..], 120)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).to_string())
    } else {
        String::from_utf8_lossy(&body).to_string()
    };

    let mut ids = Vec::new();
    for record in parse_blocks(&text, category, url) {
        ids.push(store.put(&record).await?);
    }

    info!(url, category, count = ids.len(), "listing page ingested");
    Ok(ids)
}

/// Split flattened page text into offer records.
fn parse_blocks(text: &str, category: &str, url: &str) -> Vec<OfferRecord> {
    text.split("\n\n")
        .filter_map(|block| {
            let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
            let title = lines.next()?;
            let description = lines.collect::<Vec<_>>().join(" ");
            if description.is_empty() {
                return None;
            }
            Some(OfferRecord::new(category, title, &description, url))
        })
        .collect()
}

/// Install a small fixed specials table for demo runs against an empty store.
pub async fn seed_demo_offers(store: &OfferStore) -> Result<usize> {
    let demo = [
        OfferRecord::new(
            "service",
            "Oil Change Special",
            "Full synthetic oil change, save 20% through the end of the month.",
            "https://www.stevenscreekchevy.com/service/oil-change",
        ),
        OfferRecord::new(
            "service",
            "Tire Rotation",
            "Free tire rotation with any scheduled service visit.",
            "https://www.stevenscreekchevy.com/service/tires",
        ),
        OfferRecord::new(
            "vehicle",
            "Silverado Truck Month",
            "0% APR for 60 months on select new Silverado 1500 models.",
            "https://www.stevenscreekchevy.com/new/silverado",
        ),
        OfferRecord::new(
            "vehicle",
            "Equinox EV Lease",
            "Lease a new Equinox EV from $299 per month, 24 months.",
            "https://www.stevenscreekchevy.com/new/equinox-ev",
        ),
        OfferRecord::new(
            "finance",
            "Trade-In Bonus",
            "Extra $1,000 trade-in allowance on any used vehicle purchase.",
            "https://www.stevenscreekchevy.com/finance/trade-in",
        ),
    ];

    for record in &demo {
        store.put(record).await?;
    }
    info!(count = demo.len(), "demo offers seeded");
    Ok(demo.len())
}
