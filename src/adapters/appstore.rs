//! App Store adapter: a small, time-bounded fetch from the iTunes
//! customer-reviews RSS feed. Anything that goes wrong surfaces as a
//! [`SourceError`] and the pipeline falls back to synthetic content.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::SourceAdapter;
use crate::config::Config;
use crate::error::{SourceError, SourceResult};
use crate::models::{NewReview, Source, User};

const DEFAULT_APP_ID: &str = "368677368"; // Uber
const MAX_REVIEWS: usize = 10;

pub struct AppStoreAdapter {
    client: reqwest::Client,
    base: String,
    country: String,
}

impl AppStoreAdapter {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            base: config.adapters.appstore_base.clone(),
            country: config.adapters.country.clone(),
        }
    }

    fn feed_url(&self, app_id: &str) -> String {
        format!(
            "{}/{}/rss/customerreviews/page=1/id={}/sortby=mostrecent/json",
            self.base, self.country, app_id
        )
    }
}

#[async_trait]
impl SourceAdapter for AppStoreAdapter {
    fn source(&self) -> Source {
        Source::AppStore
    }

    async fn fetch(&self, user: &User) -> SourceResult<Vec<NewReview>> {
        let app_id = user.appstore_app_id.as_deref().unwrap_or(DEFAULT_APP_ID);

        let response = self
            .client
            .get(self.feed_url(app_id))
            .send()
            .await?
            .error_for_status()?;
        let json: Value = response.json().await?;

        let entries = json
            .get("feed")
            .and_then(|f| f.get("entry"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| SourceError::Payload {
                source: "appstore",
                message: "feed has no entry array".to_string(),
            })?;

        let url = format!("https://apps.apple.com/{}/app/id{}", self.country, app_id);
        let reviews = entries
            .iter()
            .filter_map(|entry| entry_to_review(entry, &url, &self.country))
            .take(MAX_REVIEWS)
            .collect();

        Ok(reviews)
    }
}

/// Map one feed entry to a review. The first entry of the feed is often the
/// app itself (no `im:rating`); such entries are skipped.
fn entry_to_review(entry: &Value, url: &str, country: &str) -> Option<NewReview> {
    let rating: i64 = label(entry, "im:rating")?.parse().ok()?;

    let review_id = label(entry, "id").unwrap_or_default();
    if review_id.is_empty() {
        return None;
    }

    let date = label(entry, "updated")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(NewReview {
        review_id,
        source: Source::AppStore,
        date,
        rating: rating.clamp(1, 5),
        body: label(entry, "content").unwrap_or_default(),
        title: label(entry, "title"),
        username: entry
            .get("author")
            .and_then(|a| a.get("name"))
            .and_then(|n| n.get("label"))
            .and_then(|l| l.as_str())
            .unwrap_or_default()
            .to_string(),
        url: url.to_string(),
        language: country.to_string(),
        sentiment: None,
        category: None,
    })
}

fn label(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)?
        .get("label")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_entry(id: &str, rating: &str) -> Value {
        serde_json::json!({
            "id": {"label": id},
            "im:rating": {"label": rating},
            "title": {"label": "Love it"},
            "content": {"label": "Fast pickup and clean vehicle."},
            "author": {"name": {"label": "Emma W."}},
            "updated": {"label": "2025-06-01T10:00:00-07:00"},
        })
    }

    #[test]
    fn entry_maps_to_review() {
        let review = entry_to_review(&feed_entry("12345", "5"), "https://apps.apple.com/us/app/id1", "us")
            .unwrap();
        assert_eq!(review.review_id, "12345");
        assert_eq!(review.rating, 5);
        assert_eq!(review.username, "Emma W.");
        assert_eq!(review.sentiment, None);
    }

    #[test]
    fn app_metadata_entry_without_rating_is_skipped() {
        let entry = serde_json::json!({
            "id": {"label": "368677368"},
            "title": {"label": "Uber"},
        });
        assert!(entry_to_review(&entry, "u", "us").is_none());
    }

    #[test]
    fn out_of_domain_rating_is_clamped() {
        let review = entry_to_review(&feed_entry("1", "9"), "u", "us").unwrap();
        assert_eq!(review.rating, 5);
    }
}
