//! Trustpilot adapter.
//!
//! This adapter deliberately bypasses live fetching: the pipeline always
//! receives synthetic content templated from the user's company profile.
//! The page parser for Trustpilot's embedded `__NEXT_DATA__` JSON is kept
//! below for the scraping path, which is not wired into the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use super::SourceAdapter;
use crate::config::Config;
use crate::error::{SourceError, SourceResult};
use crate::generator;
use crate::models::{NewReview, Source, User};

pub struct TrustpilotAdapter {
    count: usize,
}

impl TrustpilotAdapter {
    pub fn new(config: &Config) -> Self {
        Self {
            count: config.fallback.trustpilot,
        }
    }
}

#[async_trait]
impl SourceAdapter for TrustpilotAdapter {
    fn source(&self) -> Source {
        Source::Trustpilot
    }

    async fn fetch(&self, user: &User) -> SourceResult<Vec<NewReview>> {
        let profile = generator::company_profile(
            user.website_url.as_deref(),
            user.company_name.as_deref(),
        );
        Ok(generator::generate_reviews(
            &profile,
            &Source::Trustpilot,
            self.count,
        ))
    }
}

/// Extract reviews from a Trustpilot company page's `__NEXT_DATA__` blob.
pub fn parse_review_page(html: &str) -> SourceResult<Vec<NewReview>> {
    let script = Regex::new(r#"<script id="__NEXT_DATA__"[^>]*>([\s\S]*?)</script>"#)
        .map_err(|e| SourceError::Payload {
            source: "trustpilot",
            message: format!("bad review-page pattern: {e}"),
        })?;
    let payload = script
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SourceError::Payload {
            source: "trustpilot",
            message: "page has no __NEXT_DATA__ script".to_string(),
        })?
        .as_str();

    let json: Value = serde_json::from_str(payload).map_err(|e| SourceError::Payload {
        source: "trustpilot",
        message: format!("invalid __NEXT_DATA__ JSON: {e}"),
    })?;

    let reviews = json
        .pointer("/props/pageProps/reviews")
        .and_then(|r| r.as_array())
        .ok_or_else(|| SourceError::Payload {
            source: "trustpilot",
            message: "no reviews in page props".to_string(),
        })?;

    Ok(reviews.iter().filter_map(review_from_json).collect())
}

fn review_from_json(review: &Value) -> Option<NewReview> {
    let id = review.get("id")?.as_str()?.to_string();

    let date = review
        .pointer("/dates/publishedDate")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Some(NewReview {
        review_id: id.clone(),
        source: Source::Trustpilot,
        date,
        rating: review
            .get("rating")
            .and_then(|v| v.as_i64())
            .unwrap_or(3)
            .clamp(1, 5),
        body: review
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        title: review
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        username: review
            .pointer("/consumer/displayName")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        url: format!("https://www.trustpilot.com/reviews/{id}"),
        language: review
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("en")
            .to_string(),
        sentiment: None,
        category: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><script id="__NEXT_DATA__" type="application/json">
    {"props":{"pageProps":{"reviews":[
        {"id":"tp1","rating":5,"text":"Excellent service","title":"Great",
         "consumer":{"displayName":"Lisa K."},
         "dates":{"publishedDate":"2025-05-20T08:30:00.000Z"},"language":"en"},
        {"id":"tp2","rating":1,"text":"Poor support","title":null,
         "consumer":{},"dates":{},"language":"de"}
    ]}}}
    </script></head><body></body></html>"#;

    #[test]
    fn parses_next_data_reviews() {
        let reviews = parse_review_page(PAGE).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].review_id, "tp1");
        assert_eq!(reviews[0].rating, 5);
        assert_eq!(reviews[0].username, "Lisa K.");
        assert_eq!(reviews[0].url, "https://www.trustpilot.com/reviews/tp1");
        assert_eq!(reviews[1].language, "de");
    }

    #[test]
    fn page_without_next_data_is_a_payload_error() {
        let err = parse_review_page("<html></html>").unwrap_err();
        assert!(matches!(err, SourceError::Payload { source: "trustpilot", .. }));
    }
}
