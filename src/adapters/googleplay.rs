//! Google Play adapter: paginates the Play Store `batchexecute` reviews
//! endpoint with an opaque continuation token.
//!
//! Each page is a wrapped envelope whose payload is a JSON string embedded
//! inside JSON. Token exhaustion, a malformed payload, or a type mismatch in
//! the decoded structure all end pagination cleanly with whatever was
//! collected so far; only transport-level failures raise [`SourceError`].

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use super::SourceAdapter;
use crate::config::Config;
use crate::error::SourceResult;
use crate::models::{NewReview, Source, User};

const DEFAULT_APP_ID: &str = "com.ubercab"; // Uber
const MAX_COUNT_EACH_FETCH: usize = 199;
const TARGET_REVIEWS: usize = 20;
const SORT_MOST_RELEVANT: u8 = 1;

pub struct GooglePlayAdapter {
    client: reqwest::Client,
    base: String,
    country: String,
    language: String,
}

impl GooglePlayAdapter {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            client,
            base: config.adapters.googleplay_base.clone(),
            country: config.adapters.country.clone(),
            language: config.adapters.language.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/_/PlayStoreUi/data/batchexecute?hl={}&gl={}",
            self.base, self.language, self.country
        )
    }
}

#[async_trait]
impl SourceAdapter for GooglePlayAdapter {
    fn source(&self) -> Source {
        Source::GooglePlay
    }

    async fn fetch(&self, user: &User) -> SourceResult<Vec<NewReview>> {
        let app_id = user.googleplay_app_id.as_deref().unwrap_or(DEFAULT_APP_ID);
        let endpoint = self.endpoint();
        let listing_url = format!(
            "https://play.google.com/store/apps/details?id={app_id}"
        );

        let mut collected: Vec<NewReview> = Vec::new();
        let mut token: Option<String> = None;

        while collected.len() < TARGET_REVIEWS {
            let fetch_count = (TARGET_REVIEWS - collected.len()).min(MAX_COUNT_EACH_FETCH);
            let body = request_body(app_id, fetch_count, token.as_deref());

            let text = self
                .client
                .post(&endpoint)
                .form(&[("f.req", body)])
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;

            let Some((items, next_token)) = parse_page(&text) else {
                break;
            };
            if items.is_empty() {
                break;
            }

            collected.extend(items.iter().filter_map(|item| {
                review_from_item(item, &listing_url, &self.country)
            }));

            match next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        collected.truncate(TARGET_REVIEWS);
        Ok(collected)
    }
}

/// The `f.req` envelope for one reviews page.
fn request_body(app_id: &str, count: usize, token: Option<&str>) -> String {
    let token_param = match token {
        Some(t) => format!("\\\"{t}\\\""),
        None => "null".to_string(),
    };
    format!(
        "[[[\"UsvDTd\",\"[null,null,[2,{SORT_MOST_RELEVANT},[{count},null,{token_param}]],[\\\"{app_id}\\\",7]]\",null,\"generic\"]]]"
    )
}

/// Unwrap one response page into raw review items plus the continuation
/// token. Returns `None` for any malformed or unexpectedly-shaped payload —
/// that is a clean end of pagination, not an error.
fn parse_page(text: &str) -> Option<(Vec<Value>, Option<String>)> {
    let envelope = Regex::new(r"\)\]\}'\n\n([\s\S]+)").ok()?;
    let payload = envelope.captures(text)?.get(1)?.as_str();

    let outer: Value = serde_json::from_str(payload).ok()?;
    let inner_str = outer.get(0)?.get(2)?.as_str()?;
    let inner: Value = serde_json::from_str(inner_str).ok()?;
    let frame = inner.as_array()?;

    let items = frame.first()?.as_array()?.clone();

    // Continuation token lives at [-2][-1]; a non-string there (commonly a
    // list on the last page) means the listing is exhausted.
    let token = frame
        .get(frame.len().checked_sub(2)?)
        .and_then(|v| v.as_array())
        .and_then(|a| a.last())
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Some((items, token))
}

fn review_from_item(item: &Value, url: &str, country: &str) -> Option<NewReview> {
    let review_id = item.get(0)?.as_str()?.to_string();
    let username = item
        .get(1)
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let rating = item.get(2).and_then(|v| v.as_i64()).unwrap_or(3);
    let body = item
        .get(4)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let date = item
        .get(5)
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_i64())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now);

    Some(NewReview {
        review_id,
        source: Source::GooglePlay,
        date,
        rating: rating.clamp(1, 5),
        body,
        title: None,
        username,
        url: url.to_string(),
        language: country.to_string(),
        sentiment: None,
        category: None,
    })
}
