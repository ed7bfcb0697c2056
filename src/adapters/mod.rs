//! Per-source review adapters.
//!
//! Each adapter fetches reviews from one external system and normalizes
//! them into [`NewReview`] records, or fails with a [`SourceError`]. The
//! HTTP client is constructed once and injected — adapters hold no global
//! session state, and any pagination/continuation state is internal to a
//! single `fetch` call and discarded afterwards.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::error::SourceResult;
use crate::models::{NewReview, Source, User};

pub mod appstore;
pub mod googleplay;
pub mod trustpilot;

/// One external review source.
///
/// `fetch` returns zero or more normalized reviews for the user's external
/// identity. Recovery from failure (synthetic fallback) is the pipeline's
/// job, not the adapter's.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    async fn fetch(&self, user: &User) -> SourceResult<Vec<NewReview>>;
}

/// The three adapters the onboarding pipeline drives, in sub-step order.
pub fn default_adapters(config: &Config) -> Result<Vec<Box<dyn SourceAdapter>>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.adapters.timeout_secs))
        .build()?;

    Ok(vec![
        Box::new(appstore::AppStoreAdapter::new(config, client.clone())),
        Box::new(googleplay::GooglePlayAdapter::new(config, client)),
        Box::new(trustpilot::TrustpilotAdapter::new(config)),
    ])
}
