//! Sentiment/category batch enrichment.
//!
//! Repeatedly selects reviews with null sentiment in stable id order,
//! ships them to the external classification service as a CSV upload, and
//! writes the returned labels back — but only to records that are still
//! null, so a concurrent or repeated pass never overwrites a label. A
//! failed batch is logged and the pass moves on; the loop ends when no
//! unlabeled reviews remain or a batch comes back short.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::Sentiment;
use crate::store::{self, UnlabeledReview};

/// One row of the classification service's CSV response.
#[derive(Debug, Clone)]
pub struct LabelRow {
    pub review_id: String,
    pub sentiment: String,
    pub category: Option<String>,
}

#[derive(Debug, Default)]
pub struct SentimentSummary {
    pub batches: u64,
    pub updated: u64,
}

pub async fn run_sentiment_pass(config: &Config, pool: &SqlitePool) -> Result<SentimentSummary> {
    let service_url = config
        .enrichment
        .service_url
        .as_deref()
        .context("enrichment.service_url is not configured")?;
    let batch_size = config.enrichment.batch_size;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.enrichment.timeout_secs))
        .build()?;

    let total_unlabeled = store::unlabeled_count(pool).await?;
    info!(total_unlabeled, "starting sentiment pass");

    let mut summary = SentimentSummary::default();

    loop {
        let batch = store::unlabeled_batch(pool, batch_size).await?;
        if batch.is_empty() {
            break;
        }
        let short_batch = batch.len() < batch_size;
        summary.batches += 1;

        let applied = match label_batch(&client, service_url, pool, &batch).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "enrichment batch failed, continuing");
                0
            }
        };
        summary.updated += applied;

        if short_batch || store::unlabeled_count(pool).await? == 0 {
            break;
        }
        if applied == 0 {
            // The head of the unlabeled set did not shrink; a repeat would
            // resubmit the same records.
            warn!("batch applied no labels, stopping pass");
            break;
        }
    }

    info!(
        batches = summary.batches,
        updated = summary.updated,
        "sentiment pass finished"
    );
    Ok(summary)
}

async fn label_batch(
    client: &reqwest::Client,
    service_url: &str,
    pool: &SqlitePool,
    batch: &[UnlabeledReview],
) -> Result<u64> {
    let csv_bytes = batch_to_csv(batch)?;
    let part = reqwest::multipart::Part::bytes(csv_bytes)
        .file_name("reviews.csv")
        .mime_str("text/csv")?;
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(service_url)
        .multipart(form)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if !content_type.contains("text/csv") {
        warn!(content_type, "unexpected response content type, skipping batch");
        return Ok(0);
    }

    let body = response.bytes().await?;
    let rows = parse_label_rows(&body)?;
    apply_label_rows(pool, &rows).await
}

/// Serialize a batch to the outbound transfer format: `id,review_id,text`.
pub fn batch_to_csv(batch: &[UnlabeledReview]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["id", "review_id", "text"])?;
    for review in batch {
        writer.write_record([&review.id, &review.review_id, &review.body])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("finishing CSV batch: {e}"))
}

/// Decode the service's response CSV. Columns are matched by header name;
/// `category` is optional.
pub fn parse_label_rows(bytes: &[u8]) -> Result<Vec<LabelRow>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let review_id_col = position("review_id").context("response CSV has no review_id column")?;
    let sentiment_col = position("sentiment").context("response CSV has no sentiment column")?;
    let category_col = position("category");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let review_id = record.get(review_id_col).unwrap_or("").to_string();
        if review_id.is_empty() {
            warn!("response row missing review_id, skipping");
            continue;
        }
        rows.push(LabelRow {
            review_id,
            sentiment: record.get(sentiment_col).unwrap_or("").to_string(),
            category: record
                .get(category_col.unwrap_or(usize::MAX))
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty()),
        });
    }
    Ok(rows)
}

/// Write labels back inside one transaction. Per row: zero stored matches
/// for the natural id is logged and skipped; multiple matches all receive
/// the label, each conditional on still being null.
pub async fn apply_label_rows(pool: &SqlitePool, rows: &[LabelRow]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut updated = 0u64;

    for row in rows {
        let Some(sentiment) = Sentiment::parse(&row.sentiment) else {
            warn!(
                review_id = %row.review_id,
                label = %row.sentiment,
                "unknown sentiment label, skipping row"
            );
            continue;
        };

        let matches = store::natural_id_matches(&mut *tx, &row.review_id).await?;
        if matches == 0 {
            warn!(review_id = %row.review_id, "no stored review matches response row");
            continue;
        }

        let n = store::apply_labels_if_null(
            &mut *tx,
            &row.review_id,
            sentiment,
            row.category.as_deref(),
        )
        .await?;
        if n == 0 {
            debug!(review_id = %row.review_id, "all matches already labeled");
        }
        updated += n;
    }

    tx.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{NewReview, Source};
    use crate::store::NewUser;
    use chrono::Utc;

    fn unlabeled(review_id: &str, source: Source) -> NewReview {
        NewReview {
            review_id: review_id.to_string(),
            source,
            date: Utc::now(),
            rating: 3,
            body: "Mixed experience.".to_string(),
            title: None,
            username: "Anna B.".to_string(),
            url: String::new(),
            language: "en".to_string(),
            sentiment: None,
            category: None,
        }
    }

    async fn seeded_pool() -> (SqlitePool, String) {
        let pool = db::connect_memory().await.unwrap();
        let user = store::create_user(
            &pool,
            &NewUser {
                email: "a@b.com".to_string(),
                username: "a".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (pool, user.id)
    }

    #[tokio::test]
    async fn ambiguous_natural_key_updates_all_then_noops() {
        let (pool, ctx) = seeded_pool().await;
        // Same natural review id under two sources
        store::insert_review(&pool, &ctx, &unlabeled("dup", Source::AppStore))
            .await
            .unwrap();
        store::insert_review(&pool, &ctx, &unlabeled("dup", Source::GooglePlay))
            .await
            .unwrap();

        let rows = vec![LabelRow {
            review_id: "dup".to_string(),
            sentiment: "positive".to_string(),
            category: Some("Pricing".to_string()),
        }];

        let updated = apply_label_rows(&pool, &rows).await.unwrap();
        assert_eq!(updated, 2);

        // Identical response row again: both matches already non-null
        let updated = apply_label_rows(&pool, &rows).await.unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn zero_match_and_invalid_rows_are_skipped() {
        let (pool, ctx) = seeded_pool().await;
        store::insert_review(&pool, &ctx, &unlabeled("r1", Source::AppStore))
            .await
            .unwrap();

        let rows = vec![
            LabelRow {
                review_id: "ghost".to_string(),
                sentiment: "positive".to_string(),
                category: None,
            },
            LabelRow {
                review_id: "r1".to_string(),
                sentiment: "enthusiastic".to_string(),
                category: None,
            },
        ];
        let updated = apply_label_rows(&pool, &rows).await.unwrap();
        assert_eq!(updated, 0);
        assert_eq!(store::unlabeled_count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sentiment_pass_is_idempotent_via_null_predicate() {
        let (pool, ctx) = seeded_pool().await;
        store::insert_review(&pool, &ctx, &unlabeled("r1", Source::AppStore))
            .await
            .unwrap();
        store::insert_review(&pool, &ctx, &unlabeled("r2", Source::AppStore))
            .await
            .unwrap();

        let rows: Vec<LabelRow> = ["r1", "r2"]
            .iter()
            .map(|id| LabelRow {
                review_id: id.to_string(),
                sentiment: "neutral".to_string(),
                category: Some("General".to_string()),
            })
            .collect();

        assert_eq!(apply_label_rows(&pool, &rows).await.unwrap(), 2);
        assert_eq!(store::unlabeled_count(&pool).await.unwrap(), 0);
        // Second application with no new data changes nothing
        assert_eq!(apply_label_rows(&pool, &rows).await.unwrap(), 0);
    }

    #[test]
    fn outbound_csv_has_transfer_columns() {
        let batch = vec![UnlabeledReview {
            id: "internal-1".to_string(),
            review_id: "r1".to_string(),
            body: "text with, comma".to_string(),
        }];
        let bytes = batch_to_csv(&batch).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("id,review_id,text\n"));
        assert!(text.contains("\"text with, comma\""));
    }

    #[test]
    fn response_csv_parses_by_header_name() {
        let body = b"review_id,category,sentiment\nr1,Pricing,positive\n,x,negative\nr2,,neutral\n";
        let rows = parse_label_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].review_id, "r1");
        assert_eq!(rows[0].sentiment, "positive");
        assert_eq!(rows[0].category.as_deref(), Some("Pricing"));
        assert_eq!(rows[1].category, None);
    }

    #[test]
    fn response_csv_without_required_columns_errors() {
        assert!(parse_label_rows(b"id,text\n1,hello\n").is_err());
    }
}
