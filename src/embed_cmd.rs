//! Embedding backfill over stored reviews.
//!
//! Selects reviews whose `embedding` column is null, embeds their bodies in
//! batches through the configured provider, and stores the vectors. The
//! null re-check on write makes concurrent or repeated runs safe. A failed
//! batch is logged and skipped; the pass keeps going.

use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::embedding;
use crate::store;

/// Find and embed reviews that have no embedding yet.
pub async fn run_embed_pending(
    config: &Config,
    pool: &SqlitePool,
    limit: Option<usize>,
    batch_size_override: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let batch_size = batch_size_override.unwrap_or(config.embedding.batch_size);

    let pending = store::unembedded(pool, limit).await?;

    if dry_run {
        println!("embed pending (dry-run)");
        println!("  reviews needing embeddings: {}", pending.len());
        return Ok(());
    }

    if pending.is_empty() {
        println!("embed pending");
        println!("  all reviews up to date");
        return Ok(());
    }

    let total = pending.len();
    let mut embedded = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;

    for batch in pending.chunks(batch_size) {
        // Blank bodies would waste an API call and embed nothing useful
        let items: Vec<&store::UnembeddedReview> = batch
            .iter()
            .filter(|r| !r.body.trim().is_empty())
            .collect();
        skipped += (batch.len() - items.len()) as u64;

        if items.is_empty() {
            continue;
        }

        let texts: Vec<String> = items.iter().map(|r| r.body.clone()).collect();

        match embedding::embed_texts(provider.as_ref(), &config.embedding, &texts).await {
            Ok(vectors) => {
                for (item, vec) in items.iter().zip(vectors.iter()) {
                    let blob = embedding::vec_to_blob(vec);
                    if store::set_embedding_if_null(pool, &item.id, &blob).await? {
                        embedded += 1;
                    } else {
                        skipped += 1;
                    }
                }
            }
            Err(e) => {
                eprintln!("Warning: embedding batch failed: {}", e);
                failed += items.len() as u64;
            }
        }
    }

    println!("embed pending");
    println!("  total pending: {}", total);
    println!("  embedded: {}", embedded);
    println!("  skipped: {}", skipped);
    println!("  failed: {}", failed);

    Ok(())
}
