//! Recovery sweep for contexts stranded mid-onboarding.
//!
//! A crashed worker can leave a context sitting in `pending` or
//! `processing` forever. The sweep finds those contexts and force-completes
//! each one, backfilling synthetic reviews where the context owns none, so
//! every affected user ends up in the terminal completed shape.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::pipeline;
use crate::store;

#[derive(Debug, Default)]
pub struct RecoverSummary {
    pub scanned: usize,
    pub repaired: usize,
    pub reviews_created: u64,
}

/// Scan for stuck contexts and force-complete each one. A single failed
/// repair is logged and the sweep continues with the rest.
pub async fn run_recover(config: &Config, pool: &SqlitePool) -> Result<RecoverSummary> {
    let stuck = store::stuck_contexts(pool).await?;
    let mut summary = RecoverSummary {
        scanned: stuck.len(),
        ..Default::default()
    };

    for ctx in &stuck {
        info!(user_id = %ctx.user_id, status = %ctx.overall_status.as_str(), "repairing stuck context");
        match pipeline::force_complete(config, pool, &ctx.user_id).await {
            Ok(created) => {
                summary.repaired += 1;
                summary.reviews_created += created;
            }
            Err(e) => {
                warn!(user_id = %ctx.user_id, error = %e, "could not repair context");
            }
        }
    }

    info!(
        scanned = summary.scanned,
        repaired = summary.repaired,
        reviews_created = summary.reviews_created,
        "recovery sweep finished"
    );
    Ok(summary)
}
