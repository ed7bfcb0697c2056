//! Database statistics and health overview.
//!
//! A quick summary of what the store holds: user and context counts by
//! status, review totals, label and embedding coverage, and a per-source
//! breakdown. Used by `rvw stats` to confirm that onboarding runs and
//! enrichment passes are doing what they should.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;

struct SourceStats {
    source: String,
    review_count: i64,
    labeled_count: i64,
    embedded_count: i64,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config, pool: &SqlitePool) -> Result<()> {
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let total_reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(pool)
        .await?;

    let total_labeled: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE sentiment IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let total_embedded: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE embedding IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Reviewflow — Database Stats");
    println!("===========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Users:       {}", total_users);
    println!("  Reviews:     {}", total_reviews);
    println!(
        "  Labeled:     {} / {} ({}%)",
        total_labeled,
        total_reviews,
        percent(total_labeled, total_reviews)
    );
    println!(
        "  Embedded:    {} / {} ({}%)",
        total_embedded,
        total_reviews,
        percent(total_embedded, total_reviews)
    );

    // Contexts by status
    let status_rows = sqlx::query(
        "SELECT overall_status, COUNT(*) AS n FROM contexts GROUP BY overall_status ORDER BY n DESC",
    )
    .fetch_all(pool)
    .await?;

    if !status_rows.is_empty() {
        println!();
        println!("  Contexts by status:");
        for row in &status_rows {
            let status: String = row.get("overall_status");
            let n: i64 = row.get("n");
            println!("    {:<14} {}", status, n);
        }
    }

    // Per-source breakdown
    let source_rows = sqlx::query(
        r#"
        SELECT
            source,
            COUNT(*) AS review_count,
            COUNT(sentiment) AS labeled_count,
            COUNT(embedding) AS embedded_count
        FROM reviews
        GROUP BY source
        ORDER BY review_count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let source_stats: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            review_count: row.get("review_count"),
            labeled_count: row.get("labeled_count"),
            embedded_count: row.get("embedded_count"),
        })
        .collect();

    if !source_stats.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<16} {:>8} {:>8} {:>10}",
            "SOURCE", "REVIEWS", "LABELED", "EMBEDDED"
        );
        println!("  {}", "-".repeat(46));

        for s in &source_stats {
            println!(
                "  {:<16} {:>8} {:>8} {:>10}",
                s.source, s.review_count, s.labeled_count, s.embedded_count
            );
        }
    }

    println!();
    Ok(())
}

fn percent(part: i64, whole: i64) -> i64 {
    if whole > 0 {
        (part * 100) / whole
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_percent_handles_empty() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(33, 33), 100);
        assert_eq!(percent(1, 3), 33);
    }
}
