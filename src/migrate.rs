use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL,
            website_url TEXT,
            company_name TEXT,
            appstore_app_id TEXT,
            appstore_app_name TEXT,
            googleplay_app_id TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create onboarding contexts table (one per user)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contexts (
            user_id TEXT PRIMARY KEY,
            overall_status TEXT NOT NULL DEFAULT 'not_started',
            current_step INTEGER NOT NULL DEFAULT 1,
            step_status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create reviews table. (context_id, source, review_id) is the natural
    // key; duplicate inserts are swallowed, not escalated.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            context_id TEXT NOT NULL,
            review_id TEXT NOT NULL,
            source TEXT NOT NULL,
            date INTEGER NOT NULL,
            rating INTEGER NOT NULL,
            body TEXT NOT NULL,
            title TEXT,
            username TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL DEFAULT 'en',
            sentiment TEXT,
            category TEXT,
            embedding BLOB,
            UNIQUE(context_id, source, review_id),
            FOREIGN KEY (context_id) REFERENCES contexts(user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_context ON reviews(context_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_review_id ON reviews(review_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_sentiment ON reviews(sentiment)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_contexts_status ON contexts(overall_status)")
        .execute(pool)
        .await?;

    Ok(())
}
