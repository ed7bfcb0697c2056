//! Review store: the sqlx query layer over users, contexts, and reviews.
//!
//! Writes follow two disciplines. The pipeline side is insert-only with
//! natural-key conflicts swallowed (idempotent insert). The enrichment side
//! is update-only, conditional on the target field still being null, which
//! is the only concurrency control this design uses.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{
    NewReview, OnboardingContext, OverallStatus, Review, Sentiment, Source, StepStatus, User,
};

/// Fields supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub website_url: Option<String>,
    pub company_name: Option<String>,
    pub appstore_app_id: Option<String>,
    pub appstore_app_name: Option<String>,
    pub googleplay_app_id: Option<String>,
}

/// Create a user together with its `not_started` onboarding context.
pub async fn create_user(pool: &SqlitePool, new: &NewUser) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, website_url, company_name,
                           appstore_app_id, appstore_app_name, googleplay_app_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.email)
    .bind(&new.username)
    .bind(&new.website_url)
    .bind(&new.company_name)
    .bind(&new.appstore_app_id)
    .bind(&new.appstore_app_name)
    .bind(&new.googleplay_app_id)
    .bind(now)
    .execute(pool)
    .await?;

    let step_status = serde_json::to_string(&StepStatus::pristine())?;
    sqlx::query(
        r#"
        INSERT INTO contexts (user_id, overall_status, current_step, step_status, created_at, updated_at)
        VALUES (?, 'not_started', 1, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&step_status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_user(pool, &id)
        .await?
        .context("user vanished right after insert")
}

pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, username, website_url, company_name,
               appstore_app_id, appstore_app_name, googleplay_app_id, created_at
        FROM users WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        website_url: row.get("website_url"),
        company_name: row.get("company_name"),
        appstore_app_id: row.get("appstore_app_id"),
        appstore_app_name: row.get("appstore_app_name"),
        googleplay_app_id: row.get("googleplay_app_id"),
        created_at: row.get("created_at"),
    }))
}

fn context_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<OnboardingContext> {
    let status_str: String = row.get("overall_status");
    let overall_status = OverallStatus::parse(&status_str)
        .with_context(|| format!("invalid overall_status in store: '{status_str}'"))?;
    let step_json: String = row.get("step_status");
    let step_status: StepStatus = serde_json::from_str(&step_json)
        .with_context(|| format!("invalid step_status in store: '{step_json}'"))?;

    Ok(OnboardingContext {
        user_id: row.get("user_id"),
        overall_status,
        current_step: row.get("current_step"),
        step_status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub async fn load_context(pool: &SqlitePool, user_id: &str) -> Result<Option<OnboardingContext>> {
    let row = sqlx::query(
        "SELECT user_id, overall_status, current_step, step_status, created_at, updated_at \
         FROM contexts WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| context_from_row(&r)).transpose()
}

/// Persist a context's status fields. The `step_status` JSON shape is
/// validated on load, so anything written here round-trips.
pub async fn save_context(pool: &SqlitePool, ctx: &OnboardingContext) -> Result<()> {
    let step_status = serde_json::to_string(&ctx.step_status)?;
    let now = Utc::now().timestamp();

    sqlx::query(
        r#"
        UPDATE contexts
        SET overall_status = ?, current_step = ?, step_status = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(ctx.overall_status.as_str())
    .bind(ctx.current_step)
    .bind(&step_status)
    .bind(now)
    .bind(&ctx.user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Contexts left in `pending` or `processing`. `completed` and genuinely
/// `not_started` contexts are never candidates for repair.
pub async fn stuck_contexts(pool: &SqlitePool) -> Result<Vec<OnboardingContext>> {
    let rows = sqlx::query(
        "SELECT user_id, overall_status, current_step, step_status, created_at, updated_at \
         FROM contexts WHERE overall_status IN ('pending', 'processing') ORDER BY user_id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(context_from_row).collect()
}

/// Insert one review, swallowing natural-key conflicts. Returns whether a
/// row was actually written.
pub async fn insert_review(pool: &SqlitePool, context_id: &str, review: &NewReview) -> Result<bool> {
    let id = Uuid::new_v4().to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO reviews (id, context_id, review_id, source, date, rating, body,
                             title, username, url, language, sentiment, category)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(context_id, source, review_id) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(context_id)
    .bind(&review.review_id)
    .bind(review.source.as_str())
    .bind(review.date.timestamp())
    .bind(review.rating)
    .bind(&review.body)
    .bind(&review.title)
    .bind(&review.username)
    .bind(&review.url)
    .bind(&review.language)
    .bind(review.sentiment.map(|s| s.as_str()))
    .bind(&review.category)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_reviews(
    pool: &SqlitePool,
    context_id: &str,
    reviews: &[NewReview],
) -> Result<u64> {
    let mut inserted = 0u64;
    for review in reviews {
        if insert_review(pool, context_id, review).await? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

pub async fn review_count(pool: &SqlitePool, context_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE context_id = ?")
        .bind(context_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// A review awaiting sentiment/category labels.
#[derive(Debug, Clone)]
pub struct UnlabeledReview {
    pub id: String,
    pub review_id: String,
    pub body: String,
}

/// Next batch of reviews with null sentiment, in stable id order.
pub async fn unlabeled_batch(pool: &SqlitePool, limit: usize) -> Result<Vec<UnlabeledReview>> {
    let rows = sqlx::query(
        "SELECT id, review_id, body FROM reviews WHERE sentiment IS NULL ORDER BY id LIMIT ?",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| UnlabeledReview {
            id: row.get("id"),
            review_id: row.get("review_id"),
            body: row.get("body"),
        })
        .collect())
}

pub async fn unlabeled_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE sentiment IS NULL")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// How many stored reviews carry this natural review id (across contexts).
pub async fn natural_id_matches<'e, E>(executor: E, review_id: &str) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE review_id = ?")
        .bind(review_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Apply a label to every still-null review matching the natural id.
/// The null re-check makes a repeated write-back a no-op rather than an
/// overwrite. Returns rows updated.
pub async fn apply_labels_if_null<'e, E>(
    executor: E,
    review_id: &str,
    sentiment: Sentiment,
    category: Option<&str>,
) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "UPDATE reviews SET sentiment = ?, category = ? WHERE review_id = ? AND sentiment IS NULL",
    )
    .bind(sentiment.as_str())
    .bind(category)
    .bind(review_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// `(internal id, rating, category)` for every review owned by a context.
pub async fn rating_targets(
    pool: &SqlitePool,
    context_id: &str,
) -> Result<Vec<(String, i64, Option<String>)>> {
    let rows = sqlx::query("SELECT id, rating, category FROM reviews WHERE context_id = ?")
        .bind(context_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("id"), row.get("rating"), row.get("category")))
        .collect())
}

/// Set the rating-derived sentiment, filling in a category only when the
/// record has none.
pub async fn set_rating_label(
    pool: &SqlitePool,
    id: &str,
    sentiment: Sentiment,
    category_if_null: &str,
) -> Result<()> {
    sqlx::query("UPDATE reviews SET sentiment = ?, category = COALESCE(category, ?) WHERE id = ?")
        .bind(sentiment.as_str())
        .bind(category_if_null)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// A review awaiting an embedding.
#[derive(Debug, Clone)]
pub struct UnembeddedReview {
    pub id: String,
    pub body: String,
}

pub async fn unembedded(pool: &SqlitePool, limit: Option<usize>) -> Result<Vec<UnembeddedReview>> {
    let limit_val = limit.unwrap_or(usize::MAX) as i64;
    let rows = sqlx::query(
        "SELECT id, body FROM reviews WHERE embedding IS NULL ORDER BY id LIMIT ?",
    )
    .bind(limit_val)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| UnembeddedReview {
            id: row.get("id"),
            body: row.get("body"),
        })
        .collect())
}

/// Store an embedding unless a concurrent run got there first.
pub async fn set_embedding_if_null(pool: &SqlitePool, id: &str, blob: &[u8]) -> Result<bool> {
    let result =
        sqlx::query("UPDATE reviews SET embedding = ? WHERE id = ? AND embedding IS NULL")
            .bind(blob)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Full review rows for a context, oldest first.
pub async fn reviews_for_context(pool: &SqlitePool, context_id: &str) -> Result<Vec<Review>> {
    let rows = sqlx::query(
        r#"
        SELECT id, context_id, review_id, source, date, rating, body, title,
               username, url, language, sentiment, category, embedding
        FROM reviews WHERE context_id = ? ORDER BY date
        "#,
    )
    .bind(context_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let source: String = row.get("source");
            let sentiment: Option<String> = row.get("sentiment");
            let embedding: Option<Vec<u8>> = row.get("embedding");
            Review {
                id: row.get("id"),
                context_id: row.get("context_id"),
                review_id: row.get("review_id"),
                source: Source::parse(&source),
                date: row.get("date"),
                rating: row.get("rating"),
                body: row.get("body"),
                title: row.get("title"),
                username: row.get("username"),
                url: row.get("url"),
                language: row.get("language"),
                sentiment: sentiment.as_deref().and_then(Sentiment::parse),
                category: row.get("category"),
                embedding: embedding.as_deref().map(crate::embedding::blob_to_vec),
            }
        })
        .collect())
}
