//! Read-side boundary: onboarding status, the profile view, and the
//! explicit completion entry point.
//!
//! These are the queries an outer surface (HTTP handler, CLI, support
//! tooling) calls. They never mutate pipeline state except for
//! [`complete_onboarding`], which reuses the force-complete path.

use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::ContextNotFound;
use crate::models::{OverallStatus, StepStatus};
use crate::pipeline;
use crate::store;

/// Snapshot of one user's onboarding progress.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub onboarding_status: OverallStatus,
    pub current_step: i64,
    pub step_status: StepStatus,
    pub review_count: i64,
}

/// Current onboarding status for a user. `None` means the user is unknown.
///
/// A user whose context row is somehow missing reads as `not_started` with
/// the pristine progress shape, the same default a fresh registration gets.
pub async fn onboarding_status(pool: &SqlitePool, user_id: &str) -> Result<Option<StatusReport>> {
    if store::get_user(pool, user_id).await?.is_none() {
        return Ok(None);
    }

    let report = match store::load_context(pool, user_id).await? {
        Some(ctx) => StatusReport {
            onboarding_status: ctx.overall_status,
            current_step: ctx.current_step,
            step_status: ctx.step_status,
            review_count: store::review_count(pool, user_id).await?,
        },
        None => StatusReport {
            onboarding_status: OverallStatus::NotStarted,
            current_step: 1,
            step_status: StepStatus::pristine(),
            review_count: 0,
        },
    };

    Ok(Some(report))
}

/// Explicitly drive a user's context into the terminal completed shape,
/// backfilling synthetic reviews if it owns none. Returns the number of
/// reviews created.
pub async fn complete_onboarding(
    config: &Config,
    pool: &SqlitePool,
    user_id: &str,
) -> Result<u64> {
    if store::load_context(pool, user_id).await?.is_none() {
        return Err(ContextNotFound(user_id.to_string()).into());
    }
    pipeline::force_complete(config, pool, user_id).await
}

#[derive(Debug, Serialize)]
pub struct ProfileUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub website_url: Option<String>,
    pub company_name: Option<String>,
    pub appstore_app_id: Option<String>,
    pub appstore_app_name: Option<String>,
    pub googleplay_app_id: Option<String>,
}

/// Combined identity + onboarding view.
#[derive(Debug, Serialize)]
pub struct ProfileReport {
    pub user: ProfileUser,
    pub user_data: StatusReport,
}

/// The profile view: user identity fields plus the onboarding snapshot.
/// `None` means the user is unknown.
pub async fn profile(pool: &SqlitePool, user_id: &str) -> Result<Option<ProfileReport>> {
    let Some(user) = store::get_user(pool, user_id).await? else {
        return Ok(None);
    };
    let Some(user_data) = onboarding_status(pool, user_id).await? else {
        return Ok(None);
    };

    Ok(Some(ProfileReport {
        user: ProfileUser {
            id: user.id,
            email: user.email,
            username: user.username,
            website_url: user.website_url,
            company_name: user.company_name,
            appstore_app_id: user.appstore_app_id,
            appstore_app_name: user.appstore_app_name,
            googleplay_app_id: user.googleplay_app_id,
        },
        user_data,
    }))
}
