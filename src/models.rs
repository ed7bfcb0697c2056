//! Core data models used throughout Reviewflow.
//!
//! These types represent the users, onboarding contexts, and review records
//! that flow through the ingestion and enrichment pipeline. The serialized
//! shape of [`StepStatus`] is load-bearing: it must stay bit-compatible with
//! the legacy `{"step1": ..., "step2": ..., "step1_substeps": {...}}` JSON
//! persisted by earlier deployments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a review came from. Open-ended: unknown source names round-trip
/// through [`Source::Other`] instead of failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    AppStore,
    GooglePlay,
    Trustpilot,
    Reddit,
    Twitter,
    Other(String),
}

impl Source {
    pub fn as_str(&self) -> &str {
        match self {
            Source::AppStore => "appstore",
            Source::GooglePlay => "googleplay",
            Source::Trustpilot => "trustpilot",
            Source::Reddit => "reddit",
            Source::Twitter => "twitter",
            Source::Other(name) => name,
        }
    }

    pub fn parse(s: &str) -> Source {
        match s {
            "appstore" => Source::AppStore,
            "googleplay" => Source::GooglePlay,
            "trustpilot" => Source::Trustpilot,
            "reddit" => Source::Reddit,
            "twitter" => Source::Twitter,
            other => Source::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment label attached to a review. Absence means "not yet enriched".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Sentiment> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    /// The rating-based labeling rule: 4-5 positive, 1-2 negative, 3 neutral.
    pub fn from_rating(rating: i64) -> Sentiment {
        if rating >= 4 {
            Sentiment::Positive
        } else if rating <= 2 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Overall state of a user's onboarding run.
///
/// `failed` is not terminal: the standard entry point retries, and after
/// retry exhaustion force-completes with synthetic content, so a context
/// never stays `failed` indefinitely unless the process died out-of-band
/// (which is what [`crate::recover`] exists for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    NotStarted,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::NotStarted => "not_started",
            OverallStatus::Pending => "pending",
            OverallStatus::Processing => "processing",
            OverallStatus::Completed => "completed",
            OverallStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<OverallStatus> {
        match s {
            "not_started" => Some(OverallStatus::NotStarted),
            "pending" => Some(OverallStatus::Pending),
            "processing" => Some(OverallStatus::Processing),
            "completed" => Some(OverallStatus::Completed),
            "failed" => Some(OverallStatus::Failed),
            _ => None,
        }
    }
}

/// Status of one stage or sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Completed,
    Failed,
}

/// Per-source ingestion sub-steps of stage 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstepStatus {
    pub substep1: StageStatus,
    pub substep2: StageStatus,
    pub substep3: StageStatus,
}

/// Fixed-shape progress record, persisted as JSON on the context row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub step1: StageStatus,
    pub step2: StageStatus,
    pub step1_substeps: SubstepStatus,
}

impl StepStatus {
    /// The shape of a context that has done no work yet.
    pub fn pristine() -> StepStatus {
        StepStatus {
            step1: StageStatus::Pending,
            step2: StageStatus::Pending,
            step1_substeps: SubstepStatus {
                substep1: StageStatus::Pending,
                substep2: StageStatus::Pending,
                substep3: StageStatus::Pending,
            },
        }
    }

    /// The fully-completed invariant shape.
    pub fn completed() -> StepStatus {
        StepStatus {
            step1: StageStatus::Completed,
            step2: StageStatus::Completed,
            step1_substeps: SubstepStatus {
                substep1: StageStatus::Completed,
                substep2: StageStatus::Completed,
                substep3: StageStatus::Completed,
            },
        }
    }

    /// A run re-initializes the progress record only when stage 1 has not
    /// started. Re-invocation mid-flight never clobbers an existing shape.
    pub fn is_pristine(&self) -> bool {
        self.step1 == StageStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        *self == StepStatus::completed()
    }

    pub fn substep_mut(&mut self, n: usize) -> Option<&mut StageStatus> {
        match n {
            1 => Some(&mut self.step1_substeps.substep1),
            2 => Some(&mut self.step1_substeps.substep2),
            3 => Some(&mut self.step1_substeps.substep3),
            _ => None,
        }
    }
}

/// A registered user, with the external identities the adapters need.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub website_url: Option<String>,
    pub company_name: Option<String>,
    pub appstore_app_id: Option<String>,
    pub appstore_app_name: Option<String>,
    pub googleplay_app_id: Option<String>,
    pub created_at: i64,
}

/// Per-user record tracking pipeline progress. Keyed by user id: a user has
/// exactly one onboarding context, which exclusively owns its reviews.
#[derive(Debug, Clone)]
pub struct OnboardingContext {
    pub user_id: String,
    pub overall_status: OverallStatus,
    pub current_step: i64,
    pub step_status: StepStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A normalized review before insertion. `(source, review_id)` is the
/// natural key; the internal row id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub review_id: String,
    pub source: Source,
    pub date: DateTime<Utc>,
    pub rating: i64,
    pub body: String,
    pub title: Option<String>,
    pub username: String,
    pub url: String,
    pub language: String,
    pub sentiment: Option<Sentiment>,
    pub category: Option<String>,
}

/// A stored review row.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: String,
    pub context_id: String,
    pub review_id: String,
    pub source: Source,
    pub date: i64,
    pub rating: i64,
    pub body: String,
    pub title: Option<String>,
    pub username: String,
    pub url: String,
    pub language: String,
    pub sentiment: Option<Sentiment>,
    pub category: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_status_json_is_bit_compatible_with_legacy_shape() {
        let json = serde_json::to_value(StepStatus::pristine()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "step1": "pending",
                "step2": "pending",
                "step1_substeps": {
                    "substep1": "pending",
                    "substep2": "pending",
                    "substep3": "pending",
                }
            })
        );
    }

    #[test]
    fn step_status_loads_legacy_json() {
        let legacy = r#"{"step1":"completed","step2":"failed","step1_substeps":{"substep1":"completed","substep2":"completed","substep3":"failed"}}"#;
        let status: StepStatus = serde_json::from_str(legacy).unwrap();
        assert_eq!(status.step1, StageStatus::Completed);
        assert_eq!(status.step2, StageStatus::Failed);
        assert_eq!(status.step1_substeps.substep3, StageStatus::Failed);
        assert!(!status.is_pristine());
    }

    #[test]
    fn sentiment_from_rating_rule() {
        assert_eq!(Sentiment::from_rating(5), Sentiment::Positive);
        assert_eq!(Sentiment::from_rating(4), Sentiment::Positive);
        assert_eq!(Sentiment::from_rating(3), Sentiment::Neutral);
        assert_eq!(Sentiment::from_rating(2), Sentiment::Negative);
        assert_eq!(Sentiment::from_rating(1), Sentiment::Negative);
    }

    #[test]
    fn source_roundtrip_preserves_unknown_names() {
        assert_eq!(Source::parse("appstore"), Source::AppStore);
        assert_eq!(Source::parse("g2"), Source::Other("g2".to_string()));
        assert_eq!(Source::parse("g2").as_str(), "g2");
    }

    #[test]
    fn completed_shape_satisfies_invariant() {
        let status = StepStatus::completed();
        assert!(status.is_completed());
        assert!(!status.is_pristine());
    }
}
