//! # Reviewflow CLI (`rvw`)
//!
//! The `rvw` binary drives the review ingestion and enrichment backend:
//! database initialization, user registration, the onboarding pipeline,
//! batch enrichment, embedding backfill, and stuck-context recovery.
//!
//! ## Usage
//!
//! ```bash
//! rvw --config ./config/rvw.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rvw init` | Create the SQLite database and run schema migrations |
//! | `rvw register` | Register a user with its onboarding context |
//! | `rvw onboard <user-id>` | Run the onboarding pipeline for a user |
//! | `rvw enrich sentiment` | Batch-label stored reviews via the classification service |
//! | `rvw embed pending` | Backfill missing review embeddings |
//! | `rvw recover` | Force-complete contexts stuck in pending/processing |
//! | `rvw status <user-id>` | Print a user's onboarding status as JSON |
//! | `rvw profile <user-id>` | Print a user's profile + onboarding view as JSON |
//! | `rvw complete <user-id>` | Explicitly force-complete a user's onboarding |
//! | `rvw stats` | Print database statistics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reviewflow::{
    config, db, embed_cmd, enrich, migrate, pipeline, recover, stats, status, store,
};

/// Reviewflow CLI — a review ingestion, onboarding, and enrichment backend.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rvw.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rvw",
    about = "Reviewflow — a review ingestion, onboarding, and enrichment backend",
    version,
    long_about = "Reviewflow pulls product reviews from app stores and review aggregators, \
    normalizes them into a common record shape, tracks per-user onboarding through a resumable \
    multi-stage pipeline with synthetic fallback content, and batch-enriches stored reviews with \
    sentiment labels and vector embeddings."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rvw.toml`. Database, pipeline, adapter,
    /// enrichment, and embedding settings are read from this file.
    #[arg(long, global = true, default_value = "./config/rvw.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (users, contexts, reviews). Idempotent — running it multiple
    /// times is safe.
    Init,

    /// Register a user.
    ///
    /// Creates the user record together with its `not_started` onboarding
    /// context and prints the assigned id.
    Register {
        /// Contact email (unique).
        #[arg(long)]
        email: String,

        /// Display name. Defaults to the email's local part.
        #[arg(long)]
        username: Option<String>,

        /// Company website; drives the synthetic content profile.
        #[arg(long)]
        website_url: Option<String>,

        /// Company name used in generated review text.
        #[arg(long)]
        company_name: Option<String>,

        /// Numeric App Store app id for live review fetching.
        #[arg(long)]
        appstore_app_id: Option<String>,

        /// App Store app name (slug used in review URLs).
        #[arg(long)]
        appstore_app_name: Option<String>,

        /// Play Store package name for live review fetching.
        #[arg(long)]
        googleplay_app_id: Option<String>,
    },

    /// Run the onboarding pipeline for a user.
    ///
    /// Ingests reviews from all sources (with synthetic fallback), applies
    /// rating-based sentiment labels, and drives the context to `completed`.
    /// Retries on failure; after retry exhaustion the context is
    /// force-completed with synthetic content.
    Onboard {
        /// User id (as printed by `rvw register`).
        user_id: String,
    },

    /// Batch enrichment of stored reviews.
    Enrich {
        #[command(subcommand)]
        action: EnrichAction,
    },

    /// Manage embedding vectors.
    ///
    /// Requires an embedding provider (e.g., OpenAI) to be configured.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Repair contexts stuck mid-onboarding.
    ///
    /// Scans for contexts in `pending` or `processing`, force-completes
    /// each one, and backfills synthetic reviews where a context owns none.
    Recover,

    /// Print a user's onboarding status as JSON.
    Status {
        /// User id.
        user_id: String,
    },

    /// Print a user's profile and onboarding view as JSON.
    Profile {
        /// User id.
        user_id: String,
    },

    /// Explicitly force-complete a user's onboarding.
    ///
    /// Puts the context into the terminal completed shape and backfills
    /// synthetic reviews if it owns none.
    Complete {
        /// User id.
        user_id: String,
    },

    /// Print database statistics.
    Stats,
}

/// Enrichment subcommands.
#[derive(Subcommand)]
enum EnrichAction {
    /// Label reviews with null sentiment via the classification service.
    ///
    /// Ships unlabeled reviews in CSV batches to the configured service
    /// and writes the returned sentiment/category labels back, never
    /// overwriting an existing label.
    Sentiment,
}

/// Embedding management subcommands.
#[derive(Subcommand)]
enum EmbedAction {
    /// Embed reviews that have no embedding yet.
    Pending {
        /// Maximum number of reviews to embed in this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Override the batch size from config (number of texts per API call).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Show counts without performing any embedding.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewflow=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let pool = db::connect(&cfg).await?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Register {
            email,
            username,
            website_url,
            company_name,
            appstore_app_id,
            appstore_app_name,
            googleplay_app_id,
        } => {
            let username = username
                .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());
            let user = store::create_user(
                &pool,
                &store::NewUser {
                    email,
                    username,
                    website_url,
                    company_name,
                    appstore_app_id,
                    appstore_app_name,
                    googleplay_app_id,
                },
            )
            .await?;
            println!("registered {}", user.email);
            println!("  id: {}", user.id);
        }
        Commands::Onboard { user_id } => {
            pipeline::run_onboarding(&cfg, &pool, &user_id).await?;
            println!("onboarding completed for {}", user_id);
        }
        Commands::Enrich { action } => match action {
            EnrichAction::Sentiment => {
                let summary = enrich::run_sentiment_pass(&cfg, &pool).await?;
                println!("enrich sentiment");
                println!("  batches: {}", summary.batches);
                println!("  updated: {}", summary.updated);
            }
        },
        Commands::Embed { action } => match action {
            EmbedAction::Pending {
                limit,
                batch_size,
                dry_run,
            } => {
                embed_cmd::run_embed_pending(&cfg, &pool, limit, batch_size, dry_run).await?;
            }
        },
        Commands::Recover => {
            let summary = recover::run_recover(&cfg, &pool).await?;
            println!("recover");
            println!("  scanned: {}", summary.scanned);
            println!("  repaired: {}", summary.repaired);
            println!("  reviews created: {}", summary.reviews_created);
        }
        Commands::Status { user_id } => match status::onboarding_status(&pool, &user_id).await? {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => anyhow::bail!("unknown user: {}", user_id),
        },
        Commands::Profile { user_id } => match status::profile(&pool, &user_id).await? {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => anyhow::bail!("unknown user: {}", user_id),
        },
        Commands::Complete { user_id } => {
            let created = status::complete_onboarding(&cfg, &pool, &user_id).await?;
            println!("completed onboarding for {}", user_id);
            println!("  reviews created: {}", created);
        }
        Commands::Stats => {
            stats::run_stats(&cfg, &pool).await?;
        }
    }

    pool.close().await;
    Ok(())
}
