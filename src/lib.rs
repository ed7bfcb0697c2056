//! # Reviewflow
//!
//! A review ingestion, onboarding, and enrichment backend.
//!
//! Reviewflow pulls third-party product reviews from multiple external
//! sources (app stores, review aggregators), normalizes them into a common
//! record shape, and tracks each user's onboarding progress through a
//! multi-stage, resumable pipeline. Stored records are later batch-enriched
//! with sentiment/category labels and vector embeddings.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │   Adapters   │──▶│  Onboarding  │──▶│  SQLite    │
//! │ AppStore/GP/ │   │   pipeline   │   │ reviews +  │
//! │  Trustpilot  │   │ (3 substeps) │   │ contexts   │
//! └──────┬───────┘   └──────────────┘   └─────┬─────┘
//!        │ fallback                           │
//! ┌──────▼───────┐                      ┌─────▼──────┐
//! │  Generator   │                      │ Enrichment  │
//! │  (synthetic) │                      │ sentiment + │
//! └──────────────┘                      │ embeddings  │
//!                                       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rvw init                          # create database
//! rvw register --email a@b.com --website-url https://uber.com
//! rvw onboard <user-id>             # run the onboarding pipeline
//! rvw enrich sentiment              # label stored reviews
//! rvw embed pending                 # generate embeddings
//! rvw recover                       # repair stuck contexts
//! rvw status <user-id>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`adapters`] | Per-source review adapters |
//! | [`generator`] | Synthetic fallback content |
//! | [`pipeline`] | Onboarding state machine |
//! | [`enrich`] | Sentiment/category batch enrichment |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`embed_cmd`] | Embedding backfill pass |
//! | [`recover`] | Stuck-context repair |
//! | [`status`] | Status, profile, and completion boundary |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod adapters;
pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod embedding;
pub mod enrich;
pub mod error;
pub mod generator;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod recover;
pub mod stats;
pub mod status;
pub mod store;
