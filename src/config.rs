use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Bounded retry for the whole onboarding run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    /// Pauses between sub-steps spread load; they do not wait on anything.
    #[serde(default = "default_substep_pause_ms")]
    pub substep_pause_ms: u64,
    #[serde(default = "default_step2_pause_ms")]
    pub step2_pause_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
            substep_pause_ms: default_substep_pause_ms(),
            step2_pause_ms: default_step2_pause_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_secs() -> u64 {
    60
}
fn default_substep_pause_ms() -> u64 {
    1000
}
fn default_step2_pause_ms() -> u64 {
    2000
}

/// How many synthetic reviews to create per source when a live fetch fails
/// or a stuck context is backfilled.
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    #[serde(default = "default_appstore_count")]
    pub appstore: usize,
    #[serde(default = "default_googleplay_count")]
    pub googleplay: usize,
    #[serde(default = "default_trustpilot_count")]
    pub trustpilot: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            appstore: default_appstore_count(),
            googleplay: default_googleplay_count(),
            trustpilot: default_trustpilot_count(),
        }
    }
}

fn default_appstore_count() -> usize {
    15
}
fn default_googleplay_count() -> usize {
    10
}
fn default_trustpilot_count() -> usize {
    8
}

impl FallbackConfig {
    pub fn count_for(&self, source: &crate::models::Source) -> usize {
        use crate::models::Source;
        match source {
            Source::AppStore => self.appstore,
            Source::GooglePlay => self.googleplay,
            _ => self.trustpilot,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdaptersConfig {
    /// Base URL of the iTunes RSS feed host.
    #[serde(default = "default_appstore_base")]
    pub appstore_base: String,
    /// Base URL of the Play Store listing host.
    #[serde(default = "default_googleplay_base")]
    pub googleplay_base: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_adapter_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            appstore_base: default_appstore_base(),
            googleplay_base: default_googleplay_base(),
            country: default_country(),
            language: default_language(),
            timeout_secs: default_adapter_timeout_secs(),
        }
    }
}

fn default_appstore_base() -> String {
    "https://itunes.apple.com".to_string()
}
fn default_googleplay_base() -> String {
    "https://play.google.com".to_string()
}
fn default_country() -> String {
    "us".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_adapter_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    /// Classification service endpoint accepting a CSV upload.
    pub service_url: Option<String>,
    #[serde(default = "default_enrich_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_enrich_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            batch_size: default_enrich_batch_size(),
            timeout_secs: default_enrich_timeout_secs(),
        }
    }
}

fn default_enrich_batch_size() -> usize {
    50
}
fn default_enrich_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: default_embed_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embed_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.pipeline.max_attempts == 0 {
        anyhow::bail!("pipeline.max_attempts must be >= 1");
    }

    if config.enrichment.batch_size == 0 {
        anyhow::bail!("enrichment.batch_size must be > 0");
    }

    if config.fallback.appstore == 0 && config.fallback.googleplay == 0 && config.fallback.trustpilot == 0
    {
        anyhow::bail!("at least one fallback count must be > 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}
