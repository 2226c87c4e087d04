use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_max_depth() -> usize {
    3
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// Weight-store delta applied per phrase on a feedback update.
    #[serde(default = "default_scoring_multiplier")]
    pub scoring_multiplier: f64,
    /// Minimum combined score for a comment to rank as secondary context.
    #[serde(default)]
    pub relevance_threshold: f64,
    #[serde(default = "default_max_relevant_comments")]
    pub max_relevant_comments: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scoring_multiplier: default_scoring_multiplier(),
            relevance_threshold: 0.0,
            max_relevant_comments: default_max_relevant_comments(),
        }
    }
}

fn default_scoring_multiplier() -> f64 {
    1.0
}
fn default_max_relevant_comments() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Token budget for the serialized primary context.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
        }
    }
}

fn default_token_budget() -> usize {
    12_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Environment variable holding the API bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.crawler.max_depth < 1 {
        anyhow::bail!("crawler.max_depth must be >= 1");
    }

    if config.crawler.fetch_timeout_secs == 0 {
        anyhow::bail!("crawler.fetch_timeout_secs must be > 0");
    }

    if config.scoring.scoring_multiplier <= 0.0 {
        anyhow::bail!("scoring.scoring_multiplier must be > 0");
    }

    if config.scoring.max_relevant_comments < 1 {
        anyhow::bail!("scoring.max_relevant_comments must be >= 1");
    }

    if config.context.token_budget < 1 {
        anyhow::bail!("context.token_budget must be >= 1");
    }

    Ok(config)
}
