//! TOML configuration parsing and validation.
//!
//! Every section has serde defaults, so a missing config file yields a
//! fully usable default configuration. A config file that is present but
//! malformed or out of range is a fatal startup error — the assistant
//! refuses to start rather than serve with bad thresholds or a corrupt
//! rule table.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Minimum similarity for a search result to count. The reference
    /// system shipped several values over its lifetime; this is the final
    /// one.
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f32,
    /// Passages fetched per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Rule fuzzy-match cutoff (word-overlap score must exceed this).
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_floor: default_relevance_floor(),
            top_k: default_top_k(),
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

fn default_relevance_floor() -> f32 {
    0.1
}
fn default_top_k() -> usize {
    3
}
fn default_fuzzy_threshold() -> f32 {
    0.4
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Response cache capacity; 0 means unbounded (the reference
    /// behavior). When bounded, the oldest entry is evicted first.
    #[serde(default)]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 0 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Seed (and reseed after clear) the built-in case-study passages.
    #[serde(default = "default_true")]
    pub seed_baseline: bool,
    /// Extra files or directories ingested at startup.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Glob patterns applied when a corpus path is a directory.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            seed_baseline: true,
            paths: Vec::new(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
        "**/*.pdf".to_string(),
        "**/*.docx".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KnowledgeConfig {
    /// Optional TOML file of extra `[[rule]]` entries appended to the
    /// built-in rule table.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `disabled`, `openai`, or `ollama`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model name; required unless the provider is disabled.
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override (Ollama only).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_retries() -> u32 {
    3
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8723".to_string()
}

/// Load configuration: defaults when no path is given, a validated file
/// otherwise.
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => Ok(Config::default()),
    }
}

/// Load and validate a configuration file. Any violation is fatal.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(0.0..1.0).contains(&config.retrieval.relevance_floor) {
        anyhow::bail!("retrieval.relevance_floor must be in [0.0, 1.0)");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if !(0.0..1.0).contains(&config.retrieval.fuzzy_threshold) {
        anyhow::bail!("retrieval.fuzzy_threshold must be in [0.0, 1.0)");
    }

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    match config.generation.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if config.generation.is_enabled() && config.generation.model.is_none() {
        anyhow::bail!(
            "generation.model must be specified when provider is '{}'",
            config.generation.provider
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retrieval.relevance_floor, 0.1);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.fuzzy_threshold, 0.4);
        assert_eq!(config.cache.max_entries, 0);
        assert!(config.corpus.seed_baseline);
        assert_eq!(config.generation.provider, "disabled");
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8723");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbk.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 2\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.retrieval.relevance_floor, 0.1);
    }

    #[test]
    fn test_out_of_range_floor_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbk.toml");
        std::fs::write(&path, "[retrieval]\nrelevance_floor = 1.5\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_enabled_generation_requires_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbk.toml");
        std::fs::write(&path, "[generation]\nprovider = \"openai\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbk.toml");
        std::fs::write(&path, "[generation]\nprovider = \"groq\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
