use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub movierag: MovieragConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// MovieRAG-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MovieragConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Chat model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Deadline for a single model round trip
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Transport-level retries on 429/5xx. Zero keeps one round trip per prompt.
    #[serde(default)]
    pub max_retries: usize,
}

/// Which retriever handles questions the topic gate lets through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverKind {
    /// Hand-written lookups chosen by the query selector
    Selector,
    /// SQL written by the model against the graph schema
    Generated,
}

/// How the topic gate reads the classifier's yes/no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStrategyKind {
    Substring,
    Strict,
}

/// Retrieval routing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_retriever")]
    pub retriever: RetrieverKind,
    #[serde(default = "default_verdict_strategy")]
    pub verdict_strategy: VerdictStrategyKind,
    /// Issue title extraction and operation classification concurrently
    #[serde(default = "default_parallel_classification")]
    pub parallel_classification: bool,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_max_generated_rows")]
    pub max_generated_rows: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retriever: default_retriever(),
            verdict_strategy: default_verdict_strategy(),
            parallel_classification: default_parallel_classification(),
            store_timeout_secs: default_store_timeout_secs(),
            max_generated_rows: default_max_generated_rows(),
        }
    }
}

/// Assistant configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Number of chat messages kept in the conversation window
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            memory_window: default_memory_window(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_retriever() -> RetrieverKind {
    RetrieverKind::Selector
}

fn default_verdict_strategy() -> VerdictStrategyKind {
    VerdictStrategyKind::Substring
}

fn default_parallel_classification() -> bool {
    true
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_max_generated_rows() -> usize {
    50
}

fn default_memory_window() -> usize {
    10
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in MOVIERAG_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("MOVIERAG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&config_str)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration text without touching the environment
    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).context("Failed to parse config.toml")
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.llm.provider != "openai" {
            anyhow::bail!(
                "llm.provider '{}' is not supported (expected \"openai\")",
                self.llm.provider
            );
        }

        std::env::var(&self.llm.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your OpenAI API key.",
                self.llm.api_key_env
            )
        })?;

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be greater than 0");
        }

        if self.retrieval.store_timeout_secs == 0 {
            anyhow::bail!("retrieval.store_timeout_secs must be greater than 0");
        }

        if self.retrieval.max_generated_rows == 0 {
            anyhow::bail!("retrieval.max_generated_rows must be greater than 0");
        }

        if self.assistant.memory_window == 0 {
            anyhow::bail!("assistant.memory_window must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.movierag.db_path
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval.store_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[movierag]
db_path = "./test.db"

[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "MOVIERAG_TEST_API_KEY"
"#;

    const FULL: &str = r#"
[movierag]
db_path = "./test.db"
log_level = "debug"

[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "MOVIERAG_TEST_API_KEY"
base_url = "http://localhost:8080/v1"
temperature = 0.0
timeout_secs = 5
max_retries = 2

[retrieval]
retriever = "generated"
verdict_strategy = "strict"
parallel_classification = false
store_timeout_secs = 3
max_generated_rows = 7

[assistant]
memory_window = 4
"#;

    fn with_config_env(config_path: &std::path::Path, api_key: Option<&str>, f: impl FnOnce()) {
        let original_config = std::env::var("MOVIERAG_CONFIG").ok();
        let original_key = std::env::var("MOVIERAG_TEST_API_KEY").ok();
        std::env::set_var("MOVIERAG_CONFIG", config_path.to_str().unwrap());
        match api_key {
            Some(k) => std::env::set_var("MOVIERAG_TEST_API_KEY", k),
            None => std::env::remove_var("MOVIERAG_TEST_API_KEY"),
        }
        f();
        std::env::remove_var("MOVIERAG_CONFIG");
        std::env::remove_var("MOVIERAG_TEST_API_KEY");
        if let Some(val) = original_config {
            std::env::set_var("MOVIERAG_CONFIG", val);
        }
        if let Some(val) = original_key {
            std::env::set_var("MOVIERAG_TEST_API_KEY", val);
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.movierag.log_level, "info");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.retrieval.retriever, RetrieverKind::Selector);
        assert_eq!(config.retrieval.verdict_strategy, VerdictStrategyKind::Substring);
        assert!(config.retrieval.parallel_classification);
        assert_eq!(config.assistant.memory_window, 10);
    }

    #[test]
    fn test_full_config_parsed() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.retrieval.retriever, RetrieverKind::Generated);
        assert_eq!(config.retrieval.verdict_strategy, VerdictStrategyKind::Strict);
        assert!(!config.retrieval.parallel_classification);
        assert_eq!(config.store_timeout(), Duration::from_secs(3));
        assert_eq!(config.llm_timeout(), Duration::from_secs(5));
        assert_eq!(config.assistant.memory_window, 4);
    }

    #[test]
    fn test_unknown_retriever_rejected() {
        let text = MINIMAL.to_string() + "\n[retrieval]\nretriever = \"cypher\"\n";
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, FULL).unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            assert_eq!(config.unwrap().movierag.log_level, "debug");
        });
    }

    #[test]
    fn test_config_missing_api_key() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, MINIMAL).unwrap();
        with_config_env(&config_path, None, || {
            let config = Config::load();
            assert!(config.is_err(), "Expected missing API key error");
            assert!(config
                .unwrap_err()
                .to_string()
                .contains("MOVIERAG_TEST_API_KEY"));
        });
    }

    #[test]
    fn test_config_zero_memory_window_rejected() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let text = MINIMAL.to_string() + "\n[assistant]\nmemory_window = 0\n";
        fs::write(&config_path, text).unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let err = Config::load().unwrap_err();
            assert!(err.to_string().contains("memory_window"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("MOVIERAG_CONFIG").ok();
        std::env::set_var("MOVIERAG_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("MOVIERAG_CONFIG");
        if let Some(v) = original {
            std::env::set_var("MOVIERAG_CONFIG", v);
        }
    }
}
