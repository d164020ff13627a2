use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible endpoint base URL.
    pub base_url: String,
    /// API key; usually injected via the `GSATVOCAB_API_KEY` env variable.
    pub api_key: String,
    /// Fast model for simple high-volume batches (definition generation,
    /// WSD fallback).
    pub model_fast: String,
    /// Balanced model for sense clustering.
    pub model_balanced: String,
    /// Smart model for pattern teaching content.
    pub model_smart: String,
    pub embedding_model: String,
    /// Maximum in-flight LLM requests.
    pub concurrency: usize,
    /// Minimum seconds between request starts.
    pub request_delay: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model_fast: "gpt-4.1".to_string(),
            model_balanced: "gpt-5-mini".to_string(),
            model_smart: "gpt-5.1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            concurrency: 12,
            request_delay: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Base URL of the free dictionary API; `/{lemma}` is appended per request.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: "data/registry/sense_registry.redb".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub dictionary: DictionaryConfig,
    pub registry: RegistryConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration: defaults, overlaid by the TOML file at `path`
    /// when present, overlaid by environment variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, no config file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        fn set(target: &mut String, key: &str) {
            if let Ok(value) = env::var(key) {
                if !value.is_empty() {
                    *target = value;
                }
            }
        }
        set(&mut self.llm.api_key, "GSATVOCAB_API_KEY");
        set(&mut self.llm.base_url, "GSATVOCAB_BASE_URL");
        set(&mut self.llm.model_fast, "GSATVOCAB_MODEL_FAST");
        set(&mut self.llm.model_balanced, "GSATVOCAB_MODEL_BALANCED");
        set(&mut self.llm.model_smart, "GSATVOCAB_MODEL_SMART");
        set(&mut self.llm.embedding_model, "GSATVOCAB_EMBEDDING_MODEL");
        set(&mut self.registry.path, "GSATVOCAB_REGISTRY_PATH");

        if let Ok(value) = env::var("GSATVOCAB_LLM_CONCURRENCY") {
            if let Ok(n) = value.parse() {
                self.llm.concurrency = n;
            }
        }
        if let Ok(value) = env::var("GSATVOCAB_LLM_REQUEST_DELAY") {
            if let Ok(n) = value.parse() {
                self.llm.request_delay = n;
            }
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}
