//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested with `__`, e.g. `APP_SEARCH__MAX_LIMIT`). The well-known secrets
//! `OPENAI_API_KEY` and `DATABASE_URL` are picked up last. Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known base
//! directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::request::{RequestDefaults, DEFAULT_MAX_LIMIT};
use crate::types::{FusionWeights, DEFAULT_FTS_WEIGHT, DEFAULT_FUZZY_THRESHOLD, DEFAULT_LIMIT, DEFAULT_SEMANTIC_WEIGHT};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::raw().only(&["OPENAI_API_KEY"]).map(|_| "embedding.api_key".into()))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "store.database_url".into()));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match env {
            "prod" | "production" => {
                if settings.store.backend == StoreBackend::Postgres && settings.store.database_url.is_none() {
                    anyhow::bail!("store.database_url (or DATABASE_URL) is required in production");
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.search;
        if s.default_limit == 0 || s.default_limit > s.max_limit {
            anyhow::bail!("search.default_limit must be between 1 and search.max_limit ({})", s.max_limit);
        }
        if !(s.fts_weight >= 0.0 && s.semantic_weight >= 0.0) {
            anyhow::bail!("search weights must be non-negative");
        }
        if !(0.0..=1.0).contains(&s.fuzzy_threshold) {
            anyhow::bail!("search.fuzzy_threshold must be within [0, 1]");
        }
        if self.embedding.dimensions == 0 {
            anyhow::bail!("embedding.dimensions must be positive");
        }
        if self.store.max_connections == 0 {
            anyhow::bail!("store.max_connections must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self { Self { host: "127.0.0.1".to_string(), port: 8080 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub fts_weight: f32,
    pub semantic_weight: f32,
    pub fuzzy_threshold: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            fts_weight: DEFAULT_FTS_WEIGHT,
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl From<&SearchSettings> for RequestDefaults {
    fn from(s: &SearchSettings) -> Self {
        Self {
            limit: s.default_limit,
            max_limit: s.max_limit,
            weights: FusionWeights::new(s.fts_weight, s.semantic_weight),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub dimensions: usize,
    pub endpoint: String,
    /// Left empty in files; comes from `OPENAI_API_KEY` or `APP_EMBEDDING__API_KEY`.
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// JSON seed (`{"suppliers": [...], "products": [...]}`) for the memory backend.
    pub seed_file: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { backend: StoreBackend::default(), database_url: None, max_connections: 5, seed_file: None }
    }
}

/// Expands `~` and `$VAR` in a configured file path (seed file, products file).
/// Unknown variables are left as written.
pub fn expand_path(raw: &str) -> PathBuf {
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}
