//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_CHUNKING__MAX_CHARS=800`). Values are fixed for the process lifetime.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::Namespace;

pub const DEFAULT_NAMESPACE: &str = "Sample";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_namespace: String,
    pub chunking: ChunkingConfig,
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub sample_document: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            chunking: ChunkingConfig::default(),
            search: SearchSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            sample_document: "assets/sample.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_k: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_k: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// XLM-RoBERTa (BGE-M3) weights loaded from `model_dir`.
    Local,
    /// Deterministic token hashing; no model files needed.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model_dir: Option<String>,
    pub dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Local, model_dir: None, dim: 1024, max_len: 256, batch_size: 32 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Lance,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    /// Location of the index. Absent means the engine starts disabled.
    pub uri: Option<String>,
    pub table_prefix: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { backend: IndexBackend::Lance, uri: None, table_prefix: "kb_".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        Namespace::new(&self.default_namespace)
            .map_err(|_| Error::config(format!("default_namespace {:?} is not a valid namespace", self.default_namespace)))?;
        if self.search.default_k == 0 {
            return Err(Error::config("search.default_k must be at least 1"));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::config("embedding.batch_size must be at least 1"));
        }
        if self.embedding.dim == 0 || self.embedding.max_len == 0 {
            return Err(Error::config("embedding.dim and embedding.max_len must be positive"));
        }
        Ok(())
    }

    pub fn default_namespace(&self) -> Result<Namespace> {
        Namespace::new(&self.default_namespace).map_err(Error::config)
    }

    pub fn sample_document_path(&self) -> PathBuf {
        expand_path(&self.sample_document)
    }

    /// `APP_USE_FAKE_EMBEDDINGS=1` switches to the hashing embedder.
    pub fn apply_fake_embeddings_override(&mut self) {
        let use_fake = env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if use_fake {
            self.embedding.provider = EmbeddingProvider::Hash;
        }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self::load_from(Path::new("."), &env_name))
    }

    /// Layer the config files found in `dir` for `env_name` over the defaults.
    pub fn load_from(dir: &Path, env_name: &str) -> Self {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self { figment }
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self.figment.extract().map_err(Error::config)?;
        settings.apply_fake_embeddings_override();
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
