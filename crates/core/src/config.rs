//! Configuration management for docqa.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config file (`.docqa/config.yaml`, or the path in `DOCQA_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. The configuration is workspace-centric: relative
//! vector store paths resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Vector store backends accepted by `vectorStore.backend`.
pub const KNOWN_STORE_BACKENDS: [&str; 5] = ["flat", "faiss", "collection", "lancedb", "chroma"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider identifier (e.g., "ollama", "openai")
    pub provider: String,

    /// Generation model identifier; `None` means the provider's default
    pub model: Option<String>,

    /// API key override for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Generation provider configurations
    pub llm: Option<LlmConfig>,

    /// Embedding model settings
    pub embedding: EmbeddingSection,

    /// Vector store settings
    pub vector_store: VectorStoreSection,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSection {
    /// Embedding provider: "ollama" or "trigram"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier passed to the provider
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimension
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Provider endpoint (Ollama base URL)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            endpoint: None,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorStoreSection {
    /// Backend selector: "flat" or "collection"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Storage directory
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_backend() -> String {
    "flat".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/vector_store")
}

impl Default for VectorStoreSection {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingSection>,
    #[serde(rename = "vectorStore")]
    vector_store: Option<VectorStoreSection>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingSection::default(),
            vector_store: VectorStoreSection::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `DOCQA_WORKSPACE`: Override workspace path
    /// - `DOCQA_CONFIG`: Path to config file
    /// - `DOCQA_PROVIDER`: Generation provider
    /// - `DOCQA_MODEL`: Generation model identifier
    /// - `DOCQA_API_KEY`: API key
    /// - `DOCQA_EMBEDDING_PROVIDER` / `DOCQA_EMBEDDING_MODEL`
    /// - `DOCQA_VECTOR_STORE_BACKEND` / `DOCQA_VECTOR_STORE_PATH`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`], reading variables through `env`.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = env("DOCQA_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = env("DOCQA_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.docqa_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        config.apply_env(&env);

        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(provider) = env("DOCQA_PROVIDER") {
            self.switch_provider(provider);
        }

        if let Some(model) = env("DOCQA_MODEL") {
            self.model = Some(model);
        }

        if let Some(key) = env("DOCQA_API_KEY") {
            self.api_key = Some(key);
        }

        if let Some(provider) = env("DOCQA_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(model) = env("DOCQA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(backend) = env("DOCQA_VECTOR_STORE_BACKEND") {
            self.vector_store.backend = backend;
        }

        if let Some(path) = env("DOCQA_VECTOR_STORE_PATH") {
            self.vector_store.path = PathBuf::from(path);
        }

        if let Some(level) = env("RUST_LOG") {
            self.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(store) = config_file.vector_store {
            result.vector_store = store;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            result.model = llm
                .providers
                .get(&llm.active_provider)
                .map(|entry| entry.model().to_string());

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.switch_provider(provider);
        }

        if let Some(model) = model {
            self.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Select a generation provider. The model follows the provider's
    /// configured entry, or the provider default when there is none.
    fn switch_provider(&mut self, provider: String) {
        if provider != self.provider {
            self.model = self
                .get_provider_config(&provider)
                .map(|entry| entry.model().to_string());
        }
        self.provider = provider;
    }

    /// Get the path to the .docqa directory.
    pub fn docqa_dir(&self) -> PathBuf {
        self.workspace.join(".docqa")
    }

    /// Resolve the vector store directory against the workspace.
    pub fn store_path(&self) -> PathBuf {
        if self.vector_store.path.is_absolute() {
            self.vector_store.path.clone()
        } else {
            self.workspace.join(&self.vector_store.path)
        }
    }

    /// Get the configuration entry for a generation provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key for a provider.
    ///
    /// `DOCQA_API_KEY` wins; otherwise the provider's `apiKeyEnv` variable
    /// is consulted, falling back to `OPENAI_API_KEY` for openai.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.resolve_api_key_with(provider, |key| std::env::var(key).ok())
    }

    fn resolve_api_key_with(
        &self,
        provider: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let key = match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => env(&api_key_env),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider.eq_ignore_ascii_case("openai") => env("OPENAI_API_KEY"),
            None => None,
        };

        key.filter(|key| !key.trim().is_empty())
    }

    /// Resolve the endpoint URL configured for a provider, if any.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint,
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    /// Validate the parts of the configuration that are checked at startup.
    ///
    /// The generation provider is deliberately not checked here: an unknown
    /// provider surfaces when the first answer is generated.
    pub fn validate(&self) -> AppResult<()> {
        let backend = self.vector_store.backend.trim().to_lowercase();
        if !KNOWN_STORE_BACKENDS.contains(&backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown vector store backend: {}. Supported: {}",
                self.vector_store.backend,
                KNOWN_STORE_BACKENDS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
