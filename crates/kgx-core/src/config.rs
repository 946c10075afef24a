//! KGX Configuration Management
//!
//! One immutable `PipelineConfig` per pipeline instance, built from
//! environment variables or a TOML file and validated before any model
//! call is made. Components receive it by reference; there is no global
//! mutable state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Text chunking parameters
    pub chunking: ChunkingConfig,

    /// Extraction mode and validation toggles
    pub extraction: ExtractionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
            config.llm.model = config.llm.provider.default_model().to_string();
        }
        if let Ok(model) = std::env::var("LLM_MODEL_NAME") {
            config.llm.model = model;
        }
        if let Ok(temp) = std::env::var("LLM_TEMPERATURE") {
            config.llm.temperature = temp.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LLM_TEMPERATURE".to_string(),
                value: temp,
            })?;
        }
        if let Ok(tokens) = std::env::var("LLM_MAX_TOKENS") {
            config.llm.max_tokens = tokens.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LLM_MAX_TOKENS".to_string(),
                value: tokens,
            })?;
        }

        config.llm.api_key = match config.llm.provider {
            ModelProvider::OpenAi => std::env::var("OPENAI_API_KEY").ok(),
            ModelProvider::Anthropic => std::env::var("ANTHROPIC_API_KEY").ok(),
        };
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.llm.api_base = Some(base);
        }

        if let Ok(size) = std::env::var("CHUNK_SIZE") {
            config.chunking.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }
        if let Ok(overlap) = std::env::var("CHUNK_OVERLAP") {
            config.chunking.chunk_overlap =
                overlap.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "CHUNK_OVERLAP".to_string(),
                    value: overlap,
                })?;
        }

        if let Ok(mode) = std::env::var("EXTRACTION_MODE") {
            config.extraction.mode = mode.parse()?;
        }
        if let Ok(path) = std::env::var("ONTOLOGY_PATH") {
            config.extraction.ontology_path = Some(PathBuf::from(path));
        }
        if let Ok(flag) = std::env::var("ENABLE_VALIDATION") {
            config.extraction.enable_validation = flag.to_lowercase() == "true";
        }
        if let Ok(flag) = std::env::var("ENABLE_NORMALIZATION") {
            config.extraction.enable_normalization = flag.to_lowercase() == "true";
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Called before any model call is made;
    /// every failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "llm.temperature".to_string(),
                value: self.llm.temperature.to_string(),
            });
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.max_tokens".to_string(),
                value: "0".to_string(),
            });
        }
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_overlap".to_string(),
                value: format!(
                    "{} (must be smaller than chunk_size {})",
                    self.chunking.chunk_overlap, self.chunking.chunk_size
                ),
            });
        }
        if self.extraction.mode == ExtractionMode::JsonLd
            && self.extraction.ontology_path.is_none()
        {
            return Err(ConfigError::MissingRequired(
                "extraction.ontology_path (required for jsonld mode)".to_string(),
            ));
        }
        Ok(())
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider to use
    pub provider: ModelProvider,

    /// Model name
    pub model: String,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// API key (from environment; never serialized)
    #[serde(skip)]
    pub api_key: Option<String>,

    /// API base URL override (for Azure or compatible endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAi,
            model: ModelProvider::OpenAi.default_model().to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            api_key: None,
            api_base: None,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    OpenAi,
    Anthropic,
}

impl ModelProvider {
    /// Default model for each provider
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4-turbo",
            Self::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Text chunking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum words per chunk
    pub chunk_size: usize,

    /// Words shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 100,
        }
    }
}

/// Extraction mode selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Triples,
    JsonLd,
}

impl std::str::FromStr for ExtractionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triples" => Ok(Self::Triples),
            "jsonld" => Ok(Self::JsonLd),
            _ => Err(ConfigError::InvalidValue {
                key: "EXTRACTION_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Triples => write!(f, "triples"),
            Self::JsonLd => write!(f, "jsonld"),
        }
    }
}

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Output shape: SPO triples or ontology-constrained JSON-LD
    pub mode: ExtractionMode,

    /// OWL/RDF-XML ontology source (required for jsonld mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_path: Option<PathBuf>,

    /// Reject items that fail ontology validation
    pub enable_validation: bool,

    /// Normalize and deduplicate across chunks
    pub enable_normalization: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Triples,
            ontology_path: None,
            enable_validation: true,
            enable_normalization: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
