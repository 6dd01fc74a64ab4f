//! Registry configuration
//!
//! One [`ModelEntry`] per content type, plus the device every model runs on.
//!
//! ```yaml
//! device: cpu
//! models:
//!   email:
//!     name: distilbert-email
//!     source:
//!       type: local
//!       path: ./models/fine_tuned_distilbert_email
//!     architecture: distilbert
//!   social_media:
//!     source:
//!       type: huggingface
//!       repo: acme/roberta-social
//!     architecture: roberta
//!     labels: [REAL, FAKE]
//! ```

use crate::models::Architecture;
use candle_core::Device;
use contentcheck_core::{ContentType, Error, LabelMap, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "CONTENTCHECK_CONFIG";

/// Configuration for the model registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Device all models are loaded onto
    #[serde(default)]
    pub device: DeviceSpec,

    /// Model per content type
    pub models: BTreeMap<ContentType, ModelEntry>,
}

/// Configuration for a single content type's model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model name used in logs; defaults to the source location
    #[serde(default)]
    pub name: Option<String>,

    /// Where the tokenizer and weights live
    pub source: ModelSource,

    /// Classifier architecture of the checkpoint
    pub architecture: Architecture,

    /// Override for the content type's default label pair
    #[serde(default)]
    pub labels: Option<LabelMap>,
}

impl ModelEntry {
    pub fn local(path: impl Into<PathBuf>, architecture: Architecture) -> Self {
        Self {
            name: None,
            source: ModelSource::Local { path: path.into() },
            architecture,
            labels: None,
        }
    }

    /// Name for logs and metrics
    pub fn display_name(&self) -> String {
        match (&self.name, &self.source) {
            (Some(name), _) => name.clone(),
            (None, ModelSource::Local { path }) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            (None, ModelSource::HuggingFace { repo, .. }) => repo.clone(),
        }
    }
}

/// Model source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Directory on the local filesystem
    Local { path: PathBuf },

    /// Repository on the HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_revision() -> String {
    "main".to_string()
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::HuggingFace { repo, revision } => write!(f, "hf://{}@{}", repo, revision),
        }
    }
}

/// Device specification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

impl DeviceSpec {
    /// Initialize the candle device
    pub fn to_device(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda => Device::new_cuda(0)
                .map_err(|e| Error::registry_load(format!("Failed to initialize CUDA: {}", e))),
            Self::Metal => Device::new_metal(0)
                .map_err(|e| Error::registry_load(format!("Failed to initialize Metal: {}", e))),
        }
    }
}

impl Default for RegistryConfig {
    /// The four fine-tuned checkpoints under `./models`
    fn default() -> Self {
        let models_dir = Path::new("models");
        let models = ContentType::ALL
            .iter()
            .map(|&content_type| {
                let (dir, architecture) = default_model(content_type);
                (content_type, ModelEntry::local(models_dir.join(dir), architecture))
            })
            .collect();

        Self {
            device: DeviceSpec::Cpu,
            models,
        }
    }
}

fn default_model(content_type: ContentType) -> (&'static str, Architecture) {
    match content_type {
        ContentType::Email => ("fine_tuned_distilbert_email", Architecture::DistilBert),
        ContentType::Sms => ("fine_tuned_mobilebert_sms", Architecture::MobileBert),
        ContentType::NewsArticle => ("fine_tuned_bert_news", Architecture::Bert),
        ContentType::SocialMedia => ("fine_tuned_roberta_social", Architecture::Roberta),
    }
}

impl RegistryConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid registry config: {}", e)))
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load from an explicit path, then `CONTENTCHECK_CONFIG`, then defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_file(PathBuf::from(path)),
            _ => {
                tracing::debug!("No registry config given, using default model locations");
                Ok(Self::default())
            }
        }
    }

    /// Get the entry for a content type
    pub fn model(&self, content_type: ContentType) -> Option<&ModelEntry> {
        self.models.get(&content_type)
    }
}
