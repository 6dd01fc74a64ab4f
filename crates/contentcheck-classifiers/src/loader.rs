//! Model loading backends
//!
//! The registry resolves each content type's [`ModelEntry`] through a
//! [`ModelLoader`]. [`CandleModelLoader`] is the production backend; tests
//! substitute their own to exercise the registry without real weights.

use crate::classifier::{SequenceClassifier, TextEncoder};
use crate::config::{ModelEntry, ModelSource};
use crate::models::ConfigHints;
use crate::tokenizer::HfTextEncoder;
use candle_core::Device;
use contentcheck_core::{ContentType, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tokenizer and classifier loaded for one content type
pub struct LoadedModel {
    pub encoder: Arc<dyn TextEncoder>,
    pub classifier: Arc<dyn SequenceClassifier>,
}

/// Pluggable backend turning a configured model into a tokenizer/classifier pair
pub trait ModelLoader: Send + Sync {
    fn load(
        &self,
        content_type: ContentType,
        entry: &ModelEntry,
        device: &Device,
    ) -> Result<LoadedModel>;
}

/// Files fetched from the Hub; only `config.json` and the weights are required
const HUB_REQUIRED_FILES: &[&str] = &["config.json", "model.safetensors"];
const HUB_OPTIONAL_FILES: &[&str] = &[
    "tokenizer.json",
    "tokenizer_config.json",
    "vocab.txt",
    "vocab.json",
    "merges.txt",
];

/// Loads safetensors checkpoints with Candle
#[derive(Debug, Default, Clone)]
pub struct CandleModelLoader;

impl CandleModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a model source to a local directory, downloading if needed
    pub fn resolve_model_dir(&self, source: &ModelSource) -> Result<PathBuf> {
        match source {
            ModelSource::Local { path } => {
                if !path.is_dir() {
                    return Err(Error::registry_load(format!(
                        "Model directory does not exist: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            ModelSource::HuggingFace { repo, revision } => {
                download_from_huggingface(repo, revision)
            }
        }
    }
}

impl ModelLoader for CandleModelLoader {
    fn load(
        &self,
        content_type: ContentType,
        entry: &ModelEntry,
        device: &Device,
    ) -> Result<LoadedModel> {
        let model_dir = self.resolve_model_dir(&entry.source)?;
        let hints = ConfigHints::from_dir(&model_dir)?;

        let encoder =
            HfTextEncoder::from_dir(&model_dir, entry.architecture.position_limit(&hints))?;
        let classifier = entry
            .architecture
            .load(&entry.display_name(), &model_dir, device)?;

        tracing::debug!(
            "{} model ready: {} (default max length {})",
            content_type,
            classifier.name(),
            encoder.default_max_length()
        );

        Ok(LoadedModel {
            encoder: Arc::new(encoder),
            classifier: Arc::from(classifier),
        })
    }
}

fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    use hf_hub::{api::sync::Api, Repo, RepoType};

    tracing::info!("Downloading model from HuggingFace: {} @ {}", repo, revision);

    let api = Api::new().map_err(|e| {
        Error::registry_load(format!("Failed to initialize HuggingFace API: {}", e))
    })?;
    let hub_repo = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let mut model_dir: Option<PathBuf> = None;
    for file in HUB_REQUIRED_FILES {
        tracing::debug!("Downloading {}", file);
        let path = hub_repo.get(file).map_err(|e| {
            Error::registry_load(format!("Failed to download {} from {}: {}", file, repo, e))
        })?;
        model_dir = path.parent().map(Path::to_path_buf);
    }

    // Which tokenizer files exist depends on how the checkpoint was saved
    for file in HUB_OPTIONAL_FILES {
        if let Err(e) = hub_repo.get(file) {
            tracing::debug!("{} not available in {}: {}", file, repo, e);
        }
    }

    model_dir.ok_or_else(|| Error::registry_load(format!("Invalid cache path for {}", repo)))
}
