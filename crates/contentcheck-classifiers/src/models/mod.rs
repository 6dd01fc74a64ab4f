//! Candle-backed sequence classification architectures
//!
//! Each architecture loads a fine-tuned `*ForSequenceClassification`
//! checkpoint (`config.json` + `model.safetensors`) and exposes it as a
//! [`SequenceClassifier`].

pub mod bert;
pub mod distilbert;
pub mod mobilebert;
pub mod roberta;

use crate::classifier::{EncodedInput, SequenceClassifier};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use contentcheck_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use bert::BertSequenceClassifier;
pub use distilbert::DistilBertSequenceClassifier;
pub use mobilebert::MobileBertSequenceClassifier;
pub use roberta::RobertaSequenceClassifier;

/// Every model in the registry is strictly binary
pub const NUM_LABELS: usize = 2;

/// Supported `*ForSequenceClassification` architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Bert,
    DistilBert,
    MobileBert,
    Roberta,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bert => "bert",
            Self::DistilBert => "distilbert",
            Self::MobileBert => "mobilebert",
            Self::Roberta => "roberta",
        }
    }

    /// Longest input the architecture can embed, derived from `config.json`.
    ///
    /// RoBERTa offsets positions by `pad_token_id + 1`, so two slots of its
    /// position table are never addressable.
    pub fn position_limit(&self, hints: &ConfigHints) -> Option<usize> {
        let max_positions = hints.max_position_embeddings?;
        match self {
            Self::Roberta => {
                let offset = hints.pad_token_id.unwrap_or(1) + 1;
                Some(max_positions.saturating_sub(offset))
            }
            _ => Some(max_positions),
        }
    }

    /// Load the classifier for this architecture from a model directory
    pub fn load(
        &self,
        name: &str,
        model_dir: &Path,
        device: &Device,
    ) -> Result<Box<dyn SequenceClassifier>> {
        let vb = load_var_builder(model_dir, device)?;
        let config_path = model_dir.join("config.json");
        let hints: ConfigHints = parse_json_config(&config_path)?;

        let classifier: Box<dyn SequenceClassifier> = match self {
            Self::Bert => Box::new(BertSequenceClassifier::load(
                name,
                vb,
                &parse_json_config(&config_path)?,
                hints.hidden_size(),
                device,
            )?),
            Self::DistilBert => Box::new(DistilBertSequenceClassifier::load(
                name,
                vb,
                &parse_json_config(&config_path)?,
                hints.hidden_size(),
                device,
            )?),
            Self::MobileBert => Box::new(MobileBertSequenceClassifier::load(
                name,
                vb,
                &parse_json_config(&config_path)?,
                device,
            )?),
            Self::Roberta => Box::new(RobertaSequenceClassifier::load(
                name,
                vb,
                &parse_json_config(&config_path)?,
                device,
            )?),
        };

        tracing::info!(
            "Loaded {} sequence classifier '{}' from {}",
            self.as_str(),
            name,
            model_dir.display()
        );

        Ok(classifier)
    }
}

/// Architecture-independent fields of `config.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigHints {
    #[serde(default)]
    pub max_position_embeddings: Option<usize>,

    #[serde(default)]
    pub pad_token_id: Option<usize>,

    #[serde(default)]
    pub hidden_size: Option<usize>,

    /// DistilBERT names its hidden size `dim`
    #[serde(default)]
    pub dim: Option<usize>,
}

impl ConfigHints {
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        parse_json_config(&model_dir.join("config.json"))
    }

    pub fn hidden_size(&self) -> usize {
        self.dim.or(self.hidden_size).unwrap_or(768)
    }
}

pub(crate) fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::registry_load(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::registry_load(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::registry_load(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    // SAFETY: the weights file is only read, and the registry keeps it
    // mapped for the life of the process.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::registry_load(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

/// Try a loader under each weight prefix, returning the first that fits.
///
/// Checkpoints differ in whether the backbone lives under its architecture
/// name (`bert.`, `distilbert.`) or at the root.
pub(crate) fn load_with_prefixes<'a, T>(
    vb: &VarBuilder<'a>,
    prefixes: &[&str],
    what: &str,
    load: impl Fn(VarBuilder<'a>) -> candle_core::Result<T>,
) -> Result<(T, String)> {
    let mut errors = Vec::new();

    for prefix in prefixes {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(*prefix)
        };
        let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };

        match load(vb_prefix) {
            Ok(model) => {
                tracing::debug!("Loaded {} from '{}'", what, effective_prefix);
                return Ok((model, prefix.to_string()));
            }
            Err(e) => errors.push(format!("{}: {}", effective_prefix, e)),
        }
    }

    Err(Error::registry_load(format!(
        "Failed to load {} with tried prefixes [{}]",
        what,
        errors.join(" | ")
    )))
}

/// Context for candle failures on the request path
pub(crate) trait InferenceContext<T> {
    fn inference_context(self, what: &str) -> Result<T>;
}

impl<T> InferenceContext<T> for candle_core::Result<T> {
    fn inference_context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::inference(format!("{}: {}", what, e)))
    }
}

/// Context for candle failures while loading weights
pub(crate) trait LoadContext<T> {
    fn load_context(self, what: &str) -> Result<T>;
}

impl<T> LoadContext<T> for candle_core::Result<T> {
    fn load_context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::registry_load(format!("{}: {}", what, e)))
    }
}

/// Batch-of-one tensors built from an encoding
pub(crate) struct InputTensors {
    pub input_ids: Tensor,
    pub type_ids: Tensor,
    pub attention_mask: Tensor,
}

impl InputTensors {
    pub fn new(input: &EncodedInput, device: &Device) -> Result<Self> {
        if input.is_empty() || !input.is_consistent() {
            return Err(Error::inference(format!(
                "malformed encoding: {} ids, {} type ids, {} mask entries",
                input.input_ids.len(),
                input.type_ids.len(),
                input.attention_mask.len()
            )));
        }

        Ok(Self {
            input_ids: row_tensor(&input.input_ids, device)?,
            type_ids: row_tensor(&input.type_ids, device)?,
            attention_mask: row_tensor(&input.attention_mask, device)?,
        })
    }
}

fn row_tensor(values: &[u32], device: &Device) -> Result<Tensor> {
    Tensor::new(values, device)
        .and_then(|t| t.unsqueeze(0))
        .inference_context("Failed to create input tensor")
}

/// Flatten `(1, num_labels)` logits and check the label count
pub(crate) fn logits_to_vec(logits: &Tensor) -> Result<Vec<f32>> {
    let scores: Vec<f32> = logits
        .squeeze(0)
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.to_vec1())
        .inference_context("Failed to read logits")?;

    if scores.len() != NUM_LABELS {
        return Err(Error::inference(format!(
            "expected {} logits, model produced {}",
            NUM_LABELS,
            scores.len()
        )));
    }

    Ok(scores)
}
