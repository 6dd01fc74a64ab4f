//! Stub tokenizers and classifiers for testing
//!
//! Provides configurable implementations of [`TextEncoder`] and
//! [`SequenceClassifier`] so the registry, pipeline and web shell can be
//! exercised without model weights.

use crate::classifier::{EncodedInput, SequenceClassifier, TextEncoder};
use crate::config::ModelEntry;
use crate::loader::{LoadedModel, ModelLoader};
use crate::registry::{ModelBinding, ModelRegistry};
use candle_core::Device;
use contentcheck_core::{ContentType, Error, Result};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Sentinel stored while no call has passed an explicit max length
const NO_MAX_LENGTH: usize = usize::MAX;

/// Whitespace tokenizer wrapping tokens in `[CLS]` (id 101) and `[SEP]` (id 102)
pub struct StubEncoder {
    default_max_length: usize,
    call_count: AtomicU32,
    last_max_length: AtomicUsize,
}

impl StubEncoder {
    pub const CLS: u32 = 101;
    pub const SEP: u32 = 102;

    pub fn new(default_max_length: usize) -> Self {
        Self {
            default_max_length,
            call_count: AtomicU32::new(0),
            last_max_length: AtomicUsize::new(NO_MAX_LENGTH),
        }
    }

    /// Number of times encode was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// `max_length` passed to the most recent encode call
    pub fn last_max_length(&self) -> Option<usize> {
        match self.last_max_length.load(Ordering::Relaxed) {
            NO_MAX_LENGTH => None,
            len => Some(len),
        }
    }
}

impl TextEncoder for StubEncoder {
    fn encode(&self, text: &str, max_length: Option<usize>) -> Result<EncodedInput> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.last_max_length
            .store(max_length.unwrap_or(NO_MAX_LENGTH), Ordering::Relaxed);

        let max_length = max_length.unwrap_or(self.default_max_length).max(2);
        let mut input_ids = vec![Self::CLS];
        input_ids.extend(
            text.split_whitespace()
                .take(max_length - 2)
                .map(|word| 1000 + (word.len() as u32)),
        );
        input_ids.push(Self::SEP);

        let len = input_ids.len();
        Ok(EncodedInput {
            input_ids,
            type_ids: vec![0; len],
            attention_mask: vec![1; len],
        })
    }

    fn default_max_length(&self) -> usize {
        self.default_max_length
    }
}

/// Classifier returning fixed logits
pub struct StubClassifier {
    name: String,
    logits: Vec<f32>,
    call_count: AtomicU32,
    last_input_len: AtomicUsize,
}

impl StubClassifier {
    pub fn new(name: &str, logits: impl Into<Vec<f32>>) -> Self {
        Self {
            name: name.to_string(),
            logits: logits.into(),
            call_count: AtomicU32::new(0),
            last_input_len: AtomicUsize::new(0),
        }
    }

    /// Number of times logits was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Length of the last encoding seen
    pub fn last_input_len(&self) -> usize {
        self.last_input_len.load(Ordering::Relaxed)
    }
}

impl SequenceClassifier for StubClassifier {
    fn logits(&self, input: &EncodedInput) -> Result<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.last_input_len.store(input.len(), Ordering::Relaxed);
        Ok(self.logits.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A classifier that always fails - for testing error paths
pub struct FailingClassifier;

impl SequenceClassifier for FailingClassifier {
    fn logits(&self, _input: &EncodedInput) -> Result<Vec<f32>> {
        Err(Error::inference("simulated forward pass failure"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Stub encoder and classifier for one content type, with handles kept for
/// inspecting calls after the binding is moved into a registry
pub struct StubModel {
    pub encoder: Arc<StubEncoder>,
    pub classifier: Arc<StubClassifier>,
    content_type: ContentType,
}

impl StubModel {
    /// Default max length of every stub encoder
    pub const DEFAULT_MAX_LENGTH: usize = 128;

    pub fn new(content_type: ContentType, logits: impl Into<Vec<f32>>) -> Self {
        Self {
            encoder: Arc::new(StubEncoder::new(Self::DEFAULT_MAX_LENGTH)),
            classifier: Arc::new(StubClassifier::new(
                &format!("stub-{}", content_type.as_str()),
                logits,
            )),
            content_type,
        }
    }

    pub fn binding(&self) -> ModelBinding {
        ModelBinding::new(
            self.encoder.clone(),
            self.classifier.clone(),
            self.content_type.default_label_map(),
        )
    }
}

/// Binding with a fresh stub pair and the default label map
pub fn stub_binding(content_type: ContentType, logits: impl Into<Vec<f32>>) -> ModelBinding {
    StubModel::new(content_type, logits).binding()
}

/// Registry in which every content type returns the same logits
pub fn stub_registry(logits: [f32; 2]) -> ModelRegistry {
    let bindings = ContentType::ALL
        .iter()
        .map(|&ct| (ct, stub_binding(ct, logits)));

    match ModelRegistry::from_bindings(bindings) {
        Ok(registry) => registry,
        Err(e) => unreachable!("stub bindings cover every content type: {}", e),
    }
}

/// Loader producing stub models for existing local directories only
#[derive(Debug, Default)]
pub struct StubModelLoader {
    logits: [f32; 2],
}

impl StubModelLoader {
    pub fn new(logits: [f32; 2]) -> Self {
        Self { logits }
    }
}

impl ModelLoader for StubModelLoader {
    fn load(
        &self,
        content_type: ContentType,
        entry: &ModelEntry,
        _device: &Device,
    ) -> Result<LoadedModel> {
        if let crate::config::ModelSource::Local { path } = &entry.source {
            if !path.is_dir() {
                return Err(Error::registry_load(format!(
                    "Model directory does not exist: {}",
                    path.display()
                )));
            }
        }

        let model = StubModel::new(content_type, self.logits);
        Ok(LoadedModel {
            encoder: model.encoder,
            classifier: model.classifier,
        })
    }
}
