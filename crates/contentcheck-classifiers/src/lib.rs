//! ContentCheck Classifiers
//!
//! Binary text classifiers for spam and fake-content detection.
//!
//! Each content type is served by its own fine-tuned transformer:
//! - Email: DistilBERT, HAM/SPAM
//! - SMS: MobileBERT, HAM/SPAM
//! - News Article: BERT, REAL/FAKE
//! - Social Media: RoBERTa, REAL/FAKE
//!
//! All four are loaded once into a [`ModelRegistry`] and shared by a single
//! [`ClassificationPipeline`].

pub mod classifier;
pub mod config;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod tokenizer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use classifier::{EncodedInput, SequenceClassifier, TextEncoder};
pub use config::{DeviceSpec, ModelEntry, ModelSource, RegistryConfig, CONFIG_ENV_VAR};
pub use loader::{CandleModelLoader, LoadedModel, ModelLoader};
pub use models::Architecture;
pub use pipeline::{argmax, ClassificationPipeline};
pub use registry::{ModelBinding, ModelRegistry};
pub use tokenizer::HfTextEncoder;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{EncodedInput, SequenceClassifier, TextEncoder};
    pub use crate::config::{ModelEntry, ModelSource, RegistryConfig};
    pub use crate::pipeline::ClassificationPipeline;
    pub use crate::registry::{ModelBinding, ModelRegistry};
    pub use contentcheck_core::prelude::*;
}
