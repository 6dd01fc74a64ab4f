//! Model registry
//!
//! Maps every [`ContentType`] to the tokenizer, classifier and label map used
//! to classify it. A registry is either fully populated or not built at all,
//! and is never mutated after construction.

use crate::classifier::{SequenceClassifier, TextEncoder};
use crate::config::RegistryConfig;
use crate::loader::{CandleModelLoader, ModelLoader};
use contentcheck_core::{ContentType, Error, LabelMap, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Everything needed to classify one content type
#[derive(Clone)]
pub struct ModelBinding {
    pub encoder: Arc<dyn TextEncoder>,
    pub classifier: Arc<dyn SequenceClassifier>,
    pub label_map: LabelMap,
    pub model_name: String,
}

impl ModelBinding {
    pub fn new(
        encoder: Arc<dyn TextEncoder>,
        classifier: Arc<dyn SequenceClassifier>,
        label_map: LabelMap,
    ) -> Self {
        let model_name = classifier.name().to_string();
        Self {
            encoder,
            classifier,
            label_map,
            model_name,
        }
    }
}

impl fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinding")
            .field("model_name", &self.model_name)
            .field("label_map", &self.label_map)
            .field("default_max_length", &self.encoder.default_max_length())
            .finish()
    }
}

/// One binding per content type, loaded once at startup
#[derive(Debug)]
pub struct ModelRegistry {
    bindings: BTreeMap<ContentType, ModelBinding>,
}

impl ModelRegistry {
    /// Load every configured model with Candle
    pub fn load(config: &RegistryConfig) -> Result<Self> {
        Self::load_with(config, &CandleModelLoader::new())
    }

    /// Load every configured model through `loader`.
    ///
    /// Fails as a whole if any content type is unconfigured or fails to load.
    pub fn load_with(config: &RegistryConfig, loader: &dyn ModelLoader) -> Result<Self> {
        info!("Loading models for {} content types", ContentType::ALL.len());

        let device = config.device.to_device()?;
        let mut bindings = BTreeMap::new();

        for content_type in ContentType::ALL {
            let entry = config.model(content_type).ok_or_else(|| {
                error!("No model configured for {}", content_type);
                Error::registry_load(format!("no model configured for {}", content_type))
            })?;

            let model_name = entry.display_name();
            let loaded = loader.load(content_type, entry, &device).map_err(|e| {
                error!(
                    "Failed to load {} model '{}' from {}: {}",
                    content_type, model_name, entry.source, e
                );
                Error::registry_load(format!(
                    "failed to load {} model from {}: {}",
                    content_type, entry.source, e
                ))
            })?;

            let label_map = entry
                .labels
                .clone()
                .unwrap_or_else(|| content_type.default_label_map());

            info!(
                content_type = %content_type,
                model = %model_name,
                source = %entry.source,
                architecture = entry.architecture.as_str(),
                "Loaded model"
            );

            bindings.insert(
                content_type,
                ModelBinding {
                    encoder: loaded.encoder,
                    classifier: loaded.classifier,
                    label_map,
                    model_name,
                },
            );
        }

        Ok(Self { bindings })
    }

    /// Build a registry from pre-constructed bindings.
    ///
    /// Requires exactly one binding per content type.
    pub fn from_bindings(
        bindings: impl IntoIterator<Item = (ContentType, ModelBinding)>,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();

        for (content_type, binding) in bindings {
            if map.insert(content_type, binding).is_some() {
                return Err(Error::registry_load(format!(
                    "duplicate binding for {}",
                    content_type
                )));
            }
        }

        let missing: Vec<&str> = ContentType::ALL
            .iter()
            .filter(|ct| !map.contains_key(*ct))
            .map(|ct| ct.display_name())
            .collect();
        if !missing.is_empty() {
            return Err(Error::registry_load(format!(
                "no binding for {}",
                missing.join(", ")
            )));
        }

        Ok(Self { bindings: map })
    }

    pub fn get(&self, content_type: ContentType) -> Option<&ModelBinding> {
        self.bindings.get(&content_type)
    }

    /// Loaded content types in display order
    pub fn content_types(&self) -> Vec<ContentType> {
        ContentType::ALL
            .into_iter()
            .filter(|ct| self.bindings.contains_key(ct))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stub_binding, stub_registry};

    #[test]
    fn test_from_bindings_requires_every_type() {
        let bindings = [
            (ContentType::Email, stub_binding(ContentType::Email, [0.0, 1.0])),
            (ContentType::Sms, stub_binding(ContentType::Sms, [0.0, 1.0])),
        ];

        let err = ModelRegistry::from_bindings(bindings).unwrap_err();
        assert!(matches!(err, Error::RegistryLoad(_)));
        assert!(err.to_string().contains("News Article"));
        assert!(err.to_string().contains("Social Media"));
    }

    #[test]
    fn test_from_bindings_rejects_duplicates() {
        let mut bindings: Vec<_> = ContentType::ALL
            .iter()
            .map(|&ct| (ct, stub_binding(ct, [1.0, 0.0])))
            .collect();
        bindings.push((
            ContentType::Email,
            stub_binding(ContentType::Email, [0.0, 1.0]),
        ));

        let err = ModelRegistry::from_bindings(bindings).unwrap_err();
        assert!(err.to_string().contains("duplicate binding for Email"));
    }

    #[test]
    fn test_content_types_in_display_order() {
        let registry = stub_registry([0.5, 0.1]);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.content_types(), ContentType::ALL.to_vec());
        assert_eq!(
            registry.get(ContentType::SocialMedia).unwrap().label_map,
            LabelMap::real_fake()
        );
    }
}
