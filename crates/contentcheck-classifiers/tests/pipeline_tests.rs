//! Pipeline and registry integration tests
//!
//! Every model is replaced by stub tokenizer/classifier pairs, so these run
//! without weights on disk.

use contentcheck_classifiers::testing::{
    stub_binding, FailingClassifier, StubEncoder, StubModel, StubModelLoader,
};
use contentcheck_classifiers::{
    Architecture, ClassificationPipeline, ModelBinding, ModelEntry, ModelRegistry, RegistryConfig,
};
use contentcheck_core::{ContentType, Error, LabelMap, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;

/// One stub model per content type, all returning `logits`
fn stub_models(logits: [f32; 2]) -> HashMap<ContentType, StubModel> {
    ContentType::ALL
        .iter()
        .map(|&ct| (ct, StubModel::new(ct, logits)))
        .collect()
}

fn pipeline_for(models: &HashMap<ContentType, StubModel>) -> ClassificationPipeline {
    let registry =
        ModelRegistry::from_bindings(models.iter().map(|(ct, model)| (*ct, model.binding())))
            .unwrap();
    ClassificationPipeline::new(Arc::new(registry))
}

#[test]
fn test_empty_input_never_reaches_models() {
    let models = stub_models([0.1, 0.9]);
    let pipeline = pipeline_for(&models);

    for content_type in ContentType::ALL {
        for text in ["", "   ", "\n\t  \r\n"] {
            let err = pipeline.classify(content_type, text).unwrap_err();
            assert!(matches!(
                err,
                Error::Validation(ValidationError::EmptyInput)
            ));
        }
    }

    for model in models.values() {
        assert_eq!(model.encoder.call_count(), 0);
        assert_eq!(model.classifier.call_count(), 0);
    }
}

#[test]
fn test_email_spam_end_to_end() {
    let models = stub_models([0.1, 0.9]);
    let pipeline = pipeline_for(&models);

    let result = pipeline
        .classify(ContentType::Email, "Congratulations! You won a FREE cruise. Reply YES")
        .unwrap();

    assert_eq!(result.label, "SPAM");
    assert_eq!(result.content_type, ContentType::Email);

    let email = &models[&ContentType::Email];
    assert_eq!(email.encoder.call_count(), 1);
    assert_eq!(email.classifier.call_count(), 1);

    // Other content types are never consulted
    assert_eq!(models[&ContentType::Sms].classifier.call_count(), 0);
}

#[test]
fn test_label_mapping_per_content_type() {
    let index0 = pipeline_for(&stub_models([2.0, -2.0]));
    let index1 = pipeline_for(&stub_models([-2.0, 2.0]));

    let expected = [
        (ContentType::Email, "HAM", "SPAM"),
        (ContentType::Sms, "HAM", "SPAM"),
        (ContentType::NewsArticle, "REAL", "FAKE"),
        (ContentType::SocialMedia, "REAL", "FAKE"),
    ];

    for (content_type, label0, label1) in expected {
        assert_eq!(index0.classify(content_type, "some text").unwrap().label, label0);
        assert_eq!(index1.classify(content_type, "some text").unwrap().label, label1);
    }
}

#[test]
fn test_tie_maps_to_index_zero() {
    let pipeline = pipeline_for(&stub_models([0.5, 0.5]));

    assert_eq!(pipeline.classify(ContentType::Sms, "ok see you").unwrap().label, "HAM");
    assert_eq!(
        pipeline
            .classify(ContentType::SocialMedia, "ok see you")
            .unwrap()
            .label,
        "REAL"
    );
}

#[test]
fn test_classification_is_deterministic() {
    let pipeline = pipeline_for(&stub_models([0.3, 0.7]));
    let text = "Scientists confirm chocolate cures all diseases";

    let first = pipeline.classify(ContentType::NewsArticle, text).unwrap();
    let second = pipeline.classify(ContentType::NewsArticle, text).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_truncation_limits_per_content_type() {
    let models = stub_models([0.1, 0.9]);
    let pipeline = pipeline_for(&models);
    let long_text = "word ".repeat(2000);

    for content_type in [ContentType::NewsArticle, ContentType::SocialMedia] {
        pipeline.classify(content_type, &long_text).unwrap();
        let model = &models[&content_type];
        assert_eq!(model.encoder.last_max_length(), Some(512));
        assert_eq!(model.classifier.last_input_len(), 512);
    }

    for content_type in [ContentType::Email, ContentType::Sms] {
        pipeline.classify(content_type, &long_text).unwrap();
        let model = &models[&content_type];
        assert_eq!(model.encoder.last_max_length(), None);
        assert_eq!(
            model.classifier.last_input_len(),
            StubModel::DEFAULT_MAX_LENGTH
        );
    }
}

#[test]
fn test_untrimmed_text_is_encoded() {
    let models = stub_models([0.1, 0.9]);
    let pipeline = pipeline_for(&models);

    pipeline.classify(ContentType::Sms, "  hi  there  ").unwrap();
    // [CLS] hi there [SEP]
    assert_eq!(models[&ContentType::Sms].classifier.last_input_len(), 4);
}

#[test]
fn test_wrong_score_count_is_inference_error() {
    let mut bindings: Vec<(ContentType, ModelBinding)> = ContentType::ALL
        .iter()
        .map(|&ct| (ct, stub_binding(ct, [0.1, 0.9])))
        .collect();
    bindings[0].1 = stub_binding(ContentType::Email, vec![0.1, 0.2, 0.7]);

    let pipeline =
        ClassificationPipeline::new(Arc::new(ModelRegistry::from_bindings(bindings).unwrap()));

    let err = pipeline.classify(ContentType::Email, "hello").unwrap_err();
    assert!(matches!(err, Error::Inference(_)));

    // Other content types keep working
    assert_eq!(pipeline.classify(ContentType::Sms, "hello").unwrap().label, "SPAM");
}

#[test]
fn test_classifier_failure_is_inference_error() {
    let bindings = ContentType::ALL.iter().map(|&ct| {
        let binding = if ct == ContentType::SocialMedia {
            ModelBinding::new(
                Arc::new(StubEncoder::new(64)),
                Arc::new(FailingClassifier),
                ct.default_label_map(),
            )
        } else {
            stub_binding(ct, [0.1, 0.9])
        };
        (ct, binding)
    });
    let pipeline =
        ClassificationPipeline::new(Arc::new(ModelRegistry::from_bindings(bindings).unwrap()));

    let err = pipeline
        .classify(ContentType::SocialMedia, "totally real news")
        .unwrap_err();
    assert_eq!(err.kind(), "inference");
}

/// Default config with every model directory under `root`; directories are
/// created for all content types except `missing`
fn local_config(root: &std::path::Path, missing: Option<ContentType>) -> RegistryConfig {
    let mut config = RegistryConfig::default();
    for (content_type, entry) in config.models.iter_mut() {
        let dir = root.join(content_type.as_str());
        if Some(*content_type) != missing {
            std::fs::create_dir_all(&dir).unwrap();
        }
        *entry = ModelEntry::local(dir, entry.architecture);
    }
    config
}

#[test]
fn test_registry_load_with_all_sources_present() {
    let root = tempfile::tempdir().unwrap();
    let mut config = local_config(root.path(), None);
    config
        .models
        .get_mut(&ContentType::NewsArticle)
        .unwrap()
        .labels = Some(LabelMap::new("GENUINE", "FABRICATED").unwrap());

    let registry = ModelRegistry::load_with(&config, &StubModelLoader::new([0.0, 1.0])).unwrap();
    assert_eq!(registry.len(), 4);

    let pipeline = ClassificationPipeline::new(Arc::new(registry));
    assert_eq!(
        pipeline
            .classify(ContentType::NewsArticle, "headline")
            .unwrap()
            .label,
        "FABRICATED"
    );
    assert_eq!(
        pipeline.classify(ContentType::Email, "hello").unwrap().label,
        "SPAM"
    );
}

#[test]
fn test_unresolvable_sms_model_fails_whole_load() {
    let root = tempfile::tempdir().unwrap();
    let config = local_config(root.path(), Some(ContentType::Sms));

    let err = ModelRegistry::load_with(&config, &StubModelLoader::new([0.0, 1.0])).unwrap_err();
    assert!(matches!(err, Error::RegistryLoad(_)));
    assert!(err.to_string().contains("SMS"));
}

#[test]
fn test_missing_config_entry_fails_load() {
    let root = tempfile::tempdir().unwrap();
    let mut config = local_config(root.path(), None);
    config.models.remove(&ContentType::SocialMedia);

    let err = ModelRegistry::load_with(&config, &StubModelLoader::new([0.0, 1.0])).unwrap_err();
    assert!(matches!(err, Error::RegistryLoad(_)));
    assert!(err.to_string().contains("Social Media"));
}

#[test]
fn test_default_config_architectures() {
    let config = RegistryConfig::default();
    let architectures: Vec<Architecture> = ContentType::ALL
        .iter()
        .map(|ct| config.model(*ct).unwrap().architecture)
        .collect();

    assert_eq!(
        architectures,
        vec![
            Architecture::DistilBert,
            Architecture::MobileBert,
            Architecture::Bert,
            Architecture::Roberta,
        ]
    );
}

/// Loads the real fine-tuned checkpoints from `./models` or
/// `CONTENTCHECK_CONFIG`.
#[test]
#[ignore = "requires fine-tuned model weights"]
fn test_real_models_load_and_classify() {
    let config = RegistryConfig::load_or_default(None).unwrap();
    let registry = ModelRegistry::load(&config).unwrap();
    let pipeline = ClassificationPipeline::new(Arc::new(registry));

    for content_type in ContentType::ALL {
        let result = pipeline
            .classify(content_type, "Win a brand new iPhone, click the link now!")
            .unwrap();
        assert!(content_type
            .default_label_map()
            .labels()
            .contains(&result.label));
    }
}
