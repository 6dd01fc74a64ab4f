//! Interaction shell
//!
//! Turns one explicit user submission into a displayable outcome. Both the
//! web form and the `classify` command go through [`on_submit`].

use contentcheck_classifiers::ClassificationPipeline;
use contentcheck_core::{ContentType, Error};
use serde::Serialize;

/// Warning shown for empty or whitespace-only input
pub const EMPTY_INPUT_WARNING: &str = "⚠️ Please enter some text first!";

/// Result of a single submission, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Success {
        content_type: ContentType,
        label: String,
        message: String,
    },
    Warning {
        message: String,
    },
    #[serde(rename = "error")]
    Failed {
        message: String,
    },
}

impl SubmissionOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Warning { message } | Self::Failed { message } => {
                message
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Classify `text` and describe the outcome
pub fn on_submit(
    pipeline: &ClassificationPipeline,
    content_type: ContentType,
    text: &str,
) -> SubmissionOutcome {
    match pipeline.classify(content_type, text) {
        Ok(result) => {
            let flagged = pipeline
                .registry()
                .get(content_type)
                .map(|binding| binding.label_map.is_flagged(&result.label))
                .unwrap_or(false);

            SubmissionOutcome::Success {
                content_type,
                message: prediction_message(content_type, &result.label, flagged),
                label: result.label,
            }
        }
        Err(Error::Validation(_)) => SubmissionOutcome::Warning {
            message: EMPTY_INPUT_WARNING.to_string(),
        },
        Err(e) => {
            tracing::error!("{} prediction failed: {}", content_type, e);
            SubmissionOutcome::Failed {
                message: format!("❌ {} prediction failed: {}", content_type, e),
            }
        }
    }
}

/// Heading used in prediction messages
pub fn content_type_heading(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Email => "📧 Email",
        ContentType::Sms => "📱 SMS",
        ContentType::NewsArticle => "📰 News",
        ContentType::SocialMedia => "💬 Social Media",
    }
}

/// e.g. "📧 Email Prediction: 🚫 SPAM"
pub fn prediction_message(content_type: ContentType, label: &str, flagged: bool) -> String {
    let marker = if flagged { "🚫" } else { "✅" };
    format!(
        "{} Prediction: {} {}",
        content_type_heading(content_type),
        marker,
        label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentcheck_classifiers::testing::{stub_binding, stub_registry};
    use contentcheck_classifiers::ModelRegistry;
    use std::sync::Arc;

    fn pipeline(logits: [f32; 2]) -> ClassificationPipeline {
        ClassificationPipeline::new(Arc::new(stub_registry(logits)))
    }

    #[test]
    fn test_success_messages() {
        let spam = pipeline([0.1, 0.9]);
        let outcome = on_submit(&spam, ContentType::Email, "You won a free cruise");
        assert_eq!(
            outcome,
            SubmissionOutcome::Success {
                content_type: ContentType::Email,
                label: "SPAM".to_string(),
                message: "📧 Email Prediction: 🚫 SPAM".to_string(),
            }
        );

        let real = pipeline([0.9, 0.1]);
        assert_eq!(
            on_submit(&real, ContentType::NewsArticle, "Council approves budget").message(),
            "📰 News Prediction: ✅ REAL"
        );
        assert_eq!(
            on_submit(&real, ContentType::Sms, "see you at 6").message(),
            "📱 SMS Prediction: ✅ HAM"
        );
        assert_eq!(
            on_submit(&spam, ContentType::SocialMedia, "Moon made of cheese").message(),
            "💬 Social Media Prediction: 🚫 FAKE"
        );
    }

    #[test]
    fn test_empty_input_warns() {
        let outcome = on_submit(&pipeline([0.1, 0.9]), ContentType::Sms, "  \n ");
        assert_eq!(
            outcome,
            SubmissionOutcome::Warning {
                message: EMPTY_INPUT_WARNING.to_string()
            }
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_inference_failure_is_reported() {
        let bindings = ContentType::ALL.iter().map(|&ct| {
            let logits = if ct == ContentType::Email {
                vec![1.0]
            } else {
                vec![0.0, 1.0]
            };
            (ct, stub_binding(ct, logits))
        });
        let registry = ModelRegistry::from_bindings(bindings).unwrap();
        let pipeline = ClassificationPipeline::new(Arc::new(registry));

        let outcome = on_submit(&pipeline, ContentType::Email, "hello");
        assert!(matches!(outcome, SubmissionOutcome::Failed { .. }));
        assert!(outcome.message().contains("Email prediction failed"));
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = SubmissionOutcome::Success {
            content_type: ContentType::SocialMedia,
            label: "FAKE".to_string(),
            message: "💬 Social Media Prediction: 🚫 FAKE".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["content_type"], "social_media");
        assert_eq!(json["label"], "FAKE");

        let failed = SubmissionOutcome::Failed {
            message: "boom".to_string(),
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["status"], "error");
    }
}
