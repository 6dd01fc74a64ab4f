//! Classification pipeline
//!
//! A single pipeline serves every content type: validate the text, look up
//! the content type's binding, encode, score, arg-max and map the winning
//! index to a label.

use crate::registry::ModelRegistry;
use contentcheck_core::{
    ContentType, Error, PredictionRequest, PredictionResult, Result, ValidationError,
};
use std::sync::Arc;
use std::time::Instant;

/// Runs predictions against a loaded [`ModelRegistry`]
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    registry: Arc<ModelRegistry>,
}

impl ClassificationPipeline {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Classify `text` as the given content type.
    ///
    /// Empty or whitespace-only text fails with
    /// [`ValidationError::EmptyInput`] before any model is touched. Non-empty
    /// text is encoded exactly as submitted.
    pub fn classify(&self, content_type: ContentType, text: &str) -> Result<PredictionResult> {
        let result = self.run(content_type, text);

        match &result {
            Ok(prediction) => {
                metrics::counter!(
                    "contentcheck_predictions_total",
                    "content_type" => content_type.as_str(),
                    "label" => prediction.label.clone()
                )
                .increment(1);
            }
            Err(e) => {
                metrics::counter!(
                    "contentcheck_errors_total",
                    "content_type" => content_type.as_str(),
                    "kind" => e.kind()
                )
                .increment(1);
            }
        }

        result
    }

    /// Classify a [`PredictionRequest`]
    pub fn classify_request(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.classify(request.content_type, &request.raw_text)
    }

    fn run(&self, content_type: ContentType, text: &str) -> Result<PredictionResult> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }

        let binding = self.registry.get(content_type).ok_or_else(|| {
            Error::internal(format!("registry has no binding for {}", content_type))
        })?;

        let start = Instant::now();

        let encoded = binding.encoder.encode(text, content_type.max_length())?;
        let logits = binding.classifier.logits(&encoded)?;
        let index = argmax(&logits)?;

        let label = binding.label_map.label(index).ok_or_else(|| {
            Error::inference(format!(
                "class index {} has no label in a binary label map",
                index
            ))
        })?;

        let latency_us = start.elapsed().as_micros() as u64;
        metrics::histogram!(
            "contentcheck_inference_latency_us",
            "content_type" => content_type.as_str()
        )
        .record(latency_us as f64);

        tracing::debug!(
            content_type = %content_type,
            model = %binding.model_name,
            tokens = encoded.len(),
            latency_us,
            label,
            "Classified text"
        );

        Ok(PredictionResult {
            label: label.to_string(),
            content_type,
        })
    }
}

/// Index of the largest score; the first index wins ties.
///
/// Requires exactly two scores. A NaN score or any other count is an
/// inference error.
pub fn argmax(scores: &[f32]) -> Result<usize> {
    if scores.len() != 2 {
        return Err(Error::inference(format!(
            "expected 2 scores from a binary classifier, got {}",
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(Error::inference("classifier produced a NaN score"));
    }

    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stub_registry;

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.3, 0.3]).unwrap(), 0);
        assert_eq!(argmax(&[0.1, 0.9]).unwrap(), 1);
        assert_eq!(argmax(&[2.0, -1.0]).unwrap(), 0);
        assert_eq!(argmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]).unwrap(), 0);
    }

    #[test]
    fn test_argmax_rejects_bad_scores() {
        assert!(matches!(argmax(&[]), Err(Error::Inference(_))));
        assert!(matches!(argmax(&[0.1, 0.2, 0.7]), Err(Error::Inference(_))));
        assert!(matches!(argmax(&[f32::NAN, 0.2]), Err(Error::Inference(_))));
    }

    #[test]
    fn test_classify_request() {
        let pipeline = ClassificationPipeline::new(Arc::new(stub_registry([-1.0, 1.0])));
        let request = PredictionRequest::new(ContentType::NewsArticle, "Aliens endorse candidate");

        let result = pipeline.classify_request(&request).unwrap();
        assert_eq!(result.label, "FAKE");
        assert_eq!(result.content_type, ContentType::NewsArticle);
    }
}
