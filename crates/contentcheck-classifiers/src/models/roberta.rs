//! RoBERTa for sequence classification
//!
//! RoBERTa and XLM-RoBERTa share the same checkpoint layout (`roberta.*`
//! backbone, `classifier.dense` + `classifier.out_proj` head), so the
//! XLM-RoBERTa implementation serves both.

use super::{load_with_prefixes, logits_to_vec, InferenceContext, InputTensors, NUM_LABELS};
use crate::classifier::{EncodedInput, SequenceClassifier};
use candle_core::Device;
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{
    Config as RobertaConfig, XLMRobertaForSequenceClassification,
};
use contentcheck_core::Result;

pub struct RobertaSequenceClassifier {
    name: String,
    model: XLMRobertaForSequenceClassification,
    device: Device,
}

impl RobertaSequenceClassifier {
    pub fn load(
        name: &str,
        vb: VarBuilder,
        config: &RobertaConfig,
        device: &Device,
    ) -> Result<Self> {
        let (model, _) = load_with_prefixes(&vb, &["", "model"], "RoBERTa", |vb| {
            XLMRobertaForSequenceClassification::new(NUM_LABELS, config, vb)
        })?;

        Ok(Self {
            name: name.to_string(),
            model,
            device: device.clone(),
        })
    }
}

impl SequenceClassifier for RobertaSequenceClassifier {
    fn logits(&self, input: &EncodedInput) -> Result<Vec<f32>> {
        let tensors = InputTensors::new(input, &self.device)?;

        let logits = self
            .model
            .forward(
                &tensors.input_ids,
                &tensors.attention_mask,
                &tensors.type_ids,
            )
            .inference_context("Model forward pass failed")?;

        logits_to_vec(&logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
