//! DistilBERT for sequence classification

use super::{
    load_with_prefixes, logits_to_vec, InferenceContext, InputTensors, LoadContext, NUM_LABELS,
};
use crate::classifier::{EncodedInput, SequenceClassifier};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use contentcheck_core::Result;

/// DistilBERT backbone, `pre_classifier` + ReLU over `[CLS]`, and a linear head
pub struct DistilBertSequenceClassifier {
    name: String,
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    device: Device,
}

impl DistilBertSequenceClassifier {
    pub fn load(
        name: &str,
        vb: VarBuilder,
        config: &DistilBertConfig,
        hidden_size: usize,
        device: &Device,
    ) -> Result<Self> {
        let (model, _) =
            load_with_prefixes(&vb, &["distilbert", ""], "DistilBERT backbone", |vb| {
                DistilBertModel::load(vb, config)
            })?;

        let pre_classifier = candle_nn::linear(hidden_size, hidden_size, vb.pp("pre_classifier"))
            .load_context("Failed to load pre_classifier")?;
        let classifier = candle_nn::linear(hidden_size, NUM_LABELS, vb.pp("classifier"))
            .load_context("Failed to load classification head")?;

        Ok(Self {
            name: name.to_string(),
            model,
            pre_classifier,
            classifier,
            device: device.clone(),
        })
    }
}

impl SequenceClassifier for DistilBertSequenceClassifier {
    fn logits(&self, input: &EncodedInput) -> Result<Vec<f32>> {
        let tensors = InputTensors::new(input, &self.device)?;

        // DistilBERT masks positions where the mask is 1, the inverse of the
        // tokenizer's attention mask
        let padding_mask: Vec<u8> = input
            .attention_mask
            .iter()
            .map(|&x| u8::from(x == 0))
            .collect();
        let padding_mask = Tensor::new(padding_mask.as_slice(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .inference_context("Failed to create attention mask")?;

        let hidden_states = self
            .model
            .forward(&tensors.input_ids, &padding_mask)
            .inference_context("Model forward pass failed")?;

        let cls_embedding = hidden_states
            .i((.., 0))
            .inference_context("Failed to get CLS token")?;

        let pooled = self
            .pre_classifier
            .forward(&cls_embedding)
            .and_then(|t| t.relu())
            .inference_context("Pre-classifier failed")?;

        let logits = self
            .classifier
            .forward(&pooled)
            .inference_context("Classification head failed")?;

        logits_to_vec(&logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
