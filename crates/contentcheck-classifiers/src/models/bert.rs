//! BERT for sequence classification

use super::{
    load_with_prefixes, logits_to_vec, InferenceContext, InputTensors, LoadContext, NUM_LABELS,
};
use crate::classifier::{EncodedInput, SequenceClassifier};
use candle_core::{Device, IndexOp};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use contentcheck_core::Result;

/// BERT backbone, tanh pooler over `[CLS]`, and a linear head
pub struct BertSequenceClassifier {
    name: String,
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    device: Device,
}

impl BertSequenceClassifier {
    pub fn load(
        name: &str,
        vb: VarBuilder,
        config: &BertConfig,
        hidden_size: usize,
        device: &Device,
    ) -> Result<Self> {
        let (model, prefix) =
            load_with_prefixes(&vb, &["bert", ""], "BERT backbone", |vb| {
                BertModel::load(vb, config)
            })?;

        let vb_backbone = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(&prefix)
        };
        let pooler = candle_nn::linear(hidden_size, hidden_size, vb_backbone.pp("pooler.dense"))
            .load_context("Failed to load BERT pooler")?;
        let classifier = candle_nn::linear(hidden_size, NUM_LABELS, vb.pp("classifier"))
            .load_context("Failed to load classification head")?;

        Ok(Self {
            name: name.to_string(),
            model,
            pooler,
            classifier,
            device: device.clone(),
        })
    }
}

impl SequenceClassifier for BertSequenceClassifier {
    fn logits(&self, input: &EncodedInput) -> Result<Vec<f32>> {
        let tensors = InputTensors::new(input, &self.device)?;

        let hidden_states = self
            .model
            .forward(
                &tensors.input_ids,
                &tensors.type_ids,
                Some(&tensors.attention_mask),
            )
            .inference_context("Model forward pass failed")?;

        let cls_embedding = hidden_states
            .i((.., 0))
            .inference_context("Failed to get CLS token")?;

        let pooled = self
            .pooler
            .forward(&cls_embedding)
            .and_then(|t| t.tanh())
            .inference_context("Pooler failed")?;

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
