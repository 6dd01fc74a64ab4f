//! MobileBERT for sequence classification
//!
//! candle-transformers ships no MobileBERT, so the model is assembled here
//! from candle-nn layers following the HuggingFace checkpoint layout:
//! trigram embeddings, bottlenecked transformer blocks with stacked
//! feed-forward networks, and `NoNorm` in place of layer normalization.

use super::{
    load_with_prefixes, logits_to_vec, InferenceContext, InputTensors, LoadContext, NUM_LABELS,
};
use crate::classifier::{EncodedInput, SequenceClassifier};
use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{Activation, Embedding, LayerNorm, Linear, VarBuilder};
use contentcheck_core::Result;
use serde::Deserialize;

type CandleResult<T> = candle_core::Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationType {
    NoNorm,
    LayerNorm,
}

/// `config.json` of a MobileBERT checkpoint. Defaults are those of
/// `google/mobilebert-uncased`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub hidden_act: Activation,
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    pub layer_norm_eps: f64,
    pub embedding_size: usize,
    pub trigram_input: bool,
    pub use_bottleneck: bool,
    pub intra_bottleneck_size: usize,
    pub use_bottleneck_attention: bool,
    pub key_query_shared_bottleneck: bool,
    pub num_feedforward_networks: usize,
    pub normalization_type: NormalizationType,
    pub classifier_activation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vocab_size: 30522,
            hidden_size: 512,
            num_hidden_layers: 24,
            num_attention_heads: 4,
            intermediate_size: 512,
            hidden_act: Activation::Relu,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            layer_norm_eps: 1e-12,
            embedding_size: 128,
            trigram_input: true,
            use_bottleneck: true,
            intra_bottleneck_size: 128,
            use_bottleneck_attention: false,
            key_query_shared_bottleneck: true,
            num_feedforward_networks: 4,
            normalization_type: NormalizationType::NoNorm,
            classifier_activation: true,
        }
    }
}

impl Config {
    /// Width of the attention and feed-forward blocks
    pub fn true_hidden_size(&self) -> usize {
        if self.use_bottleneck {
            self.intra_bottleneck_size
        } else {
            self.hidden_size
        }
    }
}

/// Elementwise affine transform, or a regular layer norm
#[derive(Debug, Clone)]
enum Norm {
    NoNorm { weight: Tensor, bias: Tensor },
    LayerNorm(LayerNorm),
}

impl Norm {
    fn load(size: usize, config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        match config.normalization_type {
            NormalizationType::NoNorm => Ok(Self::NoNorm {
                weight: vb.get(size, "weight")?,
                bias: vb.get(size, "bias")?,
            }),
            NormalizationType::LayerNorm => Ok(Self::LayerNorm(candle_nn::layer_norm(
                size,
                config.layer_norm_eps,
                vb,
            )?)),
        }
    }
}

impl Module for Norm {
    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        match self {
            Self::NoNorm { weight, bias } => xs.broadcast_mul(weight)?.broadcast_add(bias),
            Self::LayerNorm(norm) => norm.forward(xs),
        }
    }
}

/// Concatenate each token embedding with its successor and predecessor
/// (zero at the sequence edges) along the feature axis.
fn trigram_concat(xs: &Tensor) -> CandleResult<Tensor> {
    let seq_len = xs.dim(1)?;
    let next = xs.pad_with_zeros(1, 0, 1)?.narrow(1, 1, seq_len)?;
    let prev = xs.pad_with_zeros(1, 1, 0)?.narrow(1, 0, seq_len)?;
    Tensor::cat(&[&next, xs, &prev], 2)
}

struct Embeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    embedding_transformation: Option<Linear>,
    norm: Norm,
    trigram_input: bool,
}

impl Embeddings {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let word_embeddings = candle_nn::embedding(
            config.vocab_size,
            config.embedding_size,
            vb.pp("word_embeddings"),
        )?;
        let position_embeddings = candle_nn::embedding(
            config.max_position_embeddings,
            config.hidden_size,
            vb.pp("position_embeddings"),
        )?;
        let token_type_embeddings = candle_nn::embedding(
            config.type_vocab_size,
            config.hidden_size,
            vb.pp("token_type_embeddings"),
        )?;

        let input_size = if config.trigram_input {
            config.embedding_size * 3
        } else {
            config.embedding_size
        };
        let embedding_transformation =
            if config.trigram_input || config.embedding_size != config.hidden_size {
                Some(candle_nn::linear(
                    input_size,
                    config.hidden_size,
                    vb.pp("embedding_transformation"),
                )?)
            } else {
                None
            };

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            embedding_transformation,
            norm: Norm::load(config.hidden_size, config, vb.pp("LayerNorm"))?,
            trigram_input: config.trigram_input,
        })
    }

    fn forward(&self, input_ids: &Tensor, type_ids: &Tensor) -> CandleResult<Tensor> {
        let seq_len = input_ids.dim(1)?;

        let mut embeddings = self.word_embeddings.forward(input_ids)?;
        if self.trigram_input {
            embeddings = trigram_concat(&embeddings)?;
        }
        if let Some(transformation) = &self.embedding_transformation {
            embeddings = transformation.forward(&embeddings)?;
        }

        let position_ids = Tensor::arange(0u32, seq_len as u32, input_ids.device())?.unsqueeze(0)?;
        let embeddings = embeddings
            .broadcast_add(&self.position_embeddings.forward(&position_ids)?)?
            .broadcast_add(&self.token_type_embeddings.forward(type_ids)?)?;

        self.norm.forward(&embeddings)
    }
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    num_heads: usize,
    head_size: usize,
}

impl SelfAttention {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let true_hidden = config.true_hidden_size();
        let value_input = if config.use_bottleneck_attention {
            true_hidden
        } else {
            config.hidden_size
        };

        Ok(Self {
            query: candle_nn::linear(true_hidden, true_hidden, vb.pp("query"))?,
            key: candle_nn::linear(true_hidden, true_hidden, vb.pp("key"))?,
            value: candle_nn::linear(value_input, true_hidden, vb.pp("value"))?,
            num_heads: config.num_attention_heads,
            head_size: true_hidden / config.num_attention_heads,
        })
    }

    fn split_heads(&self, xs: &Tensor) -> CandleResult<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        xs.reshape((batch, seq_len, self.num_heads, self.head_size))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        attention_mask: &Tensor,
    ) -> CandleResult<Tensor> {
        let (batch, seq_len, _) = query.dims3()?;

        let q = self.split_heads(&self.query.forward(query)?)?;
        let k = self.split_heads(&self.key.forward(key)?)?;
        let v = self.split_heads(&self.value.forward(value)?)?;

        let scale = (self.head_size as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? / scale)?.broadcast_add(attention_mask)?;
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;

        probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, self.num_heads * self.head_size))
    }
}

/// `dense` + residual + norm, the shape shared by several sub-blocks
struct DenseResidual {
    dense: Linear,
    norm: Norm,
}

impl DenseResidual {
    fn load(
        in_size: usize,
        out_size: usize,
        config: &Config,
        vb: VarBuilder,
    ) -> CandleResult<Self> {
        Ok(Self {
            dense: candle_nn::linear(in_size, out_size, vb.pp("dense"))?,
            norm: Norm::load(out_size, config, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, xs: &Tensor, residual: &Tensor) -> CandleResult<Tensor> {
        self.norm.forward(&(self.dense.forward(xs)? + residual)?)
    }
}

struct Attention {
    self_attention: SelfAttention,
    output: DenseResidual,
}

impl Attention {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let true_hidden = config.true_hidden_size();
        Ok(Self {
            self_attention: SelfAttention::load(config, vb.pp("self"))?,
            output: DenseResidual::load(true_hidden, true_hidden, config, vb.pp("output"))?,
        })
    }
}

struct Intermediate {
    dense: Linear,
    activation: Activation,
}

impl Intermediate {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        Ok(Self {
            dense: candle_nn::linear(
                config.true_hidden_size(),
                config.intermediate_size,
                vb.pp("dense"),
            )?,
            activation: config.hidden_act,
        })
    }
}

impl Module for Intermediate {
    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        self.activation.forward(&self.dense.forward(xs)?)
    }
}

/// `dense` + norm without a residual
struct BottleneckLayer {
    dense: Linear,
    norm: Norm,
}

impl BottleneckLayer {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        Ok(Self {
            dense: candle_nn::linear(
                config.hidden_size,
                config.intra_bottleneck_size,
                vb.pp("dense"),
            )?,
            norm: Norm::load(config.intra_bottleneck_size, config, vb.pp("LayerNorm"))?,
        })
    }
}

impl Module for BottleneckLayer {
    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        self.norm.forward(&self.dense.forward(xs)?)
    }
}

/// Query, key, value and layer input for one transformer block
struct BlockInputs {
    query: Tensor,
    key: Tensor,
    value: Tensor,
    layer_input: Tensor,
}

struct Bottleneck {
    input: BottleneckLayer,
    attention: Option<BottleneckLayer>,
    use_bottleneck_attention: bool,
}

impl Bottleneck {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let attention = if config.key_query_shared_bottleneck {
            Some(BottleneckLayer::load(config, vb.pp("attention"))?)
        } else {
            None
        };

        Ok(Self {
            input: BottleneckLayer::load(config, vb.pp("input"))?,
            attention,
            use_bottleneck_attention: config.use_bottleneck_attention,
        })
    }

    fn forward(&self, hidden_states: &Tensor) -> CandleResult<BlockInputs> {
        let bottlenecked = self.input.forward(hidden_states)?;

        if self.use_bottleneck_attention {
            return Ok(BlockInputs {
                query: bottlenecked.clone(),
                key: bottlenecked.clone(),
                value: bottlenecked.clone(),
                layer_input: bottlenecked,
            });
        }

        let shared = match &self.attention {
            Some(attention) => attention.forward(hidden_states)?,
            None => hidden_states.clone(),
        };

        Ok(BlockInputs {
            query: shared.clone(),
            key: shared,
            value: hidden_states.clone(),
            layer_input: bottlenecked,
        })
    }
}

struct FeedForward {
    intermediate: Intermediate,
    output: DenseResidual,
}

impl FeedForward {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        Ok(Self {
            intermediate: Intermediate::load(config, vb.pp("intermediate"))?,
            output: DenseResidual::load(
                config.intermediate_size,
                config.true_hidden_size(),
                config,
                vb.pp("output"),
            )?,
        })
    }
}

impl Module for FeedForward {
    fn forward(&self, xs: &Tensor) -> CandleResult<Tensor> {
        self.output.forward(&self.intermediate.forward(xs)?, xs)
    }
}

struct LayerOutput {
    output: DenseResidual,
    bottleneck: Option<DenseResidual>,
}

impl LayerOutput {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let true_hidden = config.true_hidden_size();
        let bottleneck = if config.use_bottleneck {
            Some(DenseResidual::load(
                true_hidden,
                config.hidden_size,
                config,
                vb.pp("bottleneck"),
            )?)
        } else {
            None
        };

        Ok(Self {
            output: DenseResidual::load(config.intermediate_size, true_hidden, config, vb)?,
            bottleneck,
        })
    }

    fn forward(
        &self,
        intermediate: &Tensor,
        attention_output: &Tensor,
        layer_input: &Tensor,
    ) -> CandleResult<Tensor> {
        let output = self.output.forward(intermediate, attention_output)?;
        match &self.bottleneck {
            Some(bottleneck) => bottleneck.forward(&output, layer_input),
            None => Ok(output),
        }
    }
}

struct Layer {
    bottleneck: Option<Bottleneck>,
    attention: Attention,
    ffn: Vec<FeedForward>,
    intermediate: Intermediate,
    output: LayerOutput,
}

impl Layer {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let bottleneck = if config.use_bottleneck {
            Some(Bottleneck::load(config, vb.pp("bottleneck"))?)
        } else {
            None
        };

        let vb_ffn = vb.pp("ffn");
        let ffn = (0..config.num_feedforward_networks.saturating_sub(1))
            .map(|i| FeedForward::load(config, vb_ffn.pp(i.to_string())))
            .collect::<CandleResult<Vec<_>>>()?;

        Ok(Self {
            bottleneck,
            attention: Attention::load(config, vb.pp("attention"))?,
            ffn,
            intermediate: Intermediate::load(config, vb.pp("intermediate"))?,
            output: LayerOutput::load(config, vb.pp("output"))?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_mask: &Tensor) -> CandleResult<Tensor> {
        let inputs = match &self.bottleneck {
            Some(bottleneck) => bottleneck.forward(hidden_states)?,
            None => BlockInputs {
                query: hidden_states.clone(),
                key: hidden_states.clone(),
                value: hidden_states.clone(),
                layer_input: hidden_states.clone(),
            },
        };

        let context = self.attention.self_attention.forward(
            &inputs.query,
            &inputs.key,
            &inputs.value,
            attention_mask,
        )?;
        let mut attention_output = self.attention.output.forward(&context, &inputs.layer_input)?;

        for ffn in &self.ffn {
            attention_output = ffn.forward(&attention_output)?;
        }

        let intermediate = self.intermediate.forward(&attention_output)?;
        self.output
            .forward(&intermediate, &attention_output, hidden_states)
    }
}

/// Backbone and pooler, the `mobilebert.*` weights
struct MobileBertModel {
    embeddings: Embeddings,
    layers: Vec<Layer>,
    pooler: Option<Linear>,
}

impl MobileBertModel {
    fn load(config: &Config, vb: VarBuilder) -> CandleResult<Self> {
        let vb_layers = vb.pp("encoder.layer");
        let layers = (0..config.num_hidden_layers)
            .map(|i| Layer::load(config, vb_layers.pp(i.to_string())))
            .collect::<CandleResult<Vec<_>>>()?;

        let pooler = if config.classifier_activation {
            Some(candle_nn::linear(
                config.hidden_size,
                config.hidden_size,
                vb.pp("pooler.dense"),
            )?)
        } else {
            None
        };

        Ok(Self {
            embeddings: Embeddings::load(config, vb.pp("embeddings"))?,
            layers,
            pooler,
        })
    }

    /// Pooled `[CLS]` representation
    fn forward(
        &self,
        input_ids: &Tensor,
        type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> CandleResult<Tensor> {
        let attention_mask = extended_attention_mask(attention_mask)?;

        let mut hidden_states = self.embeddings.forward(input_ids, type_ids)?;
        for layer in &self.layers {
            hidden_states = layer.forward(&hidden_states, &attention_mask)?;
        }

        let first_token = hidden_states.i((.., 0))?;
        match &self.pooler {
            Some(dense) => dense.forward(&first_token)?.tanh(),
            None => Ok(first_token),
        }
    }
}

/// `(batch, seq)` 0/1 mask to an additive `(batch, 1, 1, seq)` bias
fn extended_attention_mask(mask: &Tensor) -> CandleResult<Tensor> {
    mask.to_dtype(DType::F32)?
        .affine(-1.0, 1.0)?
        .affine(f32::MIN as f64, 0.0)?
        .unsqueeze(1)?
        .unsqueeze(1)
}

pub struct MobileBertSequenceClassifier {
    name: String,
    model: MobileBertModel,
    classifier: Linear,
    device: Device,
}

impl MobileBertSequenceClassifier {
    pub fn load(name: &str, vb: VarBuilder, config: &Config, device: &Device) -> Result<Self> {
        let (model, _) = load_with_prefixes(&vb, &["mobilebert", ""], "MobileBERT backbone", |vb| {
            MobileBertModel::load(config, vb)
        })?;

        let classifier = candle_nn::linear(config.hidden_size, NUM_LABELS, vb.pp("classifier"))
            .load_context("Failed to load classification head")?;

        Ok(Self {
            name: name.to_string(),
            model,
            classifier,
            device: device.clone(),
        })
    }
}

impl SequenceClassifier for MobileBertSequenceClassifier {
    fn logits(&self, input: &EncodedInput) -> Result<Vec<f32>> {
        let tensors = InputTensors::new(input, &self.device)?;

        let pooled = self
            .model
            .forward(
                &tensors.input_ids,
                &tensors.type_ids,
                &tensors.attention_mask,
            )
            .inference_context("Model forward pass failed")?;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: Config =
            serde_json::from_str(r#"{"hidden_act": "relu", "num_hidden_layers": 2}"#).unwrap();
        assert_eq!(config.num_hidden_layers, 2);
        assert_eq!(config.hidden_size, 512);
        assert_eq!(config.true_hidden_size(), 128);
        assert_eq!(config.normalization_type, NormalizationType::NoNorm);
    }

    #[test]
    fn test_trigram_concat_shifts_neighbours() {
        // (batch=1, seq=3, dim=1)
        let xs = Tensor::new(&[[[1f32], [2.], [3.]]], &Device::Cpu).unwrap();
        let out = trigram_concat(&xs).unwrap();
        assert_eq!(out.dims(), &[1, 3, 3]);

        let rows: Vec<Vec<f32>> = out.squeeze(0).unwrap().to_vec2().unwrap();
        assert_eq!(rows[0], vec![2., 1., 0.]);
        assert_eq!(rows[1], vec![3., 2., 1.]);
        assert_eq!(rows[2], vec![0., 3., 2.]);
    }

    #[test]
    fn test_extended_attention_mask() {
        let mask = Tensor::new(&[[1u32, 0]], &Device::Cpu).unwrap();
        let bias = extended_attention_mask(&mask).unwrap();
        assert_eq!(bias.dims(), &[1, 1, 1, 2]);

        let values: Vec<f32> = bias.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], f32::MIN);
    }

    #[test]
    fn test_tiny_model_produces_two_logits() {
        let config = Config {
            vocab_size: 16,
            hidden_size: 8,
            num_hidden_layers: 2,
            num_attention_heads: 2,
            intermediate_size: 8,
            max_position_embeddings: 16,
            embedding_size: 4,
            intra_bottleneck_size: 4,
            num_feedforward_networks: 2,
            ..Default::default()
        };

        // VarMap-backed builders create every weight on request
        let varmap = candle_nn::VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let classifier =
            MobileBertSequenceClassifier::load("tiny", vb, &config, &Device::Cpu).unwrap();

        let input = EncodedInput {
            input_ids: vec![2, 5, 7, 3],
            type_ids: vec![0; 4],
            attention_mask: vec![1; 4],
        };
        let logits = classifier.logits(&input).unwrap();
        assert_eq!(logits.len(), 2);
        assert!(logits.iter().all(|l| l.is_finite()));
    }
}
