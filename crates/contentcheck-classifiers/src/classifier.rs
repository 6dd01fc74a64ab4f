//! Tokenizer and classifier traits
//!
//! Both seams are opaque collaborators of the pipeline: the pipeline only
//! knows how to hand text to a [`TextEncoder`] and the resulting
//! [`EncodedInput`] to a [`SequenceClassifier`].

use contentcheck_core::Result;

/// Numeric encoding of a single text, ready for a forward pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedInput {
    /// Token ids, including special tokens
    pub input_ids: Vec<u32>,

    /// Segment ids (all zero for single-sequence input)
    pub type_ids: Vec<u32>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    /// Number of positions in the encoded sequence
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Whether the encoding has no positions at all
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Check that all three sequences line up
    pub fn is_consistent(&self) -> bool {
        self.type_ids.len() == self.input_ids.len()
            && self.attention_mask.len() == self.input_ids.len()
    }
}

/// Converts raw text into the input format a classifier expects
pub trait TextEncoder: Send + Sync {
    /// Encode `text` with truncation.
    ///
    /// `max_length` is the total length including special tokens. `None`
    /// falls back to [`TextEncoder::default_max_length`].
    fn encode(&self, text: &str, max_length: Option<usize>) -> Result<EncodedInput>;

    /// The tokenizer's own maximum sequence length
    fn default_max_length(&self) -> usize;
}

/// Inference-only sequence classifier producing raw logits
pub trait SequenceClassifier: Send + Sync {
    /// Run a forward pass and return one logit per class
    fn logits(&self, input: &EncodedInput) -> Result<Vec<f32>>;

    /// Model name, for logging
    fn name(&self) -> &str;
}
