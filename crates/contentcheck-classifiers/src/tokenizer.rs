//! HuggingFace tokenizer adapter

use crate::classifier::{EncodedInput, TextEncoder};
use contentcheck_core::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tokenizers::{PostProcessor, Tokenizer, TruncationDirection};

/// Fallback when neither the tokenizer nor the model declares a limit
pub const FALLBACK_MAX_LENGTH: usize = 512;

/// `model_max_length` values above this are HF's "no limit" sentinel
const UNBOUNDED_MAX_LENGTH: f64 = 1.0e6;

/// Subset of `tokenizer_config.json` that affects encoding
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenizerHints {
    #[serde(default)]
    pub model_max_length: Option<f64>,

    #[serde(default)]
    pub do_lower_case: Option<bool>,
}

impl TokenizerHints {
    /// Read `tokenizer_config.json` from a model directory, if present
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let path = model_dir.join("tokenizer_config.json");
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::registry_load(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Declared `model_max_length`, ignoring the unbounded sentinel
    pub fn bounded_max_length(&self) -> Option<usize> {
        self.model_max_length
            .filter(|len| *len > 0.0 && *len < UNBOUNDED_MAX_LENGTH)
            .map(|len| len as usize)
    }
}

/// [`TextEncoder`] backed by a `tokenizers::Tokenizer`
pub struct HfTextEncoder {
    tokenizer: Tokenizer,
    default_max_length: usize,
}

impl HfTextEncoder {
    /// Wrap a tokenizer with the given default maximum length.
    ///
    /// Any truncation or padding stored in the tokenizer is cleared; limits
    /// are applied per call instead.
    pub fn new(mut tokenizer: Tokenizer, default_max_length: usize) -> Result<Self> {
        tokenizer
            .with_truncation(None)
            .map_err(|e| Error::registry_load(format!("failed to reset truncation: {}", e)))?;
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            default_max_length: default_max_length.max(1),
        })
    }

    /// Load the tokenizer stored in a model directory.
    ///
    /// `position_limit` is the classifier's own positional capacity; the
    /// default maximum never exceeds it.
    pub fn from_dir(model_dir: &Path, position_limit: Option<usize>) -> Result<Self> {
        let hints = TokenizerHints::from_dir(model_dir)?;
        let tokenizer = load_tokenizer(model_dir, &hints)?;

        let default_max_length = match (hints.bounded_max_length(), position_limit) {
            (Some(declared), Some(limit)) => declared.min(limit),
            (Some(declared), None) => declared,
            (None, Some(limit)) => limit,
            (None, None) => FALLBACK_MAX_LENGTH,
        };

        tracing::debug!(
            "Tokenizer from {} uses default max length {}",
            model_dir.display(),
            default_max_length
        );

        Self::new(tokenizer, default_max_length)
    }

    fn special_token_count(&self) -> usize {
        self.tokenizer
            .get_post_processor()
            .map(|processor| processor.added_tokens(false))
            .unwrap_or(0)
    }
}

impl TextEncoder for HfTextEncoder {
    fn encode(&self, text: &str, max_length: Option<usize>) -> Result<EncodedInput> {
        let max_length = max_length.unwrap_or(self.default_max_length);

        let mut encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::inference(format!("Tokenization failed: {}", e)))?;

        // Special tokens count against the limit and must survive truncation
        let content_budget = max_length.saturating_sub(self.special_token_count());
        encoding.truncate(content_budget, 0, TruncationDirection::Right);

        let encoding = self
            .tokenizer
            .post_process(encoding, None, true)
            .map_err(|e| Error::inference(format!("Post-processing failed: {}", e)))?;

        // A single sequence padded to the longest in its batch is already
        // padded, so the mask is taken as-is
        Ok(EncodedInput {
            input_ids: encoding.get_ids().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        })
    }

    fn default_max_length(&self) -> usize {
        self.default_max_length
    }
}

/// Load a tokenizer from `tokenizer.json`, falling back to the slow-tokenizer
/// vocab files (`vocab.txt` for WordPiece, `vocab.json` + `merges.txt` for
/// byte-level BPE).
pub fn load_tokenizer(model_dir: &Path, hints: &TokenizerHints) -> Result<Tokenizer> {
    let tokenizer_json_path = model_dir.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path).map_err(|e| {
            Error::registry_load(format!("Failed to load tokenizer.json: {}", e))
        });
    }

    let vocab_path = model_dir.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building WordPiece tokenizer from vocab.txt");
        return build_wordpiece_tokenizer(&vocab_path, hints.do_lower_case.unwrap_or(true));
    }

    let bpe_vocab_path = model_dir.join("vocab.json");
    let merges_path = model_dir.join("merges.txt");
    if bpe_vocab_path.exists() && merges_path.exists() {
        tracing::debug!("Building byte-level BPE tokenizer from vocab.json/merges.txt");
        return build_byte_level_bpe_tokenizer(&bpe_vocab_path, &merges_path);
    }

    Err(Error::registry_load(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.txt, vocab.json + merges.txt)",
        model_dir.display()
    )))
}

fn build_wordpiece_tokenizer(vocab_path: &Path, lowercase: bool) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::processors::bert::BertProcessing;

    let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| Error::registry_load(format!("Failed to build WordPiece model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

    let sep = special_token(&tokenizer, "[SEP]")?;
    let cls = special_token(&tokenizer, "[CLS]")?;
    tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

    Ok(tokenizer)
}

fn build_byte_level_bpe_tokenizer(vocab_path: &Path, merges_path: &Path) -> Result<Tokenizer> {
    use tokenizers::models::bpe::BPE;
    use tokenizers::pre_tokenizers::byte_level::ByteLevel;
    use tokenizers::processors::roberta::RobertaProcessing;

    let bpe = BPE::from_file(
        vocab_path.to_string_lossy().as_ref(),
        merges_path.to_string_lossy().as_ref(),
    )
    .build()
    .map_err(|e| Error::registry_load(format!("Failed to build BPE model: {}", e)))?;

    let mut tokenizer = Tokenizer::new(bpe);
    tokenizer.with_pre_tokenizer(Some(ByteLevel::default().add_prefix_space(false)));
    tokenizer.with_decoder(Some(ByteLevel::default()));

    let sep = special_token(&tokenizer, "</s>")?;
    let cls = special_token(&tokenizer, "<s>")?;
    tokenizer.with_post_processor(Some(
        RobertaProcessing::new(sep, cls)
            .trim_offsets(true)
            .add_prefix_space(false),
    ));

    Ok(tokenizer)
}

fn special_token(tokenizer: &Tokenizer, token: &str) -> Result<(String, u32)> {
    tokenizer
        .token_to_id(token)
        .map(|id| (token.to_string(), id))
        .ok_or_else(|| Error::registry_load(format!("Vocabulary has no '{}' token", token)))
}
