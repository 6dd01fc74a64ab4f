//! Core types for ContentCheck

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of text submitted for classification.
///
/// Each variant selects exactly one registry entry and one label map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[serde(alias = "Email")]
    Email,
    #[serde(alias = "SMS")]
    Sms,
    #[serde(alias = "News Article", alias = "news-article")]
    NewsArticle,
    #[serde(alias = "Social Media", alias = "social-media")]
    SocialMedia,
}

impl ContentType {
    /// All content types in display order
    pub const ALL: [ContentType; 4] = [
        ContentType::Email,
        ContentType::Sms,
        ContentType::NewsArticle,
        ContentType::SocialMedia,
    ];

    /// Token cap for the long-form types.
    pub const LONG_FORM_MAX_LENGTH: usize = 512;

    /// Human-readable name, as shown in the form
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Sms => "SMS",
            Self::NewsArticle => "News Article",
            Self::SocialMedia => "Social Media",
        }
    }

    /// Stable identifier used in config files and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::NewsArticle => "news_article",
            Self::SocialMedia => "social_media",
        }
    }

    /// Explicit truncation length for this content type.
    ///
    /// `None` means the tokenizer's own default maximum applies. Only the
    /// long-form types carry an explicit 512-token cap.
    pub fn max_length(&self) -> Option<usize> {
        match self {
            Self::Email | Self::Sms => None,
            Self::NewsArticle | Self::SocialMedia => Some(Self::LONG_FORM_MAX_LENGTH),
        }
    }

    /// The fixed label pair for this content type
    pub fn default_label_map(&self) -> LabelMap {
        match self {
            Self::Email | Self::Sms => LabelMap::spam_ham(),
            Self::NewsArticle | Self::SocialMedia => LabelMap::real_fake(),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "newsarticle" | "news" => Ok(Self::NewsArticle),
            "socialmedia" | "social" => Ok(Self::SocialMedia),
            _ => Err(Error::config(format!(
                "unknown content type '{}' (expected one of: Email, SMS, News Article, Social Media)",
                s
            ))),
        }
    }
}

/// Binary mapping from predicted class index to label.
///
/// Always exactly two distinct, non-empty labels at indices 0 and 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[String; 2]", into = "[String; 2]")]
pub struct LabelMap {
    labels: [String; 2],
}

impl LabelMap {
    /// Create a label map from the labels for index 0 and index 1
    pub fn new(index0: impl Into<String>, index1: impl Into<String>) -> crate::Result<Self> {
        let labels = [index0.into(), index1.into()];

        if labels.iter().any(|l| l.trim().is_empty()) {
            return Err(Error::config("label map entries must be non-empty"));
        }
        if labels[0] == labels[1] {
            return Err(Error::config(format!(
                "label map entries must be distinct, got '{}' twice",
                labels[0]
            )));
        }

        Ok(Self { labels })
    }

    /// 0 → HAM, 1 → SPAM
    pub fn spam_ham() -> Self {
        Self {
            labels: ["HAM".to_string(), "SPAM".to_string()],
        }
    }

    /// 0 → REAL, 1 → FAKE
    pub fn real_fake() -> Self {
        Self {
            labels: ["REAL".to_string(), "FAKE".to_string()],
        }
    }

    /// Label for a class index, `None` outside {0, 1}
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// The index-1 label (SPAM / FAKE for the built-in maps)
    pub fn flagged(&self) -> &str {
        &self.labels[1]
    }

    /// Whether `label` is the index-1 label
    pub fn is_flagged(&self, label: &str) -> bool {
        self.labels[1] == label
    }

    /// Both labels in index order
    pub fn labels(&self) -> &[String; 2] {
        &self.labels
    }
}

impl TryFrom<[String; 2]> for LabelMap {
    type Error = Error;

    fn try_from(value: [String; 2]) -> Result<Self, Self::Error> {
        let [index0, index1] = value;
        Self::new(index0, index1)
    }
}

impl From<LabelMap> for [String; 2] {
    fn from(value: LabelMap) -> Self {
        value.labels
    }
}

/// A single classification request from the interaction shell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Which model/label pair to use
    pub content_type: ContentType,

    /// Text as submitted; may be empty
    #[serde(rename = "text")]
    pub raw_text: String,
}

impl PredictionRequest {
    /// Create a new prediction request
    pub fn new(content_type: ContentType, raw_text: impl Into<String>) -> Self {
        Self {
            content_type,
            raw_text: raw_text.into(),
        }
    }
}

/// Outcome of a successful classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// One of the two labels of the content type's label map
    pub label: String,

    /// Content type the request was classified as
    pub content_type: ContentType,
}
