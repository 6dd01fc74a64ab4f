//! ContentCheck Core
//!
//! Core types shared across ContentCheck components.
//!
//! This crate provides:
//! - The fixed set of content types and their binary label maps
//! - Prediction request/result types exchanged with the interaction shell
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result, ValidationError};
pub use types::{ContentType, LabelMap, PredictionRequest, PredictionResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result, ValidationError};
    pub use crate::types::{ContentType, LabelMap, PredictionRequest, PredictionResult};
}
