//! Storage Layer
//!
//! Append-only detection history persisted as JSON Lines, with statistics
//! recomputed from the log on every query.

mod logger;
mod model;

pub use logger::DetectionLogger;
pub use model::{DetectionEvent, DetectionStats, Metadata, RECENT_DETECTIONS};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Confidence must be a finite value in [0, 1], got {0}")]
    InvalidConfidence(f64),
}
