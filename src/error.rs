//! Error types for folio.
//!
//! Only integrity failures and an aggregate validation failure are errors.
//! Content-quality findings (no headings found, merged chapters, forced
//! chunk boundaries) are reported as warnings on the stage reports instead.

use crate::capacity::ChunkCapacityError;

/// The processing stage an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Configuration loading or validation.
    Config,
    /// Chapter detection and construction.
    Chapterize,
    /// Chunk packing.
    Chunkify,
    /// Invariant validation of the final chunk sequence.
    Validate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Chapterize => "chapterize",
            Self::Chunkify => "chunkify",
            Self::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during segmentation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Chunk size bounds are inconsistent.
    #[error(transparent)]
    InvalidCapacity(#[from] ChunkCapacityError),

    /// Any other configuration problem, including unparseable TOML.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two adjacent chapters overlap.
    #[error("chapter {current} end ({current_end}) overlaps with {next} start ({next_start})")]
    OverlappingChapters {
        /// Id of the earlier chapter.
        current: String,
        /// Id of the later chapter.
        next: String,
        /// Exclusive end of the earlier chapter.
        current_end: usize,
        /// Start of the later chapter.
        next_start: usize,
    },

    /// Chunk offsets disagree with the source text.
    #[error("chunk {chunk_id}: {message}")]
    OffsetMismatch {
        /// Offending chunk.
        chunk_id: String,
        /// What went wrong.
        message: String,
    },

    /// The whole book produced no chunks.
    #[error("no chunks produced from text")]
    NoChunks,

    /// Validation found blocking issues.
    #[error("validation failed with {error_count} error(s)")]
    ValidationFailed {
        /// Number of ERROR-severity issues.
        error_count: usize,
    },
}

impl Error {
    /// The stage this error belongs to.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::InvalidCapacity(_) | Self::InvalidConfig(_) => Stage::Config,
            Self::OverlappingChapters { .. } => Stage::Chapterize,
            Self::OffsetMismatch { .. } | Self::NoChunks => Stage::Chunkify,
            Self::ValidationFailed { .. } => Stage::Validate,
        }
    }

    /// Number of blocking validation issues, when this is a validation failure.
    #[must_use]
    pub const fn error_count(&self) -> Option<usize> {
        match self {
            Self::ValidationFailed { error_count } => Some(*error_count),
            _ => None,
        }
    }
}

/// Result type for folio operations.
pub type Result<T> = std::result::Result<T, Error>;
