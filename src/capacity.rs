//! Chunk size bounds.
//!
//! ## The Problem
//!
//! A single size limit forces awkward splits. Downstream consumers (speech
//! synthesis, embedding, summarization) want chunks of a predictable size,
//! but they also want every chunk to end where a sentence ends.
//!
//! ```text
//! target = 600, max = 1600
//!
//! Rigid:    ["...the carriage drew up at the", "door. Elizabeth stepped..."]
//!           ↑ hits the size limit mid-sentence
//!
//! Flexible: ["...the carriage drew up at the door.", "Elizabeth stepped..."]
//!           ↑ slightly over target, but ends on a sentence
//! ```
//!
//! ## Three Bounds
//!
//! - `target`: what the packer aims for. It stops buffering paragraphs here.
//! - `min`: chunks shorter than this are folded into their predecessor.
//! - `max`: the hard ceiling. The packer only grows past `target` up to here,
//!   and only to reach a sentence boundary.

use std::cmp::Ordering;

/// Default target chunk size in bytes.
pub const DEFAULT_TARGET: usize = 600;
/// Default minimum chunk size in bytes.
pub const DEFAULT_MIN: usize = 200;
/// Default maximum chunk size in bytes.
pub const DEFAULT_MAX: usize = 1600;

/// Target, minimum, and maximum chunk sizes.
///
/// Invariant: `0 < target`, `min <= target <= max`.
///
/// # Examples
///
/// ```rust
/// use folio::ChunkCapacity;
///
/// let cap = ChunkCapacity::default();
/// assert_eq!(cap.target(), 600);
/// assert_eq!(cap.min(), 200);
/// assert_eq!(cap.max(), 1600);
///
/// // Strict: target == max, no minimum
/// let cap = ChunkCapacity::new(512).unwrap();
/// assert_eq!(cap.max(), 512);
///
/// let cap = ChunkCapacity::new(500).unwrap().with_max(800).unwrap().with_min(100).unwrap();
/// assert_eq!((cap.min(), cap.target(), cap.max()), (100, 500, 800));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCapacity {
    target: usize,
    min: usize,
    max: usize,
}

impl ChunkCapacity {
    /// Create a capacity whose target is also its ceiling, with no minimum.
    ///
    /// # Errors
    ///
    /// Returns an error if `target == 0`.
    pub const fn new(target: usize) -> Result<Self, ChunkCapacityError> {
        if target == 0 {
            return Err(ChunkCapacityError::ZeroTarget);
        }
        Ok(Self {
            target,
            min: 0,
            max: target,
        })
    }

    /// Build all three bounds at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are not ordered `min <= target <= max`
    /// or `target == 0`.
    pub fn from_bounds(target: usize, min: usize, max: usize) -> Result<Self, ChunkCapacityError> {
        Self::new(target)?.with_max(max)?.with_min(min)
    }

    /// The size the packer aims for.
    #[must_use]
    pub const fn target(&self) -> usize {
        self.target
    }

    /// Chunks below this size are merged into their predecessor.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// The hard ceiling.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Set a ceiling above the target.
    ///
    /// # Errors
    ///
    /// Returns an error if `max < target`.
    pub fn with_max(self, max: usize) -> Result<Self, ChunkCapacityError> {
        if max < self.target {
            Err(ChunkCapacityError::MaxLessThanTarget {
                target: self.target,
                max,
            })
        } else {
            Ok(Self { max, ..self })
        }
    }

    /// Set the minimum chunk size.
    ///
    /// # Errors
    ///
    /// Returns an error if `min > target`.
    pub fn with_min(self, min: usize) -> Result<Self, ChunkCapacityError> {
        if min > self.target {
            Err(ChunkCapacityError::MinGreaterThanTarget {
                target: self.target,
                min,
            })
        } else {
            Ok(Self { min, ..self })
        }
    }

    /// Classify a chunk size:
    /// - `Ordering::Less`: below target, can take more
    /// - `Ordering::Equal`: between target and max
    /// - `Ordering::Greater`: over max, must split
    #[must_use]
    pub fn fits(&self, size: usize) -> Ordering {
        if size < self.target {
            Ordering::Less
        } else if size > self.max {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Whether `size` is over the target.
    #[must_use]
    pub const fn exceeds_target(&self, size: usize) -> bool {
        size > self.target
    }

    /// Whether `size` is under the minimum.
    #[must_use]
    pub const fn is_undersized(&self, size: usize) -> bool {
        size < self.min
    }

    /// Check if adding `additional` bytes would exceed the ceiling.
    #[must_use]
    pub fn would_overflow(&self, current: usize, additional: usize) -> bool {
        current.saturating_add(additional) > self.max
    }
}

impl Default for ChunkCapacity {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
        }
    }
}

/// Error when configuring chunk capacity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkCapacityError {
    /// Target size must be > 0.
    #[error("target chunk size must be > 0")]
    ZeroTarget,

    /// Max size must be >= target size.
    #[error("max ({max}) must be >= target ({target})")]
    MaxLessThanTarget {
        /// The target chunk size.
        target: usize,
        /// The max that was too small.
        max: usize,
    },

    /// Min size must be <= target size.
    #[error("min ({min}) must be <= target ({target})")]
    MinGreaterThanTarget {
        /// The target chunk size.
        target: usize,
        /// The min that was too large.
        min: usize,
    },
}
