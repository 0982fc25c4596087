//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! [chunking]
//! target_chars = 600
//! min_chars = 200
//! max_chars = 1600
//! sentence_splitter = "regex"
//!
//! [chapters]
//! min_chapter_chars = 500
//! large_chapter_ratio = 0.2
//! front_matter_chars = 500
//! min_text_chars = 1000
//! ```

use serde::{Deserialize, Serialize};

use crate::capacity::{ChunkCapacity, DEFAULT_MAX, DEFAULT_MIN, DEFAULT_TARGET};
use crate::sentence::SegmenterKind;
use crate::{Error, Result};

/// Default configuration constants.
pub mod defaults {
    /// Chapters shorter than this are merged into their predecessor.
    pub const MIN_CHAPTER_CHARS: usize = 500;
    /// Chapters larger than this share of the text produce a warning.
    pub const LARGE_CHAPTER_RATIO: f64 = 0.20;
    /// Text before the first heading longer than this becomes its own chapter.
    pub const FRONT_MATTER_CHARS: usize = 500;
    /// Documents shorter than this skip the tiny-chapter merge.
    pub const MIN_TEXT_CHARS: usize = 1000;
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Chunk packing settings.
    pub chunking: ChunkingConfig,
    /// Chapter construction settings.
    pub chapters: ChapterConfig,
}

/// Chunk packing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Size the packer aims for.
    pub target_chars: usize,
    /// Chunks below this are merged into their predecessor.
    pub min_chars: usize,
    /// Hard ceiling.
    pub max_chars: usize,
    /// Which sentence segmenter splits oversized paragraphs.
    pub sentence_splitter: SegmenterKind,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: DEFAULT_TARGET,
            min_chars: DEFAULT_MIN,
            max_chars: DEFAULT_MAX,
            sentence_splitter: SegmenterKind::default(),
        }
    }
}

impl ChunkingConfig {
    /// The validated size bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if the bounds are inconsistent.
    pub fn capacity(&self) -> Result<ChunkCapacity> {
        Ok(ChunkCapacity::from_bounds(
            self.target_chars,
            self.min_chars,
            self.max_chars,
        )?)
    }
}

/// Chapter construction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChapterConfig {
    /// Tiny-chapter merge threshold.
    pub min_chapter_chars: usize,
    /// Share of the text above which a chapter is reported as suspiciously large.
    pub large_chapter_ratio: f64,
    /// Leading text longer than this before the first heading gets its own chapter.
    pub front_matter_chars: usize,
    /// Below this text length chapters are kept as detected.
    ///
    /// Short texts skip the `min_chapter_chars` merge entirely, so a short
    /// document keeps chapters that a long book would fold together.
    pub min_text_chars: usize,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            min_chapter_chars: defaults::MIN_CHAPTER_CHARS,
            large_chapter_ratio: defaults::LARGE_CHAPTER_RATIO,
            front_matter_chars: defaults::FRONT_MATTER_CHARS,
            min_text_chars: defaults::MIN_TEXT_CHARS,
        }
    }
}

impl Config {
    /// Create a configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] on malformed TOML or unknown keys, and
    /// the validation errors of [`Config::validate`].
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if chunk bounds are inconsistent or the large-chapter
    /// ratio is outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        self.chunking.capacity()?;

        let ratio = self.chapters.large_chapter_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "large_chapter_ratio must be in (0, 1], got {ratio}"
            )));
        }

        Ok(())
    }
}

/// Fluent builder for configuration.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    target_chars: Option<usize>,
    min_chars: Option<usize>,
    max_chars: Option<usize>,
    sentence_splitter: Option<SegmenterKind>,
    min_chapter_chars: Option<usize>,
    large_chapter_ratio: Option<f64>,
    front_matter_chars: Option<usize>,
    min_text_chars: Option<usize>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target chunk size.
    pub fn target_chars(mut self, size: usize) -> Self {
        self.target_chars = Some(size);
        self
    }

    /// Set the minimum chunk size.
    pub fn min_chars(mut self, size: usize) -> Self {
        self.min_chars = Some(size);
        self
    }

    /// Set the maximum chunk size.
    pub fn max_chars(mut self, size: usize) -> Self {
        self.max_chars = Some(size);
        self
    }

    /// Select the sentence segmenter.
    pub fn sentence_splitter(mut self, kind: SegmenterKind) -> Self {
        self.sentence_splitter = Some(kind);
        self
    }

    /// Set the tiny-chapter merge threshold.
    pub fn min_chapter_chars(mut self, size: usize) -> Self {
        self.min_chapter_chars = Some(size);
        self
    }

    /// Set the large-chapter warning ratio.
    pub fn large_chapter_ratio(mut self, ratio: f64) -> Self {
        self.large_chapter_ratio = Some(ratio);
        self
    }

    /// Set the implicit front-matter chapter threshold.
    pub fn front_matter_chars(mut self, size: usize) -> Self {
        self.front_matter_chars = Some(size);
        self
    }

    /// Set the text length below which tiny chapters are not merged.
    pub fn min_text_chars(mut self, size: usize) -> Self {
        self.min_text_chars = Some(size);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Config::validate`].
    pub fn build(self) -> Result<Config> {
        let mut config = Config::default();
        let chunking = &mut config.chunking;
        let chapters = &mut config.chapters;

        chunking.target_chars = self.target_chars.unwrap_or(chunking.target_chars);
        chunking.min_chars = self.min_chars.unwrap_or(chunking.min_chars);
        chunking.max_chars = self.max_chars.unwrap_or(chunking.max_chars);
        chunking.sentence_splitter = self.sentence_splitter.unwrap_or(chunking.sentence_splitter);

        chapters.min_chapter_chars = self.min_chapter_chars.unwrap_or(chapters.min_chapter_chars);
        chapters.large_chapter_ratio = self
            .large_chapter_ratio
            .unwrap_or(chapters.large_chapter_ratio);
        chapters.front_matter_chars = self.front_matter_chars.unwrap_or(chapters.front_matter_chars);
        chapters.min_text_chars = self.min_text_chars.unwrap_or(chapters.min_text_chars);

        config.validate()?;
        Ok(config)
    }
}
