//! Stage orchestration: chapterize, chunkify, validate.
//!
//! Each stage returns a report carrying its output, a few statistics, and
//! the recoverable warnings it raised. Integrity failures abort the book with
//! an [`Error`] tagged with the failing stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capacity::ChunkCapacity;
use crate::chapter::{Chapter, ChapterBuilder};
use crate::chunk::Chunk;
use crate::config::Config;
use crate::detect::BoundaryDetector;
use crate::pack::ChunkPacker;
use crate::sentence::{resolve_segmenter, SegmenterKind, SentenceSegmenter};
use crate::validate::ValidationReport;
use crate::{Error, Result};

/// Output of the chapterize stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterizeReport {
    /// Contiguous chapter partition of the text.
    pub chapters: Vec<Chapter>,
    /// Surviving candidates per pattern name.
    pub pattern_matches: BTreeMap<String, usize>,
    /// Whether no heading survived and a single chapter was used.
    pub fallback_used: bool,
    /// Recoverable findings.
    pub warnings: Vec<String>,
}

/// Output of the chunkify stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkifyReport {
    /// Chunks of the whole book in order.
    pub chunks: Vec<Chunk>,
    /// Number of chunks.
    pub total_chunks: usize,
    /// Mean chunk length, rounded to one decimal.
    pub avg_chunk_chars: f64,
    /// Shortest chunk.
    pub min_chunk_chars: usize,
    /// Longest chunk.
    pub max_chunk_chars: usize,
    /// Name of the sentence segmenter used.
    pub sentence_splitter_used: String,
    /// Recoverable findings.
    pub warnings: Vec<String>,
}

/// All three stage reports for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Chapter detection and construction.
    pub chapterize: ChapterizeReport,
    /// Chunk packing.
    pub chunkify: ChunkifyReport,
    /// Invariant validation. Always successful here.
    pub validation: ValidationReport,
}

impl Segmentation {
    /// The chapters.
    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapterize.chapters
    }

    /// The chunks.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunkify.chunks
    }
}

/// Runs the segmentation stages over one book at a time.
///
/// ## Example
///
/// ```rust
/// use folio::Pipeline;
///
/// let text = "Chapter 1\n\nIt was a dark night. The wind howled.\n\n\
///             Chapter 2\n\nShe walked on. The end.";
///
/// let result = Pipeline::default().run(text, "book", None).unwrap();
///
/// assert_eq!(result.chapters().len(), 2);
/// assert_eq!(result.chunks().len(), 2);
/// assert!(result.validation.success);
/// ```
pub struct Pipeline {
    config: Config,
    capacity: ChunkCapacity,
    segmenter: Box<dyn SentenceSegmenter>,
    segmenter_warning: Option<String>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("segmenter", &self.segmenter.name())
            .finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        let (segmenter, segmenter_warning) = resolve_segmenter(SegmenterKind::default());
        Self {
            config: Config::default(),
            capacity: ChunkCapacity::default(),
            segmenter,
            segmenter_warning,
        }
    }
}

impl Pipeline {
    /// Create a pipeline from a configuration.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Config::validate`].
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.chunking.capacity()?;
        let (segmenter, segmenter_warning) = resolve_segmenter(config.chunking.sentence_splitter);
        Ok(Self {
            config,
            capacity,
            segmenter,
            segmenter_warning,
        })
    }

    /// Replace the configured sentence segmenter.
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: impl SentenceSegmenter + 'static) -> Self {
        self.segmenter = Box::new(segmenter);
        self.segmenter_warning = None;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run all stages.
    ///
    /// # Errors
    ///
    /// Any stage error, or [`Error::ValidationFailed`] if validation found
    /// ERROR issues.
    pub fn run(&self, text: &str, book_id: &str, hint: Option<&str>) -> Result<Segmentation> {
        let chapterize = self.chapterize(text, book_id, hint)?;
        let chunkify = self.chunkify(text, &chapterize.chapters)?;
        let validation = self.validate(&chunkify.chunks).into_result()?;

        Ok(Segmentation {
            chapterize,
            chunkify,
            validation,
        })
    }

    /// Detect headings and build the chapter partition.
    ///
    /// # Errors
    ///
    /// [`Error::OverlappingChapters`] if construction is inconsistent.
    pub fn chapterize(
        &self,
        text: &str,
        book_id: &str,
        hint: Option<&str>,
    ) -> Result<ChapterizeReport> {
        tracing::info!(book_id, len = text.len(), "starting chapterize stage");

        let detector = BoundaryDetector::new(hint);
        let mut warnings = detector.warnings().to_vec();

        let candidates = detector.detect(text);
        let candidates = ChapterBuilder::validate_boundaries(&candidates, text);

        let mut pattern_matches = BTreeMap::new();
        for candidate in &candidates {
            *pattern_matches
                .entry(candidate.pattern.as_str().to_string())
                .or_insert(0) += 1;
        }

        let built =
            ChapterBuilder::new(self.config.chapters).build(&candidates, text.len(), book_id)?;
        warnings.extend(built.warnings);

        tracing::info!(
            book_id,
            chapters = built.chapters.len(),
            fallback = built.fallback_used,
            "chapterize stage completed"
        );

        Ok(ChapterizeReport {
            chapters: built.chapters,
            pattern_matches,
            fallback_used: built.fallback_used,
            warnings,
        })
    }

    /// Pack every chapter into chunks.
    ///
    /// # Errors
    ///
    /// [`Error::NoChunks`] if the whole book is blank, and
    /// [`Error::OffsetMismatch`] if a chunk disagrees with the source.
    pub fn chunkify(&self, text: &str, chapters: &[Chapter]) -> Result<ChunkifyReport> {
        tracing::info!(chapters = chapters.len(), "starting chunkify stage");

        let mut warnings: Vec<String> = self.segmenter_warning.iter().cloned().collect();
        let packer = ChunkPacker::new(self.capacity, self.segmenter.as_ref());

        let mut chunks = Vec::new();
        let mut running_index = 0;
        for chapter in chapters {
            let chapter_text = text.get(chapter.span()).ok_or_else(|| Error::OffsetMismatch {
                chunk_id: chapter.chapter_id.clone(),
                message: format!(
                    "chapter range {}..{} is not a valid slice of a {}-byte text",
                    chapter.char_start,
                    chapter.char_end,
                    text.len()
                ),
            })?;

            let packed = packer.pack(chapter_text, chapter, running_index);
            running_index = packed.next_index;
            warnings.extend(packed.warnings);
            chunks.extend(packed.chunks);
        }

        if chunks.is_empty() {
            return Err(Error::NoChunks);
        }
        audit_offsets(&chunks, text)?;

        let sizes = chunks.iter().map(Chunk::len);
        let total: usize = sizes.clone().sum();
        let avg = total as f64 / chunks.len() as f64;

        tracing::info!(chunks = chunks.len(), "chunkify stage completed");

        Ok(ChunkifyReport {
            total_chunks: chunks.len(),
            avg_chunk_chars: (avg * 10.0).round() / 10.0,
            min_chunk_chars: sizes.clone().min().unwrap_or(0),
            max_chunk_chars: sizes.max().unwrap_or(0),
            sentence_splitter_used: self.segmenter.name().to_string(),
            chunks,
            warnings,
        })
    }

    /// Audit the chunk sequence. Never fails; inspect `success`.
    #[must_use]
    pub fn validate(&self, chunks: &[Chunk]) -> ValidationReport {
        ValidationReport::from_chunks(chunks, self.capacity)
    }
}

/// Check every chunk against the source text and its predecessor.
///
/// # Errors
///
/// [`Error::OffsetMismatch`] for the first chunk whose range runs past the
/// text, starts before the previous chunk ends, or whose text differs from
/// the source slice.
pub fn audit_offsets(chunks: &[Chunk], text: &str) -> Result<()> {
    let mismatch = |chunk: &Chunk, message: String| Error::OffsetMismatch {
        chunk_id: chunk.chunk_id.clone(),
        message,
    };

    let mut prev_end = 0;
    for chunk in chunks {
        if chunk.char_end > text.len() {
            return Err(mismatch(
                chunk,
                format!("char_end {} exceeds text length {}", chunk.char_end, text.len()),
            ));
        }
        if chunk.char_start < prev_end {
            return Err(mismatch(
                chunk,
                format!("char_start {} before previous chunk end {prev_end}", chunk.char_start),
            ));
        }
        if text.get(chunk.span()) != Some(chunk.text.as_str()) {
            return Err(mismatch(
                chunk,
                format!("text does not match source at {}..{}", chunk.char_start, chunk.char_end),
            ));
        }
        prev_end = chunk.char_end;
    }
    Ok(())
}
