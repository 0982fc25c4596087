//! # folio
//!
//! Book segmentation: chapters first, then size-bounded chunks.
//!
//! ## The Problem
//!
//! Downstream consumers (speech synthesis, embedding, summarization) want a
//! book as a sequence of small, addressable pieces. Each piece must be big
//! enough to carry meaning, small enough to process, and must end where a
//! reader would pause. Consumers also need to trust the offsets: a chunk's
//! `char_start..char_end` must slice exactly its text out of the book.
//!
//! Cutting a book well means answering two questions:
//!
//! - Where do chapters start? Headings come in many shapes (`Chapter 12`,
//!   `PART II`, `XIV`, `Prologue`), and many lines that look like headings are
//!   not (a drop cap, a shouted line of dialogue, a numbered list item).
//! - Where do chunks end? Ideally at a paragraph, otherwise at a sentence,
//!   and never past a hard ceiling.
//!
//! ## Stages
//!
//! ```text
//! text ─▶ BoundaryDetector ─▶ candidates
//!                                 │
//!                                 ▼
//!                          ChapterBuilder ─▶ chapters (partition of text)
//!                                 │
//!                                 ▼
//!                     ChunkPacker (per chapter) ─▶ chunks (partition of each chapter)
//!                                 │
//!                                 ▼
//!                        InvariantValidator ─▶ ERROR / WARN issues
//! ```
//!
//! ### Boundary Detection
//!
//! Heading patterns are tried in priority order, first match wins. Matches
//! are then gated: drop caps are skipped, and a heading must be followed by
//! prose. An upstream hint pattern, if given, goes first.
//!
//! ### Chapter Construction
//!
//! Candidates become a contiguous, exhaustive partition. Weak patterns
//! (bare numerals, all-caps lines) must follow a finished sentence. Tiny
//! chapters fold into their predecessor. No headings at all yields a single
//! "Full Text" chapter.
//!
//! ### Chunk Packing
//!
//! Paragraphs are packed greedily toward `target`. A chunk ends early when
//! the next paragraph would overflow and the buffer already ends a sentence;
//! it grows toward `max` when it doesn't. Oversized paragraphs are packed
//! sentence by sentence through a pluggable [`SentenceSegmenter`].
//!
//! ```text
//! target = 600, max = 1600
//!
//! ¶1 (250, ends ".")  ¶2 (300, ends ".")  ¶3 (200, ends ".")
//! └────────── chunk 1 (552) ──────────┘  └─ chunk 2 ... ─┘
//! ```
//!
//! ### Validation
//!
//! The final chunk sequence is audited for empty or oversized chunks,
//! duplicate ids, index gaps, and offset overlaps (blocking), plus short
//! chunks, non-prose chunks, duplicate text, and offset gaps (advisory).
//!
//! ## Quick Start
//!
//! ```rust
//! use folio::{Config, Pipeline, SegmenterKind};
//!
//! let text = "Chapter 1\n\nIt was a dark night. The wind howled.\n\n\
//!             Chapter 2\n\nShe walked on. The end.";
//!
//! let config = Config::builder()
//!     .target_chars(600)
//!     .sentence_splitter(SegmenterKind::Regex)
//!     .build()?;
//! let result = Pipeline::new(config)?.run(text, "book", None)?;
//!
//! for chunk in result.chunks() {
//!     assert_eq!(&text[chunk.span()], chunk.text);
//! }
//! # Ok::<(), folio::Error>(())
//! ```
//!
//! ## Offsets
//!
//! All offsets and lengths are UTF-8 byte offsets, so `&text[start..end]`
//! always works. Chunk text is never rewritten: hard-wrap unwrapping only
//! affects how punctuation and sentences are detected.
//!
//! ## Logging
//!
//! Stages emit [`tracing`] events. Install a subscriber to see them.

mod capacity;
mod chapter;
mod chunk;
mod config;
mod detect;
mod error;
mod pack;
mod paragraph;
mod pipeline;
mod sentence;
mod validate;

pub use capacity::{ChunkCapacity, ChunkCapacityError, DEFAULT_MAX, DEFAULT_MIN, DEFAULT_TARGET};
pub use chapter::{
    chapter_id, merge_tiny_chapters, validate_no_overlaps, BuiltChapters, Chapter, ChapterBuilder,
    FALLBACK_TITLE,
};
pub use chunk::{chunk_id, Chunk};
pub use config::{defaults, ChapterConfig, ChunkingConfig, Config, ConfigBuilder};
pub use detect::{detect_boundaries, BoundaryDetector, ChapterCandidate, HeadingPattern};
pub use error::{Error, Result, Stage};
pub use pack::{merge_tiny_chunks, ChunkPacker, PackedChapter};
pub use paragraph::{
    ends_with_sentence_punctuation, logical_lines, split_paragraphs, unwrap_hard_wraps, Paragraph,
};
pub use pipeline::{audit_offsets, ChapterizeReport, ChunkifyReport, Pipeline, Segmentation};
pub use sentence::{resolve_segmenter, RegexSegmenter, SegmenterKind, SentenceSegmenter};
pub use validate::{validate, Check, Severity, ValidationIssue, ValidationReport, MAX_OFFSET_GAP};

#[cfg(feature = "unicode")]
pub use sentence::UnicodeSegmenter;
