//! Chapter construction.
//!
//! Turns detected candidates into an exhaustive, contiguous partition of the
//! text:
//!
//! ```text
//! chapters[0].char_start == 0
//! chapters[i].char_end   == chapters[i + 1].char_start
//! chapters[last].char_end == text.len()
//! ```
//!
//! ## Policies
//!
//! - Weak candidates (bare Roman numeral, all-caps line, numbered title) only
//!   survive after the end of a sentence or a short caption line.
//! - Front matter longer than `front_matter_chars` becomes an implicit
//!   "Chapter 1"; shorter front matter is folded into the first chapter.
//! - No surviving candidates: one "Full Text" chapter.
//! - Chapters under `min_chapter_chars` are merged into their predecessor.
//!
//! Every structural change builds fresh records; nothing is renumbered in place.

use serde::{Deserialize, Serialize};

use crate::config::ChapterConfig;
use crate::detect::ChapterCandidate;
use crate::paragraph::ends_with_sentence_punctuation;
use crate::{Error, Result};

/// Preceding lines shorter than this read as captions, not truncated prose.
const CAPTION_CHARS: usize = 40;

/// Title of the single chapter used when no headings are found.
pub const FALLBACK_TITLE: &str = "Full Text";

/// Id of the `index`-th (1-based) chapter of a book.
///
/// ```rust
/// assert_eq!(folio::chapter_id("pp", 3), "pp_ch003");
/// ```
#[must_use]
pub fn chapter_id(book_id: &str, index: usize) -> String {
    format!("{book_id}_ch{index:03}")
}

/// A contiguous span of the book forming one narrative unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Book the chapter belongs to.
    pub book_id: String,
    /// `{book_id}_ch{index:03}`.
    pub chapter_id: String,
    /// 1-based position in the book.
    pub index: usize,
    /// Heading title.
    pub title: String,
    /// Inclusive byte offset.
    pub char_start: usize,
    /// Exclusive byte offset.
    pub char_end: usize,
}

impl Chapter {
    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.char_end.saturating_sub(self.char_start)
    }

    /// Whether the chapter spans no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The byte span of this chapter in the book.
    #[must_use]
    pub fn span(&self) -> std::ops::Range<usize> {
        self.char_start..self.char_end
    }
}

/// Output of [`ChapterBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltChapters {
    /// The final chapter partition.
    pub chapters: Vec<Chapter>,
    /// Whether the single "Full Text" chapter was used.
    pub fallback_used: bool,
    /// Recoverable findings.
    pub warnings: Vec<String>,
}

/// Builds chapters from candidates.
#[derive(Debug, Clone, Default)]
pub struct ChapterBuilder {
    config: ChapterConfig,
}

impl ChapterBuilder {
    /// Create a builder with the given policy settings.
    #[must_use]
    pub const fn new(config: ChapterConfig) -> Self {
        Self { config }
    }

    /// Drop weak candidates that do not follow a sentence end or a caption.
    ///
    /// Strong candidates and the first candidate are always kept.
    pub fn validate_boundaries(candidates: &[ChapterCandidate], text: &str) -> Vec<ChapterCandidate> {
        candidates
            .iter()
            .enumerate()
            .filter(|(i, candidate)| {
                if *i == 0 || candidate.pattern.is_strong() {
                    return true;
                }
                let keep = follows_sentence_or_caption(text, candidate.char_start);
                if !keep {
                    tracing::debug!(
                        line = candidate.line_number,
                        pattern = candidate.pattern.as_str(),
                        title = %candidate.title,
                        "rejected weak heading after unfinished sentence"
                    );
                }
                keep
            })
            .map(|(_, candidate)| candidate.clone())
            .collect()
    }

    /// Build the chapter partition of a text of `text_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingChapters`] if construction produced
    /// overlapping ranges, which indicates a bug rather than bad input.
    pub fn build(
        &self,
        candidates: &[ChapterCandidate],
        text_len: usize,
        book_id: &str,
    ) -> Result<BuiltChapters> {
        let mut warnings = Vec::new();

        let (chapters, fallback_used) = if candidates.is_empty() {
            tracing::warn!(book_id, "no chapters detected, creating single chapter");
            warnings
                .push("No chapter boundaries detected, created single 'Full Text' chapter".to_string());
            (vec![fallback_chapter(book_id, text_len)], true)
        } else {
            (self.from_candidates(candidates, text_len, book_id), false)
        };

        let chapters = if text_len >= self.config.min_text_chars {
            let (merged, merge_warnings) =
                merge_tiny_chapters(&chapters, self.config.min_chapter_chars, book_id);
            warnings.extend(merge_warnings);
            merged
        } else {
            tracing::debug!(text_len, "short document, keeping chapters unmerged");
            chapters
        };

        validate_no_overlaps(&chapters)?;

        if text_len > 0 {
            let limit = text_len as f64 * self.config.large_chapter_ratio;
            for chapter in &chapters {
                if chapter.len() as f64 > limit {
                    let pct = chapter.len() as f64 / text_len as f64 * 100.0;
                    tracing::warn!(chapter = %chapter.chapter_id, pct, "large chapter");
                    warnings.push(format!("Chapter '{}' is {pct:.1}% of book", chapter.title));
                }
            }
        }

        Ok(BuiltChapters {
            chapters,
            fallback_used,
            warnings,
        })
    }

    fn from_candidates(
        &self,
        candidates: &[ChapterCandidate],
        text_len: usize,
        book_id: &str,
    ) -> Vec<Chapter> {
        let first_start = candidates[0].char_start;
        let mut spans: Vec<(String, usize)> = Vec::with_capacity(candidates.len() + 1);

        if first_start > self.config.front_matter_chars {
            tracing::debug!(first_start, "synthesizing chapter for front matter");
            spans.push(("Chapter 1".to_string(), 0));
        }
        spans.extend(candidates.iter().map(|c| (c.title.clone(), c.char_start)));
        // Short front matter belongs to the first chapter.
        spans[0].1 = 0;

        let ends: Vec<usize> = spans
            .iter()
            .skip(1)
            .map(|(_, start)| *start)
            .chain(std::iter::once(text_len))
            .collect();

        spans
            .into_iter()
            .zip(ends)
            .enumerate()
            .map(|(i, ((title, char_start), char_end))| Chapter {
                book_id: book_id.to_string(),
                chapter_id: chapter_id(book_id, i + 1),
                index: i + 1,
                title,
                char_start,
                char_end,
            })
            .collect()
    }
}

/// Whether the line before `offset` ends a sentence or is a short caption.
///
/// A candidate with no text before it passes.
fn follows_sentence_or_caption(text: &str, offset: usize) -> bool {
    let before = text[..offset].trim_end();
    let Some(line) = before.rsplit('\n').next().filter(|l| !l.is_empty()) else {
        return true;
    };
    ends_with_sentence_punctuation(line) || line.trim().chars().count() < CAPTION_CHARS
}

fn fallback_chapter(book_id: &str, text_len: usize) -> Chapter {
    Chapter {
        book_id: book_id.to_string(),
        chapter_id: chapter_id(book_id, 1),
        index: 1,
        title: FALLBACK_TITLE.to_string(),
        char_start: 0,
        char_end: text_len,
    }
}

/// Merge chapters shorter than `min_chars` backward into their predecessor.
///
/// The predecessor keeps its title and start; its end grows. The first
/// chapter is never merged away. Returns renumbered chapters and one warning
/// per merge.
pub fn merge_tiny_chapters(
    chapters: &[Chapter],
    min_chars: usize,
    book_id: &str,
) -> (Vec<Chapter>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut merged: Vec<(&str, usize, usize)> = Vec::with_capacity(chapters.len());

    for chapter in chapters {
        if chapter.len() < min_chars {
            if let Some(prev) = merged.last_mut() {
                tracing::warn!(
                    tiny = %chapter.title,
                    into = prev.0,
                    chars = chapter.len(),
                    "merging tiny chapter"
                );
                warnings.push(format!(
                    "Merged tiny chapter '{}' ({} chars) with '{}'",
                    chapter.title,
                    chapter.len(),
                    prev.0
                ));
                prev.2 = chapter.char_end;
                continue;
            }
        }
        merged.push((&chapter.title, chapter.char_start, chapter.char_end));
    }

    let renumbered = merged
        .into_iter()
        .enumerate()
        .map(|(i, (title, char_start, char_end))| Chapter {
            book_id: book_id.to_string(),
            chapter_id: chapter_id(book_id, i + 1),
            index: i + 1,
            title: title.to_string(),
            char_start,
            char_end,
        })
        .collect();

    (renumbered, warnings)
}

/// Check that no chapter ends after its successor starts.
///
/// # Errors
///
/// Returns [`Error::OverlappingChapters`] for the first offending pair.
pub fn validate_no_overlaps(chapters: &[Chapter]) -> Result<()> {
    for pair in chapters.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if current.char_end > next.char_start {
            return Err(Error::OverlappingChapters {
                current: current.chapter_id.clone(),
                next: next.chapter_id.clone(),
                current_end: current.char_end,
                next_start: next.char_start,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::HeadingPattern;

    fn candidate(char_start: usize, title: &str, pattern: HeadingPattern) -> ChapterCandidate {
        ChapterCandidate {
            line_number: 0,
            char_start,
            title: title.to_string(),
            pattern,
        }
    }

    fn chapter(index: usize, char_start: usize, char_end: usize) -> Chapter {
        Chapter {
            book_id: "b".into(),
            chapter_id: chapter_id("b", index),
            index,
            title: format!("T{index}"),
            char_start,
            char_end,
        }
    }

    fn assert_partition(chapters: &[Chapter], text_len: usize) {
        assert_eq!(chapters[0].char_start, 0);
        assert_eq!(chapters.last().unwrap().char_end, text_len);
        for pair in chapters.windows(2) {
            assert_eq!(pair[0].char_end, pair[1].char_start);
        }
        for (i, c) in chapters.iter().enumerate() {
            assert_eq!(c.index, i + 1);
            assert_eq!(c.chapter_id, chapter_id("b", i + 1));
        }
    }

    #[test]
    fn test_build_from_candidates() {
        let candidates = [
            candidate(0, "Chapter 1", HeadingPattern::ChapterNumbered),
            candidate(1000, "Chapter 2", HeadingPattern::ChapterNumbered),
            candidate(2500, "Chapter 3", HeadingPattern::ChapterNumbered),
        ];
        let built = ChapterBuilder::default().build(&candidates, 4000, "b").unwrap();

        assert!(!built.fallback_used);
        assert_eq!(built.chapters.len(), 3);
        assert_partition(&built.chapters, 4000);
        assert_eq!(built.chapters[1].title, "Chapter 2");
        assert_eq!(built.chapters[1].span(), 1000..2500);
    }

    #[test]
    fn test_fallback_chapter() {
        let built = ChapterBuilder::default().build(&[], 3000, "b").unwrap();

        assert!(built.fallback_used);
        assert_eq!(built.chapters.len(), 1);
        assert_eq!(built.chapters[0].title, FALLBACK_TITLE);
        assert_partition(&built.chapters, 3000);
        assert!(built.warnings.iter().any(|w| w.contains("No chapter boundaries")));
    }

    #[test]
    fn test_front_matter_becomes_chapter() {
        let candidates = [candidate(800, "Chapter I", HeadingPattern::ChapterNumbered)];
        let built = ChapterBuilder::default().build(&candidates, 5000, "b").unwrap();

        assert_eq!(built.chapters.len(), 2);
        assert_eq!(built.chapters[0].title, "Chapter 1");
        assert_eq!(built.chapters[0].span(), 0..800);
        assert_eq!(built.chapters[1].title, "Chapter I");
        assert_partition(&built.chapters, 5000);
    }

    #[test]
    fn test_short_front_matter_folded() {
        let candidates = [candidate(120, "Prologue", HeadingPattern::SectionMarker)];
        let built = ChapterBuilder::default().build(&candidates, 5000, "b").unwrap();

        assert_eq!(built.chapters.len(), 1);
        assert_eq!(built.chapters[0].title, "Prologue");
        assert_eq!(built.chapters[0].span(), 0..5000);
    }

    #[test]
    fn test_tiny_chapter_merged_backward() {
        let candidates = [
            candidate(0, "One", HeadingPattern::ChapterNumbered),
            candidate(1000, "Two", HeadingPattern::ChapterNumbered),
            candidate(2900, "Three", HeadingPattern::ChapterNumbered),
        ];
        let built = ChapterBuilder::default().build(&candidates, 3000, "b").unwrap();

        assert_eq!(built.chapters.len(), 2);
        assert_eq!(built.chapters[1].title, "Two");
        assert_eq!(built.chapters[1].span(), 1000..3000);
        assert_partition(&built.chapters, 3000);
        assert!(built.warnings.iter().any(|w| w.contains("Merged tiny chapter 'Three'")));
    }

    #[test]
    fn test_first_chapter_never_merged_away() {
        let chapters = [chapter(1, 0, 10), chapter(2, 10, 900)];
        let (merged, warnings) = merge_tiny_chapters(&chapters, 500, "b");
        assert_eq!(merged.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_merge_builds_fresh_records() {
        let chapters = [chapter(1, 0, 600), chapter(2, 600, 700), chapter(3, 700, 1400)];
        let (merged, warnings) = merge_tiny_chapters(&chapters, 500, "b");

        assert_eq!(warnings.len(), 1);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].chapter_id, "b_ch002");
        assert_eq!(merged[1].title, "T3");
        assert_eq!(merged[0].span(), 0..700);
        // Input untouched.
        assert_eq!(chapters[1].char_end, 700);
    }

    #[test]
    fn test_short_document_not_merged() {
        let text = "Chapter 1\n\nIt was a dark night. The wind howled.\n\nChapter 2\n\nShe walked on. The end.";
        let candidates = [
            candidate(0, "Chapter 1", HeadingPattern::ChapterNumbered),
            candidate(50, "Chapter 2", HeadingPattern::ChapterNumbered),
        ];
        let built = ChapterBuilder::default()
            .build(&candidates, text.len(), "b")
            .unwrap();
        assert_eq!(built.chapters.len(), 2);
    }

    #[test]
    fn test_large_chapter_warning() {
        let candidates = [
            candidate(0, "Big", HeadingPattern::ChapterNumbered),
            candidate(9000, "Small", HeadingPattern::ChapterNumbered),
        ];
        let built = ChapterBuilder::default().build(&candidates, 10_000, "b").unwrap();
        assert!(built.warnings.iter().any(|w| w == "Chapter 'Big' is 90.0% of book"));
    }

    #[test]
    fn test_overlap_detected() {
        let chapters = [chapter(1, 0, 600), chapter(2, 500, 900)];
        let err = validate_no_overlaps(&chapters).unwrap_err();
        assert!(matches!(
            err,
            Error::OverlappingChapters { current_end: 600, next_start: 500, .. }
        ));
    }

    #[test]
    fn test_weak_candidate_after_unfinished_sentence() {
        let text = "Chapter 1\n\nHe had walked a very long way down the road towards\n\nXIV\n\nthe house.";
        let xiv = text.find("XIV").unwrap();
        let candidates = [
            candidate(0, "Chapter 1", HeadingPattern::ChapterNumbered),
            candidate(xiv, "XIV", HeadingPattern::RomanNumeral),
        ];
        let kept = ChapterBuilder::validate_boundaries(&candidates, text);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_weak_candidate_after_sentence_or_caption() {
        let text = "He had walked a very long way down the road to the house.\n\nXIV\n\nShort caption\n\nTHE STORM\n";
        let candidates = [
            candidate(0, "first", HeadingPattern::NumberedTitle),
            candidate(text.find("XIV").unwrap(), "XIV", HeadingPattern::RomanNumeral),
            candidate(text.find("THE STORM").unwrap(), "The Storm", HeadingPattern::AllCapsHeader),
        ];
        let kept = ChapterBuilder::validate_boundaries(&candidates, text);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_strong_candidate_always_kept() {
        let text = "an unfinished line of prose that runs on and on without end\n\nChapter 2\n";
        let candidates = [
            candidate(0, "x", HeadingPattern::AllCapsHeader),
            candidate(text.find("Chapter").unwrap(), "Chapter 2", HeadingPattern::ChapterNumbered),
        ];
        assert_eq!(ChapterBuilder::validate_boundaries(&candidates, text).len(), 2);
    }
}
