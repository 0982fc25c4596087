//! Sentence segmentation.
//!
//! The packer only needs sentences when a single paragraph is larger than the
//! target chunk size. It depends on the [`SentenceSegmenter`] trait, so any
//! implementation can be plugged in.
//!
//! ## The Hard Part: Finding Sentences
//!
//! ```text
//! "Mr. Darcy bowed. Elizabeth said nothing."
//!    ^             ^
//!    |             real boundary
//!    not a boundary (honorific)
//! ```
//!
//! Two implementations ship with the crate:
//!
//! - [`RegexSegmenter`]: always available. Splits after `.`, `!` or `?`
//!   (optionally followed by closing quotes) when whitespace and an uppercase
//!   letter or opening quote follow, except after honorifics and single
//!   capital initials.
//! - [`UnicodeSegmenter`]: Unicode Standard Annex #29 sentence boundaries.
//!   Requires the `unicode` feature.
//!
//! When the configured segmenter is compiled out, [`resolve_segmenter`] falls
//! back to the regex one and reports a warning. This degrades quality, never
//! correctness.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Splits a paragraph into sentences.
///
/// Implementations return byte spans into `text` that are:
/// - trimmed (no leading or trailing whitespace)
/// - non-empty
/// - in ascending order and non-overlapping
pub trait SentenceSegmenter: Send + Sync {
    /// Short name reported in stage reports.
    fn name(&self) -> &str;

    /// Split `text` into sentence spans.
    fn split(&self, text: &str) -> Vec<Range<usize>>;
}

/// Which built-in segmenter to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterKind {
    /// [`RegexSegmenter`].
    #[default]
    Regex,
    /// [`UnicodeSegmenter`].
    Unicode,
}

/// Resolve a configured segmenter.
///
/// Returns the segmenter and, when the requested implementation is not
/// available in this build, a warning describing the fallback.
pub fn resolve_segmenter(kind: SegmenterKind) -> (Box<dyn SentenceSegmenter>, Option<String>) {
    match kind {
        SegmenterKind::Regex => (Box::new(RegexSegmenter), None),
        #[cfg(feature = "unicode")]
        SegmenterKind::Unicode => (Box::new(UnicodeSegmenter), None),
        #[cfg(not(feature = "unicode"))]
        SegmenterKind::Unicode => {
            tracing::warn!("unicode segmenter unavailable, using regex sentence splitter");
            (
                Box::new(RegexSegmenter),
                Some("unicode segmenter unavailable, using regex sentence splitter".to_string()),
            )
        }
    }
}

/// `.`/`!`/`?`, optional closing quotes or brackets, then whitespace.
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]["'\u{201D}\u{2019}\u{00BB})\]]*\s+"#).expect("valid sentence end regex")
});

const HONORIFICS: [&str; 6] = ["Mr", "Mrs", "Ms", "Dr", "Jr", "Sr"];

/// Regex-based sentence segmenter.
///
/// ## Example
///
/// ```rust
/// use folio::{RegexSegmenter, SentenceSegmenter};
///
/// let text = "Mr. Darcy bowed. Elizabeth said nothing.";
/// let spans = RegexSegmenter.split(text);
///
/// assert_eq!(spans.len(), 2);
/// assert_eq!(&text[spans[0].clone()], "Mr. Darcy bowed.");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexSegmenter;

impl RegexSegmenter {
    /// Whether the `.` ending `head` belongs to an abbreviation.
    fn is_abbreviation(head: &str) -> bool {
        let Some(before) = head.strip_suffix('.') else {
            return false;
        };
        let word = before
            .rsplit(|c: char| !c.is_alphabetic())
            .next()
            .unwrap_or_default();

        let mut chars = word.chars();
        let single_initial = matches!(
            (chars.next(), chars.next()),
            (Some(c), None) if c.is_uppercase()
        );

        single_initial || HONORIFICS.contains(&word)
    }
}

impl SentenceSegmenter for RegexSegmenter {
    fn name(&self) -> &str {
        "regex"
    }

    fn split(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start = 0;

        for m in SENTENCE_END.find_iter(text) {
            let opens_sentence = text[m.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase() || c == '"' || c == '\u{201C}');
            if !opens_sentence {
                continue;
            }

            // The terminator is ASCII, so `m.start() + 1` is a char boundary.
            if Self::is_abbreviation(&text[..=m.start()]) {
                continue;
            }

            push_trimmed(text, start..m.end(), &mut spans);
            start = m.end();
        }

        push_trimmed(text, start..text.len(), &mut spans);
        spans
    }
}

/// UAX #29 sentence segmenter.
///
/// ```rust
/// use folio::{SentenceSegmenter, UnicodeSegmenter};
///
/// let spans = UnicodeSegmenter.split("How are you? I am fine.");
/// assert_eq!(spans.len(), 2);
/// ```
#[cfg(feature = "unicode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

#[cfg(feature = "unicode")]
impl SentenceSegmenter for UnicodeSegmenter {
    fn name(&self) -> &str {
        "unicode"
    }

    fn split(&self, text: &str) -> Vec<Range<usize>> {
        use unicode_segmentation::UnicodeSegmentation;

        let mut spans = Vec::new();
        for (offset, sentence) in text.split_sentence_bound_indices() {
            push_trimmed(text, offset..offset + sentence.len(), &mut spans);
        }
        spans
    }
}

/// Push `range` with surrounding whitespace removed, if anything is left.
fn push_trimmed(text: &str, range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading < slice.len() {
        spans.push(range.start + leading..range.end - trailing);
    }
}
