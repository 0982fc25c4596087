//! Paragraph splitting and hard-wrap unwrapping.
//!
//! Source text is often hard-wrapped at a fixed column:
//!
//! ```text
//! It is a truth universally acknowledged, that a single
//! man in possession of a good fortune, must be in want
//! of a wife.
//! ```
//!
//! Unwrapping joins physical lines with a space. A line that already ends in
//! terminal or structural punctuation (`. ! ? : ; " '`) starts a new logical
//! line instead. Unwrapping never changes length: each line break inside a
//! paragraph becomes exactly one space, so offsets in the unwrapped text are
//! offsets in the source.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Two or more line breaks with only whitespace between them.
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid blank line regex"));

/// `.`/`!`/`?`, optional closing quotes or brackets, optional whitespace, end.
static TERMINAL_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]["'\u{201D}\u{2019}\u{00BB}\])}]*\s*$"#)
        .expect("valid terminal punctuation regex")
});

const LINE_BREAKERS: [char; 7] = ['.', '!', '?', ':', ';', '"', '\''];

/// Whether `text` ends like a sentence.
///
/// ```rust
/// use folio::ends_with_sentence_punctuation;
///
/// assert!(ends_with_sentence_punctuation("She left."));
/// assert!(ends_with_sentence_punctuation("\"Who is there?\"\n"));
/// assert!(!ends_with_sentence_punctuation("and then the"));
/// ```
pub fn ends_with_sentence_punctuation(text: &str) -> bool {
    TERMINAL_PUNCTUATION.is_match(text)
}

/// A paragraph located in its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Byte span of the trimmed paragraph in the source.
    pub span: Range<usize>,
    /// The paragraph with hard wraps unwrapped. Same length as `span`.
    pub text: String,
}

impl Paragraph {
    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.span.len()
    }

    /// Whether the paragraph is empty. Never true for split output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

/// Split text on blank lines into trimmed, non-empty paragraphs.
///
/// ```rust
/// use folio::split_paragraphs;
///
/// let text = "First line\nwrapped.\n\n\n  Second.  ";
/// let paragraphs = split_paragraphs(text);
///
/// assert_eq!(paragraphs.len(), 2);
/// assert_eq!(paragraphs[0].text, "First line wrapped.");
/// assert_eq!(&text[paragraphs[1].span.clone()], "Second.");
/// ```
pub fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut start = 0;

    let mut push = |range: Range<usize>| {
        let slice = &text[range.clone()];
        let trimmed = slice.trim();
        if trimmed.is_empty() {
            return;
        }
        let leading = slice.len() - slice.trim_start().len();
        let span = range.start + leading..range.start + leading + trimmed.len();
        paragraphs.push(Paragraph {
            text: unwrap_hard_wraps(trimmed),
            span,
        });
    };

    for m in BLANK_LINE.find_iter(text) {
        push(start..m.start());
        start = m.end();
    }
    push(start..text.len());

    paragraphs
}

/// Join hard-wrapped lines with spaces.
///
/// ```rust
/// use folio::unwrap_hard_wraps;
///
/// assert_eq!(unwrap_hard_wraps("a single\nman"), "a single man");
/// ```
pub fn unwrap_hard_wraps(paragraph: &str) -> String {
    paragraph
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Byte spans of the logical lines of a paragraph.
///
/// A new logical line starts after a physical line ending in terminal or
/// structural punctuation. Spans exclude the line break that ends them.
///
/// ```rust
/// use folio::logical_lines;
///
/// let text = "Dear Sir:\nI write to\ntell you.";
/// let lines: Vec<_> = logical_lines(text).into_iter().map(|r| &text[r]).collect();
/// assert_eq!(lines, ["Dear Sir:", "I write to\ntell you."]);
/// ```
pub fn logical_lines(paragraph: &str) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for physical in paragraph.split('\n') {
        let end = offset + physical.len();
        if physical.trim_end().ends_with(LINE_BREAKERS) {
            if end > start {
                lines.push(start..end);
            }
            start = (end + 1).min(paragraph.len());
        }
        offset = end + 1;
    }

    if start < paragraph.len() {
        lines.push(start..paragraph.len());
    }

    lines
}
