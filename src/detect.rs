//! Chapter boundary detection.
//!
//! Scans the text line by line and reports lines that look like chapter
//! headings. Detection is heuristic and tuned for prose books.
//!
//! ## Which Lines Are Tested
//!
//! Only the first line of the document and lines directly after a blank line.
//! A heading sits on its own; a match in the middle of a paragraph is prose.
//!
//! ## Patterns
//!
//! Patterns are tried in priority order and the first match decides the line.
//! A later pattern never gets a second chance at a line an earlier one matched,
//! even if the earlier match is then rejected.
//!
//! | Priority | Pattern | Example |
//! |----------|---------|---------|
//! | 0 | caller hint | (any) |
//! | 1 | numbered chapter | `Chapter 12`, `Ch. IV` |
//! | 2 | part / book | `Part II`, `BOOK 3` |
//! | 3 | section marker | `Prologue`, `EPILOGUE` |
//! | 4 | locale chapter | `Rozdział 5`, `Kapitel 2` |
//! | 5 | bare Roman numeral | `XIV` |
//! | 6 | numbered title | `12. The Storm` |
//! | 7 | all-caps header | `THE STORM BREAKS` |
//!
//! ## Rejection Gates
//!
//! Drop caps: a one-letter Roman numeral line is rejected when the next
//! non-blank line reads like the rest of a word.
//!
//! ```text
//! M              <- drop cap, not chapter "M"
//!
//! r. Bennet was among the earliest of those who waited on Mr. Bingley.
//! ```
//!
//! Context: at least 2 of the following 6 lines must look like prose.

use std::sync::LazyLock;

use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Lines after a candidate inspected by the context gate.
const CONTEXT_LINES: usize = 6;
/// Prose-like lines required in the context window.
const MIN_PROSE_LINES: usize = 2;
/// Non-blank lines inspected by the drop-cap gate.
const DROP_CAP_LOOKAHEAD: usize = 3;

/// The heuristic that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingPattern {
    /// Caller-supplied hint regex.
    Hint,
    /// `Chapter 12`, `Ch. IV`.
    ChapterNumbered,
    /// `Part II`, `Book 3`.
    PartBook,
    /// `Prologue`, `Epilogue`, `Preface`, ...
    SectionMarker,
    /// `Rozdział 5`, `Kapitel 2`, `Chapitre 3`, `Capítulo 4`.
    LocaleChapter,
    /// A line holding only a Roman numeral.
    RomanNumeral,
    /// `12. Something`.
    NumberedTitle,
    /// A short all-caps line.
    AllCapsHeader,
}

impl HeadingPattern {
    /// Stable name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hint => "hint",
            Self::ChapterNumbered => "chapter_numbered",
            Self::PartBook => "part_book",
            Self::SectionMarker => "section_marker",
            Self::LocaleChapter => "locale_chapter",
            Self::RomanNumeral => "roman_numeral_line",
            Self::NumberedTitle => "numbered_title",
            Self::AllCapsHeader => "all_caps_header",
        }
    }

    /// Strong patterns are trusted as-is. Weak ones must follow the end of a
    /// sentence or a short caption line to survive chapter construction.
    #[must_use]
    pub const fn is_strong(self) -> bool {
        !matches!(
            self,
            Self::RomanNumeral | Self::NumberedTitle | Self::AllCapsHeader
        )
    }
}

impl std::fmt::Display for HeadingPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisional chapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterCandidate {
    /// 0-based line number of the heading.
    pub line_number: usize,
    /// Byte offset of the start of the heading line.
    pub char_start: usize,
    /// Cleaned-up heading title.
    pub title: String,
    /// Pattern that matched.
    pub pattern: HeadingPattern,
}

static BUILTIN_PATTERNS: LazyLock<Vec<(HeadingPattern, Regex)>> = LazyLock::new(|| {
    [
        (
            HeadingPattern::ChapterNumbered,
            r"(?i)^\s*(chapter\s*|ch\.\s*|ch\s+)(\d+|[ivxlcdm]+)\b\.?\s*(.*)$",
        ),
        (
            HeadingPattern::PartBook,
            r"(?i)^\s*(part|book)\s+(\d+|[ivxlcdm]+)\b\.?\s*(.*)$",
        ),
        (
            HeadingPattern::SectionMarker,
            r"(?i)^\s*(prologue|epilogue|introduction|preface|foreword|afterword|postscript)\s*$",
        ),
        (
            HeadingPattern::LocaleChapter,
            r"(?i)^\s*(rozdzia[łl]|kapitel|chapitre|cap[íi]tulo)\s+(\d+|[ivxlcdm]+)\b\.?\s*(.*)$",
        ),
        (HeadingPattern::RomanNumeral, r"^\s*[IVXLCDM]{1,8}\s*$"),
        (HeadingPattern::NumberedTitle, r"^\s*\d{1,3}\.\s+[A-Z]"),
        (HeadingPattern::AllCapsHeader, r"^[A-Z][A-Z\s\-']{5,50}$"),
    ]
    .into_iter()
    .map(|(pattern, source)| {
        let regex = Regex::new(source).expect("valid heading regex");
        (pattern, regex)
    })
    .collect()
});

/// Chapter heading detector.
///
/// ## Example
///
/// ```rust
/// use folio::{BoundaryDetector, HeadingPattern};
///
/// let text = "Chapter 1\n\nIt was a dark night.\nThe wind howled.\n";
/// let candidates = BoundaryDetector::new(None).detect(text);
///
/// assert_eq!(candidates.len(), 1);
/// assert_eq!(candidates[0].title, "Chapter 1");
/// assert_eq!(candidates[0].pattern, HeadingPattern::ChapterNumbered);
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    hint: Option<Regex>,
    warnings: Vec<String>,
}

impl BoundaryDetector {
    /// Create a detector, optionally with a heading hint from upstream.
    ///
    /// The hint is matched case-insensitively at the start of a line and
    /// takes priority over every built-in pattern. It is dropped, with a
    /// warning, if it is not a valid regex or if it matches an empty or blank
    /// line.
    #[must_use]
    pub fn new(hint: Option<&str>) -> Self {
        let mut warnings = Vec::new();
        let hint = hint.and_then(|source| match compile_hint(source) {
            Ok(regex) => {
                tracing::info!(hint = source, "prepended heading hint to detection patterns");
                Some(regex)
            }
            Err(reason) => {
                tracing::warn!(hint = source, "{reason}");
                warnings.push(format!("heading hint '{source}' rejected: {reason}"));
                None
            }
        });

        Self { hint, warnings }
    }

    /// Warnings raised while preparing the detector.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether a hint pattern is active.
    #[must_use]
    pub fn has_hint(&self) -> bool {
        self.hint.is_some()
    }

    /// Patterns in priority order.
    fn patterns(&self) -> impl Iterator<Item = (HeadingPattern, &Regex)> {
        self.hint
            .iter()
            .map(|regex| (HeadingPattern::Hint, regex))
            .chain(BUILTIN_PATTERNS.iter().map(|(p, r)| (*p, r)))
    }

    /// Scan `text` and return candidates in order of appearance.
    pub fn detect(&self, text: &str) -> Vec<ChapterCandidate> {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut candidates = Vec::new();
        let mut offset = 0;

        for (line_number, line) in lines.iter().enumerate() {
            let line_start = offset;
            offset += line.len() + 1;

            if line_number > 0 && !lines[line_number - 1].trim().is_empty() {
                continue;
            }

            let Some((pattern, captures)) = self
                .patterns()
                .find_map(|(pattern, regex)| regex.captures(line).map(|c| (pattern, c)))
            else {
                continue;
            };

            if pattern == HeadingPattern::RomanNumeral && is_drop_cap(&lines, line_number) {
                tracing::debug!(line = line_number, text = line.trim(), "skipping drop cap");
                continue;
            }

            if !has_prose_context(&lines, line_number) {
                tracing::debug!(
                    line = line_number,
                    pattern = pattern.as_str(),
                    "rejected heading without prose context"
                );
                continue;
            }

            let title = extract_title(line, pattern, &captures);
            tracing::debug!(
                line = line_number,
                pattern = pattern.as_str(),
                title = %title,
                "found chapter candidate"
            );
            candidates.push(ChapterCandidate {
                line_number,
                char_start: line_start,
                title,
                pattern,
            });
        }

        candidates
    }
}

/// Detect chapter candidates with an optional hint pattern.
pub fn detect_boundaries(text: &str, hint: Option<&str>) -> Vec<ChapterCandidate> {
    BoundaryDetector::new(hint).detect(text)
}

fn compile_hint(source: &str) -> Result<Regex, String> {
    let regex = RegexBuilder::new(&format!("^(?:{source})"))
        .case_insensitive(true)
        .build()
        .map_err(|e| format!("invalid regex: {e}"))?;

    if regex.is_match("") || regex.is_match(" ") {
        return Err("pattern matches empty or blank lines".to_string());
    }

    Ok(regex)
}

/// Whether a one-letter line is the oversized first letter of a word.
///
/// Lowercase continuations (`M` + `r. Bennet`) and uppercase word fragments
/// (`M` + `R. BENNET`, `D` + `URING`) are drop caps; a normal sentence start
/// (`Elizabeth`, `The`) is not.
fn is_drop_cap(lines: &[&str], line_number: usize) -> bool {
    if lines[line_number].trim().chars().count() != 1 {
        return false;
    }

    let Some(next) = lines
        .iter()
        .skip(line_number + 1)
        .take(DROP_CAP_LOOKAHEAD)
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
    else {
        return false;
    };

    let mut chars = next.chars();
    match (chars.next(), chars.next()) {
        (Some(first), _) if first.is_lowercase() => true,
        (Some(_), Some(second)) => {
            second.is_uppercase() || second == '.' || second.is_whitespace()
        }
        _ => false,
    }
}

/// Whether the lines after a candidate look like prose.
///
/// A window cut short by the end of the document only needs as many prose
/// lines as it has non-blank lines, up to the usual minimum.
fn has_prose_context(lines: &[&str], line_number: usize) -> bool {
    let window = &lines[(line_number + 1).min(lines.len())..];
    let window = &window[..window.len().min(CONTEXT_LINES)];
    if window.is_empty() {
        return true;
    }

    let prose = window
        .iter()
        .filter(|line| line.trim().chars().any(char::is_lowercase))
        .count();

    let required = if window.len() < CONTEXT_LINES {
        let non_blank = window.iter().filter(|l| !l.trim().is_empty()).count();
        MIN_PROSE_LINES.min(non_blank)
    } else {
        MIN_PROSE_LINES
    };

    prose >= required
}

fn extract_title(line: &str, pattern: HeadingPattern, captures: &Captures<'_>) -> String {
    let line = line.trim();
    match pattern {
        HeadingPattern::ChapterNumbered | HeadingPattern::PartBook | HeadingPattern::LocaleChapter => {
            let prefix = captures.get(1).map_or("", |m| m.as_str().trim());
            let number = captures.get(2).map_or("", |m| m.as_str());
            let suffix = captures
                .get(3)
                .map_or("", |m| m.as_str())
                .trim()
                .trim_start_matches([':', '.', '-', '\u{2013}', '\u{2014}'])
                .trim();

            let mut title = format!("{} {}", title_case(prefix), number.to_uppercase());
            if !suffix.is_empty() {
                title.push_str(": ");
                title.push_str(suffix);
            }
            title
        }
        HeadingPattern::SectionMarker | HeadingPattern::AllCapsHeader => title_case(line),
        HeadingPattern::RomanNumeral => line.to_uppercase(),
        HeadingPattern::NumberedTitle | HeadingPattern::Hint => line.to_string(),
    }
}

/// Uppercase the first letter of each word, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            in_word = c == '\'' && in_word;
            out.push(c);
        }
    }
    out
}
