//! Invariant validation of a book's chunk sequence.
//!
//! Runs per-chunk checks (size, content) and cross-chunk checks (identity,
//! indexing, offsets) and classifies every finding as blocking
//! ([`Severity::Error`]) or advisory ([`Severity::Warn`]).
//!
//! | Check | Severity |
//! |-------|----------|
//! | `empty_text` | ERROR |
//! | `too_short` | WARN |
//! | `too_long` | ERROR |
//! | `non_prose` | WARN |
//! | `duplicate_chunk_id` | ERROR |
//! | `duplicate_text` | WARN |
//! | `chunk_index_gap` | ERROR |
//! | `offset_overlap` | ERROR |
//! | `offset_gap` | WARN |

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::capacity::ChunkCapacity;
use crate::chunk::Chunk;
use crate::error::{Error, Result};

/// Gaps between consecutive chunks above this many bytes are reported.
pub const MAX_OFFSET_GAP: usize = 100;

/// Whether a finding blocks the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Blocks the book.
    Error,
    /// Advisory only.
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
        })
    }
}

/// The check that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Text is empty or whitespace.
    EmptyText,
    /// Shorter than `min`.
    TooShort,
    /// Longer than `max`.
    TooLong,
    /// No letters at all.
    NonProse,
    /// A `chunk_id` occurs more than once.
    DuplicateChunkId,
    /// Distinct chunks share the same trimmed text.
    DuplicateText,
    /// Global indices don't run `1..N`.
    ChunkIndexGap,
    /// Two byte ranges overlap.
    OffsetOverlap,
    /// Uncovered bytes between consecutive chunks.
    OffsetGap,
}

impl Check {
    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyText => "empty_text",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::NonProse => "non_prose",
            Self::DuplicateChunkId => "duplicate_chunk_id",
            Self::DuplicateText => "duplicate_text",
            Self::ChunkIndexGap => "chunk_index_gap",
            Self::OffsetOverlap => "offset_overlap",
            Self::OffsetGap => "offset_gap",
        }
    }

    /// Severity this check always reports with.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::TooShort | Self::NonProse | Self::DuplicateText | Self::OffsetGap => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Blocking or advisory.
    pub severity: Severity,
    /// Which check fired.
    pub check: Check,
    /// Human-readable detail.
    pub message: String,
    /// Offending chunk, for per-chunk findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Offending chunk's global index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

impl ValidationIssue {
    fn new(check: Check, message: String) -> Self {
        Self {
            severity: check.severity(),
            check,
            message,
            chunk_id: None,
            chunk_index: None,
        }
    }

    fn for_chunk(check: Check, message: String, chunk: &Chunk) -> Self {
        Self {
            chunk_id: Some(chunk.chunk_id.clone()),
            chunk_index: Some(chunk.chunk_index),
            ..Self::new(check, message)
        }
    }

    /// Whether this issue blocks the book.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.check, self.message)
    }
}

/// Outcome of validating a book's chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every finding, per-chunk first.
    pub issues: Vec<ValidationIssue>,
    /// ERROR issues.
    pub error_count: usize,
    /// WARN issues.
    pub warning_count: usize,
    /// True iff there are no ERROR issues.
    pub success: bool,
    /// Chunks audited.
    pub total_chunks: usize,
}

impl ValidationReport {
    /// Validate `chunks` and tally the findings.
    ///
    /// ```rust
    /// use folio::{Chunk, ChunkCapacity, ValidationReport};
    ///
    /// let chunk = Chunk {
    ///     book_id: "b".into(),
    ///     chapter_id: "b_ch001".into(),
    ///     chunk_id: "b_ch001_000001".into(),
    ///     chunk_index: 1,
    ///     text: "1234567890".into(),
    ///     char_start: 0,
    ///     char_end: 10,
    /// };
    ///
    /// let report = ValidationReport::from_chunks(&[chunk], ChunkCapacity::default());
    /// assert!(report.success);
    /// assert_eq!(report.warning_count, 2);
    /// ```
    #[must_use]
    pub fn from_chunks(chunks: &[Chunk], capacity: ChunkCapacity) -> Self {
        let issues = validate(chunks, capacity);
        let error_count = issues.iter().filter(|i| i.is_error()).count();
        let warning_count = issues.len() - error_count;

        tracing::info!(
            chunks = chunks.len(),
            errors = error_count,
            warnings = warning_count,
            "validation complete"
        );

        Self {
            issues,
            error_count,
            warning_count,
            success: error_count == 0,
            total_chunks: chunks.len(),
        }
    }

    /// `Ok(self)` on success, [`Error::ValidationFailed`] otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::ValidationFailed {
                error_count: self.error_count,
            })
        }
    }

    /// Issues produced by `check`.
    pub fn issues_for(&self, check: Check) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.check == check)
    }
}

/// Run every check over `chunks`.
///
/// Per-chunk findings come first, in chunk order, followed by cross-chunk
/// findings. Every issue is also logged at its severity.
pub fn validate(chunks: &[Chunk], capacity: ChunkCapacity) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for chunk in chunks {
        check_chunk(chunk, capacity, &mut issues);
    }
    check_duplicate_ids(chunks, &mut issues);
    check_duplicate_text(chunks, &mut issues);
    check_index_sequence(chunks, &mut issues);
    check_offsets(chunks, &mut issues);

    for issue in &issues {
        let chunk = issue.chunk_id.as_deref().unwrap_or("-");
        match issue.severity {
            Severity::Error => tracing::error!(check = %issue.check, chunk, "{}", issue.message),
            Severity::Warn => tracing::warn!(check = %issue.check, chunk, "{}", issue.message),
        }
    }

    issues
}

fn check_chunk(chunk: &Chunk, capacity: ChunkCapacity, issues: &mut Vec<ValidationIssue>) {
    let len = chunk.len();
    let trimmed = chunk.text.trim();

    if trimmed.is_empty() {
        issues.push(ValidationIssue::for_chunk(
            Check::EmptyText,
            "Chunk has empty text".to_string(),
            chunk,
        ));
    }
    if capacity.is_undersized(len) {
        issues.push(ValidationIssue::for_chunk(
            Check::TooShort,
            format!("Chunk is too short ({len} < {} chars)", capacity.min()),
            chunk,
        ));
    }
    if len > capacity.max() {
        issues.push(ValidationIssue::for_chunk(
            Check::TooLong,
            format!("Chunk exceeds max length ({len} > {} chars)", capacity.max()),
            chunk,
        ));
    }
    if !trimmed.is_empty() && !trimmed.chars().any(char::is_alphabetic) {
        issues.push(ValidationIssue::for_chunk(
            Check::NonProse,
            "Chunk contains only digits/punctuation/whitespace".to_string(),
            chunk,
        ));
    }
}

/// Groups in first-seen order.
fn group_by<K, V>(items: impl Iterator<Item = (K, V)>) -> Vec<(K, Vec<V>)>
where
    K: std::hash::Hash + Eq + Clone,
{
    let mut position: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();
    for (key, value) in items {
        match position.get(&key) {
            Some(&i) => groups[i].1.push(value),
            None => {
                position.insert(key.clone(), groups.len());
                groups.push((key, vec![value]));
            }
        }
    }
    groups
}

fn check_duplicate_ids(chunks: &[Chunk], issues: &mut Vec<ValidationIssue>) {
    for (id, seen) in group_by(chunks.iter().map(|c| (c.chunk_id.as_str(), ()))) {
        if seen.len() > 1 {
            issues.push(ValidationIssue {
                chunk_id: Some(id.to_string()),
                ..ValidationIssue::new(
                    Check::DuplicateChunkId,
                    format!("chunk_id '{id}' appears {} times", seen.len()),
                )
            });
        }
    }
}

fn check_duplicate_text(chunks: &[Chunk], issues: &mut Vec<ValidationIssue>) {
    let groups = group_by(chunks.iter().map(|c| (c.text.trim(), c.chunk_id.as_str())));
    for (_, mut ids) in groups {
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        if ids.len() > 1 {
            issues.push(ValidationIssue::new(
                Check::DuplicateText,
                format!("Duplicate text in chunks: {}", ids.join(", ")),
            ));
        }
    }
}

fn check_index_sequence(chunks: &[Chunk], issues: &mut Vec<ValidationIssue>) {
    let mut indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    indices.sort_unstable();

    let Some(&first) = indices.first() else {
        return;
    };
    if first != 1 {
        issues.push(ValidationIssue::new(
            Check::ChunkIndexGap,
            format!("chunk_index should start at 1, found {first}"),
        ));
    }
    for pair in indices.windows(2) {
        if pair[1] != pair[0] + 1 {
            let message = if pair[1] == pair[0] {
                format!("Duplicate chunk_index {}", pair[0])
            } else {
                format!("Gap in chunk_index: {} to {}", pair[0], pair[1])
            };
            issues.push(ValidationIssue::new(Check::ChunkIndexGap, message));
        }
    }
}

fn check_offsets(chunks: &[Chunk], issues: &mut Vec<ValidationIssue>) {
    let mut sorted: Vec<&Chunk> = chunks.iter().collect();
    sorted.sort_by_key(|c| c.char_start);

    for pair in sorted.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if prev.char_end > curr.char_start {
            issues.push(ValidationIssue::for_chunk(
                Check::OffsetOverlap,
                format!(
                    "Offset overlap: {} ends at {}, {} starts at {}",
                    prev.chunk_id, prev.char_end, curr.chunk_id, curr.char_start
                ),
                curr,
            ));
        }
        let gap = curr.char_start.saturating_sub(prev.char_end);
        if gap > MAX_OFFSET_GAP {
            issues.push(ValidationIssue::for_chunk(
                Check::OffsetGap,
                format!(
                    "Gap of {gap} chars between {} and {}",
                    prev.chunk_id, curr.chunk_id
                ),
                curr,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(seq: usize, index: usize, text: &str, start: usize) -> Chunk {
        Chunk {
            book_id: "b".into(),
            chapter_id: "b_ch001".into(),
            chunk_id: crate::chunk::chunk_id("b_ch001", seq),
            chunk_index: index,
            text: text.to_string(),
            char_start: start,
            char_end: start + text.len(),
        }
    }

    fn checks(issues: &[ValidationIssue]) -> Vec<Check> {
        issues.iter().map(|i| i.check).collect()
    }

    fn capacity() -> ChunkCapacity {
        ChunkCapacity::from_bounds(20, 5, 40).unwrap()
    }

    #[test]
    fn test_clean_sequence() {
        let a = chunk(1, 1, "The first chunk of prose.", 0);
        let b = chunk(2, 2, " And the second of them.", a.char_end);
        assert!(validate(&[a, b], capacity()).is_empty());
    }

    #[test]
    fn test_non_prose_and_too_short_share_chunk() {
        let c = chunk(1, 1, "1234567890", 0);
        let issues = validate(&[c], ChunkCapacity::default());

        assert_eq!(checks(&issues), [Check::TooShort, Check::NonProse]);
        assert!(issues.iter().all(|i| i.severity == Severity::Warn));
        assert!(issues.iter().all(|i| i.chunk_id.as_deref() == Some("b_ch001_000001")));
    }

    #[test]
    fn test_empty_text_is_error() {
        let issues = validate(&[chunk(1, 1, "   ", 0)], capacity());
        assert_eq!(checks(&issues), [Check::EmptyText, Check::TooShort]);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_too_long_is_error() {
        let text = "word ".repeat(10);
        let issues = validate(&[chunk(1, 1, &text, 0)], capacity());
        assert_eq!(checks(&issues), [Check::TooLong]);
        assert!(issues[0].message.contains("50 > 40"));
    }

    #[test]
    fn test_non_prose_accepts_non_ascii_letters() {
        let issues = validate(&[chunk(1, 1, "Żółć, 1999!", 0)], capacity());
        assert!(!checks(&issues).contains(&Check::NonProse));
    }

    #[test]
    fn test_duplicate_ids_reported_once() {
        let a = chunk(1, 1, "Alpha words here.", 0);
        let b = chunk(1, 2, "Beta words there.", a.char_end);
        let c = chunk(1, 3, "Gamma words again.", b.char_end);
        let issues = validate(&[a, b, c], capacity());

        let dup: Vec<_> = issues.iter().filter(|i| i.check == Check::DuplicateChunkId).collect();
        assert_eq!(dup.len(), 1);
        assert!(dup[0].message.contains("appears 3 times"));
        assert!(dup[0].is_error());
    }

    #[test]
    fn test_duplicate_text_lists_all_ids() {
        let a = chunk(1, 1, "Same words.", 0);
        let b = chunk(2, 2, "\n\nSame words.", a.char_end);
        let c = chunk(3, 3, " Same words.", b.char_end);
        let issues = validate(&[a, b, c], capacity());

        assert_eq!(checks(&issues), [Check::DuplicateText]);
        assert_eq!(
            issues[0].message,
            "Duplicate text in chunks: b_ch001_000001, b_ch001_000002, b_ch001_000003"
        );
    }

    #[test]
    fn test_duplicate_text_lists_repeated_id_once() {
        let a = chunk(1, 1, "Same words.", 0);
        let b = chunk(2, 2, " Same words.", a.char_end);
        let c = chunk(1, 3, "\nSame words.", b.char_end);
        let issues = validate(&[a, b, c], capacity());

        let dup: Vec<_> = issues.iter().filter(|i| i.check == Check::DuplicateText).collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].message, "Duplicate text in chunks: b_ch001_000001, b_ch001_000002");
        assert_eq!(issues.iter().filter(|i| i.check == Check::DuplicateChunkId).count(), 1);
    }

    #[test]
    fn test_index_must_start_at_one_without_gaps() {
        let a = chunk(1, 2, "Alpha words here.", 0);
        let b = chunk(2, 4, "Beta words there.", a.char_end);
        let issues = validate(&[a, b], capacity());

        assert_eq!(checks(&issues), [Check::ChunkIndexGap, Check::ChunkIndexGap]);
        assert_eq!(issues[0].message, "chunk_index should start at 1, found 2");
        assert_eq!(issues[1].message, "Gap in chunk_index: 2 to 4");
    }

    #[test]
    fn test_offset_overlap_and_gap() {
        let a = chunk(1, 1, "Alpha words here.", 0);
        let b = chunk(2, 2, "Beta words there.", 10);
        let c = chunk(3, 3, "Gamma words again.", 500);
        let issues = validate(&[c, a, b], capacity());

        assert_eq!(checks(&issues), [Check::OffsetOverlap, Check::OffsetGap]);
        assert_eq!(issues[0].chunk_id.as_deref(), Some("b_ch001_000002"));
        assert_eq!(issues[1].severity, Severity::Warn);
    }

    #[test]
    fn test_report_success_ignores_warnings() {
        let report = ValidationReport::from_chunks(&[chunk(1, 1, "Hi.", 0)], capacity());
        assert!(report.success);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.issues_for(Check::TooShort).count(), 1);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_report_failure_carries_error_count() {
        let report = ValidationReport::from_chunks(&[chunk(1, 3, "Hello there.", 0)], capacity());
        assert!(!report.success);
        let err = report.into_result().unwrap_err();
        assert_eq!(err.error_count(), Some(1));
    }

    #[test]
    fn test_issue_serializes_with_uppercase_severity() {
        let issue = validate(&[chunk(1, 1, "Hi.", 0)], capacity()).remove(0);
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""severity":"WARN""#));
        assert!(json.contains(r#""check":"too_short""#));
    }
}
