//! Paragraph-first chunk packing.
//!
//! Packs the paragraphs of one chapter into chunks near the target size,
//! preferring to end every chunk on a sentence.
//!
//! ## The Algorithm
//!
//! For each paragraph, in order:
//!
//! ```text
//! 1. Buffer empty and paragraph > target?
//!      split it into sentences, pack sentences greedily up to target
//! 2. Otherwise add it to the buffer. If that overflows target:
//!      buffer ends a sentence   -> flush buffer, retry paragraph
//!      buffer ends mid-sentence -> keep growing up to max,
//!                                  past max flush anyway and retry
//! 3. Flush whatever is left. The last chunk may end anywhere.
//! ```
//!
//! Then chunks under `min` are folded into their predecessor when the result
//! stays within `max`.
//!
//! ## Offsets
//!
//! Chunks are verbatim slices of the chapter and partition it exactly.
//! Whitespace between two paragraphs (or sentences) starts the later chunk;
//! the chapter's leading whitespace starts its first chunk and its trailing
//! whitespace ends its last one. Sizes measured while packing are therefore
//! the sizes of the emitted chunks.

use std::cmp::Ordering;
use std::ops::Range;

use crate::capacity::ChunkCapacity;
use crate::chapter::Chapter;
use crate::chunk::{chunk_id, Chunk};
use crate::paragraph::{ends_with_sentence_punctuation, logical_lines, split_paragraphs, Paragraph};
use crate::sentence::SentenceSegmenter;

/// Output of [`ChunkPacker::pack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedChapter {
    /// Chunks of the chapter, in order.
    pub chunks: Vec<Chunk>,
    /// Last global chunk index used; pass it to the next chapter.
    pub next_index: usize,
    /// Recoverable findings.
    pub warnings: Vec<String>,
}

/// Packs chapters into chunks.
///
/// ## Example
///
/// ```rust
/// use folio::{Chapter, ChunkCapacity, ChunkPacker, RegexSegmenter};
///
/// let text = "Chapter 1\n\nIt was a dark night. The wind howled.";
/// let chapter = Chapter {
///     book_id: "b".into(),
///     chapter_id: "b_ch001".into(),
///     index: 1,
///     title: "Chapter 1".into(),
///     char_start: 0,
///     char_end: text.len(),
/// };
///
/// let packer = ChunkPacker::new(ChunkCapacity::default(), &RegexSegmenter);
/// let packed = packer.pack(text, &chapter, 0);
///
/// assert_eq!(packed.chunks.len(), 1);
/// assert_eq!(packed.chunks[0].chunk_id, "b_ch001_000001");
/// assert_eq!(packed.chunks[0].text, text);
/// assert_eq!(packed.next_index, 1);
/// ```
pub struct ChunkPacker<'a> {
    capacity: ChunkCapacity,
    segmenter: &'a dyn SentenceSegmenter,
}

impl std::fmt::Debug for ChunkPacker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkPacker")
            .field("capacity", &self.capacity)
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

impl<'a> ChunkPacker<'a> {
    /// Create a packer with the given bounds and sentence segmenter.
    #[must_use]
    pub fn new(capacity: ChunkCapacity, segmenter: &'a dyn SentenceSegmenter) -> Self {
        Self {
            capacity,
            segmenter,
        }
    }

    /// The size bounds in use.
    #[must_use]
    pub const fn capacity(&self) -> ChunkCapacity {
        self.capacity
    }

    /// Pack one chapter.
    ///
    /// `chapter_text` must be the chapter's slice of the book. New chunks are
    /// numbered from `running_index + 1`.
    pub fn pack(
        &self,
        chapter_text: &str,
        chapter: &Chapter,
        running_index: usize,
    ) -> PackedChapter {
        debug_assert_eq!(chapter_text.len(), chapter.len());
        let mut warnings = Vec::new();

        if chapter_text.trim().is_empty() {
            tracing::warn!(chapter = %chapter.chapter_id, "empty chapter, skipping");
            warnings.push(format!("Chapter {} is empty, skipping", chapter.chapter_id));
            return PackedChapter {
                chunks: Vec::new(),
                next_index: running_index,
                warnings,
            };
        }

        let spans = self.pack_spans(chapter_text, &chapter.chapter_id, &mut warnings);

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| Chunk {
                book_id: chapter.book_id.clone(),
                chapter_id: chapter.chapter_id.clone(),
                chunk_id: chunk_id(&chapter.chapter_id, i + 1),
                chunk_index: running_index + i + 1,
                text: chapter_text[span.clone()].to_string(),
                char_start: chapter.char_start + span.start,
                char_end: chapter.char_start + span.end,
            })
            .collect();

        let chunks = merge_tiny_chunks(&chunks, self.capacity);
        let next_index = chunks.last().map_or(running_index, |c| c.chunk_index);

        tracing::debug!(
            chapter = %chapter.chapter_id,
            chunks = chunks.len(),
            "packed chapter"
        );

        PackedChapter {
            chunks,
            next_index,
            warnings,
        }
    }

    /// Chapter-local chunk spans covering `0..text.len()`.
    fn pack_spans(
        &self,
        text: &str,
        chapter_id: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<Range<usize>> {
        let paragraphs = split_paragraphs(text);
        let last = paragraphs.len().saturating_sub(1);
        // The last paragraph owns the chapter's trailing whitespace.
        let end_of = |i: usize| {
            if i == last {
                text.len()
            } else {
                paragraphs[i].span.end
            }
        };

        let mut ends: Vec<usize> = Vec::new();
        let mut start = 0;
        let mut buffered: Option<usize> = None;
        let mut i = 0;

        while i < paragraphs.len() {
            let candidate_len = end_of(i) - start;

            let Some(tail) = buffered else {
                if self.capacity.exceeds_target(candidate_len) {
                    let sentence_ends = self.pack_sentences(
                        text,
                        &paragraphs[i],
                        start,
                        end_of(i),
                        chapter_id,
                        warnings,
                    );
                    ends.extend(sentence_ends);
                    start = end_of(i);
                } else {
                    buffered = Some(i);
                }
                i += 1;
                continue;
            };

            if !self.capacity.exceeds_target(candidate_len) {
                buffered = Some(i);
                i += 1;
                continue;
            }

            let buffer_end = paragraphs[tail].span.end;
            if ends_with_sentence_punctuation(&paragraphs[tail].text) {
                ends.push(buffer_end);
                start = buffer_end;
                buffered = None;
            } else if !self.capacity.would_overflow(candidate_len, 0) {
                buffered = Some(i);
                i += 1;
            } else if tail == 0 && !text[paragraphs[0].span.clone()].contains('\n') {
                // A lone heading line is packed with the sentences after it.
                buffered = None;
            } else {
                tracing::warn!(
                    chapter = chapter_id,
                    offset = buffer_end,
                    "chunk doesn't end with sentence punctuation but at max size"
                );
                warnings.push(format!(
                    "Chunk in {chapter_id} ends mid-sentence at offset {buffer_end} to stay within max size"
                ));
                ends.push(buffer_end);
                start = buffer_end;
                buffered = None;
            }
        }

        if buffered.is_some() {
            ends.push(text.len());
        }

        let mut spans = Vec::with_capacity(ends.len());
        let mut prev = 0;
        for end in ends {
            spans.push(prev..end);
            prev = end;
        }
        spans
    }

    /// Chunk ends for an oversized paragraph, packed from `start` to `end`.
    ///
    /// `end` may run past the paragraph into trailing whitespace, which stays
    /// with the paragraph's last sentence.
    fn pack_sentences(
        &self,
        source: &str,
        paragraph: &Paragraph,
        start: usize,
        end: usize,
        chapter_id: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<usize> {
        let base = paragraph.span.start;
        let mut pieces: Vec<usize> = Vec::new();
        for sentence in self.segmenter.split(&paragraph.text) {
            if paragraph.text[sentence.end..].trim().is_empty() {
                break;
            }
            let sentence_end = base + sentence.end;
            let floor = pieces.last().copied().unwrap_or(start);
            if sentence_end > floor {
                pieces.push(sentence_end);
            }
        }
        pieces.push(end);

        let pieces =
            self.split_oversized_pieces(source, paragraph, start, &pieces, chapter_id, warnings);

        // Greedy: grow each chunk while it stays within target.
        let mut ends = Vec::new();
        let mut chunk_start = start;
        let mut open: Option<usize> = None;
        for piece_end in pieces {
            if let Some(open_end) = open {
                if self.capacity.exceeds_target(piece_end - chunk_start) {
                    ends.push(open_end);
                    chunk_start = open_end;
                }
            }
            open = Some(piece_end);
        }
        ends.extend(open);
        ends
    }

    /// Break any piece longer than max, preferring logical line ends, then
    /// whitespace, then the last char boundary.
    fn split_oversized_pieces(
        &self,
        source: &str,
        paragraph: &Paragraph,
        start: usize,
        pieces: &[usize],
        chapter_id: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<usize> {
        let base = paragraph.span.start;
        let line_ends: Vec<usize> = logical_lines(&source[paragraph.span.clone()])
            .into_iter()
            .map(|line| base + line.end)
            .collect();

        let mut out = Vec::with_capacity(pieces.len());
        let mut piece_start = start;
        for &piece_end in pieces {
            let len = piece_end - piece_start;
            if self.capacity.fits(len) == Ordering::Greater {
                tracing::warn!(
                    chapter = chapter_id,
                    len,
                    "sentence exceeds max size, splitting at word boundaries"
                );
                warnings.push(format!(
                    "Sentence of {len} chars in {chapter_id} exceeds max size, split at word boundaries"
                ));
                while self.capacity.fits(piece_end - piece_start) == Ordering::Greater {
                    let piece = piece_start..piece_end;
                    let Some(cut) = self.break_point(source, piece, &line_ends) else {
                        break;
                    };
                    out.push(cut);
                    piece_start = cut;
                }
            }
            out.push(piece_end);
            piece_start = piece_end;
        }
        out
    }

    /// A cut in `(from, from + max]` that leaves text, not just whitespace,
    /// after it. `None` if the piece has no such cut.
    fn break_point(
        &self,
        source: &str,
        piece: Range<usize>,
        line_ends: &[usize],
    ) -> Option<usize> {
        let from = piece.start;
        // Start of the piece's last non-whitespace char.
        let last_char = source[piece]
            .trim_end()
            .char_indices()
            .last()
            .map(|(i, _)| from + i)?;
        if last_char == from {
            return None;
        }
        let limit = (from + self.capacity.max()).min(last_char);

        if let Some(&cut) = line_ends.iter().rev().find(|&&e| e > from && e <= limit) {
            return Some(cut);
        }

        let mut cut = limit;
        while !source.is_char_boundary(cut) {
            cut -= 1;
        }
        if let Some(space) = source[from..cut].rfind(char::is_whitespace) {
            if space > 0 {
                return Some(from + space);
            }
        }
        if cut > from {
            return Some(cut);
        }

        // Max is smaller than the next character.
        let mut cut = from + 1;
        while !source.is_char_boundary(cut) {
            cut += 1;
        }
        Some(cut)
    }
}

/// Merge chunks shorter than `capacity.min()` into their predecessor.
///
/// Only chunks of the same chapter are merged, and only while the combined
/// chunk stays within `capacity.max()`. Chunks must be contiguous, so the
/// merged text is the concatenation of both slices (the separating blank
/// line already leads the later chunk). Local sequence numbers and global
/// indices are reassigned from the first chunk's index.
pub fn merge_tiny_chunks(chunks: &[Chunk], capacity: ChunkCapacity) -> Vec<Chunk> {
    let Some(first) = chunks.first() else {
        return Vec::new();
    };

    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if capacity.is_undersized(chunk.len()) {
            if let Some(prev) = merged.last_mut() {
                let mergeable = prev.chapter_id == chunk.chapter_id
                    && prev.char_end == chunk.char_start
                    && !capacity.would_overflow(prev.len(), chunk.len());
                if mergeable {
                    tracing::debug!(tiny = %chunk.chunk_id, into = %prev.chunk_id, "merging tiny chunk");
                    *prev = Chunk {
                        text: format!("{}{}", prev.text, chunk.text),
                        char_end: chunk.char_end,
                        ..prev.clone()
                    };
                    continue;
                }
            }
        }
        merged.push(chunk.clone());
    }

    let mut seq = 0;
    let mut chapter: Option<&str> = None;
    merged
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            if chapter != Some(chunk.chapter_id.as_str()) {
                chapter = Some(chunk.chapter_id.as_str());
                seq = 0;
            }
            seq += 1;
            Chunk {
                chunk_id: chunk_id(&chunk.chapter_id, seq),
                chunk_index: first.chunk_index + i,
                ..chunk.clone()
            }
        })
        .collect()
}
