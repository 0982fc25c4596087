//! The Chunk type: a sized, offset-exact slice of a chapter.

use serde::{Deserialize, Serialize};

/// Id of the `seq`-th (1-based) chunk of a chapter.
///
/// ```rust
/// assert_eq!(folio::chunk_id("pp_ch002", 7), "pp_ch002_000007");
/// ```
#[must_use]
pub fn chunk_id(chapter_id: &str, seq: usize) -> String {
    format!("{chapter_id}_{seq:06}")
}

/// A chunk of a chapter with its position in the book.
///
/// Chunks are the atomic unit for downstream synthesis, embedding, and
/// summarization. Consumers address them by `chunk_id` and never re-derive
/// offsets.
///
/// ## Byte Offsets
///
/// `char_start` and `char_end` are byte offsets into the full book text, and
/// `text` is exactly the source slice between them:
///
/// ```rust
/// use folio::Chunk;
///
/// let book = "Chapter 1\n\nIt was a dark night.";
/// let chunk = Chunk {
///     book_id: "b".into(),
///     chapter_id: "b_ch001".into(),
///     chunk_id: "b_ch001_000001".into(),
///     chunk_index: 1,
///     text: book.to_string(),
///     char_start: 0,
///     char_end: book.len(),
/// };
///
/// assert_eq!(&book[chunk.span()], chunk.text);
/// ```
///
/// ## Indexing
///
/// `chunk_index` is 1-based and global across the book. The local sequence
/// inside a chapter only shows up in `chunk_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Book the chunk belongs to.
    pub book_id: String,
    /// Chapter the chunk belongs to.
    pub chapter_id: String,
    /// Chapter id plus zero-padded local sequence.
    pub chunk_id: String,
    /// Global 1-based position across the book.
    pub chunk_index: usize,
    /// The chunk text, verbatim from the source.
    pub text: String,
    /// Byte offset where this chunk starts in the book.
    pub char_start: usize,
    /// Byte offset where this chunk ends (exclusive) in the book.
    pub char_end: usize,
}

impl Chunk {
    /// The length of this chunk in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether this chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The byte span of this chunk in the book.
    #[must_use]
    pub fn span(&self) -> std::ops::Range<usize> {
        self.char_start..self.char_end
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ id: {}, index: {}, span: {}..{}, len: {} }}",
            self.chunk_id,
            self.chunk_index,
            self.char_start,
            self.char_end,
            self.len()
        )
    }
}
