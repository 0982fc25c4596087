#![allow(clippy::manual_assert)]
//! Scenario tests for book segmentation.
//!
//! Each test feeds a small but realistic book through the public API and
//! checks one behavior end to end.

use folio::{
    detect_boundaries, BoundaryDetector, Chapter, ChapterBuilder, ChapterConfig, Check,
    ChunkCapacity, ChunkPacker, Config, Error, HeadingPattern, Pipeline, RegexSegmenter,
    SegmenterKind, Severity, Stage, FALLBACK_TITLE,
};

fn prose(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("The rain kept falling on the old house number {i} all night."))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check if the chunks of a run reconstruct the original text.
fn reconstructs_to_original(text: &str) -> bool {
    let result = Pipeline::default().run(text, "book", None).unwrap();
    let joined: String = result.chunks().iter().map(|c| c.text.as_str()).collect();
    joined == text
}

// =============================================================================
// Chapter detection
// =============================================================================

#[test]
fn no_headings_yields_full_text_chapter() {
    let text = format!("{}\n\n{}", prose(5), prose(7));
    let report = Pipeline::default().chapterize(&text, "book", None).unwrap();

    assert!(report.fallback_used);
    assert_eq!(report.chapters.len(), 1);
    assert_eq!(report.chapters[0].title, FALLBACK_TITLE);
    assert_eq!(report.chapters[0].span(), 0..text.len());
}

#[test]
fn drop_cap_is_not_a_chapter() {
    let text = format!(
        "Chapter 1\n\n{}\n\nM\n\nr. Bennet was among the earliest of those who waited on Mr. Bingley.\n{}",
        prose(3),
        prose(3)
    );
    let candidates = detect_boundaries(&text, None);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].title, "Chapter 1");
}

#[test]
fn mixed_heading_styles() {
    let body = prose(12);
    let text = format!(
        "Prologue\n\n{body}\n\nChapter 1: The Arrival\n\n{body}\n\nPART II\n\n{body}\n\nEpilogue\n\n{body}"
    );
    let candidates = BoundaryDetector::new(None).detect(&text);
    let patterns: Vec<_> = candidates.iter().map(|c| c.pattern).collect();

    assert_eq!(
        patterns,
        [
            HeadingPattern::SectionMarker,
            HeadingPattern::ChapterNumbered,
            HeadingPattern::PartBook,
            HeadingPattern::SectionMarker,
        ]
    );
}

#[test]
fn hint_pattern_takes_priority() {
    let body = prose(12);
    let text = format!("Letter 1\n\n{body}\n\nLetter 2\n\n{body}");

    assert!(detect_boundaries(&text, None).is_empty());

    let candidates = detect_boundaries(&text, Some(r"letter\s+\d+"));
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.pattern == HeadingPattern::Hint));
}

#[test]
fn weak_heading_after_unfinished_sentence_rejected() {
    let body = prose(12);
    let text = format!(
        "Chapter 1\n\n{body}\n\nand so the line of verse runs on without ending it properly\n\nXIV\n\n{body}"
    );
    let candidates = detect_boundaries(&text, None);
    assert_eq!(candidates.len(), 2);

    let kept = ChapterBuilder::validate_boundaries(&candidates, &text);
    assert_eq!(kept.len(), 1);
}

#[test]
fn tiny_chapters_merge_in_long_books() {
    let body = prose(20);
    let text = format!("Chapter 1\n\n{body}\n\nChapter 2\n\nShort one.\n\nChapter 3\n\n{body}");
    let report = Pipeline::default().chapterize(&text, "book", None).unwrap();

    let titles: Vec<_> = report.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Chapter 1", "Chapter 3"]);
    assert!(report.warnings.iter().any(|w| w.contains("Merged tiny chapter")));
    assert_eq!(report.chapters[1].chapter_id, "book_ch002");
}

#[test]
fn long_front_matter_becomes_own_chapter() {
    let text = format!("{}\n\nChapter 1\n\n{}", prose(12), prose(12));
    let report = Pipeline::default().chapterize(&text, "book", None).unwrap();

    assert_eq!(report.chapters.len(), 2);
    assert_eq!(report.chapters[0].char_start, 0);
    assert_eq!(report.chapters[1].title, "Chapter 1");
}

// =============================================================================
// Chunk packing
// =============================================================================

#[test]
fn oversized_paragraph_split_below_max() {
    let text = format!("Chapter 1\n\n{}", prose(100));
    let result = Pipeline::default().run(&text, "book", None).unwrap();

    assert!(result.chunks().len() > 3);
    for chunk in result.chunks() {
        assert!(chunk.len() <= 1600, "{chunk}");
    }
}

#[test]
fn sentence_ending_at_max_keeps_trailing_blank_lines() {
    let body = format!("{}ends.", "word ".repeat(19));
    let long = format!("{}finish.", "word ".repeat(318));
    assert_eq!((body.len(), long.len()), (100, 1597));
    let text = format!("Chapter 1\n\n{body}\n{long}\n\n");

    let result = Pipeline::default().run(&text, "book", None).unwrap();
    let chunks = result.chunks();

    for chunk in chunks {
        assert!(!chunk.text.trim().is_empty(), "{chunk:?}");
        assert!(chunk.len() <= 1600, "{}", chunk.len());
    }
    assert!(chunks.last().unwrap().text.ends_with("finish.\n\n"));
    assert!(reconstructs_to_original(&text));
}

#[test]
fn chunks_end_on_sentences() {
    let paragraphs: Vec<_> = (0..12).map(|_| prose(3)).collect();
    let text = format!("Chapter 1\n\n{}", paragraphs.join("\n\n"));
    let result = Pipeline::default().run(&text, "book", None).unwrap();
    let chunks = result.chunks();

    assert!(chunks.len() > 1);
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(folio::ends_with_sentence_punctuation(&chunk.text), "{chunk}");
    }
}

#[test]
fn chunk_index_spans_chapters() {
    let body = prose(20);
    let text = format!("Chapter 1\n\n{body}\n\nChapter 2\n\n{body}");
    let result = Pipeline::default().run(&text, "book", None).unwrap();

    let indices: Vec<_> = result.chunks().iter().map(|c| c.chunk_index).collect();
    let expected: Vec<_> = (1..=indices.len()).collect();
    assert_eq!(indices, expected);

    let second = result
        .chunks()
        .iter()
        .find(|c| c.chapter_id == "book_ch002")
        .unwrap();
    assert_eq!(second.chunk_id, "book_ch002_000001");
}

#[test]
fn hard_wrapped_text_round_trips() {
    let wrapped = "It is a truth universally acknowledged, that a single\n\
                   man in possession of a good fortune, must be in want\n\
                   of a wife.";
    let text = format!("Chapter 1\n\n{wrapped}\n\n{wrapped}");
    assert!(reconstructs_to_original(&text));
}

#[test]
fn packer_with_custom_capacity() {
    let text = prose(10);
    let chapter = Chapter {
        book_id: "b".into(),
        chapter_id: "b_ch001".into(),
        index: 1,
        title: "T".into(),
        char_start: 0,
        char_end: text.len(),
    };
    let capacity = ChunkCapacity::from_bounds(150, 50, 300).unwrap();
    let packed = ChunkPacker::new(capacity, &RegexSegmenter).pack(&text, &chapter, 0);

    assert!(packed.chunks.len() >= 4);
    for chunk in &packed.chunks {
        assert!(chunk.len() <= 300);
    }
    assert_eq!(packed.next_index, packed.chunks.len());
}

// =============================================================================
// Validation and errors
// =============================================================================

#[test]
fn end_to_end_short_book_warns_only() {
    let text = "Chapter 1\n\nIt was a dark night. The wind howled.\n\nChapter 2\n\nShe walked on. The end.";
    let result = Pipeline::default().run(text, "book", None).unwrap();

    assert_eq!(result.chapters().len(), 2);
    assert_eq!(result.chunks().len(), 2);
    assert!(result.validation.success);
    assert_eq!(result.validation.warning_count, 2);
    assert!(result
        .validation
        .issues
        .iter()
        .all(|i| i.check == Check::TooShort && i.severity == Severity::Warn));
}

#[test]
fn empty_book_is_fatal() {
    let err = Pipeline::default().run("", "book", None).unwrap_err();
    assert!(matches!(err, Error::NoChunks));
    assert_eq!(err.stage(), Stage::Chunkify);
}

#[test]
fn config_from_toml_drives_pipeline() {
    let config = Config::from_toml_str(
        r#"
        [chunking]
        target_chars = 200
        min_chars = 50
        max_chars = 400
        sentence_splitter = "unicode"

        [chapters]
        min_chapter_chars = 100
        "#,
    )
    .unwrap();
    assert_eq!(config.chunking.sentence_splitter, SegmenterKind::Unicode);
    assert_eq!(
        config.chapters,
        ChapterConfig {
            min_chapter_chars: 100,
            ..ChapterConfig::default()
        }
    );

    let text = format!("Chapter 1\n\n{}", prose(30));
    let result = Pipeline::new(config).unwrap().run(&text, "book", None).unwrap();
    for chunk in result.chunks() {
        assert!(chunk.len() <= 400);
    }
}

#[test]
fn unknown_config_key_rejected() {
    let err = Config::from_toml_str("[chunking]\ntarget = 5\n").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn segmentation_serializes() {
    let text = "Chapter 1\n\nIt was a dark night. The wind howled.";
    let result = Pipeline::default().run(text, "book", None).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["chunkify"]["total_chunks"], 1);
    assert_eq!(json["chunkify"]["chunks"][0]["chunk_id"], "book_ch001_000001");
    assert_eq!(json["validation"]["issues"][0]["severity"], "WARN");
}
