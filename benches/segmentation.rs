//! Benchmarks for the segmentation stages.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use folio::{BoundaryDetector, Pipeline, SegmenterKind, SentenceSegmenter};

fn sample_book(size: usize) -> String {
    // Chapters of hard-wrapped paragraphs
    let sentences = [
        "The quick brown fox jumps over the lazy dog.",
        "Pack my box with five dozen liquor jugs.",
        "How vexingly quick daft zebras jump!",
        "The five boxing wizards jump quickly.",
        "Sphinx of black quartz, judge my vow.",
    ];
    let mut text = String::with_capacity(size + 1024);
    let mut chapter = 0;
    let mut i = 0;
    while text.len() < size {
        if i % 60 == 0 {
            chapter += 1;
            text.push_str(&format!("Chapter {chapter}\n\n"));
        }
        text.push_str(sentences[i % sentences.len()]);
        i += 1;
        text.push_str(match i % 12 {
            0 => "\n\n",
            4 | 8 => "\n",
            _ => " ",
        });
    }
    text
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    let detector = BoundaryDetector::new(None);

    for size in [10_000, 100_000, 1_000_000] {
        let text = sample_book(size);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("boundaries", size), &text, |b, text| {
            b.iter(|| detector.detect(black_box(text)))
        });
    }

    group.finish();
}

fn bench_segmenters(c: &mut Criterion) {
    let mut group = c.benchmark_group("sentence");
    let text = sample_book(100_000).replace('\n', " ");

    for kind in [SegmenterKind::Regex, SegmenterKind::Unicode] {
        let (segmenter, _) = folio::resolve_segmenter(kind);

        group.throughput(Throughput::Bytes(text.len() as u64));
        let id = BenchmarkId::new(segmenter.name().to_string(), text.len());
        group.bench_with_input(id, &text, |b, text| {
            b.iter(|| segmenter.split(black_box(text)))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let pipeline = Pipeline::default();

    for size in [10_000, 100_000, 1_000_000] {
        let text = sample_book(size);

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("run", size), &text, |b, text| {
            b.iter(|| pipeline.run(black_box(text), "bench", None))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_detection, bench_segmenters, bench_pipeline);
criterion_main!(benches);
