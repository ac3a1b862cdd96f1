use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gradescan_core::model::{BoundingBox, ExtractionMetadata, ExtractionResult, RecognizedToken};
use gradescan_core::segmenter::QuestionSegmenter;

fn line_tokens(words: &[String], y: u32, block: u32, line: u32) -> Vec<RecognizedToken> {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| RecognizedToken {
            text: word.clone(),
            confidence: 0.9,
            bbox: BoundingBox {
                x: i as u32 * 60,
                y,
                width: 50,
                height: 20,
            },
            block,
            paragraph: 0,
            line,
            word: i as u32,
        })
        .collect()
}

// A sheet with `questions` marked questions, each followed by a line of
// unmarked working.
fn generate_sheet(questions: u32) -> ExtractionResult {
    let mut tokens = Vec::new();
    for n in 1..=questions {
        let y = n * 100;
        let marker: Vec<String> = format!("Q{n}. Solve the equation x = {n} + 1")
            .split(' ')
            .map(str::to_string)
            .collect();
        tokens.extend(line_tokens(&marker, y, n, 0));
        let working: Vec<String> = format!("Therefore the answer is {}", n + 1)
            .split(' ')
            .map(str::to_string)
            .collect();
        tokens.extend(line_tokens(&working, y + 40, n, 1));
    }
    let raw_text = tokens
        .iter()
        .map(|t| t.text.clone())
        .collect::<Vec<_>>()
        .join(" ");
    ExtractionResult {
        tokens,
        raw_text,
        metadata: ExtractionMetadata::default(),
    }
}

fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment");
    let segmenter = QuestionSegmenter::new();

    let small = generate_sheet(5);
    let medium = generate_sheet(20);
    let large = generate_sheet(50);

    group.bench_function("5_questions", |b| {
        b.iter(|| segmenter.segment(black_box(&small)))
    });

    group.bench_function("20_questions", |b| {
        b.iter(|| segmenter.segment(black_box(&medium)))
    });

    group.bench_function("50_questions", |b| {
        b.iter(|| segmenter.segment(black_box(&large)))
    });

    group.finish();
}

fn bench_candidate_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_candidates");
    let segmenter = QuestionSegmenter::new();
    let sheet = generate_sheet(20);

    group.bench_function("20_questions", |b| {
        b.iter(|| segmenter.detect_candidates(black_box(&sheet)))
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_text");
    let segmenter = QuestionSegmenter::new();

    let math_heavy = "x²+5x−6=0 and √16≥4 so x≠−6 ÷ 2".repeat(4);
    let plain_prose = "the water cycle moves water between the surface and the \
                       atmosphere through evaporation condensation and rain "
        .repeat(4);

    group.bench_function("math_heavy", |b| {
        b.iter(|| segmenter.normalize_text(black_box(&math_heavy)))
    });

    group.bench_function("plain_prose", |b| {
        b.iter(|| segmenter.normalize_text(black_box(&plain_prose)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_segment,
    bench_candidate_detection,
    bench_normalize
);
criterion_main!(benches);
