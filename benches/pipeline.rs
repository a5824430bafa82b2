//! Benchmarks for the local pipeline stages.
//!
//! # Usage
//!
//! ```bash
//! cargo bench --bench pipeline
//! ```

#![allow(clippy::panic)]

use criterion::{Criterion, criterion_group, criterion_main};
use qa_rs::decode::SpanDecoder;
use qa_rs::inference::{InferenceBackend, LogitPair};
use qa_rs::sequence::{EncodedSequence, SequenceBuilder};
use qa_rs::{PipelineConfig, QaPipeline, Tokenizer, Vocabulary};
use std::hint::black_box;
use std::sync::Arc;

const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "the", "capital", "of", "france", "is", "paris", ".",
    "what", "?", "river", "seine", "flows", "through", "city", "##s", "and", "a", "large",
];

const PASSAGE: &str = "Paris is the capital of France. The river Seine flows through the city, \
                       and Paris is a large city. ";

fn vocab() -> Arc<Vocabulary> {
    Arc::new(Vocabulary::from_tokens(VOCAB.iter().copied()).unwrap_or_else(|e| panic!("{e}")))
}

/// Deterministic scores with no network round trip.
struct StaticBackend;

impl InferenceBackend for StaticBackend {
    #[allow(clippy::cast_precision_loss)]
    fn infer(&self, sequence: &EncodedSequence) -> qa_rs::Result<LogitPair> {
        let scores: Vec<f32> = (0..sequence.len())
            .map(|i| ((i * 7919) % 97) as f32 / 10.0)
            .collect();
        Ok(LogitPair::new(scores.clone(), scores.into_iter().rev().collect()))
    }
}

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = Tokenizer::new(vocab());
    let long = PASSAGE.repeat(64);

    c.bench_function("tokenize_passage", |b| {
        b.iter(|| tokenizer.tokenize(black_box(PASSAGE)));
    });
    c.bench_function("tokenize_long_passage", |b| {
        b.iter(|| tokenizer.tokenize(black_box(&long)));
    });
}

fn bench_build(c: &mut Criterion) {
    let vocab = vocab();
    let tokenizer = Tokenizer::new(Arc::clone(&vocab));
    let builder = SequenceBuilder::new(vocab.special(), 384, 128).max_answer_length(30);
    let question = tokenizer.tokenize("What is the capital of France?");
    let context = tokenizer.tokenize(&PASSAGE.repeat(64));

    c.bench_function("build_windows", |b| {
        b.iter(|| builder.build(black_box(&question), black_box(&context)));
    });
}

fn bench_decode(c: &mut Criterion) {
    let vocab = vocab();
    let tokenizer = Tokenizer::new(Arc::clone(&vocab));
    let builder = SequenceBuilder::new(vocab.special(), 384, 128);
    let sequences = builder
        .build(
            &tokenizer.tokenize("What is the capital of France?"),
            &tokenizer.tokenize(&PASSAGE.repeat(16)),
        )
        .unwrap_or_else(|e| panic!("{e}"));
    let sequence = &sequences[0];
    let logits = StaticBackend.infer(sequence).unwrap_or_else(|e| panic!("{e}"));
    let decoder = SpanDecoder::new(30, 0.0);

    c.bench_function("decode_window", |b| {
        b.iter(|| decoder.decode(black_box(&logits), black_box(sequence)));
    });
}

fn bench_answer(c: &mut Criterion) {
    let long = PASSAGE.repeat(32);
    let sequential = QaPipeline::new(&PipelineConfig::default(), vocab(), Box::new(StaticBackend))
        .unwrap_or_else(|e| panic!("{e}"));
    let parallel = QaPipeline::new(
        &PipelineConfig {
            parallel_windows: true,
            ..Default::default()
        },
        vocab(),
        Box::new(StaticBackend),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let mut group = c.benchmark_group("answer");
    group.bench_function("sequential", |b| {
        b.iter(|| sequential.answer(black_box(&long), "What is the capital of France?"));
    });
    group.bench_function("parallel", |b| {
        b.iter(|| parallel.answer(black_box(&long), "What is the capital of France?"));
    });
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_build, bench_decode, bench_answer);
criterion_main!(benches);
