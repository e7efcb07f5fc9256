use criterion::{black_box, criterion_group, criterion_main, Criterion};
use talkturn_diarize::{
    CancelFlag, DiarizeConfig, Diarizer, FeatureConfig, FeatureExtractor, Metric, TimedSpan,
};

fn make_sine_pcm(freq_hz: f64, n_samples: usize, sample_rate: usize) -> Vec<i16> {
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (16000.0 * (freq_hz * 2.0 * std::f64::consts::PI * t).sin()) as i16
        })
        .collect()
}

fn make_transcript(n: usize) -> Vec<TimedSpan> {
    (0..n)
        .map(|i| {
            let start = i as f64 * 2.5;
            if i % 3 == 0 {
                TimedSpan::new("short calm reply here", start, start + 2.0, -0.6)
            } else {
                TimedSpan::new(
                    "a much faster stretch of speech with many more words in it",
                    start,
                    start + 2.0,
                    0.9,
                )
            }
        })
        .collect()
}

fn bench_segment_pipeline(c: &mut Criterion) {
    let spans = make_transcript(200);
    let diarizer = Diarizer::new(DiarizeConfig::default());

    c.bench_function("diarize_segments_200_spans", |b| {
        b.iter(|| {
            let _ = black_box(diarizer.diarize(black_box(&spans), None, &CancelFlag::new()));
        });
    });
}

fn bench_word_features_300ms(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeatureConfig::default());
    let audio = make_sine_pcm(180.0, 4800, 16000); // 300ms

    c.bench_function("diarize_word_features_300ms", |b| {
        b.iter(|| {
            let _ = black_box(extractor.extract_from_audio(
                black_box("word"),
                0.0,
                0.3,
                black_box(&audio),
                16000,
            ));
        });
    });
}

fn bench_word_similarity(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeatureConfig::default());
    let low =
        extractor.extract_from_audio("low", 0.0, 0.3, &make_sine_pcm(120.0, 4800, 16000), 16000);
    let high =
        extractor.extract_from_audio("high", 0.0, 0.3, &make_sine_pcm(320.0, 4800, 16000), 16000);
    let metric = Metric::word();

    c.bench_function("diarize_word_similarity", |b| {
        b.iter(|| {
            let _ = black_box(metric.similarity(black_box(&low), black_box(&high)));
        });
    });
}

criterion_group!(
    benches,
    bench_segment_pipeline,
    bench_word_features_300ms,
    bench_word_similarity,
);
criterion_main!(benches);
