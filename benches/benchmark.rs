use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use searchpipe::{
    Document, Key, KeywordRetriever, Mapper, Pipeline, RankerStage, Result, Retriever,
    RetrieverStage, ScoredKey, StageConfig,
};

fn synthetic_corpus(size: usize) -> Vec<Document> {
    let words = [
        "paris", "lyon", "bordeaux", "river", "capital", "harbor", "museum", "bridge",
    ];
    (0..size)
        .map(|i| {
            let article = format!(
                "{} {} city number {}",
                words[i % words.len()],
                words[(i / words.len()) % words.len()],
                i
            );
            Document::new()
                .with_field("id", i as i64)
                .with_field("article", article)
        })
        .collect()
}

/// Embeds each known word on its own axis.
fn hashed_encoder(text: &str) -> Vec<f32> {
    let words = [
        "paris", "lyon", "bordeaux", "river", "capital", "harbor", "museum", "bridge",
    ];
    let text = text.to_lowercase();
    words
        .iter()
        .map(|w| text.contains(w) as u8 as f32)
        .collect()
}

struct Scripted(Vec<ScoredKey>);

impl Retriever for Scripted {
    fn index(&mut self, _entries: &[(Key, String)]) -> Result<()> {
        Ok(())
    }

    fn search(&self, _query: &str, limit: Option<usize>) -> Result<Vec<ScoredKey>> {
        let mut out = self.0.clone();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

fn scripted_branch(size: usize, stride: usize) -> Pipeline {
    let results = (0..size)
        .step_by(stride)
        .map(|i| ScoredKey::scored(i as i64, 1.0 / (i + 1) as f64))
        .collect();
    let stage = RetrieverStage::new(
        "scripted",
        Box::new(Scripted(results)),
        StageConfig::new("id", ["article"]),
    )
    .unwrap();
    Pipeline::stage(stage)
}

fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential");
    for size in [100usize, 1_000, 10_000] {
        let corpus = synthetic_corpus(size);
        let keyword = RetrieverStage::new(
            "keyword",
            Box::new(KeywordRetriever::new()),
            StageConfig::new("id", ["article"]).with_k(50),
        )
        .unwrap();
        let ranker = RankerStage::new(
            "encoder",
            Box::new(hashed_encoder),
            StageConfig::new("id", ["article"]).with_k(10),
        )
        .unwrap();
        let mut pipeline = keyword + ranker + Mapper::new("id").unwrap();
        pipeline.add(&corpus).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &pipeline, |b, p| {
            b.iter(|| p.search(black_box("paris capital")).unwrap());
        });
    }
    group.finish();
}

fn bench_union_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("union_merge");
    for size in [1_000usize, 10_000] {
        let pipeline = Pipeline::union_of(vec![
            scripted_branch(size, 1),
            scripted_branch(size, 2),
            scripted_branch(size, 3),
        ]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pipeline, |b, p| {
            b.iter(|| p.search(black_box("q")).unwrap());
        });
    }
    group.finish();
}

fn bench_intersection_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersection_merge");
    for size in [1_000usize, 10_000] {
        let pipeline = Pipeline::intersection_of(vec![
            scripted_branch(size, 1),
            scripted_branch(size, 2),
            scripted_branch(size, 3),
        ]);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pipeline, |b, p| {
            b.iter(|| p.search(black_box("q")).unwrap());
        });
    }
    group.finish();
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    group.sample_size(20);
    for size in [1_000usize, 10_000] {
        let corpus = synthetic_corpus(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &corpus, |b, corpus| {
            b.iter(|| {
                let keyword = RetrieverStage::new(
                    "keyword",
                    Box::new(KeywordRetriever::new()),
                    StageConfig::new("id", ["article"]),
                )
                .unwrap();
                let mut pipeline = keyword + Mapper::new("id").unwrap();
                pipeline.add(black_box(corpus)).unwrap();
                pipeline
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sequential,
    bench_union_merge,
    bench_intersection_merge,
    bench_add
);
criterion_main!(benches);
