use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phrasescout::search::{distance, tokenize};
use phrasescout::{match_text, MatchOptions, MatchRequest, SearchSpec, Task, WorkerPool};

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "river", "bank", "quikc",
    "brwon", "near", "stone", "bridge",
];

fn create_text(word_count: usize) -> String {
    (0..word_count)
        .map(|i| WORDS[(i * 7 + i / 3) % WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn searches() -> Vec<SearchSpec> {
    vec![
        SearchSpec::new("quick brown fox", 3),
        SearchSpec::new("lazy dog", 2),
        SearchSpec::new("stone bridge", 2),
    ]
}

fn bench_tokenize(c: &mut Criterion) {
    let text = create_text(10_000);
    c.bench_function("tokenize_10k_words", |b| {
        b.iter(|| black_box(tokenize(&text).count()))
    });
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Distance");
    for (a, b) in [
        ("quick brown", "quikc brwon"),
        ("the quick brown fox", "teh quick brown fxo"),
        ("a fairly long search phrase", "a fairly long serach phrsae"),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(a.len()), &(a, b), |bench, (a, b)| {
            bench.iter(|| black_box(distance(a, b)))
        });
    }
    group.finish();
}

fn bench_match_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Match Scaling");
    for word_count in [100, 1_000, 10_000] {
        let text = create_text(word_count);
        group.bench_with_input(BenchmarkId::new("exact", word_count), &text, |b, text| {
            b.iter(|| black_box(match_text(text, &searches(), &MatchOptions::exact()).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("fuzzy", word_count), &text, |b, text| {
            b.iter(|| black_box(match_text(text, &searches(), &MatchOptions::fuzzy()).unwrap()))
        });
        let thresholded = MatchOptions::fuzzy().with_threshold(0.5);
        group.bench_with_input(
            BenchmarkId::new("fuzzy_threshold", word_count),
            &text,
            |b, text| b.iter(|| black_box(match_text(text, &searches(), &thresholded).unwrap())),
        );
    }
    group.finish();
}

fn bench_pool_throughput(c: &mut Criterion) {
    let texts: Vec<String> = (0..16).map(|_| create_text(1_000)).collect();
    let mut group = c.benchmark_group("Pool Throughput");
    group.sample_size(20);

    for capacity in [1, 2, 4, 8] {
        let pool: WorkerPool<Task> = WorkerPool::new(Some(capacity)).unwrap();
        group.bench_function(BenchmarkId::from_parameter(capacity), |b| {
            b.iter(|| {
                let handles: Vec<_> = texts
                    .iter()
                    .map(|text| {
                        pool.submit_match(MatchRequest::new(text.clone(), searches(), false))
                            .unwrap()
                    })
                    .collect();
                for handle in handles {
                    black_box(handle.wait().unwrap());
                }
            })
        });
        pool.shutdown(true);
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_distance,
    bench_match_scaling,
    bench_pool_throughput
);
criterion_main!(benches);
