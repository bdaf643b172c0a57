//! # Pipeline Benchmarks
//!
//! Filter, sort and paginate over synthetic catalogs of realistic size.
//!
//! Run with: `cargo bench -p bangumi-core`

use bangumi_core::query::{self, url};
use bangumi_core::{
    Catalog, CategorySet, NumericRange, Paginator, QueryState, RangeFilter, SortStrategy, Status,
    StatusRegistry, Subject, SubjectId,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const CATEGORIES: [&str; 5] = ["TV", "Movie", "OVA", "Web", "Special"];
const SCORES: [f64; 8] = [0.0, 5.5, 6.2, 6.9, 7.3, 7.8, 8.4, 9.1];

/// Create a catalog with `size` deterministic subjects.
fn create_catalog(size: usize) -> Catalog {
    let subjects = (0..size)
        .map(|i| {
            let mut subject = Subject::new(SubjectId(i as u64 + 1));
            subject.name = format!("Subject {i}");
            subject.studio = format!("Studio {}", i % 97);
            subject.category = CATEGORIES[i % CATEGORIES.len()].to_string();
            subject.score = SCORES[i % SCORES.len()];
            subject.rank = if i % 7 == 0 { 0 } else { (i % 20_000) as i64 + 1 };
            subject.votes = (i as u64 * 37) % 50_000;
            subject.year = 1970 + (i % 56) as u32;
            subject.month = (i % 12) as u32 + 1;
            subject.eps = (i % 52) as u32;
            subject.date = format!("{}-{:02}-01", subject.year, subject.month);
            subject.collection.collect = (i as u64 * 13) % 40_000;
            subject
        })
        .collect();
    Catalog::from_subjects(subjects)
}

fn create_registry(size: usize) -> StatusRegistry {
    StatusRegistry::from_entries(
        (0..size)
            .step_by(11)
            .map(|i| (SubjectId(i as u64 + 1), Status::ALL[i % Status::ALL.len()])),
    )
}

fn busy_state() -> QueryState {
    let mut state = QueryState::new();
    state.set_categories(CategorySet::from_tokens(["TV", "Web"]));
    state.set_range(RangeFilter::Score(NumericRange::new(6.5, 10.0)));
    state.set_range(RangeFilter::Year(NumericRange::new(1990, 2020)));
    state.set_search("studio 4");
    state
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    let paginator = Paginator::default();

    for size in [10_000usize, 25_000, 50_000] {
        let catalog = create_catalog(size);
        let registry = create_registry(size);
        let state = QueryState::new();

        group.bench_with_input(BenchmarkId::new("default", size), &size, |b, _| {
            b.iter(|| black_box(query::execute(&catalog, &state, &registry, &paginator).matched));
        });

        let busy = busy_state();
        group.bench_with_input(BenchmarkId::new("busy", size), &size, |b, _| {
            b.iter(|| black_box(query::execute(&catalog, &busy, &registry, &paginator).matched));
        });
    }

    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    let catalog = create_catalog(50_000);

    for sort in SortStrategy::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(sort), &sort, |b, &sort| {
            b.iter(|| {
                let mut items: Vec<&Subject> = catalog.subjects().iter().collect();
                sort.sort(&mut items);
                black_box(items.len())
            });
        });
    }

    group.finish();
}

fn bench_url_codec(c: &mut Criterion) {
    let query = "y=2006-2006&s=7.5-10&r=1-500&v=100-50000&e=1-26&t=TV,OVA&q=ghost&st=wishlist&sort=popularity&se=spring&p=3";

    c.bench_function("url_decode", |b| b.iter(|| black_box(url::decode(black_box(query)))));

    let state = url::decode(query);
    c.bench_function("url_encode", |b| b.iter(|| black_box(url::encode(black_box(&state)))));
}

criterion_group!(benches, bench_execute, bench_sort, bench_url_codec);
criterion_main!(benches);
