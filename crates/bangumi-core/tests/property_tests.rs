//! # Property-Based Tests
//!
//! Invariants of the query engine checked with proptest: filter
//! monotonicity, ordering, pagination bounds, URL round-trips, status
//! exclusivity and preset matching.

use bangumi_core::query::{self, preset, url};
use bangumi_core::{
    Catalog, CategorySet, NumericRange, PRESETS, Paginator, QueryState, RangeDimension,
    RangeFilter, Season, SortStrategy, Status, StatusFilter, StatusRegistry, Subject, SubjectId,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// STRATEGIES
// =============================================================================

const SCORES: [f64; 9] = [0.0, 3.5, 5.0, 6.25, 7.0, 7.5, 8.1, 9.0, 10.0];
const CATEGORIES: [&str; 6] = ["TV", "Movie", "OVA", "Web", "Special", ""];
const NAMES: [&str; 5] = ["Mushishi", "Cowboy Bebop", "Ping Pong", "Haibane Renmei", "Aria"];

fn arb_subject() -> impl Strategy<Value = Subject> {
    (
        (0u32..=2030, 0u32..=12, prop::sample::select(SCORES.to_vec())),
        (-1i64..2000, 0u64..200_000, 0u32..120),
        (
            prop::sample::select(CATEGORIES.to_vec()),
            prop::sample::select(NAMES.to_vec()),
            0u64..5000,
        ),
    )
        .prop_map(
            |((year, month, score), (rank, votes, eps), (category, name, collect))| {
                let mut subject = Subject::new(SubjectId(0));
                subject.year = year;
                subject.month = month;
                subject.score = score;
                subject.rank = rank;
                subject.votes = votes;
                subject.eps = eps;
                subject.category = category.to_string();
                subject.name = name.to_string();
                subject.collection.collect = collect;
                subject
            },
        )
}

fn arb_catalog() -> impl Strategy<Value = Catalog> {
    vec(arb_subject(), 0..120).prop_map(|subjects| {
        let subjects = subjects
            .into_iter()
            .enumerate()
            .map(|(i, mut subject)| {
                subject.id = SubjectId(i as u64 + 1);
                subject
            })
            .collect();
        Catalog::from_subjects(subjects)
    })
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

fn arb_score_range() -> impl Strategy<Value = NumericRange<f64>> {
    (
        prop::sample::select(SCORES.to_vec()),
        prop::sample::select(SCORES.to_vec()),
    )
        .prop_map(|(a, b)| {
            let (lo, hi) = ordered(a, b);
            NumericRange::new(lo, hi)
        })
}

fn arb_u32_range(max: u32) -> impl Strategy<Value = NumericRange<u32>> {
    (0..=max, 0..=max).prop_map(|(a, b)| {
        let (lo, hi) = ordered(a, b);
        NumericRange::new(lo, hi)
    })
}

fn arb_u64_range(max: u64) -> impl Strategy<Value = NumericRange<u64>> {
    (0..=max, 0..=max).prop_map(|(a, b)| {
        let (lo, hi) = ordered(a, b);
        NumericRange::new(lo, hi)
    })
}

fn arb_categories() -> impl Strategy<Value = CategorySet> {
    prop::sample::subsequence(vec!["TV", "Movie", "OVA", "Web", "Special"], 0..=5)
        .prop_shuffle()
        .prop_map(CategorySet::from_tokens)
}

fn arb_state() -> impl Strategy<Value = QueryState> {
    (
        (
            prop_oneof![arb_u32_range(2030), (1990u32..2025).prop_map(|y| NumericRange::new(y, y))],
            arb_score_range(),
            arb_u64_range(999_999),
            arb_u64_range(999_999),
            arb_u32_range(9999),
        ),
        (
            arb_categories(),
            "[a-zA-Z0-9 &=%+?,-]{0,16}",
            0usize..StatusFilter::ALL.len(),
            0usize..SortStrategy::ALL.len(),
            prop::option::of(0usize..Season::ALL.len()),
            1u32..40,
        ),
    )
        .prop_map(
            |((year, score, rank, votes, eps), (categories, search, mode, sort, season, page))| {
                let mut state = QueryState::new();
                state.set_categories(categories);
                state.set_range(RangeFilter::Year(year));
                state.set_range(RangeFilter::Score(score));
                state.set_range(RangeFilter::Rank(rank));
                state.set_range(RangeFilter::Votes(votes));
                state.set_range(RangeFilter::Episodes(eps));
                state.set_search(search);
                state.set_status_filter(StatusFilter::ALL[mode]);
                state.set_sort(SortStrategy::ALL[sort]);
                if let Some(season) = season {
                    state.set_season(Some(Season::ALL[season]));
                }
                state.set_page(page);
                state
            },
        )
}

fn matched_ids(catalog: &Catalog, state: &QueryState, statuses: &BTreeMap<SubjectId, Status>) -> Vec<SubjectId> {
    query::run(catalog, state, statuses)
        .iter()
        .map(|subject| subject.id)
        .collect()
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Narrowing a range never adds subjects to the result.
    #[test]
    fn narrowing_a_range_never_grows_the_result(
        catalog in arb_catalog(),
        outer in arb_u32_range(2030),
        shrink_lo in 0u32..50,
        shrink_hi in 0u32..50,
    ) {
        let statuses = BTreeMap::new();
        let inner_lo = outer.lo.saturating_add(shrink_lo).min(outer.hi);
        let inner_hi = outer.hi.saturating_sub(shrink_hi).max(inner_lo);

        let mut wide = QueryState::new();
        wide.set_status_filter(StatusFilter::Any);
        wide.set_range(RangeFilter::Year(outer));
        let mut narrow = wide.clone();
        narrow.set_range(RangeFilter::Year(NumericRange::new(inner_lo, inner_hi)));

        let wide_ids = matched_ids(&catalog, &wide, &statuses);
        let narrow_ids = matched_ids(&catalog, &narrow, &statuses);

        prop_assert!(narrow_ids.len() <= wide_ids.len());
        for id in &narrow_ids {
            prop_assert!(wide_ids.contains(id));
        }
    }

    /// Same for every dimension, using a shrunk copy of a random state.
    #[test]
    fn narrowing_any_dimension_is_monotone(
        catalog in arb_catalog(),
        state in arb_state(),
        score in arb_score_range(),
        rank in arb_u64_range(999_999),
        votes in arb_u64_range(999_999),
        eps in arb_u32_range(9999),
    ) {
        let statuses = BTreeMap::new();
        let before = matched_ids(&catalog, &state, &statuses).len();

        let candidates = [
            RangeFilter::Score(score),
            RangeFilter::Rank(rank),
            RangeFilter::Votes(votes),
            RangeFilter::Episodes(eps),
        ];
        for candidate in candidates {
            let current = state.range(candidate.dimension());
            let narrower = match (current, candidate) {
                (RangeFilter::Score(c), RangeFilter::Score(n)) if n.is_within(&c) => Some(candidate),
                (RangeFilter::Rank(c), RangeFilter::Rank(n)) if n.is_within(&c) => Some(candidate),
                (RangeFilter::Votes(c), RangeFilter::Votes(n)) if n.is_within(&c) => Some(candidate),
                (RangeFilter::Episodes(c), RangeFilter::Episodes(n)) if n.is_within(&c) => Some(candidate),
                _ => None,
            };
            if let Some(filter) = narrower {
                let mut narrowed = state.clone();
                narrowed.set_range(filter);
                prop_assert!(matched_ids(&catalog, &narrowed, &statuses).len() <= before);
            }
        }
    }

    /// Under rank order, unranked subjects come after every ranked one.
    #[test]
    fn unranked_sorts_after_ranked(catalog in arb_catalog()) {
        let statuses = BTreeMap::new();
        let mut state = QueryState::new();
        state.set_status_filter(StatusFilter::Any);
        state.set_categories(CategorySet::new());
        state.set_range(RangeFilter::Rank(NumericRange::new(0, 999_999)));

        let results = query::run(&catalog, &state, &statuses);
        let first_unranked = results.iter().position(|s| !s.is_ranked());
        if let Some(position) = first_unranked {
            prop_assert!(results[position..].iter().all(|s| !s.is_ranked()));
        }
        prop_assert_eq!(results.len(), catalog.len());
    }

    /// Filtering and sorting are deterministic.
    #[test]
    fn identical_input_gives_identical_output(catalog in arb_catalog(), state in arb_state()) {
        let statuses = BTreeMap::new();
        prop_assert_eq!(
            matched_ids(&catalog, &state, &statuses),
            matched_ids(&catalog, &state, &statuses)
        );
    }

    /// Page count is max(1, ceil(n / size)) and the last page is non-empty.
    #[test]
    fn pagination_bounds(n in 0usize..600, size in 1usize..100) {
        let paginator = Paginator::new(size).expect("size");
        let items: Vec<usize> = (0..n).collect();
        let pages = paginator.page_count(n) as usize;

        prop_assert_eq!(pages, n.div_ceil(size).max(1));
        if n > 0 {
            prop_assert!(!paginator.slice(&items, pages as u32).is_empty());
        }

        let rejoined: Vec<usize> = (1..=pages as u32)
            .flat_map(|page| paginator.slice(&items, page).iter().copied())
            .collect();
        prop_assert_eq!(rejoined, items);
    }

    /// decode(encode(state)) reproduces the state.
    #[test]
    fn url_round_trip(state in arb_state()) {
        let encoded = url::encode(&state);
        prop_assert_eq!(url::decode(&encoded), state.clone());
        prop_assert_eq!(url::encode(&url::decode(&format!("?{encoded}"))), encoded);
    }

    /// Setting a status replaces the previous one; clearing removes it.
    #[test]
    fn status_is_exclusive(ops in vec((0u64..8, 0usize..4), 0..60)) {
        let mut registry = StatusRegistry::new();
        let mut expected: BTreeMap<SubjectId, Status> = BTreeMap::new();

        for (id, choice) in ops {
            let id = SubjectId(id);
            let status = Status::ALL.get(choice).copied();
            let ticket = registry.begin(id, status);
            registry.complete(&ticket, Ok(()));

            match status {
                Some(status) => { expected.insert(id, status); }
                None => { expected.remove(&id); }
            }
        }

        let actual: BTreeMap<SubjectId, Status> = registry.entries().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(registry.pending_count(), 0);
    }

    /// Applying a preset activates it; applying it again restores defaults.
    #[test]
    fn preset_apply_and_toggle(state in arb_state(), index in 0usize..PRESETS.len()) {
        let preset = &PRESETS[index];
        let mut state = state;
        let was_active = preset.is_active(&state);

        let engaged = preset.apply(&mut state);

        prop_assert_eq!(engaged, !was_active);
        prop_assert_eq!(preset.is_active(&state), engaged);
        prop_assert_eq!(state.page(), 1);
        if !engaged {
            for filter in preset.ranges() {
                prop_assert!(state.range(filter.dimension()).is_default());
            }
            prop_assert_eq!(state.categories(), &CategorySet::defaults());
        }
    }

    /// Any other preset or a manual range edit deactivates a preset.
    #[test]
    fn preset_deactivated_by_edits(
        state in arb_state(),
        first in 0usize..PRESETS.len(),
        second in 0usize..PRESETS.len(),
    ) {
        prop_assume!(first != second);
        let mut state = state;
        let p = &PRESETS[first];
        let q = &PRESETS[second];

        if !p.is_active(&state) {
            p.apply(&mut state);
        }
        prop_assert!(preset::active(&state).iter().any(|a| a.id == p.id));

        let mut other = state.clone();
        if !q.is_active(&other) {
            q.apply(&mut other);
        }
        prop_assert!(!p.is_active(&other));

        let mut edited = state.clone();
        let defined = p.ranges().first().copied();
        match defined {
            Some(RangeFilter::Rank(r)) => edited.set_range(RangeFilter::Rank(NumericRange::new(r.lo, r.hi + 1))),
            Some(RangeFilter::Score(_)) => edited.set_range(RangeFilter::Score(NumericRange::new(1.0, 2.0))),
            Some(RangeFilter::Episodes(r)) => edited.set_range(RangeFilter::Episodes(NumericRange::new(r.lo, r.hi + 1))),
            Some(RangeFilter::Year(r)) => edited.set_range(RangeFilter::Year(NumericRange::new(r.lo, r.hi + 1))),
            Some(RangeFilter::Votes(r)) => edited.set_range(RangeFilter::Votes(NumericRange::new(r.lo, r.hi + 1))),
            None => edited.toggle_category("Special"),
        }
        prop_assert!(!p.is_active(&edited));
    }
}

// =============================================================================
// DEFAULTS
// =============================================================================

#[test]
fn bare_url_is_the_default_state() {
    let state = url::decode("");

    assert_eq!(state, QueryState::default());
    assert_eq!(
        state.range(RangeDimension::Year),
        RangeFilter::Year(NumericRange::new(0, 2030))
    );
    assert_eq!(
        state.range(RangeDimension::Rank),
        RangeFilter::Rank(NumericRange::new(0, 99_999))
    );
    assert_eq!(*state.categories(), CategorySet::from_tokens(["TV", "Movie", "OVA", "Web"]));
    assert_eq!(state.status_filter(), StatusFilter::Unclassified);
    assert_eq!(state.sort(), SortStrategy::Rank);
    assert_eq!(state.season(), None);
    assert_eq!(state.search(), "");
    assert_eq!(state.page(), 1);
}
