//! # URL State Codec
//!
//! Mirrors a [`QueryState`] into a flat query string and back.
//!
//! | Key    | Field           | Format                                   |
//! |--------|-----------------|------------------------------------------|
//! | `y`    | year range      | `lo-hi`                                  |
//! | `s`    | score range     | `lo-hi`                                  |
//! | `r`    | rank range      | `lo-hi`                                  |
//! | `v`    | votes range     | `lo-hi`                                  |
//! | `e`    | episode range   | `lo-hi`                                  |
//! | `t`    | categories      | comma-joined, `t=` is the empty set      |
//! | `q`    | search text     | raw, first 256 characters kept           |
//! | `st`   | status mode     | `todo` `collected` `wishlist` `ignored` `all` |
//! | `sort` | sort strategy   | `rank` `score` `date` `popularity` (`collected` read as `popularity`) |
//! | `se`   | season          | `winter` `spring` `summer` `fall`        |
//! | `p`    | page            | integer >= 1                             |
//!
//! Decoding never fails: an unparseable value leaves its field at the
//! default and unknown keys are skipped. If a key repeats, the first
//! occurrence is used. Encoding emits only fields that differ from their
//! defaults, in the table's order.
//!
//! Two inputs are accepted but not reproduced: `sort=collected` is written
//! back as `sort=popularity`, and a `q` longer than [`MAX_SEARCH_LENGTH`]
//! characters is cut to that length.

use super::state::{CategorySet, QueryState, RangeDimension, RangeFilter, Season};
use crate::primitives::MAX_SEARCH_LENGTH;
use std::collections::BTreeSet;
use url::form_urlencoded;

const KEY_CATEGORIES: &str = "t";
const KEY_SEARCH: &str = "q";
const KEY_STATUS: &str = "st";
const KEY_SORT: &str = "sort";
const KEY_SEASON: &str = "se";
const KEY_PAGE: &str = "p";

/// Query key of a range dimension.
#[must_use]
pub const fn range_key(dimension: RangeDimension) -> &'static str {
    match dimension {
        RangeDimension::Year => "y",
        RangeDimension::Score => "s",
        RangeDimension::Rank => "r",
        RangeDimension::Votes => "v",
        RangeDimension::Episodes => "e",
    }
}

fn dimension_for_key(key: &str) -> Option<RangeDimension> {
    RangeDimension::ALL
        .into_iter()
        .find(|dimension| range_key(*dimension) == key)
}

/// Decode a query string, with or without the leading `?`.
#[must_use]
pub fn decode(query: &str) -> QueryState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut state = QueryState::default();
    let mut seen = BTreeSet::new();
    let mut season: Option<Season> = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if !seen.insert(key.clone()) {
            continue;
        }

        if let Some(dimension) = dimension_for_key(&key) {
            match RangeFilter::parse(dimension, &value) {
                Some(filter) => state.ranges.set(filter),
                None => tracing::debug!(key = %key, value = %value, "Ignoring malformed range"),
            }
            continue;
        }

        match &*key {
            KEY_CATEGORIES => {
                state.categories = CategorySet::from_tokens(value.split(','));
            }
            KEY_SEARCH => {
                state.search = value.chars().take(MAX_SEARCH_LENGTH).collect();
            }
            KEY_STATUS => {
                if let Ok(mode) = value.parse() {
                    state.status_filter = mode;
                }
            }
            KEY_SORT => {
                if let Ok(sort) = value.parse() {
                    state.sort = sort;
                }
            }
            KEY_SEASON => {
                season = value.parse().ok();
            }
            KEY_PAGE => {
                if let Some(page) = value.parse::<u32>().ok().filter(|page| *page >= 1) {
                    state.page = page;
                }
            }
            _ => {}
        }
    }

    // A season only survives next to a single-year range.
    if state.season_selectable() {
        state.season = season;
    }

    state
}

/// The non-default fields of a state as key/value pairs, in key order.
#[must_use]
pub fn encode_pairs(state: &QueryState) -> Vec<(&'static str, String)> {
    let defaults = QueryState::default();
    let mut pairs = Vec::new();

    for dimension in RangeDimension::ALL {
        let filter = state.range(dimension);
        if !filter.is_default() {
            pairs.push((range_key(dimension), filter.to_string()));
        }
    }

    if *state.categories() != *defaults.categories() {
        pairs.push((KEY_CATEGORIES, state.categories().join()));
    }
    if !state.search().is_empty() {
        pairs.push((KEY_SEARCH, state.search().to_string()));
    }
    if state.status_filter() != defaults.status_filter() {
        pairs.push((KEY_STATUS, state.status_filter().to_string()));
    }
    if state.sort() != defaults.sort() {
        pairs.push((KEY_SORT, state.sort().to_string()));
    }
    if let Some(season) = state.active_season() {
        pairs.push((KEY_SEASON, season.to_string()));
    }
    if state.page() != defaults.page() {
        pairs.push((KEY_PAGE, state.page().to_string()));
    }

    pairs
}

/// Encode a state as a form-urlencoded query string without the leading
/// `?`. The default state encodes to the empty string.
#[must_use]
pub fn encode(state: &QueryState) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in encode_pairs(state) {
        serializer.append_pair(key, &value);
    }
    serializer.finish()
}

fn sorted_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort();
    pairs
}

/// Check if two query strings carry the same parameters, in any order.
#[must_use]
pub fn equivalent(a: &str, b: &str) -> bool {
    sorted_pairs(a) == sorted_pairs(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::state::{NumericRange, StatusFilter};
    use crate::query::SortStrategy;
    use crate::Status;

    #[test]
    fn empty_query_is_default_state() {
        assert_eq!(decode(""), QueryState::default());
        assert_eq!(decode("?"), QueryState::default());
        assert_eq!(encode(&QueryState::default()), "");
    }

    #[test]
    fn year_and_movie_scenario() {
        let state = decode("?y=2020-2020&t=Movie");

        assert_eq!(
            state.range(RangeDimension::Year),
            RangeFilter::Year(NumericRange::new(2020, 2020))
        );
        assert_eq!(*state.categories(), CategorySet::from_tokens(["Movie"]));
        assert!(state.season_selectable());
        assert_eq!(state.season(), None);
        assert!(equivalent(&encode(&state), "y=2020-2020&t=Movie"));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let state = decode("y=abc&s=9-3&r=1-2-3&st=watching&sort=newest&p=0&se=monsoon");
        assert_eq!(state, QueryState::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let state = decode("utm_source=feed&sort=score");
        assert_eq!(state.sort(), SortStrategy::Score);
        assert_eq!(encode(&state), "sort=score");
    }

    #[test]
    fn first_occurrence_wins() {
        let state = decode("sort=date&sort=score");
        assert_eq!(state.sort(), SortStrategy::Date);
    }

    #[test]
    fn season_needs_single_year() {
        assert_eq!(decode("se=fall").season(), None);
        assert_eq!(decode("y=2011-2011&se=fall").season(), Some(Season::Fall));
        assert_eq!(decode("se=fall&y=2011-2011").season(), Some(Season::Fall));
    }

    #[test]
    fn empty_category_set_round_trips() {
        let state = decode("t=");
        assert!(state.categories().is_empty());
        assert_eq!(encode(&state), "t=");
    }

    #[test]
    fn search_text_is_percent_encoded() {
        let mut state = QueryState::default();
        state.set_search("進撃の巨人 & co");
        let encoded = encode(&state);

        assert!(!encoded.contains(' '));
        assert_eq!(decode(&encoded).search(), "進撃の巨人 & co");
    }

    #[test]
    fn full_state_round_trips() {
        let query = "y=2006-2006&s=7.5-10&r=1-500&v=100-50000&e=1-26&t=TV,OVA&q=ghost&st=wishlist&sort=popularity&se=spring&p=3";
        let state = decode(query);

        assert_eq!(state.status_filter(), StatusFilter::Only(Status::Wishlist));
        assert_eq!(state.sort(), SortStrategy::Popularity);
        assert_eq!(state.season(), Some(Season::Spring));
        assert_eq!(state.page(), 3);
        assert!(equivalent(&encode(&state), query));
        assert_eq!(decode(&encode(&state)), state);
    }

    #[test]
    fn default_values_are_not_emitted() {
        let state = decode("y=0-2030&st=todo&sort=rank&p=1&t=TV,Movie,OVA,Web");
        assert_eq!(encode(&state), "");
    }

    #[test]
    fn equivalence_ignores_order_and_encoding() {
        assert!(equivalent("?t=TV,OVA&sort=date", "sort=date&t=TV%2COVA"));
        assert!(!equivalent("sort=date", "sort=date&p=2"));
    }

    #[test]
    fn legacy_sort_name_normalizes() {
        assert_eq!(encode(&decode("sort=collected")), "sort=popularity");
    }

    #[test]
    fn long_search_is_cut_to_limit() {
        let long = "a".repeat(MAX_SEARCH_LENGTH + 10);
        let state = decode(&format!("q={long}"));
        assert_eq!(state.search().chars().count(), MAX_SEARCH_LENGTH);
        assert_eq!(encode(&state), format!("q={}", "a".repeat(MAX_SEARCH_LENGTH)));
    }

    #[test]
    fn search_at_limit_round_trips() {
        let query = format!("q={}", "b".repeat(MAX_SEARCH_LENGTH));
        assert_eq!(encode(&decode(&query)), query);
    }
}
