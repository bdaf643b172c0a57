//! # Presets
//!
//! Named, fixed bundles of range filters and a category set.
//!
//! A preset is active when every range it defines and the category set are
//! exactly equal to the query state's. Applying a preset overwrites only
//! what it defines; applying an active preset resets those same fields to
//! the global defaults.
//!
//! Presets sharing a category set always share at least one range dimension
//! with different bounds, so at most one preset is active at a time.

use super::state::{CategorySet, NumericRange, QueryState, RangeFilter};
use crate::primitives::{DEFAULT_CATEGORIES, DEFAULT_RANK_RANGE, DEFAULT_SCORE_RANGE};

/// A named filter bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    ranges: &'static [RangeFilter],
    categories: &'static [&'static str],
}

const ANY_RANK: RangeFilter =
    RangeFilter::Rank(NumericRange::new(DEFAULT_RANK_RANGE.0, DEFAULT_RANK_RANGE.1));
const ANY_SCORE: RangeFilter =
    RangeFilter::Score(NumericRange::new(DEFAULT_SCORE_RANGE.0, DEFAULT_SCORE_RANGE.1));

/// Built-in presets in display order.
pub static PRESETS: [Preset; 7] = [
    Preset {
        id: "top-100",
        label: "Top 100",
        description: "The hundred best-ranked subjects",
        ranges: &[RangeFilter::Rank(NumericRange::new(1, 100)), ANY_SCORE],
        categories: &DEFAULT_CATEGORIES,
    },
    Preset {
        id: "masterpieces",
        label: "Masterpieces",
        description: "Score 8+ backed by at least a thousand votes",
        ranges: &[
            ANY_RANK,
            RangeFilter::Score(NumericRange::new(8.0, 10.0)),
            RangeFilter::Votes(NumericRange::new(1000, 999_999)),
        ],
        categories: &DEFAULT_CATEGORIES,
    },
    Preset {
        id: "hidden-gems",
        label: "Hidden gems",
        description: "Well scored but rarely voted",
        ranges: &[
            ANY_RANK,
            RangeFilter::Score(NumericRange::new(7.5, 10.0)),
            RangeFilter::Votes(NumericRange::new(50, 1000)),
        ],
        categories: &DEFAULT_CATEGORIES,
    },
    Preset {
        id: "classics",
        label: "Classics",
        description: "Scored 7+ and released before 2000",
        ranges: &[
            ANY_RANK,
            RangeFilter::Score(NumericRange::new(7.0, 10.0)),
            RangeFilter::Year(NumericRange::new(1901, 1999)),
        ],
        categories: &DEFAULT_CATEGORIES,
    },
    Preset {
        id: "short-tv",
        label: "Short TV",
        description: "TV series of one cour or less",
        ranges: &[RangeFilter::Episodes(NumericRange::new(1, 13))],
        categories: &["TV"],
    },
    Preset {
        id: "long-running",
        label: "Long running",
        description: "TV series of two cours or more",
        ranges: &[RangeFilter::Episodes(NumericRange::new(26, 9999))],
        categories: &["TV"],
    },
    Preset {
        id: "films",
        label: "Films",
        description: "Movies scored 7+",
        ranges: &[RangeFilter::Score(NumericRange::new(7.0, 10.0))],
        categories: &["Movie"],
    },
];

impl Preset {
    /// Range filters this preset defines.
    #[must_use]
    pub fn ranges(&self) -> &'static [RangeFilter] {
        self.ranges
    }

    /// Category set this preset selects.
    #[must_use]
    pub fn categories(&self) -> CategorySet {
        CategorySet::from_tokens(self.categories)
    }

    /// Check if the state matches this preset exactly.
    #[must_use]
    pub fn is_active(&self, state: &QueryState) -> bool {
        self.ranges
            .iter()
            .all(|filter| state.range(filter.dimension()) == *filter)
            && self.categories() == *state.categories()
    }

    /// Apply the preset, or reset its fields to defaults if it is active.
    ///
    /// Returns `true` if the preset is active afterwards.
    pub fn apply(&self, state: &mut QueryState) -> bool {
        let engage = !self.is_active(state);

        if engage {
            state.categories = self.categories();
        } else {
            state.categories = CategorySet::defaults();
        }
        state.enforce_category_constraints();

        for filter in self.ranges {
            let value = if engage {
                *filter
            } else {
                RangeFilter::default_for(filter.dimension())
            };
            state.ranges.set(value);
        }
        state.enforce_season();
        state.page = 1;

        tracing::debug!(preset = self.id, engaged = engage, "Preset applied");
        engage
    }
}

/// Lookup a built-in preset.
#[must_use]
pub fn find(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.id == id)
}

/// Presets currently active for a state.
#[must_use]
pub fn active(state: &QueryState) -> Vec<&'static Preset> {
    PRESETS
        .iter()
        .filter(|preset| preset.is_active(state))
        .collect()
}
