//! # Sort Strategies
//!
//! Total orders over a filtered result. Sorting works on a vector of
//! references and is stable, so ties keep pipeline (catalog) order.

use crate::{ExplorerError, Subject};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// How a result list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SortStrategy {
    /// Effective rank ascending, unranked last; ties by score descending.
    #[default]
    Rank,
    /// Score descending.
    Score,
    /// Release date descending (string order).
    Date,
    /// Community collect counter descending.
    Popularity,
}

impl SortStrategy {
    /// All strategies in display order.
    pub const ALL: [Self; 4] = [Self::Rank, Self::Score, Self::Date, Self::Popularity];

    /// URL value of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rank => "rank",
            Self::Score => "score",
            Self::Date => "date",
            Self::Popularity => "popularity",
        }
    }

    /// Compare two subjects under this strategy.
    #[must_use]
    pub fn compare(self, a: &Subject, b: &Subject) -> Ordering {
        match self {
            Self::Rank => a
                .effective_rank()
                .cmp(&b.effective_rank())
                .then_with(|| b.score.total_cmp(&a.score)),
            Self::Score => b.score.total_cmp(&a.score),
            Self::Date => b.date.cmp(&a.date),
            Self::Popularity => b.collection.collect.cmp(&a.collection.collect),
        }
    }

    /// Sort a result list in place.
    pub fn sort(self, items: &mut [&Subject]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortStrategy {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rank" => Ok(Self::Rank),
            "score" => Ok(Self::Score),
            "date" => Ok(Self::Date),
            // Older bookmarks name popularity after the counter it reads.
            "popularity" | "collected" => Ok(Self::Popularity),
            other => Err(ExplorerError::InvalidValue {
                field: "sort",
                value: other.to_string(),
            }),
        }
    }
}
