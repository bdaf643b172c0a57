//! # Predicate Pipeline
//!
//! A [`QueryState`] compiles into an ordered list of [`Predicate`]s. A
//! subject is admitted only if every predicate holds; evaluation stops at
//! the first failure, so cheap checks come first.
//!
//! Order: status, score, rank, votes, year, episodes, season, category, text.

use super::state::{CategorySet, QueryState, RangeDimension, RangeFilter, Season, StatusFilter};
use crate::registry::StatusLookup;
use crate::Subject;

/// One filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Registry status against the status mode.
    Status(StatusFilter),
    /// Closed range on one numeric dimension.
    Range(RangeFilter),
    /// Release month inside a season bucket. Only built for a single year.
    Season(Season),
    /// Category tag against the selected tokens.
    Category(CategorySet),
    /// Lower-cased, trimmed needle.
    Text(String),
}

impl Predicate {
    /// Evaluate the predicate.
    pub fn admits(&self, subject: &Subject, lookup: &dyn StatusLookup) -> bool {
        match self {
            Self::Status(mode) => mode.admits(lookup.status(subject.id)),
            Self::Range(filter) => filter.admits(subject),
            Self::Season(season) => season.contains_month(subject.month),
            Self::Category(set) => set.matches(&subject.category),
            Self::Text(needle) => text_matches(subject, needle),
        }
    }
}

/// Substring match on titles and studio, or exact match on the id.
fn text_matches(subject: &Subject, needle: &str) -> bool {
    subject.name.to_lowercase().contains(needle)
        || subject.localized_name.to_lowercase().contains(needle)
        || subject.studio.to_lowercase().contains(needle)
        || subject.id.to_string() == needle
}

/// The compiled filter for one query state.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    predicates: Vec<Predicate>,
}

impl Pipeline {
    /// Compile a query state.
    ///
    /// Predicates that cannot exclude anything (status `all`, empty search,
    /// empty category selection, no active season) are left out.
    #[must_use]
    pub fn from_state(state: &QueryState) -> Self {
        let mut predicates = Vec::with_capacity(9);

        if state.status_filter() != StatusFilter::Any {
            predicates.push(Predicate::Status(state.status_filter()));
        }

        for dimension in [
            RangeDimension::Score,
            RangeDimension::Rank,
            RangeDimension::Votes,
            RangeDimension::Year,
            RangeDimension::Episodes,
        ] {
            predicates.push(Predicate::Range(state.range(dimension)));
        }

        if let Some(season) = state.active_season() {
            predicates.push(Predicate::Season(season));
        }

        if !state.categories().is_empty() {
            predicates.push(Predicate::Category(state.categories().clone()));
        }

        let needle = state.search().trim().to_lowercase();
        if !needle.is_empty() {
            predicates.push(Predicate::Text(needle));
        }

        Self { predicates }
    }

    /// Compiled predicates in evaluation order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Check if a subject passes every predicate.
    pub fn admits(&self, subject: &Subject, lookup: &dyn StatusLookup) -> bool {
        self.predicates.iter().all(|p| p.admits(subject, lookup))
    }

    /// Filter subjects, keeping input order.
    pub fn filter<'a>(
        &self,
        subjects: &'a [Subject],
        lookup: &dyn StatusLookup,
    ) -> Vec<&'a Subject> {
        subjects
            .iter()
            .filter(|subject| self.admits(subject, lookup))
            .collect()
    }
}
