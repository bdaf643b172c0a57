//! # Query Engine
//!
//! Turns a [`QueryState`] into one page of subjects.
//!
//! ```text
//! Catalog -> Pipeline (filter) -> SortStrategy -> Paginator -> PageView
//! ```
//!
//! Every stage is pure: the catalog is never mutated and the same state,
//! catalog and statuses always produce the same page.

pub mod filter;
pub mod paginate;
pub mod preset;
pub mod sort;
pub mod state;
pub mod url;

pub use filter::{Pipeline, Predicate};
pub use paginate::Paginator;
pub use preset::{PRESETS, Preset};
pub use sort::SortStrategy;
pub use state::{
    CategorySet, NumericRange, QueryState, RangeDimension, RangeFilter, RangeFilters, Season,
    StatusFilter,
};

use crate::catalog::Catalog;
use crate::registry::StatusLookup;
use crate::Subject;

/// One rendered page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a> {
    /// Subjects on this page, in sort order.
    pub items: Vec<&'a Subject>,
    /// The page shown, after clamping.
    pub page: u32,
    pub page_count: u32,
    /// Subjects passing every filter.
    pub matched: usize,
    /// Subjects in the catalog.
    pub total: usize,
}

/// Filter and sort the whole catalog.
pub fn run<'a>(
    catalog: &'a Catalog,
    state: &QueryState,
    lookup: &dyn StatusLookup,
) -> Vec<&'a Subject> {
    let mut items = Pipeline::from_state(state).filter(catalog.subjects(), lookup);
    state.sort().sort(&mut items);
    items
}

/// Filter, sort and paginate in one call.
///
/// The requested page is clamped; the state itself is not modified.
pub fn execute<'a>(
    catalog: &'a Catalog,
    state: &QueryState,
    lookup: &dyn StatusLookup,
    paginator: &Paginator,
) -> PageView<'a> {
    let results = run(catalog, state, lookup);
    let page = paginator.clamp(state.page(), results.len());

    PageView {
        items: paginator.slice(&results, page).to_vec(),
        page,
        page_count: paginator.page_count(results.len()),
        matched: results.len(),
        total: catalog.len(),
    }
}
