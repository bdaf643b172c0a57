//! # Query State
//!
//! The complete set of user-controlled selections: one closed range per
//! numeric dimension, the category set, search text, status mode, season,
//! sort strategy and page.
//!
//! ## Invariants
//!
//! Enforced by the mutation methods on [`QueryState`]:
//! - Editing a range, the category set, the search text or the status mode
//!   resets the page to 1.
//! - The season is only kept while the year range is a single year.
//! - After a category mutation that leaves `{Movie}` as the only category,
//!   the episode range returns to its default and episode shortcuts are
//!   unavailable.
//!
//! Clamping the page to the page count needs the filtered result size, so
//! it is done by the session after every recompute.

use super::sort::SortStrategy;
use crate::primitives::{
    DEFAULT_CATEGORIES, DEFAULT_EPISODE_RANGE, DEFAULT_RANK_RANGE, DEFAULT_SCORE_RANGE,
    DEFAULT_VOTES_RANGE, DEFAULT_YEAR_RANGE, MAX_CATEGORY_TOKENS, MOVIE_CATEGORY,
};
use crate::{ExplorerError, Status, Subject};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// NUMERIC RANGE
// =============================================================================

/// A value type usable as a range bound.
pub trait RangeBound: Copy + PartialOrd + fmt::Display + FromStr {
    /// Reject values that parse but cannot be compared meaningfully.
    fn is_valid(&self) -> bool {
        true
    }
}

impl RangeBound for u32 {}
impl RangeBound for u64 {}

impl RangeBound for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

/// A closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange<T> {
    pub lo: T,
    pub hi: T,
}

impl<T: RangeBound> NumericRange<T> {
    /// Create a range. Bounds are taken as given.
    #[must_use]
    pub const fn new(lo: T, hi: T) -> Self {
        Self { lo, hi }
    }

    /// Check if `value` lies in the closed interval.
    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Check if the range collapses to a single value.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    /// Check if this range lies entirely inside `outer`.
    #[must_use]
    pub fn is_within(&self, outer: &Self) -> bool {
        outer.lo <= self.lo && self.hi <= outer.hi
    }

    /// Parse the `lo-hi` form, splitting on the first `-`.
    ///
    /// Returns `None` for non-numeric or non-finite bounds and for `lo > hi`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (lo, hi) = s.split_once('-')?;
        let lo: T = lo.parse().ok()?;
        let hi: T = hi.parse().ok()?;
        if !lo.is_valid() || !hi.is_valid() || lo > hi {
            return None;
        }
        Some(Self { lo, hi })
    }
}

impl<T: fmt::Display> fmt::Display for NumericRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

// =============================================================================
// RANGE DIMENSIONS
// =============================================================================

/// The numeric dimensions a subject can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RangeDimension {
    Year,
    Score,
    Rank,
    Votes,
    Episodes,
}

impl RangeDimension {
    /// All dimensions in URL order.
    pub const ALL: [Self; 5] = [
        Self::Year,
        Self::Score,
        Self::Rank,
        Self::Votes,
        Self::Episodes,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Score => "score",
            Self::Rank => "rank",
            Self::Votes => "votes",
            Self::Episodes => "episodes",
        }
    }
}

impl fmt::Display for RangeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeDimension {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" | "y" => Ok(Self::Year),
            "score" | "s" => Ok(Self::Score),
            "rank" | "r" => Ok(Self::Rank),
            "votes" | "v" => Ok(Self::Votes),
            "episodes" | "eps" | "e" => Ok(Self::Episodes),
            other => Err(ExplorerError::InvalidValue {
                field: "dimension",
                value: other.to_string(),
            }),
        }
    }
}

/// A range filter on one dimension, carrying the dimension's bound type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeFilter {
    Year(NumericRange<u32>),
    Score(NumericRange<f64>),
    Rank(NumericRange<u64>),
    Votes(NumericRange<u64>),
    Episodes(NumericRange<u32>),
}

impl RangeFilter {
    /// The dimension this filter constrains.
    #[must_use]
    pub const fn dimension(&self) -> RangeDimension {
        match self {
            Self::Year(_) => RangeDimension::Year,
            Self::Score(_) => RangeDimension::Score,
            Self::Rank(_) => RangeDimension::Rank,
            Self::Votes(_) => RangeDimension::Votes,
            Self::Episodes(_) => RangeDimension::Episodes,
        }
    }

    /// The documented default for a dimension.
    #[must_use]
    pub const fn default_for(dimension: RangeDimension) -> Self {
        match dimension {
            RangeDimension::Year => {
                Self::Year(NumericRange::new(DEFAULT_YEAR_RANGE.0, DEFAULT_YEAR_RANGE.1))
            }
            RangeDimension::Score => {
                Self::Score(NumericRange::new(DEFAULT_SCORE_RANGE.0, DEFAULT_SCORE_RANGE.1))
            }
            RangeDimension::Rank => {
                Self::Rank(NumericRange::new(DEFAULT_RANK_RANGE.0, DEFAULT_RANK_RANGE.1))
            }
            RangeDimension::Votes => {
                Self::Votes(NumericRange::new(DEFAULT_VOTES_RANGE.0, DEFAULT_VOTES_RANGE.1))
            }
            RangeDimension::Episodes => Self::Episodes(NumericRange::new(
                DEFAULT_EPISODE_RANGE.0,
                DEFAULT_EPISODE_RANGE.1,
            )),
        }
    }

    /// Parse `lo-hi` for the given dimension.
    #[must_use]
    pub fn parse(dimension: RangeDimension, s: &str) -> Option<Self> {
        match dimension {
            RangeDimension::Year => NumericRange::parse(s).map(Self::Year),
            RangeDimension::Score => NumericRange::parse(s).map(Self::Score),
            RangeDimension::Rank => NumericRange::parse(s).map(Self::Rank),
            RangeDimension::Votes => NumericRange::parse(s).map(Self::Votes),
            RangeDimension::Episodes => NumericRange::parse(s).map(Self::Episodes),
        }
    }

    /// Check if this filter equals its dimension's default.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default_for(self.dimension())
    }

    /// Evaluate the filter against a subject. Missing values are already
    /// coerced to 0 (or the unranked sentinel) by the record type.
    #[must_use]
    pub fn admits(&self, subject: &Subject) -> bool {
        match self {
            Self::Year(r) => r.contains(subject.year),
            Self::Score(r) => r.contains(subject.score),
            Self::Rank(r) => r.contains(subject.effective_rank()),
            Self::Votes(r) => r.contains(subject.votes),
            Self::Episodes(r) => r.contains(subject.eps),
        }
    }
}

impl fmt::Display for RangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(r) => r.fmt(f),
            Self::Score(r) => r.fmt(f),
            Self::Rank(r) => r.fmt(f),
            Self::Votes(r) => r.fmt(f),
            Self::Episodes(r) => r.fmt(f),
        }
    }
}

/// One range per dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilters {
    pub year: NumericRange<u32>,
    pub score: NumericRange<f64>,
    pub rank: NumericRange<u64>,
    pub votes: NumericRange<u64>,
    pub episodes: NumericRange<u32>,
}

impl Default for RangeFilters {
    fn default() -> Self {
        Self {
            year: NumericRange::new(DEFAULT_YEAR_RANGE.0, DEFAULT_YEAR_RANGE.1),
            score: NumericRange::new(DEFAULT_SCORE_RANGE.0, DEFAULT_SCORE_RANGE.1),
            rank: NumericRange::new(DEFAULT_RANK_RANGE.0, DEFAULT_RANK_RANGE.1),
            votes: NumericRange::new(DEFAULT_VOTES_RANGE.0, DEFAULT_VOTES_RANGE.1),
            episodes: NumericRange::new(DEFAULT_EPISODE_RANGE.0, DEFAULT_EPISODE_RANGE.1),
        }
    }
}

impl RangeFilters {
    /// Read the filter for a dimension.
    #[must_use]
    pub fn get(&self, dimension: RangeDimension) -> RangeFilter {
        match dimension {
            RangeDimension::Year => RangeFilter::Year(self.year),
            RangeDimension::Score => RangeFilter::Score(self.score),
            RangeDimension::Rank => RangeFilter::Rank(self.rank),
            RangeDimension::Votes => RangeFilter::Votes(self.votes),
            RangeDimension::Episodes => RangeFilter::Episodes(self.episodes),
        }
    }

    /// Replace the filter for the filter's own dimension.
    pub fn set(&mut self, filter: RangeFilter) {
        match filter {
            RangeFilter::Year(r) => self.year = r,
            RangeFilter::Score(r) => self.score = r,
            RangeFilter::Rank(r) => self.rank = r,
            RangeFilter::Votes(r) => self.votes = r,
            RangeFilter::Episodes(r) => self.episodes = r,
        }
    }
}

// =============================================================================
// SEASON
// =============================================================================

/// A three-month bucket of a single year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// All seasons in calendar order.
    pub const ALL: [Self; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Fall];

    /// First month of the bucket.
    #[must_use]
    pub const fn anchor_month(self) -> u32 {
        match self {
            Self::Winter => 1,
            Self::Spring => 4,
            Self::Summer => 7,
            Self::Fall => 10,
        }
    }

    /// Check if a month (1-12) falls in this season. Month 0 never does.
    #[must_use]
    pub const fn contains_month(self, month: u32) -> bool {
        let anchor = self.anchor_month();
        month >= anchor && month <= anchor + 2
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|season| season.as_str() == s)
            .ok_or_else(|| ExplorerError::InvalidValue {
                field: "season",
                value: s.to_string(),
            })
    }
}

// =============================================================================
// STATUS FILTER
// =============================================================================

/// Which classifications the status predicate lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum StatusFilter {
    /// Only subjects without a status.
    #[default]
    Unclassified,
    /// Only subjects with exactly this status.
    Only(Status),
    /// Every subject.
    Any,
}

impl StatusFilter {
    /// All modes in display order.
    pub const ALL: [Self; 5] = [
        Self::Unclassified,
        Self::Only(Status::Collected),
        Self::Only(Status::Wishlist),
        Self::Only(Status::Ignored),
        Self::Any,
    ];

    /// URL value of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "todo",
            Self::Only(status) => status.as_str(),
            Self::Any => "all",
        }
    }

    /// Check if a subject with the given status passes.
    #[must_use]
    pub fn admits(self, status: Option<Status>) -> bool {
        match self {
            Self::Unclassified => status.is_none(),
            Self::Only(wanted) => status == Some(wanted),
            Self::Any => true,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ExplorerError::InvalidValue {
                field: "status filter",
                value: s.to_string(),
            })
    }
}

// =============================================================================
// CATEGORY SET
// =============================================================================

/// An insertion-ordered set of category tokens.
///
/// Order is kept so a URL's `t=` value re-encodes exactly as it was written;
/// equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct CategorySet {
    tokens: Vec<String>,
}

impl CategorySet {
    /// Create an empty set. An empty selection matches every category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The categories selected on a fresh session.
    #[must_use]
    pub fn defaults() -> Self {
        Self::from_tokens(DEFAULT_CATEGORIES)
    }

    /// Build a set, skipping blank tokens and repeats.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for token in tokens {
            if set.tokens.len() >= MAX_CATEGORY_TOKENS {
                break;
            }
            set.insert(token.as_ref());
        }
        set
    }

    /// Add a token. Returns `false` if it was blank or already present.
    pub fn insert(&mut self, token: &str) -> bool {
        if token.trim().is_empty() || self.contains(token) {
            return false;
        }
        self.tokens.push(token.to_string());
        true
    }

    /// Remove a token. Returns `true` if it was present.
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        self.tokens.len() != before
    }

    /// Add the token if absent, remove it if present.
    pub fn toggle(&mut self, token: &str) {
        if !self.remove(token) {
            self.insert(token);
        }
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Comma-joined tokens in insertion order.
    #[must_use]
    pub fn join(&self) -> String {
        self.tokens.join(",")
    }

    /// Check if the selection is exactly `{Movie}`.
    #[must_use]
    pub fn is_movie_only(&self) -> bool {
        self.tokens.len() == 1 && self.contains(MOVIE_CATEGORY)
    }

    /// Check if a subject category matches the selection.
    ///
    /// An empty selection matches everything. A subject with no category is
    /// never excluded for it.
    #[must_use]
    pub fn matches(&self, category: &str) -> bool {
        if self.tokens.is_empty() || category.is_empty() {
            return true;
        }
        let category = category.to_lowercase();
        self.tokens
            .iter()
            .any(|token| category.contains(&token.to_lowercase()))
    }
}

impl PartialEq for CategorySet {
    fn eq(&self, other: &Self) -> bool {
        self.tokens.len() == other.tokens.len() && self.iter().all(|t| other.contains(t))
    }
}

impl Eq for CategorySet {}

// =============================================================================
// QUERY STATE
// =============================================================================

/// The full set of user selections driving one result page.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub(crate) ranges: RangeFilters,
    pub(crate) categories: CategorySet,
    pub(crate) search: String,
    pub(crate) status_filter: StatusFilter,
    pub(crate) season: Option<Season>,
    pub(crate) sort: SortStrategy,
    pub(crate) page: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            ranges: RangeFilters::default(),
            categories: CategorySet::defaults(),
            search: String::new(),
            status_filter: StatusFilter::default(),
            season: None,
            sort: SortStrategy::default(),
            page: 1,
        }
    }
}

impl QueryState {
    /// Create the documented default state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn ranges(&self) -> &RangeFilters {
        &self.ranges
    }

    #[must_use]
    pub fn range(&self, dimension: RangeDimension) -> RangeFilter {
        self.ranges.get(dimension)
    }

    #[must_use]
    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    #[must_use]
    pub fn season(&self) -> Option<Season> {
        self.season
    }

    #[must_use]
    pub fn sort(&self) -> SortStrategy {
        self.sort
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Check if a season can be chosen (the year range is one year).
    #[must_use]
    pub fn season_selectable(&self) -> bool {
        self.ranges.year.is_point()
    }

    /// The season actually applied by the pipeline.
    #[must_use]
    pub fn active_season(&self) -> Option<Season> {
        self.season.filter(|_| self.season_selectable())
    }

    /// Check if episode-range shortcuts apply to the current selection.
    #[must_use]
    pub fn episode_shortcuts_enabled(&self) -> bool {
        !self.categories.is_movie_only()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Replace one range filter.
    pub fn set_range(&mut self, filter: RangeFilter) {
        self.ranges.set(filter);
        self.page = 1;
        self.enforce_season();
    }

    /// Add or remove one category token.
    pub fn toggle_category(&mut self, token: &str) {
        self.categories.toggle(token);
        self.page = 1;
        self.enforce_category_constraints();
    }

    /// Replace the category set.
    pub fn set_categories(&mut self, categories: CategorySet) {
        self.categories = categories;
        self.page = 1;
        self.enforce_category_constraints();
    }

    /// Replace the free-text search string.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Replace the status mode.
    pub fn set_status_filter(&mut self, mode: StatusFilter) {
        self.status_filter = mode;
        self.page = 1;
    }

    /// Choose or clear the season.
    ///
    /// Returns `false` (and changes nothing) when a season is requested
    /// while the year range spans more than one year.
    pub fn set_season(&mut self, season: Option<Season>) -> bool {
        if season.is_some() && !self.season_selectable() {
            return false;
        }
        self.season = season;
        self.page = 1;
        true
    }

    /// Select `season`, or clear it if it is already selected.
    pub fn toggle_season(&mut self, season: Season) -> bool {
        if self.season == Some(season) {
            self.set_season(None)
        } else {
            self.set_season(Some(season))
        }
    }

    /// Replace the sort strategy. The page is kept.
    pub fn set_sort(&mut self, sort: SortStrategy) {
        self.sort = sort;
    }

    /// Request a page. Values below 1 become 1; the upper bound is applied
    /// by [`QueryState::clamp_page`].
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Clamp the page into `[1, max(1, page_count)]`.
    pub fn clamp_page(&mut self, page_count: u32) {
        self.page = self.page.clamp(1, page_count.max(1));
    }

    /// Restore the documented default state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // =========================================================================
    // DERIVED CONSTRAINTS
    // =========================================================================

    /// Drop the season once the year range is wider than one year.
    pub(crate) fn enforce_season(&mut self) {
        if !self.ranges.year.is_point() {
            self.season = None;
        }
    }

    /// Episode counts are meaningless for a movies-only selection.
    pub(crate) fn enforce_category_constraints(&mut self) {
        if self.categories.is_movie_only() {
            self.ranges
                .set(RangeFilter::default_for(RangeDimension::Episodes));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
