//! # Engine Primitives
//!
//! Fixed constants for the explorer engine.
//!
//! These values define the documented default query state. A bare URL with
//! no parameters must reproduce exactly these bounds, so they are compiled
//! in rather than configured.

/// Rank substituted for unranked subjects (rank 0, negative or absent).
///
/// Larger than [`DEFAULT_RANK_RANGE`]'s upper bound, so unranked subjects sort
/// last and are outside the default rank filter.
pub const UNRANKED_SENTINEL: u64 = 999_999;

/// Default number of subjects per page.
pub const DEFAULT_PAGE_SIZE: usize = 60;

/// Upper bound for a configured page size.
pub const MAX_PAGE_SIZE: usize = 1000;

// =============================================================================
// DEFAULT RANGES
// =============================================================================

/// Default year range `[lo, hi]`. Includes year 0 (unknown date).
pub const DEFAULT_YEAR_RANGE: (u32, u32) = (0, 2030);

/// Default score range `[lo, hi]`.
pub const DEFAULT_SCORE_RANGE: (f64, f64) = (0.0, 10.0);

/// Default rank range `[lo, hi]`.
pub const DEFAULT_RANK_RANGE: (u64, u64) = (0, 99_999);

/// Default vote-count range `[lo, hi]`.
pub const DEFAULT_VOTES_RANGE: (u64, u64) = (0, 999_999);

/// Default episode-count range `[lo, hi]`.
pub const DEFAULT_EPISODE_RANGE: (u32, u32) = (0, 9999);

/// Categories selected on a fresh session, in display order.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["TV", "Movie", "OVA", "Web"];

/// The category token that, when it is the only one selected, disables the
/// episode range.
pub const MOVIE_CATEGORY: &str = "Movie";

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum length of the free-text search string kept from a URL.
pub const MAX_SEARCH_LENGTH: usize = 256;

/// Maximum number of category tokens kept from a URL.
pub const MAX_CATEGORY_TOKENS: usize = 32;

/// Maximum size of a catalog file accepted by the loader (256 MB).
pub const MAX_CATALOG_SIZE: usize = 256 * 1024 * 1024;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes opening a status snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"BGMS";

/// Current status snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Maximum size of a status snapshot or legacy import (16 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 16 * 1024 * 1024;
