//! # bangumi-core
//!
//! The stateful query engine behind the Bangumi explorer.
//!
//! A user browses a fixed, in-memory catalog of anime subjects by combining
//! numeric range filters, a category selection, free-text search, a
//! per-subject status and a sort order. The engine paginates the result and
//! mirrors the whole selection into a shareable query string.
//!
//! ## Architectural Constraints
//!
//! - Pure, synchronous Rust: no async, no network
//! - Deterministic: the same catalog, statuses and state give the same page
//! - Recoverable: malformed input is corrected in place, load and write
//!   failures degrade to visible notices
//! - Persistence is injected through [`StatusStore`]

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod formats;
pub mod primitives;
pub mod query;
pub mod registry;
pub mod session;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CollectionCounts, ExplorerError, SiteLink, Status, Subject, SubjectId};

// =============================================================================
// RE-EXPORTS: Query Engine
// =============================================================================

pub use catalog::{Catalog, LoadReport};
pub use query::{
    CategorySet, NumericRange, PRESETS, PageView, Paginator, Pipeline, Predicate, Preset,
    QueryState, RangeDimension, RangeFilter, RangeFilters, Season, SortStrategy, StatusFilter,
};
pub use registry::{Notice, StatusLookup, StatusRegistry, WriteState, WriteTicket};
pub use session::{CatalogState, Explorer};
pub use storage::{MemoryStatusStore, RedbStatusStore, StatusStore};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{ImportFormat, import_bytes, snapshot_from_bytes, snapshot_to_bytes};
