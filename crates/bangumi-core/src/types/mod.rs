//! # Core Type Definitions
//!
//! This module contains the record and classification types shared by every
//! engine component:
//! - Subject identifiers and catalog records (`SubjectId`, `Subject`)
//! - Community counters and site links (`CollectionCounts`, `SiteLink`)
//! - User classification (`Status`)
//! - Error types (`ExplorerError`)
//!
//! ## Missing Data
//!
//! Catalog files are produced by an external batch step and are not trusted
//! to be complete. Every field of [`Subject`] tolerates being absent *or*
//! `null`; such fields collapse to zero, empty, or "unranked".

use crate::primitives::UNRANKED_SENTINEL;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a catalog subject.
///
/// This is the join key between the catalog and the status registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SubjectId(pub u64);

impl SubjectId {
    /// Get the raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

/// Treat an explicit JSON `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// SUBJECT
// =============================================================================

/// Community collection counters reported by the upstream database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionCounts {
    #[serde(deserialize_with = "null_as_default")]
    pub wish: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub collect: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub doing: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub on_hold: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub dropped: u64,
}

/// A link to the same subject on an external site.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLink {
    #[serde(deserialize_with = "null_as_default")]
    pub site: String,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
}

/// One catalog entry.
///
/// Field names follow the catalog file produced by the ingestion step, so a
/// subject serializes back to the same JSON shape it was read from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    #[serde(deserialize_with = "null_as_default")]
    pub id: SubjectId,
    /// Primary (original-language) title.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Localized title.
    #[serde(rename = "cn", deserialize_with = "null_as_default")]
    pub localized_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub img: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    /// Zero-padded release date, `YYYY-MM-DD` or a prefix of it.
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub year: u32,
    /// Release month 1-12, 0 when unknown.
    #[serde(deserialize_with = "null_as_default")]
    pub month: u32,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub eps: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_eps: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub score: f64,
    /// Upstream rank; zero or negative means unranked.
    #[serde(deserialize_with = "null_as_default")]
    pub rank: i64,
    /// Total number of votes behind `score`.
    #[serde(rename = "total", deserialize_with = "null_as_default")]
    pub votes: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub score_chart: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub collection: CollectionCounts,
    #[serde(deserialize_with = "null_as_default")]
    pub studio: String,
    #[serde(deserialize_with = "null_as_default")]
    pub director: String,
    #[serde(deserialize_with = "null_as_default")]
    pub writer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub music: String,
    #[serde(deserialize_with = "null_as_default")]
    pub char_design: String,
    #[serde(deserialize_with = "null_as_default")]
    pub original: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sites: Vec<SiteLink>,
}

impl Subject {
    /// Create a subject with only an identifier; every other field defaults.
    #[must_use]
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Rank used for filtering and ordering.
    ///
    /// Unranked subjects map to [`UNRANKED_SENTINEL`] so they sink to the
    /// bottom of rank order and fall outside the default rank range.
    #[must_use]
    pub fn effective_rank(&self) -> u64 {
        if self.rank > 0 {
            self.rank as u64
        } else {
            UNRANKED_SENTINEL
        }
    }

    /// Check if the upstream database assigned a rank.
    #[must_use]
    pub fn is_ranked(&self) -> bool {
        self.rank > 0
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// A user-assigned classification of a subject.
///
/// "Unclassified" is not a variant: it is represented by the absence of a
/// registry entry (`Option<Status>::None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Watched / owned.
    Collected,
    /// Planned.
    Wishlist,
    /// Explicitly hidden from the to-do view.
    Ignored,
}

impl Status {
    /// All statuses in display order.
    pub const ALL: [Self; 3] = [Self::Collected, Self::Wishlist, Self::Ignored];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collected => "collected",
            Self::Wishlist => "wishlist",
            Self::Ignored => "ignored",
        }
    }

    /// Compact storage code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Collected => 1,
            Self::Wishlist => 2,
            Self::Ignored => 3,
        }
    }

    /// Decode a storage code produced by [`Status::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Collected),
            2 => Some(Self::Wishlist),
            3 => Some(Self::Ignored),
            _ => None,
        }
    }

    /// Parse a user-supplied classification where `none`/`unclassified`
    /// clears the status.
    pub fn parse_assignment(s: &str) -> Result<Option<Self>, ExplorerError> {
        match s {
            "none" | "unclassified" | "clear" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ExplorerError::InvalidValue {
                field: "status",
                value: s.to_string(),
            })
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the explorer.
///
/// - Malformed query input is never an error; it is corrected in place
/// - Use `Result<T, ExplorerError>` for fallible operations
/// - No error is fatal; the engine always stays interactive
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// The catalog has not finished loading yet.
    #[error("Catalog is still loading")]
    NotReady,

    /// The requested subject is not part of the catalog.
    #[error("Subject not found: {0}")]
    SubjectNotFound(SubjectId),

    /// The requested preset does not exist.
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// A value supplied through the CLI or API could not be interpreted.
    #[error("Invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// Persisting a status change failed.
    #[error("Status write for {id} failed: {reason}")]
    StatusWriteFailed { id: SubjectId, reason: String },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
