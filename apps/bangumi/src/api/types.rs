//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use bangumi_core::{ExplorerError, Notice, Preset, Status, Subject, SubjectId, WriteState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// BROWSE RESPONSE
// =============================================================================

/// One row of a result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub id: u64,
    pub name: String,
    pub localized_name: String,
    pub category: String,
    pub date: String,
    pub year: u32,
    pub eps: u32,
    pub score: f64,
    /// `None` for unranked subjects.
    pub rank: Option<u64>,
    pub votes: u64,
    pub status: Option<Status>,
}

impl SubjectSummary {
    pub fn new(subject: &Subject, status: Option<Status>) -> Self {
        Self {
            id: subject.id.value(),
            name: subject.name.clone(),
            localized_name: subject.localized_name.clone(),
            category: subject.category.clone(),
            date: subject.date.clone(),
            year: subject.year,
            eps: subject.eps,
            score: subject.score,
            rank: subject.is_ranked().then(|| subject.effective_rank()),
            votes: subject.votes,
            status,
        }
    }
}

/// One page of browse results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResponse {
    /// Canonical query string for the request's state, page clamped.
    pub url: String,
    pub page: u32,
    pub page_count: u32,
    pub matched: usize,
    pub total: usize,
    pub items: Vec<SubjectSummary>,
    pub active_presets: Vec<String>,
    pub season_selectable: bool,
    pub episode_shortcuts: bool,
}

// =============================================================================
// SUBJECT RESPONSE
// =============================================================================

/// Full record of one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectResponse {
    pub success: bool,
    pub subject: Option<Subject>,
    pub status: Option<Status>,
    /// A status write for this subject is still in flight.
    pub pending: bool,
    pub error: Option<String>,
}

impl SubjectResponse {
    pub fn success(subject: Subject, status: Option<Status>, pending: bool) -> Self {
        Self {
            success: true,
            subject: Some(subject),
            status,
            pending,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            subject: None,
            status: None,
            pending: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// STATUS REQUEST/RESPONSE
// =============================================================================

/// Status assignment request.
///
/// `status` is `collected`, `wishlist`, `ignored`, or `none` to clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub id: u64,
    pub status: String,
}

impl StatusRequest {
    /// Validate the requested classification.
    pub fn to_assignment(&self) -> Result<(SubjectId, Option<Status>), ExplorerError> {
        let status = Status::parse_assignment(self.status.trim())?;
        Ok((SubjectId(self.id), status))
    }
}

/// Name of a settled write, as reported to clients.
#[must_use]
pub fn write_state_name(state: WriteState) -> &'static str {
    match state {
        WriteState::Confirmed => "confirmed",
        WriteState::RolledBack => "rolled_back",
        WriteState::Superseded => "superseded",
    }
}

/// Status assignment response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub id: Option<u64>,
    /// The visible status after the write settled.
    pub status: Option<Status>,
    /// `confirmed`, `rolled_back` or `superseded`.
    pub write: Option<String>,
    #[serde(default)]
    pub notices: Vec<String>,
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn settled(
        id: SubjectId,
        status: Option<Status>,
        state: WriteState,
        notices: Vec<Notice>,
    ) -> Self {
        let rolled_back = state == WriteState::RolledBack;
        Self {
            success: !rolled_back,
            id: Some(id.value()),
            status,
            write: Some(write_state_name(state).to_string()),
            error: rolled_back.then(|| "Status could not be saved".to_string()),
            notices: notices.into_iter().map(|n| n.message).collect(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            status: None,
            write: None,
            notices: Vec::new(),
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// PRESET RESPONSES
// =============================================================================

/// A preset and whether the request's state matches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetJson {
    pub id: String,
    pub label: String,
    pub description: String,
    pub active: bool,
}

impl PresetJson {
    pub fn new(preset: &Preset, active: bool) -> Self {
        Self {
            id: preset.id.to_string(),
            label: preset.label.to_string(),
            description: preset.description.to_string(),
            active,
        }
    }
}

/// Preset listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetsResponse {
    pub presets: Vec<PresetJson>,
}

/// Result of toggling a preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetToggleResponse {
    pub success: bool,
    pub id: String,
    /// Whether the preset is active after the toggle.
    pub active: bool,
    /// Query string of the resulting state.
    pub url: Option<String>,
    pub error: Option<String>,
}

impl PresetToggleResponse {
    pub fn success(id: impl Into<String>, active: bool, url: String) -> Self {
        Self {
            success: true,
            id: id.into(),
            active,
            url: Some(url),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            id: id.into(),
            active: false,
            url: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// STATS RESPONSE
// =============================================================================

/// Catalog and registry counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub subjects: usize,
    pub categories: BTreeMap<String, usize>,
    pub statuses: BTreeMap<String, usize>,
    pub pending_writes: usize,
}
