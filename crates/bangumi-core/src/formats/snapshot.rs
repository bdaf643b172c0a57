//! # Status Snapshot Format
//!
//! Portable export of the status registry.
//!
//! Format: Header (5 bytes) + postcard-serialized entries.
//! - 4 bytes: Magic ("BGMS")
//! - 1 byte: Version
//!
//! Import also accepts the legacy local-collection format: a JSON array of
//! subject ids, every one of which is imported as collected.
//!
//! Sizes and headers are checked before any payload is decoded. File I/O
//! stays in the app layer.

use crate::primitives::{MAX_SNAPSHOT_SIZE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use crate::{ExplorerError, Status, SubjectId};
use serde::{Deserialize, Serialize};

const HEADER_SIZE: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotPayload {
    entries: Vec<(SubjectId, Status)>,
}

/// Which format an imported file was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Snapshot,
    LegacyIdList,
}

fn check_size(bytes: &[u8]) -> Result<(), ExplorerError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(ExplorerError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    Ok(())
}

/// Serialize status entries (header + payload).
pub fn snapshot_to_bytes(entries: &[(SubjectId, Status)]) -> Result<Vec<u8>, ExplorerError> {
    let payload = postcard::to_stdvec(&SnapshotPayload {
        entries: entries.to_vec(),
    })
    .map_err(|e| ExplorerError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(SNAPSHOT_MAGIC);
    bytes.push(SNAPSHOT_VERSION);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize a snapshot produced by [`snapshot_to_bytes`].
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Vec<(SubjectId, Status)>, ExplorerError> {
    check_size(bytes)?;

    let Some((header, payload)) = bytes.split_at_checked(HEADER_SIZE) else {
        return Err(ExplorerError::DeserializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    };
    if &header[..4] != SNAPSHOT_MAGIC {
        return Err(ExplorerError::DeserializationError(
            "Invalid magic bytes".to_string(),
        ));
    }
    if header[4] != SNAPSHOT_VERSION {
        return Err(ExplorerError::DeserializationError(format!(
            "Unsupported version: {} (expected {})",
            header[4], SNAPSHOT_VERSION
        )));
    }

    let decoded: SnapshotPayload = postcard::from_bytes(payload).map_err(|e| {
        ExplorerError::DeserializationError(format!("Failed to decode snapshot: {}", e))
    })?;
    Ok(decoded.entries)
}

/// Import either a snapshot or a legacy JSON id list.
pub fn import_bytes(
    bytes: &[u8],
) -> Result<(Vec<(SubjectId, Status)>, ImportFormat), ExplorerError> {
    if bytes.starts_with(SNAPSHOT_MAGIC) {
        return snapshot_from_bytes(bytes).map(|entries| (entries, ImportFormat::Snapshot));
    }

    check_size(bytes)?;
    let ids: Vec<SubjectId> = serde_json::from_slice(bytes).map_err(|e| {
        ExplorerError::DeserializationError(format!("Not a snapshot or id list: {}", e))
    })?;
    let entries = ids.into_iter().map(|id| (id, Status::Collected)).collect();
    Ok((entries, ImportFormat::LegacyIdList))
}
