//! # Formats
//!
//! Pure byte-level encodings. File I/O lives in the app layer.

pub mod snapshot;

pub use snapshot::{ImportFormat, import_bytes, snapshot_from_bytes, snapshot_to_bytes};
