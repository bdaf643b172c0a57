//! # Catalog Store
//!
//! The immutable set of subjects browsed during a session.
//!
//! The catalog is produced by an external batch step as a JSON array. The
//! loader's contract is deliberately forgiving: a file that cannot be read as
//! an array yields an empty catalog, and individual elements that cannot be
//! decoded are skipped. The engine treats load failure as "zero records".

use crate::primitives::MAX_CATALOG_SIZE;
use crate::{ExplorerError, Subject, SubjectId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome counters of a catalog load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Subjects kept.
    pub loaded: usize,
    /// Array elements that could not be decoded.
    pub skipped: usize,
    /// Elements dropped because their id was already present.
    pub duplicates: usize,
}

/// Read-only, cheaply clonable catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    subjects: Arc<[Subject]>,
    index: Arc<BTreeMap<SubjectId, usize>>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from subjects. Later duplicates of an id are dropped.
    #[must_use]
    pub fn from_subjects(subjects: Vec<Subject>) -> Self {
        Self::build(subjects).0
    }

    fn build(subjects: Vec<Subject>) -> (Self, usize) {
        let mut index = BTreeMap::new();
        let mut kept = Vec::with_capacity(subjects.len());
        let mut duplicates = 0;

        for subject in subjects {
            if index.contains_key(&subject.id) {
                duplicates += 1;
                continue;
            }
            index.insert(subject.id, kept.len());
            kept.push(subject);
        }

        (
            Self {
                subjects: kept.into(),
                index: Arc::new(index),
            },
            duplicates,
        )
    }

    /// Decode a catalog from the JSON array produced by the ingestion step.
    ///
    /// Fails only if the document as a whole is not a JSON array.
    pub fn from_json(bytes: &[u8]) -> Result<(Self, LoadReport), ExplorerError> {
        if bytes.len() > MAX_CATALOG_SIZE {
            return Err(ExplorerError::DeserializationError(format!(
                "Catalog size {} bytes exceeds maximum allowed {} bytes",
                bytes.len(),
                MAX_CATALOG_SIZE
            )));
        }

        let elements: Vec<serde_json::Value> = serde_json::from_slice(bytes)
            .map_err(|e| ExplorerError::DeserializationError(e.to_string()))?;

        let mut report = LoadReport::default();
        let mut subjects = Vec::with_capacity(elements.len());
        for element in elements {
            match serde_json::from_value::<Subject>(element) {
                Ok(subject) => subjects.push(subject),
                Err(e) => {
                    tracing::debug!("Skipping catalog element: {}", e);
                    report.skipped += 1;
                }
            }
        }

        let (catalog, duplicates) = Self::build(subjects);
        report.duplicates = duplicates;
        report.loaded = catalog.len();
        Ok((catalog, report))
    }

    /// Load a catalog, degrading to an empty one on any failure.
    ///
    /// `source` is the raw read result of the catalog file so that read
    /// errors and decode errors take the same recovery path.
    pub fn load_or_empty(source: Result<Vec<u8>, ExplorerError>) -> (Self, LoadReport) {
        let loaded = source.and_then(|bytes| Self::from_json(&bytes));
        match loaded {
            Ok((catalog, report)) => {
                if report.skipped > 0 || report.duplicates > 0 {
                    tracing::warn!(
                        "Catalog loaded with {} skipped and {} duplicate entries",
                        report.skipped,
                        report.duplicates
                    );
                }
                (catalog, report)
            }
            Err(e) => {
                tracing::warn!("Failed to load catalog, continuing with zero records: {}", e);
                (Self::empty(), LoadReport::default())
            }
        }
    }

    /// All subjects in catalog order.
    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Lookup a subject by id.
    #[must_use]
    pub fn get(&self, id: SubjectId) -> Option<&Subject> {
        self.index.get(&id).map(|&i| &self.subjects[i])
    }

    /// Check if a subject is part of the catalog.
    #[must_use]
    pub fn contains(&self, id: SubjectId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Check if the catalog has no subjects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Count subjects per category tag, in tag order.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for subject in self.subjects.iter() {
            *counts.entry(subject.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_skips_bad_elements() {
        let json = br#"[
            {"id": 1, "name": "A", "type": "TV"},
            "not an object",
            {"id": 2, "name": "B", "score": "high"},
            {"id": 3, "name": "C", "type": "Movie"}
        ]"#;

        let (catalog, report) = Catalog::from_json(json).expect("load");

        assert_eq!(catalog.len(), 2);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 2);
        assert!(catalog.contains(SubjectId(1)));
        assert!(catalog.contains(SubjectId(3)));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let json = br#"[{"id": 5, "name": "first"}, {"id": 5, "name": "second"}]"#;

        let (catalog, report) = Catalog::from_json(json).expect("load");

        assert_eq!(catalog.len(), 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(catalog.get(SubjectId(5)).map(|s| s.name.as_str()), Some("first"));
    }

    #[test]
    fn non_array_is_an_error() {
        assert!(Catalog::from_json(br#"{"id": 1}"#).is_err());
        assert!(Catalog::from_json(b"garbage").is_err());
    }

    #[test]
    fn load_failure_degrades_to_empty() {
        let (catalog, report) =
            Catalog::load_or_empty(Err(ExplorerError::IoError("missing".to_string())));
        assert!(catalog.is_empty());
        assert_eq!(report, LoadReport::default());

        let (catalog, _) = Catalog::load_or_empty(Ok(b"{not json".to_vec()));
        assert!(catalog.is_empty());
    }

    #[test]
    fn category_counts_group_by_tag() {
        let mut a = Subject::new(SubjectId(1));
        a.category = "TV".to_string();
        let mut b = Subject::new(SubjectId(2));
        b.category = "TV".to_string();
        let mut c = Subject::new(SubjectId(3));
        c.category = "OVA".to_string();

        let counts = Catalog::from_subjects(vec![a, b, c]).category_counts();

        assert_eq!(counts.get("TV"), Some(&2));
        assert_eq!(counts.get("OVA"), Some(&1));
    }
}
