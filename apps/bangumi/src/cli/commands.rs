//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, SubjectSummary};
use crate::config::AppConfig;
use bangumi_core::{
    Catalog, Explorer, ExplorerError, ImportFormat, PRESETS, PageView, RedbStatusStore, Status,
    StatusRegistry, StatusStore, Subject, SubjectId, import_bytes,
    primitives::{MAX_CATALOG_SIZE, MAX_SNAPSHOT_SIZE},
    query::{preset, url},
    snapshot_to_bytes,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ExplorerError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ExplorerError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ExplorerError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ExplorerError> {
    let canonical = path.canonicalize().map_err(|e| {
        ExplorerError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ExplorerError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, ExplorerError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ExplorerError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ExplorerError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ExplorerError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Read the raw catalog file.
///
/// The error is returned rather than raised: a missing or unreadable catalog
/// still yields a usable, empty session.
pub fn read_catalog(path: &Path) -> Result<Vec<u8>, ExplorerError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_CATALOG_SIZE as u64)?;
    std::fs::read(&validated)
        .map_err(|e| ExplorerError::IoError(format!("Read catalog: {}", e)))
}

/// Open the status store and a session hydrated from it, catalog loaded.
fn open_session(config: &AppConfig) -> Result<(Explorer, RedbStatusStore), ExplorerError> {
    let store = RedbStatusStore::open(&config.database)?;
    let mut explorer = Explorer::new(config.paginator()?, StatusRegistry::hydrate(&store));
    explorer.load_catalog(read_catalog(&config.catalog));
    Ok((explorer, store))
}

/// Print and log every queued notice.
fn report_notices(explorer: &mut Explorer) {
    for notice in explorer.take_notices() {
        tracing::warn!("{}", notice.message);
        eprintln!("! {}", notice.message);
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn rank_label(subject: &Subject) -> String {
    if subject.is_ranked() {
        format!("#{}", subject.effective_rank())
    } else {
        "-".to_string()
    }
}

fn status_label(status: Option<Status>) -> &'static str {
    status.map_or("unclassified", Status::as_str)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), ExplorerError> {
    let catalog_path = config.catalog.clone();
    let source = tokio::task::spawn_blocking(move || read_catalog(&catalog_path))
        .await
        .map_err(|e| ExplorerError::IoError(format!("Catalog loader failed: {}", e)))?;
    let (catalog, report) = Catalog::load_or_empty(source);

    let store: Arc<dyn StatusStore> = Arc::new(RedbStatusStore::open(&config.database)?);
    let state = AppState::new(catalog, store, config.paginator()?);

    println!("Bangumi Explorer Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:   {}", config.bind_address());
    println!("  Catalog:   {:?} ({} subjects)", config.catalog, state.catalog.len());
    println!("  Database:  {:?}", config.database);
    println!("  Page size: {}", config.page_size);
    if report.skipped > 0 {
        println!("  Skipped:   {} unreadable catalog entries", report.skipped);
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /health               - Health check");
    println!("  GET  /browse?<state>       - One page of results");
    println!("  GET  /subjects/{{id}}        - Subject details");
    println!("  POST /status               - Classify a subject");
    println!("  GET  /presets?<state>      - List presets");
    println!("  POST /presets/{{id}}/toggle  - Toggle a preset");
    println!("  GET  /stats                - Counters");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.bind_address(), state).await
}

// =============================================================================
// BROWSE COMMAND
// =============================================================================

/// Print one page of results for a query string.
pub fn cmd_browse(
    config: &AppConfig,
    json_mode: bool,
    query: &str,
    page: Option<u32>,
) -> Result<(), ExplorerError> {
    let store = RedbStatusStore::open(&config.database)?;
    let mut explorer = Explorer::new(config.paginator()?, StatusRegistry::hydrate(&store));

    // The query string is decoded before the catalog arrives, like a page load.
    explorer.seed_from_url(query);
    explorer.load_catalog(read_catalog(&config.catalog));
    report_notices(&mut explorer);

    if let Some(page) = page {
        explorer.set_page(page)?;
    }
    if let Some(rewritten) = explorer.take_url_update() {
        tracing::debug!("Query string normalized to {:?}", rewritten);
    }

    let canonical = url::encode(explorer.state());
    let presets: Vec<&str> = explorer.active_presets().iter().map(|p| p.id).collect();
    let view = explorer.view()?;

    if json_mode {
        let items: Vec<SubjectSummary> = view
            .items
            .iter()
            .map(|s| SubjectSummary::new(s, explorer.registry().get(s.id)))
            .collect();
        print_json(&serde_json::json!({
            "url": canonical,
            "page": view.page,
            "page_count": view.page_count,
            "matched": view.matched,
            "total": view.total,
            "active_presets": presets,
            "items": items,
        }));
        return Ok(());
    }

    print_page(&explorer, &view);
    println!();
    println!("Query:   ?{}", canonical);
    if !presets.is_empty() {
        println!("Presets: {}", presets.join(", "));
    }

    Ok(())
}

fn print_page(explorer: &Explorer, view: &PageView<'_>) {
    println!(
        "Page {} of {} ({} of {} subjects match)",
        view.page, view.page_count, view.matched, view.total
    );
    println!();

    if view.items.is_empty() {
        println!("  No subjects match.");
        return;
    }

    for subject in &view.items {
        let marker = match explorer.registry().get(subject.id) {
            Some(Status::Collected) => '*',
            Some(Status::Wishlist) => '+',
            Some(Status::Ignored) => 'x',
            None => ' ',
        };
        println!(
            "{} {:>8} {:>7} {:>4.1} {:<10} {:<6} {}",
            marker,
            subject.id,
            rank_label(subject),
            subject.score,
            subject.date,
            subject.category,
            subject.name
        );
    }
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Show one subject.
pub fn cmd_show(config: &AppConfig, json_mode: bool, id: u64) -> Result<(), ExplorerError> {
    let (mut explorer, _store) = open_session(config)?;
    report_notices(&mut explorer);

    let id = SubjectId(id);
    let subject = explorer
        .catalog()
        .and_then(|catalog| catalog.get(id))
        .ok_or(ExplorerError::SubjectNotFound(id))?;
    let status = explorer.registry().get(id);

    if json_mode {
        print_json(&serde_json::json!({
            "subject": subject,
            "status": status,
        }));
        return Ok(());
    }

    println!("{} [{}]", subject.name, subject.id);
    if !subject.localized_name.is_empty() {
        println!("{}", subject.localized_name);
    }
    println!("==================");
    println!("Type:     {}", subject.category);
    println!("Date:     {}", subject.date);
    println!("Episodes: {}", subject.eps);
    println!("Score:    {:.1} ({} votes)", subject.score, subject.votes);
    println!("Rank:     {}", rank_label(subject));
    if !subject.studio.is_empty() {
        println!("Studio:   {}", subject.studio);
    }
    if !subject.director.is_empty() {
        println!("Director: {}", subject.director);
    }
    if !subject.tags.is_empty() {
        println!("Tags:     {}", subject.tags.join(", "));
    }
    println!(
        "Collected by {} users, wished by {}",
        subject.collection.collect, subject.collection.wish
    );
    for site in &subject.sites {
        println!("Link:     {} {}", site.site, site.id);
    }
    println!("Status:   {}", status_label(status));

    Ok(())
}

// =============================================================================
// MARK COMMAND
// =============================================================================

/// Set or clear a subject's status.
pub fn cmd_mark(
    config: &AppConfig,
    json_mode: bool,
    id: u64,
    status: &str,
) -> Result<(), ExplorerError> {
    let status = Status::parse_assignment(status)?;
    let (mut explorer, store) = open_session(config)?;
    report_notices(&mut explorer);

    let id = SubjectId(id);
    let previous = explorer.registry().get(id);
    explorer.set_status(id, status, &store)?;
    tracing::info!(id = %id, "Status set to {}", status_label(status));

    if json_mode {
        print_json(&serde_json::json!({
            "id": id,
            "previous": previous,
            "status": status,
        }));
        return Ok(());
    }

    println!(
        "Subject {}: {} -> {}",
        id,
        status_label(previous),
        status_label(status)
    );
    Ok(())
}

// =============================================================================
// PRESETS COMMAND
// =============================================================================

/// List presets for a query string, optionally toggling one first.
pub fn cmd_presets(json_mode: bool, query: &str, apply: Option<&str>) -> Result<(), ExplorerError> {
    let mut state = url::decode(query);

    let toggled = match apply {
        Some(id) => {
            let found =
                preset::find(id).ok_or_else(|| ExplorerError::UnknownPreset(id.to_string()))?;
            Some((found.id, found.apply(&mut state)))
        }
        None => None,
    };
    let canonical = url::encode(&state);

    if json_mode {
        let presets: Vec<serde_json::Value> = PRESETS
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "label": p.label,
                    "description": p.description,
                    "active": p.is_active(&state),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "url": canonical,
            "presets": presets,
        }));
        return Ok(());
    }

    if let Some((id, active)) = toggled {
        println!("Preset {} {}", id, if active { "applied" } else { "cleared" });
        println!("Query: ?{}", canonical);
        println!();
    }

    println!("Presets");
    println!("=======");
    for p in &PRESETS {
        let marker = if p.is_active(&state) { 'x' } else { ' ' };
        println!("[{}] {:<13} {:<14} {}", marker, p.id, p.label, p.description);
    }

    Ok(())
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Show catalog and status counters.
pub fn cmd_stats(config: &AppConfig, json_mode: bool) -> Result<(), ExplorerError> {
    let (mut explorer, _store) = open_session(config)?;
    report_notices(&mut explorer);

    let categories = explorer
        .catalog()
        .map(Catalog::category_counts)
        .unwrap_or_default();
    let total = explorer.catalog().map_or(0, Catalog::len);
    let counts = explorer.registry().counts();

    if json_mode {
        let statuses: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(status, count)| (status.to_string(), serde_json::json!(count)))
            .collect();
        print_json(&serde_json::json!({
            "catalog": config.catalog.to_string_lossy(),
            "database": config.database.to_string_lossy(),
            "subjects": total,
            "categories": categories,
            "statuses": statuses,
        }));
        return Ok(());
    }

    println!("Bangumi Explorer Status");
    println!("=======================");
    println!("Catalog:  {:?}", config.catalog);
    println!("Database: {:?}", config.database);
    println!();
    println!("Subjects: {}", total);
    for (category, count) in &categories {
        let label = if category.is_empty() { "(none)" } else { category };
        println!("  {:<10} {}", label, count);
    }
    println!();
    println!("Statuses:");
    for status in Status::ALL {
        println!(
            "  {:<10} {}",
            status.as_str(),
            counts.get(&status).copied().unwrap_or(0)
        );
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export statuses to a snapshot file.
pub fn cmd_export(config: &AppConfig, output: &Path) -> Result<(), ExplorerError> {
    let validated_output = validate_output_path(output)?;

    let store = RedbStatusStore::open(&config.database)?;
    let entries = store.load()?;
    let data = snapshot_to_bytes(&entries)?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| ExplorerError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} statuses ({} bytes) to {:?}",
        entries.len(),
        data.len(),
        validated_output
    );
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Replace statuses from a snapshot or a legacy id list.
pub fn cmd_import(config: &AppConfig, input: &Path) -> Result<(), ExplorerError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_SIZE as u64)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| ExplorerError::IoError(format!("Read file: {}", e)))?;
    let (entries, format) = import_bytes(&data)?;

    let store = RedbStatusStore::open(&config.database)?;
    store.replace_all(&entries)?;

    let source = match format {
        ImportFormat::Snapshot => "snapshot",
        ImportFormat::LegacyIdList => "legacy id list",
    };
    println!("Imported {} statuses from {}", entries.len(), source);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG: &str = r#"[
        {"id": 1, "name": "Mushishi", "type": "TV", "year": 2005, "score": 9.0, "rank": 2},
        {"id": 2, "name": "Perfect Blue", "type": "Movie", "year": 1997, "score": 8.2, "rank": 80}
    ]"#;

    fn config_in(dir: &Path) -> AppConfig {
        let catalog = dir.join("anime.json");
        std::fs::write(&catalog, CATALOG).expect("write catalog");
        AppConfig {
            catalog,
            database: dir.join("status.redb"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn missing_catalog_is_reported_not_raised() {
        let dir = tempdir().expect("temp dir");
        let result = read_catalog(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ExplorerError::IoError(_))));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempdir().expect("temp dir");
        assert!(validate_file_path(dir.path()).is_err());
    }

    #[test]
    fn output_path_needs_existing_parent() {
        let dir = tempdir().expect("temp dir");
        assert!(validate_output_path(&dir.path().join("out.bin")).is_ok());
        assert!(validate_output_path(&dir.path().join("missing/out.bin")).is_err());
    }

    #[test]
    fn mark_then_export_then_import() {
        let dir = tempdir().expect("temp dir");
        let config = config_in(dir.path());

        cmd_mark(&config, true, 1, "wishlist").expect("mark");
        assert!(matches!(
            cmd_mark(&config, true, 99, "collected"),
            Err(ExplorerError::SubjectNotFound(_))
        ));

        let snapshot = dir.path().join("statuses.bgms");
        cmd_export(&config, &snapshot).expect("export");

        let other = AppConfig {
            database: dir.path().join("other.redb"),
            ..config.clone()
        };
        cmd_import(&other, &snapshot).expect("import");

        let store = RedbStatusStore::open(&other.database).expect("open");
        assert_eq!(
            store.load().expect("load"),
            vec![(SubjectId(1), Status::Wishlist)]
        );
    }

    #[test]
    fn unknown_preset_is_an_error() {
        assert!(matches!(
            cmd_presets(true, "", Some("nope")),
            Err(ExplorerError::UnknownPreset(_))
        ));
        assert!(cmd_presets(true, "", Some("films")).is_ok());
    }

    #[test]
    fn browse_and_stats_run_on_empty_catalog() {
        let dir = tempdir().expect("temp dir");
        let config = AppConfig {
            catalog: dir.path().join("absent.json"),
            database: dir.path().join("status.redb"),
            ..AppConfig::default()
        };

        cmd_browse(&config, true, "y=2020-2020&t=Movie", None).expect("browse");
        cmd_stats(&config, true).expect("stats");
    }
}
