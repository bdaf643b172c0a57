//! # Session Module
//!
//! One user's browsing session: the catalog, the query state, the status
//! registry and the memoized result list.
//!
//! ## Lifecycle
//!
//! A session starts `Loading`. The URL may be decoded into the query state
//! while loading, exactly once. Every other mutation is refused with
//! [`ExplorerError::NotReady`] until the catalog arrives. A failed load
//! still makes the session ready, with zero subjects and a notice.
//!
//! ## Recompute
//!
//! The filtered and sorted result is kept as catalog indices and rebuilt
//! only when the query (page excluded) or the registry revision changes.
//! After every change the page is clamped to the current page count.

use crate::catalog::Catalog;
use crate::query::preset::{self, Preset};
use crate::query::{
    CategorySet, Paginator, PageView, Pipeline, QueryState, RangeFilter, Season, SortStrategy,
    StatusFilter, url,
};
use crate::registry::{Notice, StatusRegistry, WriteState, WriteTicket};
use crate::storage::StatusStore;
use crate::{ExplorerError, Status, SubjectId};

/// Whether the catalog is available yet.
#[derive(Debug, Clone)]
pub enum CatalogState {
    Loading,
    Ready(Catalog),
}

#[derive(Debug, Clone)]
struct CachedResult {
    key: (u64, u64),
    indices: Vec<usize>,
}

/// A browsing session over one catalog.
#[derive(Debug)]
pub struct Explorer {
    catalog: CatalogState,
    state: QueryState,
    registry: StatusRegistry,
    paginator: Paginator,
    /// Bumped on every query change except page navigation.
    query_revision: u64,
    seeded: bool,
    /// Last query string handed out, or the seeded one.
    last_url: Option<String>,
    cache: Option<CachedResult>,
    notices: Vec<Notice>,
}

impl Explorer {
    /// Create a session waiting for its catalog.
    #[must_use]
    pub fn new(paginator: Paginator, registry: StatusRegistry) -> Self {
        Self {
            catalog: CatalogState::Loading,
            state: QueryState::default(),
            registry,
            paginator,
            query_revision: 0,
            seeded: false,
            last_url: None,
            cache: None,
            notices: Vec::new(),
        }
    }

    /// Create a session with its catalog already loaded.
    #[must_use]
    pub fn with_catalog(catalog: Catalog, paginator: Paginator, registry: StatusRegistry) -> Self {
        let mut explorer = Self::new(paginator, registry);
        explorer.finish_loading(catalog);
        explorer
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Check if the catalog is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.catalog, CatalogState::Ready(_))
    }

    /// The catalog, once loaded.
    #[must_use]
    pub fn catalog(&self) -> Option<&Catalog> {
        match &self.catalog {
            CatalogState::Ready(catalog) => Some(catalog),
            CatalogState::Loading => None,
        }
    }

    /// Install the loaded catalog.
    pub fn finish_loading(&mut self, catalog: Catalog) {
        tracing::info!("Catalog ready with {} subjects", catalog.len());
        self.catalog = CatalogState::Ready(catalog);
        self.cache = None;
        self.refresh();
    }

    /// Record a failed load: the session continues with zero subjects.
    pub fn fail_loading(&mut self, error: ExplorerError) {
        tracing::warn!("Catalog load failed: {}", error);
        self.notices.push(Notice::new(
            None,
            format!("Catalog could not be loaded: {error}"),
        ));
        self.finish_loading(Catalog::empty());
    }

    /// Finish loading from the raw catalog bytes (or the read error).
    pub fn load_catalog(&mut self, source: Result<Vec<u8>, ExplorerError>) {
        match source.and_then(|bytes| Catalog::from_json(&bytes)) {
            Ok((catalog, report)) => {
                if report.skipped > 0 {
                    self.notices.push(Notice::new(
                        None,
                        format!("{} catalog entries could not be read", report.skipped),
                    ));
                }
                self.finish_loading(catalog);
            }
            Err(e) => self.fail_loading(e),
        }
    }

    fn ensure_ready(&self) -> Result<(), ExplorerError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ExplorerError::NotReady)
        }
    }

    // =========================================================================
    // URL SYNC
    // =========================================================================

    /// Decode the initial URL into the query state.
    ///
    /// Only the first call has an effect; returns whether it applied.
    pub fn seed_from_url(&mut self, query: &str) -> bool {
        if self.seeded {
            return false;
        }
        let raw = query.strip_prefix('?').unwrap_or(query);
        self.state = url::decode(raw);
        self.seeded = true;

        // An equivalent URL is left alone; anything else gets rewritten.
        let canonical = url::encode(&self.state);
        self.last_url = Some(if url::equivalent(raw, &canonical) {
            canonical
        } else {
            raw.to_string()
        });
        self.query_revision += 1;
        self.refresh();
        true
    }

    /// The canonical query string, if it changed since last taken.
    ///
    /// Returns `None` before the initial URL has been decoded. The result is
    /// meant to replace the current address, not to add a history entry.
    pub fn take_url_update(&mut self) -> Option<String> {
        if !self.seeded {
            return None;
        }
        let encoded = url::encode(&self.state);
        if self.last_url.as_deref() == Some(encoded.as_str()) {
            return None;
        }
        self.last_url = Some(encoded.clone());
        Some(encoded)
    }

    // =========================================================================
    // QUERY STATE
    // =========================================================================

    /// The current query state.
    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// The status registry.
    #[must_use]
    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    #[must_use]
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Apply an arbitrary edit to the query state.
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut QueryState) -> R) -> Result<R, ExplorerError> {
        self.ensure_ready()?;
        let before = self.state.clone();
        let result = edit(&mut self.state);

        let mut page_only = before;
        page_only.page = self.state.page;
        if page_only != self.state {
            self.query_revision += 1;
        }
        self.refresh();
        Ok(result)
    }

    pub fn set_range(&mut self, filter: RangeFilter) -> Result<(), ExplorerError> {
        self.update(|state| state.set_range(filter))
    }

    pub fn toggle_category(&mut self, token: &str) -> Result<(), ExplorerError> {
        self.update(|state| state.toggle_category(token))
    }

    pub fn set_categories(&mut self, categories: CategorySet) -> Result<(), ExplorerError> {
        self.update(|state| state.set_categories(categories))
    }

    pub fn set_search(&mut self, search: &str) -> Result<(), ExplorerError> {
        self.update(|state| state.set_search(search))
    }

    pub fn set_status_filter(&mut self, mode: StatusFilter) -> Result<(), ExplorerError> {
        self.update(|state| state.set_status_filter(mode))
    }

    /// Choose or clear the season; `Ok(false)` if refused.
    pub fn set_season(&mut self, season: Option<Season>) -> Result<bool, ExplorerError> {
        self.update(|state| state.set_season(season))
    }

    pub fn set_sort(&mut self, sort: SortStrategy) -> Result<(), ExplorerError> {
        self.update(|state| state.set_sort(sort))
    }

    pub fn set_page(&mut self, page: u32) -> Result<(), ExplorerError> {
        self.update(|state| state.set_page(page))
    }

    pub fn reset(&mut self) -> Result<(), ExplorerError> {
        self.update(QueryState::reset)
    }

    // =========================================================================
    // PRESETS
    // =========================================================================

    /// Presets matching the current state.
    #[must_use]
    pub fn active_presets(&self) -> Vec<&'static Preset> {
        preset::active(&self.state)
    }

    /// Apply (or toggle off) a preset by id.
    ///
    /// Returns whether the preset is active afterwards.
    pub fn apply_preset(&mut self, id: &str) -> Result<bool, ExplorerError> {
        let preset = preset::find(id).ok_or_else(|| ExplorerError::UnknownPreset(id.to_string()))?;
        self.update(|state| preset.apply(state))
    }

    // =========================================================================
    // STATUS WRITES
    // =========================================================================

    fn ensure_known(&self, id: SubjectId) -> Result<(), ExplorerError> {
        match &self.catalog {
            CatalogState::Ready(catalog) if catalog.contains(id) => Ok(()),
            CatalogState::Ready(_) => Err(ExplorerError::SubjectNotFound(id)),
            CatalogState::Loading => Err(ExplorerError::NotReady),
        }
    }

    /// Classify a subject optimistically; settle with [`Explorer::complete_status`].
    pub fn begin_status(
        &mut self,
        id: SubjectId,
        status: Option<Status>,
    ) -> Result<WriteTicket, ExplorerError> {
        self.ensure_known(id)?;
        let ticket = self.registry.begin(id, status);
        self.refresh();
        Ok(ticket)
    }

    /// Settle an optimistic write with the persistence outcome.
    pub fn complete_status(
        &mut self,
        ticket: &WriteTicket,
        outcome: Result<(), ExplorerError>,
    ) -> WriteState {
        let settled = self.registry.complete(ticket, outcome);
        self.refresh();
        settled
    }

    /// Classify a subject and persist it synchronously.
    pub fn set_status(
        &mut self,
        id: SubjectId,
        status: Option<Status>,
        store: &dyn StatusStore,
    ) -> Result<WriteState, ExplorerError> {
        self.ensure_known(id)?;
        let result = self.registry.set(id, status, store);
        self.refresh();
        result
    }

    /// Take every queued notice.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        let mut notices = std::mem::take(&mut self.notices);
        notices.extend(self.registry.take_notices());
        notices
    }

    // =========================================================================
    // RESULTS
    // =========================================================================

    fn cache_key(&self) -> (u64, u64) {
        (self.query_revision, self.registry.revision())
    }

    /// Rebuild the result list if stale, then clamp the page.
    fn refresh(&mut self) {
        let CatalogState::Ready(catalog) = &self.catalog else {
            return;
        };
        let key = self.cache_key();
        let stale = self.cache.as_ref().is_none_or(|cache| cache.key != key);
        if stale {
            let subjects = catalog.subjects();
            let pipeline = Pipeline::from_state(&self.state);
            let sort = self.state.sort();
            let mut indices: Vec<usize> = (0..subjects.len())
                .filter(|&i| pipeline.admits(&subjects[i], &self.registry))
                .collect();
            indices.sort_by(|&a, &b| sort.compare(&subjects[a], &subjects[b]));

            tracing::debug!(matched = indices.len(), "Result list rebuilt");
            self.cache = Some(CachedResult { key, indices });
        }

        let matched = self.cache.as_ref().map_or(0, |cache| cache.indices.len());
        self.state.clamp_page(self.paginator.page_count(matched));
    }

    /// The current page. Fails while the catalog is loading.
    pub fn view(&self) -> Result<PageView<'_>, ExplorerError> {
        let CatalogState::Ready(catalog) = &self.catalog else {
            return Err(ExplorerError::NotReady);
        };
        let indices = self
            .cache
            .as_ref()
            .map(|cache| cache.indices.as_slice())
            .unwrap_or_default();
        let subjects = catalog.subjects();
        let page = self.paginator.clamp(self.state.page(), indices.len());

        Ok(PageView {
            items: self
                .paginator
                .slice(indices, page)
                .iter()
                .map(|&i| &subjects[i])
                .collect(),
            page,
            page_count: self.paginator.page_count(indices.len()),
            matched: indices.len(),
            total: catalog.len(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::NumericRange;
    use crate::storage::MemoryStatusStore;
    use crate::Subject;

    fn catalog(n: u64) -> Catalog {
        Catalog::from_subjects(
            (1..=n)
                .map(|id| {
                    let mut s = Subject::new(SubjectId(id));
                    s.name = format!("Subject {id}");
                    s.category = "TV".to_string();
                    s.rank = id as i64;
                    s.score = 7.0;
                    s
                })
                .collect(),
        )
    }

    fn ready(n: u64) -> Explorer {
        Explorer::with_catalog(
            catalog(n),
            Paginator::new(10).expect("size"),
            StatusRegistry::new(),
        )
    }

    #[test]
    fn loading_gates_mutations_but_not_seeding() {
        let mut explorer = Explorer::new(Paginator::default(), StatusRegistry::new());

        assert!(explorer.seed_from_url("?sort=score"));
        assert!(matches!(explorer.set_page(2), Err(ExplorerError::NotReady)));
        assert!(matches!(explorer.view(), Err(ExplorerError::NotReady)));
        assert!(matches!(
            explorer.begin_status(SubjectId(1), Some(Status::Collected)),
            Err(ExplorerError::NotReady)
        ));

        explorer.finish_loading(catalog(3));
        assert_eq!(explorer.state().sort(), SortStrategy::Score);
        assert_eq!(explorer.view().expect("view").matched, 3);
    }

    #[test]
    fn failed_load_is_ready_and_empty() {
        let mut explorer = Explorer::new(Paginator::default(), StatusRegistry::new());
        explorer.load_catalog(Err(ExplorerError::IoError("missing file".to_string())));

        assert!(explorer.is_ready());
        let view = explorer.view().expect("view");
        assert_eq!(view.total, 0);
        assert_eq!(view.page_count, 1);
        assert_eq!(explorer.take_notices().len(), 1);
    }

    #[test]
    fn seeding_happens_once() {
        let mut explorer = ready(5);
        assert!(explorer.seed_from_url("sort=date"));
        assert!(!explorer.seed_from_url("sort=score"));
        assert_eq!(explorer.state().sort(), SortStrategy::Date);
    }

    #[test]
    fn url_updates_only_after_seed_and_on_change() {
        let mut explorer = ready(50);
        explorer.set_sort(SortStrategy::Score).expect("sort");
        assert_eq!(explorer.take_url_update(), None);

        explorer.seed_from_url("?sort=score");
        assert_eq!(explorer.take_url_update(), None);

        explorer.set_page(2).expect("page");
        assert_eq!(explorer.take_url_update().as_deref(), Some("sort=score&p=2"));
        assert_eq!(explorer.take_url_update(), None);
    }

    #[test]
    fn malformed_seed_url_is_rewritten() {
        let mut explorer = ready(5);
        explorer.seed_from_url("y=garbage&sort=date");
        assert_eq!(explorer.take_url_update().as_deref(), Some("sort=date"));
    }

    #[test]
    fn seeded_page_is_clamped_after_load() {
        let mut explorer = Explorer::new(Paginator::new(10).expect("size"), StatusRegistry::new());
        explorer.seed_from_url("p=99");
        explorer.finish_loading(catalog(25));

        assert_eq!(explorer.state().page(), 3);
        assert_eq!(explorer.take_url_update().as_deref(), Some("p=3"));
    }

    #[test]
    fn filter_change_resets_page() {
        let mut explorer = ready(50);
        explorer.set_page(4).expect("page");
        assert_eq!(explorer.view().expect("view").page, 4);

        explorer
            .set_range(RangeFilter::Rank(NumericRange::new(1, 20)))
            .expect("range");

        let view = explorer.view().expect("view");
        assert_eq!(view.page, 1);
        assert_eq!(view.matched, 20);
        assert_eq!(view.page_count, 2);
    }

    #[test]
    fn optimistic_status_hides_subject_immediately() {
        let mut explorer = ready(3);
        assert_eq!(explorer.view().expect("view").matched, 3);

        let ticket = explorer
            .begin_status(SubjectId(2), Some(Status::Ignored))
            .expect("begin");
        assert_eq!(explorer.view().expect("view").matched, 2);

        let settled = explorer.complete_status(
            &ticket,
            Err(ExplorerError::IoError("offline".to_string())),
        );
        assert_eq!(settled, WriteState::RolledBack);
        assert_eq!(explorer.view().expect("view").matched, 3);
        assert_eq!(explorer.take_notices().len(), 1);
    }

    #[test]
    fn sync_status_write_persists() {
        let mut explorer = ready(3);
        let store = MemoryStatusStore::new();

        explorer
            .set_status(SubjectId(1), Some(Status::Collected), &store)
            .expect("set");
        explorer.set_status_filter(StatusFilter::Only(Status::Collected)).expect("mode");

        let view = explorer.view().expect("view");
        assert_eq!(view.matched, 1);
        assert_eq!(view.items[0].id, SubjectId(1));
        assert_eq!(store.load().expect("load"), vec![(SubjectId(1), Status::Collected)]);
    }

    #[test]
    fn unknown_subject_is_rejected() {
        let mut explorer = ready(3);
        assert!(matches!(
            explorer.begin_status(SubjectId(99), Some(Status::Wishlist)),
            Err(ExplorerError::SubjectNotFound(SubjectId(99)))
        ));
    }

    #[test]
    fn presets_through_session() {
        let mut explorer = ready(150);

        assert!(explorer.apply_preset("top-100").expect("apply"));
        let ids: Vec<_> = explorer.active_presets().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["top-100"]);
        assert_eq!(explorer.view().expect("view").matched, 100);

        assert!(!explorer.apply_preset("top-100").expect("toggle"));
        assert!(explorer.active_presets().is_empty());

        assert!(matches!(
            explorer.apply_preset("nope"),
            Err(ExplorerError::UnknownPreset(_))
        ));
    }

    #[test]
    fn movie_only_disables_episode_shortcuts() {
        let mut explorer = ready(3);
        explorer
            .set_range(RangeFilter::Episodes(NumericRange::new(1, 12)))
            .expect("range");
        explorer
            .set_categories(CategorySet::from_tokens(["Movie"]))
            .expect("categories");

        assert!(!explorer.state().episode_shortcuts_enabled());
        assert!(
            explorer
                .state()
                .range(crate::query::RangeDimension::Episodes)
                .is_default()
        );
    }
}
