//! Cell store: the rendered-cell map and the diff between visibility sets.
//!
//! The store owns every per-cell resource: the drawable (through the
//! [`Renderer`]), the outstanding load (through the [`LoadScheduler`]) and
//! the decoded texture (through the shared [`TextureCache`]). Nothing here
//! is async; fetches leave the store as [`FetchOrder`]s and come back
//! through [`CellStore::complete`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use foundation::grid::{CellKey, GridMapper};
use foundation::math::Vec2;
use streaming::cache::TextureCache;
use streaming::fetch::{CancelToken, LoadError, Texture};
use streaming::lifecycle::LoadState;
use streaming::protocol::{IdentifierBatch, IdentifierRequest};
use streaming::request::{ContentId, LoadRequest, Ticket};
use streaming::scheduler::{CancelOutcome, LoadScheduler};
use tracing::{debug, warn};

use crate::pool::{DrawableId, Renderer};

#[derive(Debug, Clone)]
pub enum Cell {
    /// Content id unknown, or known and waiting for a load slot. The origin
    /// cell stays in this state for its whole life.
    Placeholder { key: CellKey, drawable: DrawableId },
    Loading {
        key: CellKey,
        content_id: ContentId,
        drawable: DrawableId,
        ticket: Ticket,
    },
    Loaded {
        key: CellKey,
        content_id: ContentId,
        drawable: DrawableId,
        texture: Arc<Texture>,
    },
    /// Terminal until the cell leaves the visible set.
    Errored {
        key: CellKey,
        content_id: ContentId,
        drawable: DrawableId,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellState {
    Placeholder,
    Loading,
    Loaded,
    Errored,
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellState::Placeholder => "placeholder",
            CellState::Loading => "loading",
            CellState::Loaded => "loaded",
            CellState::Errored => "errored",
        })
    }
}

impl Cell {
    pub fn key(&self) -> CellKey {
        match self {
            Cell::Placeholder { key, .. }
            | Cell::Loading { key, .. }
            | Cell::Loaded { key, .. }
            | Cell::Errored { key, .. } => *key,
        }
    }

    pub fn drawable(&self) -> DrawableId {
        match self {
            Cell::Placeholder { drawable, .. }
            | Cell::Loading { drawable, .. }
            | Cell::Loaded { drawable, .. }
            | Cell::Errored { drawable, .. } => *drawable,
        }
    }

    pub fn content_id(&self) -> Option<&ContentId> {
        match self {
            Cell::Placeholder { .. } => None,
            Cell::Loading { content_id, .. }
            | Cell::Loaded { content_id, .. }
            | Cell::Errored { content_id, .. } => Some(content_id),
        }
    }

    pub fn state(&self) -> CellState {
        match self {
            Cell::Placeholder { .. } => CellState::Placeholder,
            Cell::Loading { .. } => CellState::Loading,
            Cell::Loaded { .. } => CellState::Loaded,
            Cell::Errored { .. } => CellState::Errored,
        }
    }
}

/// A load that was admitted and must be fetched by the caller. The result
/// goes back through [`CellStore::complete`] with the same ticket.
#[derive(Debug, Clone)]
pub struct FetchOrder {
    pub ticket: Ticket,
    pub cell: CellKey,
    pub content_id: ContentId,
    pub token: CancelToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub created: Vec<CellKey>,
    pub removed: Vec<CellKey>,
    /// Admitted loads whose cancellation token was fired.
    pub cancelled: usize,
    /// Created cells queued straight from a pending identifier.
    pub promoted: Vec<CellKey>,
    pub discarded_pending: Vec<CellKey>,
    /// `None` when every created cell was either the origin or promoted.
    pub request: Option<IdentifierRequest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentifierOutcome {
    pub enqueued: usize,
    pub pending: usize,
    pub ignored: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AdmitReport {
    pub orders: Vec<FetchOrder>,
    /// Cells completed synchronously from the texture cache.
    pub cache_hits: Vec<CellKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Ticket no longer in flight: the cell was removed (and its load
    /// cancelled) before the result arrived.
    Stale,
    Loaded(CellKey),
    /// Any error on a live ticket, including a fetcher that reports
    /// `Cancelled` without having been asked to.
    Failed { cell: CellKey, error: LoadError },
}

impl Completion {
    /// Terminal state of the load, `None` for stale results.
    pub fn load_state(&self) -> Option<LoadState> {
        match self {
            Completion::Stale => None,
            Completion::Loaded(_) => Some(LoadState::Succeeded),
            Completion::Failed { .. } => Some(LoadState::Failed),
        }
    }
}

#[derive(Debug)]
pub struct CellStore {
    grid: GridMapper,
    origin: CellKey,
    center: Vec2,
    cells: BTreeMap<CellKey, Cell>,
    pending: BTreeMap<CellKey, ContentId>,
    scheduler: LoadScheduler,
    renderer: Renderer,
    cache: TextureCache,
}

impl CellStore {
    pub fn new(
        grid: GridMapper,
        origin: CellKey,
        scheduler: LoadScheduler,
        renderer: Renderer,
        cache: TextureCache,
    ) -> Self {
        Self {
            grid,
            origin,
            center: grid.cell_world_center(origin),
            cells: BTreeMap::new(),
            pending: BTreeMap::new(),
            scheduler,
            renderer,
            cache,
        }
    }

    pub fn origin(&self) -> CellKey {
        self.origin
    }

    pub fn get(&self, key: &CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.values().filter(|c| c.state() == state).count()
    }

    pub fn loading_count(&self) -> usize {
        self.count(CellState::Loading)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn scheduler(&self) -> &LoadScheduler {
        &self.scheduler
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    /// Content id of `key` if it is `Loaded`.
    pub fn loaded_content(&self, key: &CellKey) -> Option<&ContentId> {
        match self.cells.get(key) {
            Some(Cell::Loaded { content_id, .. }) => Some(content_id),
            _ => None,
        }
    }

    /// Diffs `visible` against the rendered set.
    ///
    /// Removed cells have their loads cancelled and drawables released.
    /// Created cells start as placeholders; a pending identifier for one of
    /// them is consumed and queued immediately. Pending identifiers that no
    /// created cell claimed are discarded.
    pub fn reconcile(&mut self, visible: &BTreeSet<CellKey>, center: Vec2) -> Reconciliation {
        self.center = center;
        let mut out = Reconciliation::default();

        let to_remove: Vec<CellKey> = self
            .cells
            .keys()
            .filter(|k| !visible.contains(*k))
            .copied()
            .collect();
        for key in to_remove {
            if let CancelOutcome::Signalled(ticket) = self.scheduler.cancel(&key) {
                debug!(cell = %key, ticket = ticket.0, "in-flight load cancelled");
                out.cancelled += 1;
            }
            if let Some(cell) = self.cells.remove(&key) {
                self.renderer.release(cell.drawable());
            }
            out.removed.push(key);
        }

        let mut pending = std::mem::take(&mut self.pending);
        let mut request_keys = Vec::new();
        for &key in visible {
            if self.cells.contains_key(&key) {
                continue;
            }
            out.created.push(key);
            if key == self.origin {
                let drawable = self.renderer.acquire_origin_cell(key);
                self.cells.insert(key, Cell::Placeholder { key, drawable });
                continue;
            }

            let drawable = self.renderer.acquire_placeholder(key);
            self.cells.insert(key, Cell::Placeholder { key, drawable });
            match pending.remove(&key) {
                Some(content_id) => {
                    self.enqueue(key, content_id);
                    out.promoted.push(key);
                }
                None => request_keys.push(key),
            }
        }
        out.discarded_pending = pending.into_keys().collect();

        self.scheduler.reprioritize(&self.grid, center);

        if !request_keys.is_empty() {
            out.request = Some(IdentifierRequest::new(request_keys));
        }
        debug!(
            created = out.created.len(),
            removed = out.removed.len(),
            cancelled = out.cancelled,
            promoted = out.promoted.len(),
            discarded_pending = out.discarded_pending.len(),
            "reconciled"
        );
        out
    }

    /// Applies an identifier batch.
    ///
    /// Entries for placeholders are queued, entries for cells that are not
    /// rendered become pending identifiers, and everything else (the origin
    /// cell, cells already loading/loaded/errored) is ignored.
    pub fn apply_identifiers(&mut self, batch: &IdentifierBatch) -> IdentifierOutcome {
        if !batch.is_aligned() {
            warn!(
                keys = batch.keys.len(),
                content_ids = batch.content_ids.len(),
                "identifier batch arrays differ in length, truncating"
            );
        }

        let mut out = IdentifierOutcome::default();
        for (key, content_id) in batch.pairs() {
            if key == self.origin {
                out.ignored += 1;
                continue;
            }
            match self.cells.get(&key) {
                None => {
                    self.pending.insert(key, content_id.clone());
                    out.pending += 1;
                }
                Some(Cell::Placeholder { .. }) => {
                    if self.enqueue(key, content_id.clone()) {
                        out.enqueued += 1;
                    } else {
                        out.ignored += 1;
                    }
                }
                Some(_) => out.ignored += 1,
            }
        }
        out
    }

    fn enqueue(&mut self, key: CellKey, content_id: ContentId) -> bool {
        let req = LoadRequest::by_distance(
            content_id,
            key,
            self.grid.cell_world_center(key),
            self.center,
        );
        self.scheduler.enqueue(req)
    }

    /// Admits queued loads up to the concurrency limit.
    ///
    /// A load whose texture is already cached completes on the spot and
    /// frees its slot for the next request.
    pub fn admit(&mut self) -> AdmitReport {
        let mut report = AdmitReport::default();
        while let Some(admission) = self.scheduler.admit_next() {
            let key = admission.request.cell;
            let content_id = admission.request.content_id;

            let drawable = match self.cells.get(&key) {
                Some(Cell::Placeholder { drawable, .. }) => *drawable,
                _ => {
                    warn!(cell = %key, "admitted load for a cell that is not a placeholder");
                    self.scheduler.settle(admission.ticket);
                    continue;
                }
            };

            if let Some(texture) = self.cache.get(&content_id) {
                self.scheduler.settle(admission.ticket);
                self.renderer.promote_to_image(drawable, texture.clone());
                self.cells.insert(
                    key,
                    Cell::Loaded {
                        key,
                        content_id,
                        drawable,
                        texture,
                    },
                );
                report.cache_hits.push(key);
                continue;
            }

            self.cells.insert(
                key,
                Cell::Loading {
                    key,
                    content_id: content_id.clone(),
                    drawable,
                    ticket: admission.ticket,
                },
            );
            report.orders.push(FetchOrder {
                ticket: admission.ticket,
                cell: key,
                content_id,
                token: admission.token,
            });
        }
        report
    }

    /// Applies the result of a fetch started from a [`FetchOrder`].
    pub fn complete(&mut self, ticket: Ticket, result: Result<Texture, LoadError>) -> Completion {
        let Some(settled) = self.scheduler.settle(ticket) else {
            return Completion::Stale;
        };
        let key = settled.cell;

        let drawable = match self.cells.get(&key) {
            Some(Cell::Loading {
                drawable, ticket: t, ..
            }) if *t == ticket => *drawable,
            _ => return Completion::Stale,
        };

        match result {
            Ok(texture) => {
                let texture = self.cache.store(settled.content_id.clone(), texture);
                self.renderer.promote_to_image(drawable, texture.clone());
                self.cells.insert(
                    key,
                    Cell::Loaded {
                        key,
                        content_id: settled.content_id,
                        drawable,
                        texture,
                    },
                );
                Completion::Loaded(key)
            }
            Err(error) => {
                if error.is_cancelled() {
                    // The scheduler did not cancel this ticket, so the fetcher gave up on its own.
                    debug!(cell = %key, ticket = ticket.0, "fetcher abandoned a live load");
                }
                self.renderer.show_error(drawable);
                self.cells.insert(
                    key,
                    Cell::Errored {
                        key,
                        content_id: settled.content_id,
                        drawable,
                    },
                );
                Completion::Failed { cell: key, error }
            }
        }
    }

    /// Runs overflow eviction, never touching textures shown by `Loaded` cells.
    pub fn evict_cache(&mut self) -> Vec<ContentId> {
        let protected: BTreeSet<ContentId> = self
            .cells
            .values()
            .filter_map(|c| match c {
                Cell::Loaded { content_id, .. } => Some(content_id.clone()),
                _ => None,
            })
            .collect();
        self.cache.evict_overflow(&protected)
    }

    /// Sets or clears the dwell border on a `Loaded` cell.
    pub fn set_border(&mut self, key: &CellKey, progress: Option<f32>) -> bool {
        match self.cells.get(key) {
            Some(Cell::Loaded { drawable, .. }) => self.renderer.set_border(*drawable, progress),
            _ => false,
        }
    }

    /// Cancels every load and releases every drawable. The texture cache is
    /// kept.
    pub fn clear(&mut self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        for (_, cell) in std::mem::take(&mut self.cells) {
            self.renderer.release(cell.drawable());
        }
        self.pending.clear();
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use foundation::grid::{CellKey, GridMapper};
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;
    use streaming::cache::TextureCache;
    use streaming::fetch::{LoadError, Texture};
    use streaming::lifecycle::LoadState;
    use streaming::protocol::IdentifierBatch;
    use streaming::request::ContentId;
    use streaming::scheduler::LoadScheduler;

    use super::{Cell, CellState, CellStore, Completion};
    use crate::pool::{DrawableKind, Layer, OriginContent, Renderer};

    const ORIGIN: CellKey = CellKey::new(7, 7);

    fn store(max_concurrent: usize) -> CellStore {
        let grid = GridMapper::new(400.0);
        CellStore::new(
            grid,
            ORIGIN,
            LoadScheduler::new(max_concurrent),
            Renderer::new(
                grid,
                OriginContent {
                    title: "Mosaic".to_string(),
                    links: Vec::new(),
                },
            ),
            TextureCache::new(50),
        )
    }

    fn view(center: Vec2) -> BTreeSet<CellKey> {
        GridMapper::new(400.0).visible_cells(center, 2)
    }

    fn tex() -> Texture {
        Texture {
            width: 1,
            height: 1,
            rgba: Arc::from(vec![1u8, 2, 3, 255]),
        }
    }

    fn batch(pairs: &[((i64, i64), &str)]) -> IdentifierBatch {
        IdentifierBatch::from_pairs(
            pairs
                .iter()
                .map(|&((gx, gy), id)| (CellKey::new(gx, gy), ContentId::new(id))),
        )
    }

    const CENTER: Vec2 = Vec2 {
        x: 3000.0,
        y: 3000.0,
    };

    #[test]
    fn initial_reconcile_creates_grid_with_origin_and_one_request() {
        let mut s = store(6);
        let r = s.reconcile(&view(CENTER), CENTER);
        assert_eq!(r.created.len(), 25);
        assert_eq!(s.count(CellState::Placeholder), 25);

        let request = r.request.unwrap();
        assert_eq!(request.keys.len(), 24);
        assert!(!request.keys.contains(&ORIGIN));

        let origin = s.get(&ORIGIN).unwrap();
        let drawable = s.renderer().get(origin.drawable()).unwrap();
        assert_eq!(drawable.kind, DrawableKind::Origin);
        assert!(drawable.layers().contains(&Layer::Title("Mosaic".to_string())));
        assert!(!s.scheduler().is_outstanding(&ORIGIN));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((8, 7), "a")]));
        s.admit();

        let again = s.reconcile(&view(CENTER), CENTER);
        assert!(again.created.is_empty());
        assert!(again.removed.is_empty());
        assert_eq!(again.request, None);
        assert!(s.admit().orders.is_empty());
        assert_eq!(s.loading_count(), 1);
    }

    #[test]
    fn identifiers_for_origin_and_busy_cells_are_ignored() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        let out = s.apply_identifiers(&batch(&[((7, 7), "o"), ((8, 7), "a"), ((8, 7), "a")]));
        assert_eq!((out.enqueued, out.pending, out.ignored), (1, 0, 2));
    }

    #[test]
    fn admission_is_bounded_and_closest_first() {
        let mut s = store(2);
        s.reconcile(&view(CENTER), CENTER);
        // Cell centers: (9,9) is farthest, (7,8) and (8,7) are adjacent.
        s.apply_identifiers(&batch(&[((9, 9), "far"), ((7, 8), "near1"), ((8, 7), "near2")]));

        let report = s.admit();
        let cells: Vec<CellKey> = report.orders.iter().map(|o| o.cell).collect();
        assert_eq!(cells, vec![CellKey::new(7, 8), CellKey::new(8, 7)]);
        assert_eq!(s.loading_count(), 2);

        let first = report.orders[0].ticket;
        assert_eq!(s.complete(first, Ok(tex())), Completion::Loaded(CellKey::new(7, 8)));
        let next = s.admit();
        assert_eq!(next.orders.len(), 1);
        assert_eq!(next.orders[0].cell, CellKey::new(9, 9));
    }

    #[test]
    fn http_failure_is_terminal_until_cell_reenters() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((8, 7), "xyz")]));
        let order = s.admit().orders.remove(0);

        let err = LoadError::Fetch {
            status: Some(500),
            message: "GET".to_string(),
        };
        let done = s.complete(order.ticket, Err(err.clone()));
        assert_eq!(
            done,
            Completion::Failed {
                cell: CellKey::new(8, 7),
                error: err
            }
        );
        let cell = s.get(&CellKey::new(8, 7)).unwrap();
        assert_eq!(cell.state(), CellState::Errored);
        assert!(
            s.renderer()
                .get(cell.drawable())
                .unwrap()
                .layers()
                .contains(&Layer::ErrorTile)
        );

        // No retry while it stays visible.
        s.apply_identifiers(&batch(&[((8, 7), "xyz")]));
        assert!(s.admit().orders.is_empty());
        s.reconcile(&view(CENTER), CENTER);
        assert_eq!(s.scheduler().in_flight_len(), 0);
    }

    #[test]
    fn removing_a_loading_cell_cancels_and_frees_the_slot() {
        let mut s = store(1);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((9, 9), "a")]));
        let order = s.admit().orders.remove(0);

        let far = Vec2::new(10_000.0, 10_000.0);
        let r = s.reconcile(&view(far), far);
        assert_eq!(r.cancelled, 1);
        assert!(order.token.is_cancelled());
        assert_eq!(s.scheduler().in_flight_len(), 0);
        assert_eq!(s.loading_count(), 0);

        // The late result is a no-op.
        assert_eq!(s.complete(order.ticket, Err(LoadError::Cancelled)), Completion::Stale);
        assert_eq!(s.count(CellState::Errored), 0);
    }

    #[test]
    fn fetcher_giving_up_on_live_load_marks_cell_errored() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((8, 7), "abc")]));
        let order = s.admit().orders.remove(0);
        assert!(!order.token.is_cancelled());

        let done = s.complete(order.ticket, Err(LoadError::Cancelled));
        assert_eq!(
            done,
            Completion::Failed {
                cell: CellKey::new(8, 7),
                error: LoadError::Cancelled
            }
        );
        assert_eq!(done.load_state(), Some(LoadState::Failed));
        let cell = s.get(&CellKey::new(8, 7)).unwrap();
        assert_eq!(cell.state(), CellState::Errored);
        assert_eq!(cell.content_id(), Some(&ContentId::new("abc")));
        assert!(
            s.renderer()
                .get(cell.drawable())
                .unwrap()
                .layers()
                .contains(&Layer::ErrorTile)
        );
        assert_eq!(s.scheduler().in_flight_len(), 0);
    }

    #[test]
    fn late_batch_for_removed_cell_is_discarded_on_next_reconcile() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        let west = Vec2::new(1000.0, 3000.0);
        s.reconcile(&view(west), west);
        assert!(s.get(&CellKey::new(8, 7)).is_none());

        let out = s.apply_identifiers(&batch(&[((8, 7), "abc")]));
        assert_eq!(out.pending, 1);

        let further = Vec2::new(500.0, 3000.0);
        let r = s.reconcile(&view(further), further);
        assert_eq!(r.discarded_pending, vec![CellKey::new(8, 7)]);
        assert_eq!(s.pending_len(), 0);

        s.reconcile(&view(CENTER), CENTER);
        assert!(!s.scheduler().is_outstanding(&CellKey::new(8, 7)));
    }

    #[test]
    fn early_batch_is_consumed_when_cell_appears() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((10, 7), "early")]));

        let east = Vec2::new(3400.0, 3000.0);
        let r = s.reconcile(&view(east), east);
        assert_eq!(r.promoted, vec![CellKey::new(10, 7)]);
        assert!(!r.request.unwrap().keys.contains(&CellKey::new(10, 7)));
        assert!(s.scheduler().is_outstanding(&CellKey::new(10, 7)));
    }

    #[test]
    fn cached_texture_completes_without_fetch() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((8, 7), "same")]));
        let order = s.admit().orders.remove(0);
        s.complete(order.ticket, Ok(tex()));

        s.apply_identifiers(&batch(&[((6, 7), "same")]));
        let report = s.admit();
        assert!(report.orders.is_empty());
        assert_eq!(report.cache_hits, vec![CellKey::new(6, 7)]);
        match (s.get(&CellKey::new(8, 7)), s.get(&CellKey::new(6, 7))) {
            (Some(Cell::Loaded { texture: a, .. }), Some(Cell::Loaded { texture: b, .. })) => {
                assert!(Arc::ptr_eq(a, b))
            }
            other => panic!("expected two loaded cells, got {other:?}"),
        }
    }

    #[test]
    fn border_only_applies_to_loaded_cells() {
        let mut s = store(6);
        s.reconcile(&view(CENTER), CENTER);
        assert!(!s.set_border(&CellKey::new(8, 7), Some(0.5)));
        s.apply_identifiers(&batch(&[((8, 7), "a")]));
        let order = s.admit().orders.remove(0);
        s.complete(order.ticket, Ok(tex()));
        assert!(s.set_border(&CellKey::new(8, 7), Some(0.5)));
        assert_eq!(s.loaded_content(&CellKey::new(8, 7)), Some(&ContentId::new("a")));
    }

    #[test]
    fn clear_releases_everything() {
        let mut s = store(2);
        s.reconcile(&view(CENTER), CENTER);
        s.apply_identifiers(&batch(&[((8, 7), "a"), ((6, 7), "b"), ((7, 6), "c")]));
        s.admit();
        assert_eq!(s.clear(), 3);
        assert!(s.is_empty());
        assert_eq!(s.renderer().stats().live, 0);
        assert_eq!(s.scheduler().in_flight_len(), 0);
    }
}
