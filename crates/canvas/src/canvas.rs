//! The mounted canvas: one owner for the viewport, the cell store and the
//! dwell tracker.
//!
//! `Canvas` is a synchronous state machine. Every input takes the current
//! logical time; side effects that need I/O are queued as [`Effect`]s for
//! whoever drives the canvas (see [`crate::driver`]) and their results are
//! fed back through [`Canvas::apply_identifiers`] and
//! [`Canvas::fetch_settled`].

use std::time::Duration;

use foundation::grid::{CellKey, GridMapper};
use foundation::math::Vec2;
use foundation::time::Millis;
use runtime::event_bus::EventBus;
use runtime::metrics::Metrics;
use streaming::cache::TextureCache;
use streaming::fetch::{LoadError, Texture};
use streaming::lifecycle::LoadState;
use streaming::protocol::{IdentifierBatch, IdentifierRequest};
use streaming::request::{ContentId, Ticket};
use streaming::scheduler::LoadScheduler;
use tracing::{debug, info, warn};

use crate::cells::{CellStore, Completion, FetchOrder};
use crate::config::{CanvasConfig, ConfigError};
use crate::dwell::{DwellStatus, DwellTracker};
use crate::pool::{OriginContent, Renderer};
use crate::viewport::ViewportController;

#[derive(Debug, Clone)]
pub enum Effect {
    /// Ask the identifier source for these cells' content ids.
    RequestIdentifiers(IdentifierRequest),
    Fetch(FetchOrder),
    /// A dwell committed on a loaded cell.
    Navigate { content_id: ContentId, url: String },
}

#[derive(Debug)]
pub struct Canvas {
    config: CanvasConfig,
    grid: GridMapper,
    viewport: ViewportController,
    store: CellStore,
    dwell: DwellTracker,
    effects: EventBus<Effect>,
    metrics: Metrics,
}

impl Canvas {
    /// Validates `config` and renders the initial neighbourhood around
    /// `config.initial_center`, whose cell becomes the origin cell.
    pub fn mount(
        config: CanvasConfig,
        authenticated: bool,
        now: Millis,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = GridMapper::new(config.cell_size);
        let center = config.initial_center();
        let origin = grid.world_to_cell(center.x, center.y);

        let renderer = Renderer::new(
            grid,
            OriginContent {
                title: config.origin_title.clone(),
                links: config.origin_links(authenticated).to_vec(),
            },
        );
        let store = CellStore::new(
            grid,
            origin,
            LoadScheduler::new(config.max_concurrent_loads),
            renderer,
            TextureCache::new(config.cache_high_water),
        );
        let viewport = ViewportController::new(
            center,
            (config.min_zoom, config.max_zoom),
            config.move_throttle_ms,
            config.settle_debounce_ms,
        );

        let mut canvas = Self {
            dwell: DwellTracker::new(config.dwell_ms),
            config,
            grid,
            viewport,
            store,
            effects: EventBus::new(),
            metrics: Metrics::new(),
        };
        info!(
            origin = %origin,
            cell_size = canvas.config.cell_size,
            radius = canvas.config.radius_in_cells,
            max_concurrent_loads = canvas.config.max_concurrent_loads,
            authenticated,
            "canvas mounted"
        );
        canvas.revirtualize(center, now);
        Ok(canvas)
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn origin(&self) -> CellKey {
        self.store.origin()
    }

    pub fn effects(&self) -> &EventBus<Effect> {
        &self.effects
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        self.effects.drain().into_iter().map(|e| e.payload).collect()
    }

    /// Nothing is waiting on a future `tick` to be delivered.
    pub fn is_quiescent(&self) -> bool {
        !self.viewport.has_pending_move()
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64, now: Millis) {
        if let Some(center) = self.viewport.pan_by(dx, dy, now) {
            self.revirtualize(center, now);
        }
    }

    pub fn pan_to(&mut self, center: Vec2, now: Millis) {
        if let Some(center) = self.viewport.pan_to(center, now) {
            self.revirtualize(center, now);
        }
    }

    pub fn zoom_by(&mut self, factor: f64, now: Millis) {
        if let Some(center) = self.viewport.zoom_by(factor, now) {
            self.revirtualize(center, now);
        }
    }

    /// Timer input: delivers trailing moves, runs cache eviction once the
    /// viewport settles, and advances the dwell animation.
    pub fn tick(&mut self, now: Millis) {
        let poll = self.viewport.poll(now);
        if let Some(center) = poll.moved {
            self.revirtualize(center, now);
        }
        if poll.settled {
            self.evict(now);
        }

        match self.dwell.tick(now) {
            DwellStatus::Idle => {}
            DwellStatus::Progress { cell, progress } => {
                self.store.set_border(&cell, Some(progress));
            }
            DwellStatus::Commit(cell) => {
                self.store.set_border(&cell, None);
                if let Some(content_id) = self.store.loaded_content(&cell).cloned() {
                    let url = self.config.detail_url.render(&content_id);
                    info!(cell = %cell, content_id = %content_id, url = %url, "dwell committed");
                    self.metrics.incr("dwell.commits");
                    self.effects
                        .emit(now, Effect::Navigate { content_id, url });
                }
            }
        }
    }

    /// Pointer position in world coordinates. Only `Loaded` cells start a
    /// dwell; moving anywhere else abandons the current one.
    pub fn pointer_move(&mut self, world: Vec2, now: Millis) {
        let cell = self.grid.world_to_cell(world.x, world.y);
        if self.store.loaded_content(&cell).is_none() {
            self.pointer_leave();
            return;
        }
        let previous = self.dwell.active_cell();
        if self.dwell.enter(cell, now) {
            if let Some(previous) = previous {
                self.store.set_border(&previous, None);
            }
            self.store.set_border(&cell, Some(0.0));
        }
    }

    pub fn pointer_leave(&mut self) {
        if let Some(cell) = self.dwell.leave() {
            debug!(cell = %cell, "dwell abandoned");
            self.store.set_border(&cell, None);
        }
    }

    pub fn apply_identifiers(&mut self, batch: &IdentifierBatch, now: Millis) {
        let outcome = self.store.apply_identifiers(batch);
        debug!(
            entries = batch.len(),
            enqueued = outcome.enqueued,
            pending = outcome.pending,
            ignored = outcome.ignored,
            "identifier batch applied"
        );
        self.admit(now);
    }

    pub fn fetch_settled(&mut self, ticket: Ticket, result: Result<Texture, LoadError>, now: Millis) {
        let completion = self.store.complete(ticket, result);
        match &completion {
            Completion::Loaded(cell) => {
                debug!(cell = %cell, ticket = ticket.0, "cell loaded");
            }
            Completion::Failed { cell, error } => {
                warn!(cell = %cell, ticket = ticket.0, error = %error, "cell load failed");
            }
            Completion::Stale => {}
        }
        if let Some(state) = completion.load_state() {
            self.metrics.incr(state.metric_name());
        }
        self.admit(now);
    }

    /// Wall-clock time of one fetch including decode, for the `fetch.ms`
    /// histogram.
    pub fn record_fetch_time(&mut self, elapsed: Duration) {
        let ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        self.metrics.record("fetch.ms", ms);
    }

    /// Cancels all loads and releases every drawable.
    pub fn unmount(&mut self) {
        self.dwell.leave();
        let cancelled = self.store.clear();
        self.metrics.add(LoadState::Cancelled.metric_name(), cancelled as u64);
        self.metrics.set_gauge("loads.in_flight", 0);
        self.effects.drain();
        info!(cancelled, "canvas unmounted");
    }

    fn revirtualize(&mut self, center: Vec2, now: Millis) {
        let visible = self.grid.visible_cells(center, self.visible_radius());
        let r = self.store.reconcile(&visible, center);

        self.metrics.add("cells.created", r.created.len() as u64);
        self.metrics.add("cells.removed", r.removed.len() as u64);
        self.metrics.add(LoadState::Cancelled.metric_name(), r.cancelled as u64);
        if let Some(active) = self.dwell.active_cell()
            && r.removed.contains(&active)
        {
            self.dwell.leave();
        }
        if let Some(request) = r.request {
            self.metrics
                .add("identifiers.requested", request.keys.len() as u64);
            self.effects.emit(now, Effect::RequestIdentifiers(request));
        }
        self.admit(now);
    }

    /// Configured radius, widened when zoomed out so the rendered
    /// neighbourhood still covers the screen. Zooming in never shrinks it.
    fn visible_radius(&self) -> u32 {
        let base = self.config.radius_in_cells;
        let scaled = (f64::from(base) / self.viewport.zoom()).ceil() as u32;
        base.max(scaled)
    }

    fn admit(&mut self, now: Millis) {
        let report = self.store.admit();
        self.metrics.add("cache.hits", report.cache_hits.len() as u64);
        self.metrics.add(LoadState::Admitted.metric_name(), report.orders.len() as u64);
        for order in report.orders {
            self.effects.emit(now, Effect::Fetch(order));
        }
        self.metrics.set_gauge(
            "loads.in_flight",
            self.store.scheduler().in_flight_len() as i64,
        );
    }

    fn evict(&mut self, now: Millis) {
        let evicted = self.store.evict_cache();
        if !evicted.is_empty() {
            self.metrics.add("cache.evicted", evicted.len() as u64);
            info!(
                at_ms = now.0,
                evicted = evicted.len(),
                remaining = self.store.cache().len(),
                "evicted textures after viewport settled"
            );
        }
    }
}
