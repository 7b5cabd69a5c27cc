use foundation::math::Vec2;
use foundation::time::Millis;
use runtime::throttle::{Debounce, Throttle};

/// What `ViewportController::poll` observed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportPoll {
    /// Trailing move coalesced by the throttle, if one became due.
    pub moved: Option<Vec2>,
    /// The viewport has been still for the settle period.
    pub settled: bool,
}

/// Owns the pannable/zoomable view onto the plane.
///
/// Every change re-arms the settle debounce. Only throttled changes are
/// reported as moves, which is what drives re-virtualization.
#[derive(Debug, Clone)]
pub struct ViewportController {
    center: Vec2,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    throttle: Throttle,
    settle: Debounce,
}

impl ViewportController {
    pub fn new(
        center: Vec2,
        zoom_range: (f64, f64),
        move_throttle_ms: u64,
        settle_debounce_ms: u64,
    ) -> Self {
        Self {
            center,
            zoom: 1.0f64.clamp(zoom_range.0, zoom_range.1),
            min_zoom: zoom_range.0,
            max_zoom: zoom_range.1,
            throttle: Throttle::new(move_throttle_ms),
            settle: Debounce::new(settle_debounce_ms),
        }
    }

    /// World position at the middle of the screen.
    pub fn visual_center(&self) -> Vec2 {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Drags the surface by a screen-space delta; the content follows the
    /// pointer, so the center moves the opposite way.
    pub fn pan_by(&mut self, dx: f64, dy: f64, now: Millis) -> Option<Vec2> {
        self.center = self.center - Vec2::new(dx, dy) * (1.0 / self.zoom);
        self.changed(now)
    }

    pub fn pan_to(&mut self, center: Vec2, now: Millis) -> Option<Vec2> {
        self.center = center;
        self.changed(now)
    }

    pub fn zoom_by(&mut self, factor: f64, now: Millis) -> Option<Vec2> {
        if !(factor.is_finite() && factor > 0.0) {
            return None;
        }
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.changed(now)
    }

    /// A throttled move is waiting for `poll`.
    pub fn has_pending_move(&self) -> bool {
        self.throttle.is_pending()
    }

    pub fn poll(&mut self, now: Millis) -> ViewportPoll {
        ViewportPoll {
            moved: self.throttle.poll(now).then_some(self.center),
            settled: self.settle.fire_due(now),
        }
    }

    fn changed(&mut self, now: Millis) -> Option<Vec2> {
        self.settle.poke(now);
        self.throttle.trigger(now).then_some(self.center)
    }
}
