use std::fmt;

use foundation::grid::CellKey;
use foundation::math::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque identifier the identifier source assigns to a cell's content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifies one admitted load.
///
/// Tickets are never reused, so a completion arriving for a load that was
/// cancelled (or replaced) is recognisable as stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// Request to load `content_id` into `cell`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub content_id: ContentId,
    pub cell: CellKey,
    /// Higher loads first. Distance-based requests are `<= 0`.
    pub priority: f64,
}

impl LoadRequest {
    pub fn new(content_id: ContentId, cell: CellKey, priority: f64) -> Self {
        Self {
            content_id,
            cell,
            priority,
        }
    }

    pub fn by_distance(
        content_id: ContentId,
        cell: CellKey,
        cell_center: Vec2,
        viewport_center: Vec2,
    ) -> Self {
        Self::new(
            content_id,
            cell,
            distance_priority(cell_center, viewport_center),
        )
    }
}

/// Negative Euclidean distance: closer cells get the larger value.
pub fn distance_priority(cell_center: Vec2, viewport_center: Vec2) -> f64 {
    -cell_center.distance(viewport_center)
}

#[cfg(test)]
mod tests {
    use super::{ContentId, LoadRequest, distance_priority};
    use foundation::grid::CellKey;
    use foundation::math::Vec2;

    #[test]
    fn closer_cells_have_higher_priority() {
        let center = Vec2::new(3000.0, 3000.0);
        let near = distance_priority(Vec2::new(3000.0, 3000.0), center);
        let far = distance_priority(Vec2::new(3400.0, 3300.0), center);
        assert_eq!(near, 0.0);
        assert_eq!(far, -500.0);
        assert!(near > far);
    }

    #[test]
    fn by_distance_uses_cell_center() {
        let req = LoadRequest::by_distance(
            ContentId::from("abc"),
            CellKey::new(8, 7),
            Vec2::new(3400.0, 3000.0),
            Vec2::new(3000.0, 3000.0),
        );
        assert_eq!(req.priority, -400.0);
        assert_eq!(req.content_id.as_str(), "abc");
    }
}
