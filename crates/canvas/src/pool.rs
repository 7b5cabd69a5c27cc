//! Drawable objects backing cells, recycled through a pool.
//!
//! Drawables live in a generational arena. Releasing one clears its layers
//! (keeping their allocation) and parks it on a spare list for the next
//! acquire; the released `DrawableId` stops resolving at the same moment, so
//! a handle kept around by mistake can never reach the recycled object.

use std::sync::Arc;

use foundation::arena::Arena;
use foundation::grid::{CellKey, GridMapper};
use foundation::handles::Handle;
use foundation::math::Vec2;
use serde::{Deserialize, Serialize};
use streaming::fetch::Texture;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DrawableId(Handle);

/// Static navigation link shown on the origin cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

impl NavLink {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Background,
    Title(String),
    Link(NavLink),
    Image(Arc<Texture>),
    ErrorTile,
    /// Dwell progress in `[0, 1]`.
    Border { progress: f32 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DrawableKind {
    #[default]
    Placeholder,
    Origin,
    Image,
    Error,
}

#[derive(Debug, Default)]
pub struct Drawable {
    pub cell: CellKey,
    /// World-space top-left corner.
    pub position: Vec2,
    pub size: f64,
    pub kind: DrawableKind,
    layers: Vec<Layer>,
}

impl Drawable {
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.layers.iter().find_map(|l| match l {
            Layer::Image(t) => Some(t),
            _ => None,
        })
    }

    pub fn border_progress(&self) -> Option<f32> {
        self.layers.iter().find_map(|l| match l {
            Layer::Border { progress } => Some(*progress),
            _ => None,
        })
    }

    fn clear(&mut self) {
        self.layers.clear();
        self.kind = DrawableKind::Placeholder;
    }
}

/// Title and links for the origin cell, resolved at mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginContent {
    pub title: String,
    pub links: Vec<NavLink>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Drawables created from scratch.
    pub allocated: u64,
    /// Acquisitions served from the spare list.
    pub reused: u64,
    pub live: usize,
    pub spare: usize,
}

#[derive(Debug)]
pub struct Renderer {
    grid: GridMapper,
    origin: OriginContent,
    live: Arena<Drawable>,
    spare: Vec<Drawable>,
    allocated: u64,
    reused: u64,
}

impl Renderer {
    pub fn new(grid: GridMapper, origin: OriginContent) -> Self {
        Self {
            grid,
            origin,
            live: Arena::new(),
            spare: Vec::new(),
            allocated: 0,
            reused: 0,
        }
    }

    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.live.get(id.0)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated,
            reused: self.reused,
            live: self.live.len(),
            spare: self.spare.len(),
        }
    }

    fn acquire(&mut self, cell: CellKey, kind: DrawableKind, layers: &[Layer]) -> DrawableId {
        let mut drawable = match self.spare.pop() {
            Some(d) => {
                self.reused += 1;
                d
            }
            None => {
                self.allocated += 1;
                Drawable::default()
            }
        };
        drawable.cell = cell;
        drawable.position = self.grid.cell_world_origin(cell);
        drawable.size = self.grid.cell_size();
        drawable.kind = kind;
        drawable.layers.extend_from_slice(layers);
        DrawableId(self.live.insert(drawable))
    }

    pub fn acquire_placeholder(&mut self, cell: CellKey) -> DrawableId {
        self.acquire(cell, DrawableKind::Placeholder, &[Layer::Background])
    }

    pub fn acquire_origin_cell(&mut self, cell: CellKey) -> DrawableId {
        let mut layers = vec![Layer::Background, Layer::Title(self.origin.title.clone())];
        layers.extend(self.origin.links.iter().cloned().map(Layer::Link));
        self.acquire(cell, DrawableKind::Origin, &layers)
    }

    /// Swaps placeholder visuals for the image; position and size are kept.
    pub fn promote_to_image(&mut self, id: DrawableId, texture: Arc<Texture>) -> bool {
        let Some(d) = self.live.get_mut(id.0) else {
            return false;
        };
        d.layers.clear();
        d.layers.push(Layer::Image(texture));
        d.kind = DrawableKind::Image;
        true
    }

    pub fn show_error(&mut self, id: DrawableId) -> bool {
        let Some(d) = self.live.get_mut(id.0) else {
            return false;
        };
        d.layers.clear();
        d.layers.push(Layer::Background);
        d.layers.push(Layer::ErrorTile);
        d.kind = DrawableKind::Error;
        true
    }

    /// Shows (`Some`) or clears (`None`) the dwell border.
    pub fn set_border(&mut self, id: DrawableId, progress: Option<f32>) -> bool {
        let Some(d) = self.live.get_mut(id.0) else {
            return false;
        };
        d.layers.retain(|l| !matches!(l, Layer::Border { .. }));
        if let Some(progress) = progress {
            d.layers.push(Layer::Border {
                progress: progress.clamp(0.0, 1.0),
            });
        }
        true
    }

    pub fn release(&mut self, id: DrawableId) -> bool {
        let Some(mut d) = self.live.remove(id.0) else {
            return false;
        };
        d.clear();
        self.spare.push(d);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DrawableKind, Layer, NavLink, OriginContent, Renderer};
    use foundation::grid::{CellKey, GridMapper};
    use foundation::math::Vec2;
    use streaming::fetch::Texture;

    fn renderer() -> Renderer {
        Renderer::new(
            GridMapper::new(400.0),
            OriginContent {
                title: "Mosaic".to_string(),
                links: vec![NavLink::new("Log in", "/login")],
            },
        )
    }

    fn texture() -> Arc<Texture> {
        Arc::new(Texture {
            width: 1,
            height: 1,
            rgba: Arc::from(vec![0u8, 0, 0, 255]),
        })
    }

    #[test]
    fn placeholder_is_positioned_at_cell_origin() {
        let mut r = renderer();
        let id = r.acquire_placeholder(CellKey::new(8, -1));
        let d = r.get(id).unwrap();
        assert_eq!(d.position, Vec2::new(3200.0, -400.0));
        assert_eq!(d.size, 400.0);
        assert_eq!(d.kind, DrawableKind::Placeholder);
        assert_eq!(d.layers(), &[Layer::Background]);
    }

    #[test]
    fn origin_cell_shows_title_and_links() {
        let mut r = renderer();
        let id = r.acquire_origin_cell(CellKey::new(7, 7));
        let d = r.get(id).unwrap();
        assert_eq!(d.kind, DrawableKind::Origin);
        assert!(d.layers().contains(&Layer::Title("Mosaic".to_string())));
        assert!(d.layers().contains(&Layer::Link(NavLink::new("Log in", "/login"))));
    }

    #[test]
    fn promote_keeps_position_and_replaces_visuals() {
        let mut r = renderer();
        let id = r.acquire_placeholder(CellKey::new(1, 2));
        let tex = texture();
        assert!(r.promote_to_image(id, tex.clone()));
        let d = r.get(id).unwrap();
        assert_eq!(d.position, Vec2::new(400.0, 800.0));
        assert_eq!(d.kind, DrawableKind::Image);
        assert!(Arc::ptr_eq(d.texture().unwrap(), &tex));
    }

    #[test]
    fn border_is_set_and_cleared() {
        let mut r = renderer();
        let id = r.acquire_placeholder(CellKey::new(0, 0));
        r.promote_to_image(id, texture());
        r.set_border(id, Some(0.25));
        r.set_border(id, Some(0.5));
        assert_eq!(r.get(id).unwrap().border_progress(), Some(0.5));
        r.set_border(id, None);
        assert_eq!(r.get(id).unwrap().border_progress(), None);
        assert!(r.get(id).unwrap().texture().is_some());
    }

    #[test]
    fn released_drawables_are_reused_and_old_ids_go_stale() {
        let mut r = renderer();
        let a = r.acquire_placeholder(CellKey::new(0, 0));
        r.show_error(a);
        assert!(r.release(a));
        assert!(!r.release(a));
        assert!(r.get(a).is_none());
        assert!(!r.promote_to_image(a, texture()));

        let b = r.acquire_placeholder(CellKey::new(5, 5));
        let d = r.get(b).unwrap();
        assert_eq!(d.layers(), &[Layer::Background]);
        assert_eq!(d.kind, DrawableKind::Placeholder);

        let stats = r.stats();
        assert_eq!((stats.allocated, stats.reused, stats.live, stats.spare), (1, 1, 1, 0));
    }
}
