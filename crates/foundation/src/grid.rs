//! Mapping between continuous world coordinates and the discrete cell grid.
//!
//! Everything here is pure. The plane is conceptually unbounded, so
//! coordinates are plain `i64` and no saturation is attempted.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;

use crate::math::Vec2;

pub const DEFAULT_CELL_SIZE: f64 = 400.0;

/// Integer address of one fixed-size square of the grid.
///
/// Ordering is `(gx, gy)`, which gives every ordered collection of keys a
/// stable iteration order.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub gx: i64,
    pub gy: i64,
}

impl CellKey {
    pub const fn new(gx: i64, gy: i64) -> Self {
        Self { gx, gy }
    }
}

/// Canonical string form: `"gx,gy"`.
impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.gx, self.gy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCellKeyError {
    pub input: String,
}

impl fmt::Display for ParseCellKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell key {:?}, expected \"gx,gy\"", self.input)
    }
}

impl std::error::Error for ParseCellKeyError {}

impl FromStr for CellKey {
    type Err = ParseCellKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellKeyError {
            input: s.to_string(),
        };
        let (gx, gy) = s.split_once(',').ok_or_else(err)?;
        let gx = gx.trim().parse::<i64>().map_err(|_| err())?;
        let gy = gy.trim().parse::<i64>().map_err(|_| err())?;
        Ok(CellKey::new(gx, gy))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridMapper {
    cell_size: f64,
}

impl Default for GridMapper {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl GridMapper {
    /// `cell_size` must be positive; configuration validates this upstream.
    pub fn new(cell_size: f64) -> Self {
        Self { cell_size }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn world_to_cell(&self, x: f64, y: f64) -> CellKey {
        CellKey::new(
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// Square neighbourhood of side `2 * radius + 1` around the cell that
    /// contains `center`.
    pub fn visible_cells(&self, center: Vec2, radius: u32) -> BTreeSet<CellKey> {
        let c = self.world_to_cell(center.x, center.y);
        let r = i64::from(radius);
        let mut out = BTreeSet::new();
        for gx in c.gx - r..=c.gx + r {
            for gy in c.gy - r..=c.gy + r {
                out.insert(CellKey::new(gx, gy));
            }
        }
        out
    }

    pub fn cell_world_origin(&self, key: CellKey) -> Vec2 {
        Vec2::new(
            key.gx as f64 * self.cell_size,
            key.gy as f64 * self.cell_size,
        )
    }

    pub fn cell_world_center(&self, key: CellKey) -> Vec2 {
        let half = self.cell_size / 2.0;
        self.cell_world_origin(key) + Vec2::new(half, half)
    }
}
