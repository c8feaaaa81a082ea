#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared tile occupancy for every mover walking the town grid.
//!
//! The map separates permanent obstacles derived from the [`TileLayout`] from
//! transient claims made by movers standing on a cell. Both are stored in one
//! blocked grid; a release consults the layout again so that a bookkeeping
//! slip can never open up a wall.

mod layout;

pub use layout::{LayoutError, TileLayout};

use townwalk_core::CellCoord;
use tracing::warn;

/// Mutable set of blocked cells shared by all movers.
#[derive(Clone, Debug)]
pub struct TileOccupancyMap {
    layout: TileLayout,
    blocked: Vec<bool>,
}

impl TileOccupancyMap {
    /// Creates an occupancy map whose static blocks mirror the layout.
    #[must_use]
    pub fn new(layout: TileLayout) -> Self {
        let (columns, rows) = layout.dimensions();
        let mut blocked = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(column as i32, row as i32);
                blocked.push(!layout.is_tile_walkable(cell));
            }
        }

        Self { layout, blocked }
    }

    /// Static geometry backing the map.
    #[must_use]
    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    /// Provides the dimensions of the map as `(columns, rows)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.layout.dimensions()
    }

    /// Reports whether a mover may enter the cell right now.
    ///
    /// Cells outside the grid are never walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.layout
            .index(cell)
            .and_then(|index| self.blocked.get(index))
            .map_or(false, |blocked| !blocked)
    }

    /// Reports whether the cell is a permanent obstacle or lies off the grid.
    #[must_use]
    pub fn is_static_obstacle(&self, cell: CellCoord) -> bool {
        !self.layout.is_tile_walkable(cell)
    }

    /// Reports whether a mover currently claims the cell.
    #[must_use]
    pub fn is_claimed(&self, cell: CellCoord) -> bool {
        !self.is_static_obstacle(cell) && !self.is_walkable(cell)
    }

    /// Marks the cell as occupied. Claiming twice has no further effect.
    pub fn claim(&mut self, cell: CellCoord) {
        if let Some(slot) = self
            .layout
            .index(cell)
            .and_then(|index| self.blocked.get_mut(index))
        {
            *slot = true;
        }
    }

    /// Clears a claim unless the layout marks the cell as a static obstacle.
    pub fn release(&mut self, cell: CellCoord) {
        if self.layout.is_tile_walkable(cell) {
            let Some(slot) = self
                .layout
                .index(cell)
                .and_then(|index| self.blocked.get_mut(index))
            else {
                return;
            };

            if !*slot {
                warn!(
                    column = cell.column(),
                    row = cell.row(),
                    "released a cell that was not claimed"
                );
            }
            *slot = false;
        }
    }

    /// Iterates the cells currently claimed by movers in row-major order.
    pub fn claimed_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let (columns, _) = self.dimensions();
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, blocked)| **blocked)
            .map(move |(index, _)| {
                let columns = columns.max(1) as usize;
                CellCoord::new((index % columns) as i32, (index / columns) as i32)
            })
            .filter(|cell| self.layout.is_tile_walkable(*cell))
    }
}
