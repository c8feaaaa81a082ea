#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Townwalk movement stack.
//!
//! This crate defines the vocabulary that connects the occupancy world, the
//! pathfinding and movement systems, and the hosts that embed them. Hosts
//! convert between world space and the tile grid through [`TileSpace`], issue
//! path-follow requests that answer with a [`MoveOrder`], and advance movers
//! once per frame, reacting to the returned [`StepOutcome`] within the same
//! tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Cardinal facing and movement directions available to movers.
///
/// Rows grow downwards, so [`Direction::South`] points toward increasing row
/// indices and increasing world-space `y`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    #[default]
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in the order neighbors are expanded by searches.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Derives a facing from a world-space delta using its dominant axis.
    ///
    /// Ties favour the horizontal axis. A zero delta yields `None`.
    #[must_use]
    pub fn from_delta(delta: Vec2) -> Option<Self> {
        if delta.x == 0.0 && delta.y == 0.0 {
            return None;
        }

        if delta.x.abs() >= delta.y.abs() {
            if delta.x > 0.0 {
                Some(Self::East)
            } else {
                Some(Self::West)
            }
        } else if delta.y > 0.0 {
            Some(Self::South)
        } else {
            Some(Self::North)
        }
    }

    /// Column and row offsets travelled by a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Unique identifier assigned to a mover by its host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoverId(u32);

impl MoverId {
    /// Creates a new mover identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so that conversions of positions left of or above
/// the grid origin stay representable; such cells are simply out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .saturating_add(self.row.abs_diff(other.row))
    }

    /// Computes the Chebyshev (ring) distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }

    /// Cell reached by taking one step in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction) -> Self {
        let (column, row) = direction.offset();
        Self::new(
            self.column.saturating_add(column),
            self.row.saturating_add(row),
        )
    }

    /// The four orthogonal neighbors in [`Direction::ALL`] order.
    #[must_use]
    pub fn neighbors(self) -> [CellCoord; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }

    /// Direction of a single orthogonal step from `self` to `other`, if adjacent.
    #[must_use]
    pub fn direction_to(self, other: CellCoord) -> Option<Direction> {
        let column_diff = self.column.abs_diff(other.column);
        let row_diff = self.row.abs_diff(other.row);
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if other.column > self.column {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if other.row > self.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Conversion between continuous world positions and grid cells.
///
/// Hosts supply an implementation matching their tilemap; the movement stack
/// only ever asks for whole cells and cell centers.
pub trait TileSpace {
    /// Cell containing the provided world-space position.
    fn world_to_tile(&self, position: Vec2) -> CellCoord;

    /// World-space center of the provided cell.
    fn tile_to_world(&self, cell: CellCoord) -> Vec2;
}

/// Square tile grid anchored at a world-space origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    origin: Vec2,
    tile_length: f32,
}

impl GridGeometry {
    /// Creates a geometry whose cell `(0, 0)` starts at `origin`.
    ///
    /// Non-positive tile lengths are clamped to one world unit so conversions
    /// never divide by zero.
    #[must_use]
    pub fn new(origin: Vec2, tile_length: f32) -> Self {
        let tile_length = if tile_length > 0.0 { tile_length } else { 1.0 };
        Self {
            origin,
            tile_length,
        }
    }

    /// World-space position of the upper-left corner of cell `(0, 0)`.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Side length of a single square tile expressed in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }
}

impl TileSpace for GridGeometry {
    fn world_to_tile(&self, position: Vec2) -> CellCoord {
        let local = (position - self.origin) / self.tile_length;
        CellCoord::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    fn tile_to_world(&self, cell: CellCoord) -> Vec2 {
        let corner = Vec2::new(cell.column() as f32, cell.row() as f32) * self.tile_length;
        self.origin + corner + Vec2::splat(self.tile_length * 0.5)
    }
}

/// Immediate answer to a path-follow request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOrder {
    /// A route was found and the mover queued the provided number of steps.
    Started {
        /// Number of cells the mover will step through.
        steps: usize,
        /// Destination actually pursued; differs from the request when a
        /// nearest-walkable substitute was chosen.
        goal: CellCoord,
    },
    /// The mover already stands on the requested cell; no motion follows.
    Arrived,
    /// No route exists right now; the mover is left idle.
    Unreachable,
}

/// Result of advancing a mover by one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing queued and nothing in flight.
    Idle,
    /// The mover is translating or about to begin its next step.
    Moving,
    /// The final cell of the active path was reached during this frame.
    ///
    /// Reported exactly once per completed path.
    Arrived,
    /// The next queued cell became blocked and a fresh route was planned.
    Replanning,
    /// The next queued cell became blocked and no alternative route exists.
    Stalled,
}
