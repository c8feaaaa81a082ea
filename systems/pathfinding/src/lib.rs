#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! A* route planning over the shared tile occupancy map.
//!
//! Searches are four-directional with a uniform step cost and a Manhattan
//! heuristic. The goal cell is always treated as enterable so a mover can
//! plan onto a tile somebody else is about to leave; the movement executor
//! re-checks every step before taking it. A search that exhausts its
//! expansion budget reports no route rather than spending unbounded time on
//! enclosed or oversized maps.

use townwalk_core::CellCoord;
use townwalk_world::TileOccupancyMap;
use tracing::{debug, trace};

/// Expansion budget applied by [`PathFinder::default`].
pub const DEFAULT_MAX_EXPANSIONS: usize = 2_000;

/// Ring radius searched by [`RouteFallback::default_nearest`].
pub const DEFAULT_FALLBACK_RADIUS: u32 = 5;

/// Ordered cell sequence from a search's start to its goal, both inclusive.
///
/// An empty path means "no route" or "already there"; callers treat it as a
/// no-op rather than an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Path that contains no cells.
    #[must_use]
    pub const fn empty() -> Self {
        Self { cells: Vec::new() }
    }

    /// Cells of the path in travel order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of cells contained in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the path contains no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First cell of the path, which equals the search start.
    #[must_use]
    pub fn first(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Last cell of the path, which equals the search goal.
    #[must_use]
    pub fn last(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Consumes the path, yielding its cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<CellCoord> {
        self.cells
    }
}

/// What a caller does when the direct search toward its goal fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RouteFallback {
    /// Accept the empty result.
    #[default]
    None,
    /// Retry once against the nearest walkable cell around the goal.
    NearestWalkable {
        /// Largest ring radius inspected around the goal.
        radius: u32,
    },
}

impl RouteFallback {
    /// Nearest-walkable fallback using [`DEFAULT_FALLBACK_RADIUS`].
    #[must_use]
    pub const fn default_nearest() -> Self {
        Self::NearestWalkable {
            radius: DEFAULT_FALLBACK_RADIUS,
        }
    }
}

/// Outcome of [`PathFinder::plan`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    path: Path,
    requested: CellCoord,
    goal: CellCoord,
}

impl Route {
    /// Cells to walk, inclusive of the start cell.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Goal originally asked for.
    #[must_use]
    pub const fn requested(&self) -> CellCoord {
        self.requested
    }

    /// Goal the path leads to; a substitute when the fallback kicked in.
    #[must_use]
    pub const fn goal(&self) -> CellCoord {
        self.goal
    }

    /// Reports whether the goal was replaced by a nearest-walkable substitute.
    #[must_use]
    pub fn is_substitute(&self) -> bool {
        self.goal != self.requested
    }

    /// Consumes the route, yielding the path and the goal it leads to.
    #[must_use]
    pub fn into_parts(self) -> (Path, CellCoord) {
        (self.path, self.goal)
    }
}

/// Stateless A* planner with a bounded expansion budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathFinder {
    max_expansions: usize,
}

impl Default for PathFinder {
    fn default() -> Self {
        Self {
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

impl PathFinder {
    /// Creates a planner that gives up after `max_expansions` node expansions.
    #[must_use]
    pub const fn with_max_expansions(max_expansions: usize) -> Self {
        Self { max_expansions }
    }

    /// Maximum number of node expansions attempted per search.
    #[must_use]
    pub const fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    /// Searches for a route from `start` to `goal`.
    ///
    /// Returns an empty path when `start == goal`, when either end lies
    /// outside the grid, when no route exists, or when the expansion budget
    /// runs out.
    #[must_use]
    pub fn find_path(&self, map: &TileOccupancyMap, start: CellCoord, goal: CellCoord) -> Path {
        if start == goal {
            return Path::empty();
        }

        let (columns, rows) = map.dimensions();
        let (Some(start_index), Some(goal_index)) = (
            cell_index(columns, rows, start),
            cell_index(columns, rows, goal),
        ) else {
            trace!(?start, ?goal, "search endpoint outside the grid");
            return Path::empty();
        };

        let node_count = columns as usize * rows as usize;
        let mut closed = vec![false; node_count];
        let mut parent: Vec<Option<usize>> = vec![None; node_count];
        let mut open = vec![SearchNode::new(start, 0, start.manhattan_distance(goal))];
        let mut expansions = 0usize;

        while !open.is_empty() {
            if expansions >= self.max_expansions {
                debug!(
                    ?start,
                    ?goal,
                    expansions,
                    "search exhausted its expansion budget"
                );
                return Path::empty();
            }

            let current = open.remove(lowest_cost_index(&open));
            expansions += 1;

            let Some(current_index) = cell_index(columns, rows, current.cell) else {
                continue;
            };
            if current_index == goal_index {
                trace!(?start, ?goal, expansions, cost = current.g, "route found");
                return reconstruct(&parent, columns, start_index, goal_index);
            }
            closed[current_index] = true;

            for neighbor in current.cell.neighbors() {
                let Some(neighbor_index) = cell_index(columns, rows, neighbor) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }
                if neighbor != goal && !map.is_walkable(neighbor) {
                    continue;
                }

                let tentative_g = current.g.saturating_add(1);
                if let Some(existing) = open.iter_mut().find(|node| node.cell == neighbor) {
                    if existing.g <= tentative_g {
                        continue;
                    }
                    existing.reprice(tentative_g);
                } else {
                    open.push(SearchNode::new(
                        neighbor,
                        tentative_g,
                        neighbor.manhattan_distance(goal),
                    ));
                }
                parent[neighbor_index] = Some(current_index);
            }
        }

        trace!(?start, ?goal, expansions, "no route");
        Path::empty()
    }

    /// Finds the walkable cell nearest to `goal` within `max_radius` rings.
    ///
    /// Rings are square (Chebyshev) shells around the goal inspected from the
    /// inside out; within the first ring holding a walkable cell the one with
    /// the smallest Manhattan distance to the goal wins. The goal itself is
    /// never returned.
    #[must_use]
    pub fn nearest_walkable(
        &self,
        map: &TileOccupancyMap,
        goal: CellCoord,
        max_radius: u32,
    ) -> Option<CellCoord> {
        let max_radius = i32::try_from(max_radius).unwrap_or(i32::MAX);
        for radius in 1..=max_radius {
            let mut best: Option<(u32, CellCoord)> = None;
            for cell in ring(goal, radius) {
                if !map.is_walkable(cell) {
                    continue;
                }

                let distance = cell.manhattan_distance(goal);
                if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                    best = Some((distance, cell));
                }
            }

            if let Some((_, cell)) = best {
                return Some(cell);
            }
        }

        None
    }

    /// Searches toward `goal`, applying `fallback` when no direct route exists.
    #[must_use]
    pub fn plan(
        &self,
        map: &TileOccupancyMap,
        start: CellCoord,
        goal: CellCoord,
        fallback: RouteFallback,
    ) -> Route {
        let path = self.find_path(map, start, goal);
        if !path.is_empty() || start == goal {
            return Route {
                path,
                requested: goal,
                goal,
            };
        }

        let RouteFallback::NearestWalkable { radius } = fallback else {
            return Route {
                path,
                requested: goal,
                goal,
            };
        };

        let Some(substitute) = self.nearest_walkable(map, goal, radius) else {
            debug!(?goal, radius, "no walkable cell near unreachable goal");
            return Route {
                path,
                requested: goal,
                goal,
            };
        };

        debug!(?goal, ?substitute, "retrying search toward nearest walkable cell");
        Route {
            path: self.find_path(map, start, substitute),
            requested: goal,
            goal: substitute,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    cell: CellCoord,
    g: u32,
    h: u32,
    f: u32,
}

impl SearchNode {
    fn new(cell: CellCoord, g: u32, h: u32) -> Self {
        Self {
            cell,
            g,
            h,
            f: g.saturating_add(h),
        }
    }

    fn reprice(&mut self, g: u32) {
        self.g = g;
        self.f = g.saturating_add(self.h);
    }
}

/// Index of the first open node carrying the lowest `f`.
fn lowest_cost_index(open: &[SearchNode]) -> usize {
    let mut best_index = 0usize;
    for (index, node) in open.iter().enumerate().skip(1) {
        if node.f < open[best_index].f {
            best_index = index;
        }
    }
    best_index
}

fn reconstruct(
    parent: &[Option<usize>],
    columns: u32,
    start_index: usize,
    goal_index: usize,
) -> Path {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];
    while cursor != start_index {
        let Some(next) = parent.get(cursor).copied().flatten() else {
            return Path::empty();
        };
        cursor = next;
        indices.push(cursor);
    }
    indices.reverse();

    let width = columns.max(1) as usize;
    Path {
        cells: indices
            .into_iter()
            .map(|index| CellCoord::new((index % width) as i32, (index / width) as i32))
            .collect(),
    }
}

fn cell_index(columns: u32, rows: u32, cell: CellCoord) -> Option<usize> {
    let column = u32::try_from(cell.column()).ok()?;
    let row = u32::try_from(cell.row()).ok()?;
    if column >= columns || row >= rows {
        return None;
    }

    let width = usize::try_from(columns).ok()?;
    usize::try_from(row)
        .ok()?
        .checked_mul(width)?
        .checked_add(usize::try_from(column).ok()?)
}

/// Cells at exactly `radius` Chebyshev distance from `center`, row by row.
fn ring(center: CellCoord, radius: i32) -> impl Iterator<Item = CellCoord> {
    (-radius..=radius).flat_map(move |row_offset| {
        (-radius..=radius).filter_map(move |column_offset| {
            if row_offset.abs() != radius && column_offset.abs() != radius {
                return None;
            }
            Some(CellCoord::new(
                center.column().saturating_add(column_offset),
                center.row().saturating_add(row_offset),
            ))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use townwalk_world::TileLayout;

    #[test]
    fn ring_enumerates_square_shell() {
        let center = CellCoord::new(5, 5);
        let cells: Vec<_> = ring(center, 1).collect();
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|cell| cell.chebyshev_distance(center) == 1));

        let outer: Vec<_> = ring(center, 2).collect();
        assert_eq!(outer.len(), 16);
    }

    #[test]
    fn lowest_cost_prefers_earliest_tie() {
        let open = [
            SearchNode::new(CellCoord::new(0, 0), 2, 3),
            SearchNode::new(CellCoord::new(1, 0), 1, 3),
            SearchNode::new(CellCoord::new(2, 0), 3, 1),
        ];
        assert_eq!(lowest_cost_index(&open), 1);
    }

    #[test]
    fn cell_index_rejects_out_of_bounds() {
        assert_eq!(cell_index(3, 2, CellCoord::new(2, 1)), Some(5));
        assert_eq!(cell_index(3, 2, CellCoord::new(3, 0)), None);
        assert_eq!(cell_index(3, 2, CellCoord::new(0, -1)), None);
    }

    #[test]
    fn nearest_walkable_prefers_orthogonal_neighbors() {
        let layout = TileLayout::parse(
            "
            .....
            ..#..
            .#.#.
            ..#..
            .....
            ",
        )
        .expect("layout parses");
        let map = TileOccupancyMap::new(layout);
        let finder = PathFinder::default();

        let goal = CellCoord::new(2, 2);
        let nearest = finder
            .nearest_walkable(&map, goal, 3)
            .expect("diagonal ring cells are walkable");
        assert_eq!(nearest.chebyshev_distance(goal), 1);
        assert_eq!(nearest.manhattan_distance(goal), 2);
    }

    #[test]
    fn plan_without_fallback_keeps_requested_goal() {
        let layout = TileLayout::parse(
            "
            ...
            ###
            ...
            ",
        )
        .expect("layout parses");
        let map = TileOccupancyMap::new(layout);
        let finder = PathFinder::default();

        let route = finder.plan(
            &map,
            CellCoord::new(0, 0),
            CellCoord::new(2, 2),
            RouteFallback::None,
        );
        assert!(route.path().is_empty());
        assert_eq!(route.goal(), CellCoord::new(2, 2));
        assert!(!route.is_substitute());
    }
}
