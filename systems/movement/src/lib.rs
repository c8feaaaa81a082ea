#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-driven movement executor shared by every kind of mover.
//!
//! A [`Mover`] consumes a planned cell path one step at a time. Before each
//! step it re-checks that the next cell is still free, claims it, releases the
//! cell it is leaving, and then translates its continuous world position
//! toward the new cell's center over the following frames. A step that turns
//! out to be blocked triggers a fresh search toward the retained destination;
//! that replan is the only collision-avoidance mechanism in the stack.
//!
//! The occupancy map is passed into every operation explicitly so that many
//! movers can share it without any global state.

use std::collections::VecDeque;

use glam::Vec2;
use townwalk_core::{CellCoord, Direction, MoveOrder, MoverId, StepOutcome, TileSpace};
use townwalk_system_pathfinding::{PathFinder, RouteFallback};
use townwalk_world::TileOccupancyMap;
use tracing::{debug, trace};

/// Remaining distance below which a translating mover snaps onto its target.
pub const ARRIVAL_EPSILON: f32 = 0.01;

/// Replans tolerated without a successful step before a mover gives up.
pub const DEFAULT_MAX_REPLANS: u32 = 8;

/// Movement speed applied by [`MoverConfig::default`], in world units per second.
pub const DEFAULT_SPEED: f32 = 64.0;

/// Tunables fixed for the lifetime of a mover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoverConfig {
    /// Translation speed in world units per second.
    pub speed: f32,
    /// Policy applied when the direct search toward a destination fails.
    pub fallback: RouteFallback,
    /// Consecutive replans allowed before the mover stalls.
    pub max_replans: u32,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            fallback: RouteFallback::None,
            max_replans: DEFAULT_MAX_REPLANS,
        }
    }
}

/// Coarse state of the executor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoverState {
    /// No path queued and no translation in flight.
    #[default]
    Idle,
    /// Translating toward the center of the current step's cell.
    Advancing,
    /// The queued path was blocked and has just been replaced.
    Replanning,
}

/// Per-mover path executor.
#[derive(Clone, Debug)]
pub struct Mover {
    id: MoverId,
    cell: CellCoord,
    position: Vec2,
    target: Option<Vec2>,
    path: VecDeque<CellCoord>,
    destination: Option<CellCoord>,
    facing: Direction,
    state: MoverState,
    replans: u32,
    config: MoverConfig,
}

impl Mover {
    /// Spawns a mover at the cell containing `position`, snapped to its center.
    ///
    /// The starting cell is claimed immediately.
    pub fn spawn<S>(
        id: MoverId,
        map: &mut TileOccupancyMap,
        space: &S,
        position: Vec2,
        config: MoverConfig,
    ) -> Self
    where
        S: TileSpace + ?Sized,
    {
        let cell = space.world_to_tile(position);
        map.claim(cell);
        trace!(mover = id.get(), ?cell, "mover spawned");

        Self {
            id,
            cell,
            position: space.tile_to_world(cell),
            target: None,
            path: VecDeque::new(),
            destination: None,
            facing: Direction::default(),
            state: MoverState::Idle,
            replans: 0,
            config,
        }
    }

    /// Identifier assigned by the host.
    #[must_use]
    pub const fn id(&self) -> MoverId {
        self.id
    }

    /// Cell the mover occupies, including a cell it is still translating into.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Continuous world-space position.
    #[must_use]
    pub const fn world_position(&self) -> Vec2 {
        self.position
    }

    /// Reports whether the mover is translating between cells.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Direction the mover currently faces.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Destination retained for replanning, if a path is active.
    #[must_use]
    pub const fn destination(&self) -> Option<CellCoord> {
        self.destination
    }

    /// Coarse executor state.
    #[must_use]
    pub const fn state(&self) -> MoverState {
        self.state
    }

    /// Tunables the mover was spawned with.
    #[must_use]
    pub const fn config(&self) -> &MoverConfig {
        &self.config
    }

    /// Cells still queued, excluding any step already in flight.
    pub fn remaining_path(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.path.iter().copied()
    }

    /// Turns the mover to face `direction` without moving it.
    pub fn face(&mut self, direction: Direction) {
        self.facing = direction;
    }

    /// Starts following a path toward `target`, replacing any queued path.
    ///
    /// A translation already in flight finishes smoothly before the new path
    /// takes over. Requesting the current cell answers [`MoveOrder::Arrived`]
    /// without motion; no later update reports arrival for that request.
    pub fn move_to(
        &mut self,
        map: &TileOccupancyMap,
        pathfinder: &PathFinder,
        target: CellCoord,
    ) -> MoveOrder {
        self.path.clear();
        self.destination = None;
        self.replans = 0;
        self.settle_state();

        if target == self.cell {
            trace!(mover = self.id.get(), ?target, "already at destination");
            return MoveOrder::Arrived;
        }

        let route = pathfinder.plan(map, self.cell, target, self.config.fallback);
        let (path, goal) = route.into_parts();
        if goal == self.cell {
            trace!(mover = self.id.get(), ?target, "closest reachable cell is current cell");
            return MoveOrder::Arrived;
        }
        if path.is_empty() {
            debug!(mover = self.id.get(), from = ?self.cell, ?target, "destination unreachable");
            return MoveOrder::Unreachable;
        }

        self.path = self.queue_from(path.into_cells());
        self.destination = Some(target);
        self.settle_state();
        debug!(
            mover = self.id.get(),
            from = ?self.cell,
            ?target,
            ?goal,
            steps = self.path.len(),
            "path assigned"
        );

        MoveOrder::Started {
            steps: self.path.len(),
            goal,
        }
    }

    /// Starts following a path toward the cell containing a world position.
    pub fn move_to_world_position<S>(
        &mut self,
        map: &TileOccupancyMap,
        pathfinder: &PathFinder,
        space: &S,
        position: Vec2,
    ) -> MoveOrder
    where
        S: TileSpace + ?Sized,
    {
        let target = space.world_to_tile(position);
        self.move_to(map, pathfinder, target)
    }

    /// Drops the queued path and halts translation. Occupancy is untouched.
    pub fn stop(&mut self) {
        self.path.clear();
        self.destination = None;
        self.target = None;
        self.replans = 0;
        self.state = MoverState::Idle;
    }

    /// Advances the mover by `dt` seconds.
    pub fn update<S>(
        &mut self,
        dt: f32,
        map: &mut TileOccupancyMap,
        pathfinder: &PathFinder,
        space: &S,
    ) -> StepOutcome
    where
        S: TileSpace + ?Sized,
    {
        if self.target.is_none() {
            let Some(next) = self.path.front().copied() else {
                self.state = MoverState::Idle;
                return StepOutcome::Idle;
            };

            if !map.is_walkable(next) || self.cell.direction_to(next).is_none() {
                return self.replan(map, pathfinder);
            }

            let _ = self.path.pop_front();
            map.claim(next);
            map.release(self.cell);
            trace!(mover = self.id.get(), from = ?self.cell, to = ?next, "step started");
            self.cell = next;
            self.target = Some(space.tile_to_world(next));
            self.replans = 0;
            self.state = MoverState::Advancing;
        }

        self.translate(dt)
    }

    /// Releases the mover's cell as it leaves the grid for good.
    pub fn despawn(self, map: &mut TileOccupancyMap) {
        map.release(self.cell);
        trace!(mover = self.id.get(), cell = ?self.cell, "mover despawned");
    }

    fn translate(&mut self, dt: f32) -> StepOutcome {
        let Some(target) = self.target else {
            return StepOutcome::Idle;
        };

        let delta = target - self.position;
        if let Some(facing) = Direction::from_delta(delta) {
            self.facing = facing;
        }

        let distance = delta.length();
        let travel = (self.config.speed * dt.max(0.0)).min(distance);
        if distance > 0.0 {
            self.position += delta / distance * travel;
        }

        if distance - travel >= ARRIVAL_EPSILON {
            return StepOutcome::Moving;
        }

        self.position = target;
        self.target = None;
        if !self.path.is_empty() {
            return StepOutcome::Moving;
        }

        self.state = MoverState::Idle;
        match self.destination.take() {
            Some(destination) => {
                debug!(mover = self.id.get(), ?destination, cell = ?self.cell, "arrived");
                StepOutcome::Arrived
            }
            None => StepOutcome::Idle,
        }
    }

    fn replan(&mut self, map: &mut TileOccupancyMap, pathfinder: &PathFinder) -> StepOutcome {
        self.path.clear();
        map.claim(self.cell);

        let Some(destination) = self.destination else {
            debug!(mover = self.id.get(), cell = ?self.cell, "next step blocked, stopping");
            self.state = MoverState::Idle;
            return StepOutcome::Stalled;
        };

        if self.replans >= self.config.max_replans {
            debug!(
                mover = self.id.get(),
                cell = ?self.cell,
                ?destination,
                replans = self.replans,
                "giving up after repeated replans"
            );
            self.destination = None;
            self.state = MoverState::Idle;
            return StepOutcome::Stalled;
        }
        self.replans += 1;

        let (path, goal) = pathfinder
            .plan(map, self.cell, destination, self.config.fallback)
            .into_parts();
        if goal == self.cell {
            self.destination = None;
            self.state = MoverState::Idle;
            return StepOutcome::Arrived;
        }
        if path.is_empty() {
            debug!(mover = self.id.get(), cell = ?self.cell, ?destination, "no route after blocked step");
            self.destination = None;
            self.state = MoverState::Idle;
            return StepOutcome::Stalled;
        }

        self.path = self.queue_from(path.into_cells());
        self.state = MoverState::Replanning;
        debug!(
            mover = self.id.get(),
            cell = ?self.cell,
            ?destination,
            steps = self.path.len(),
            attempt = self.replans,
            "replanned around blocked step"
        );
        StepOutcome::Replanning
    }

    /// Converts a search result into a step queue, dropping the start cell.
    fn queue_from(&self, cells: Vec<CellCoord>) -> VecDeque<CellCoord> {
        let mut queue: VecDeque<CellCoord> = cells.into();
        if queue.front() == Some(&self.cell) {
            let _ = queue.pop_front();
        }
        queue
    }

    fn settle_state(&mut self) {
        self.state = if self.target.is_some() {
            MoverState::Advancing
        } else {
            MoverState::Idle
        };
    }
}
