#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scripted tour guide that walks a fixed list of waypoints.
//!
//! The walker reuses the shared [`Mover`] executor but plans with the direct
//! search only: when a waypoint cannot be reached it either skips ahead or
//! waits and retries, as chosen by its [`MissPolicy`].

use glam::Vec2;
use townwalk_core::{CellCoord, Direction, MoveOrder, MoverId, StepOutcome, TileSpace};
use townwalk_system_movement::{Mover, MoverConfig};
use townwalk_system_pathfinding::{PathFinder, RouteFallback};
use townwalk_world::TileOccupancyMap;
use tracing::{debug, info};

/// Single stop along a tour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    /// Cell the guide walks to.
    pub cell: CellCoord,
    /// Direction the guide turns to face on arrival.
    pub facing: Option<Direction>,
    /// Seconds spent at the stop before heading to the next one.
    pub pause: f32,
}

impl Waypoint {
    /// Waypoint without a facing change or pause.
    #[must_use]
    pub const fn at(cell: CellCoord) -> Self {
        Self {
            cell,
            facing: None,
            pause: 0.0,
        }
    }

    /// Sets the facing applied on arrival.
    #[must_use]
    pub const fn facing(mut self, direction: Direction) -> Self {
        self.facing = Some(direction);
        self
    }

    /// Sets the pause spent at the stop.
    #[must_use]
    pub const fn pause(mut self, seconds: f32) -> Self {
        self.pause = seconds;
        self
    }
}

/// Ordered list of stops.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TourScript {
    waypoints: Vec<Waypoint>,
    looping: bool,
}

impl TourScript {
    /// Creates a script that visits `waypoints` once, in order.
    #[must_use]
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints,
            looping: false,
        }
    }

    /// Restarts from the first stop after the last one.
    #[must_use]
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Stops in visiting order.
    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Reports whether the tour restarts after the last stop.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }
}

/// Reaction to a waypoint the direct search cannot reach.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MissPolicy {
    /// Move on to the following waypoint.
    Skip,
    /// Stay put and retry the same waypoint later.
    Wait {
        /// Seconds between attempts.
        retry_after: f32,
    },
}

impl Default for MissPolicy {
    fn default() -> Self {
        Self::Wait { retry_after: 1.0 }
    }
}

/// What the walker did during one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TourEvent {
    /// Walking toward the current waypoint.
    Walking {
        /// Index of the waypoint being approached.
        index: usize,
    },
    /// Arrived at a waypoint this frame.
    ReachedWaypoint {
        /// Index of the waypoint reached.
        index: usize,
    },
    /// Lingering at a waypoint.
    Paused {
        /// Index of the waypoint the guide lingers at.
        index: usize,
    },
    /// Gave up on an unreachable waypoint and moved on.
    SkippedWaypoint {
        /// Index of the skipped waypoint.
        index: usize,
    },
    /// Waiting before retrying an unreachable waypoint.
    Waiting {
        /// Index of the waypoint to retry.
        index: usize,
    },
    /// Every waypoint of a non-looping tour has been handled.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Ready,
    Walking,
    Paused { index: usize, remaining: f32 },
    Waiting { remaining: f32 },
    Finished,
}

/// Tour guide driving one mover through a [`TourScript`].
#[derive(Clone, Debug)]
pub struct ScriptedWalker {
    mover: Mover,
    script: TourScript,
    policy: MissPolicy,
    next: usize,
    phase: Phase,
}

impl ScriptedWalker {
    /// Spawns the guide's mover at `position` and prepares the script.
    pub fn spawn<S>(
        id: MoverId,
        map: &mut TileOccupancyMap,
        space: &S,
        position: Vec2,
        speed: f32,
        script: TourScript,
        policy: MissPolicy,
    ) -> Self
    where
        S: TileSpace + ?Sized,
    {
        let config = MoverConfig {
            speed,
            fallback: RouteFallback::None,
            ..MoverConfig::default()
        };

        Self {
            mover: Mover::spawn(id, map, space, position, config),
            script,
            policy,
            next: 0,
            phase: Phase::Ready,
        }
    }

    /// Mover executing the tour.
    #[must_use]
    pub fn mover(&self) -> &Mover {
        &self.mover
    }

    /// Script being followed.
    #[must_use]
    pub fn script(&self) -> &TourScript {
        &self.script
    }

    /// Index of the waypoint the guide is heading to or will head to next.
    #[must_use]
    pub const fn next_waypoint(&self) -> usize {
        self.next
    }

    /// Reports whether a non-looping tour has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Abandons the current leg and starts over from the first waypoint.
    pub fn restart(&mut self) {
        self.mover.stop();
        self.next = 0;
        self.phase = Phase::Ready;
    }

    /// Advances the tour by `dt` seconds.
    pub fn update<S>(
        &mut self,
        dt: f32,
        map: &mut TileOccupancyMap,
        pathfinder: &PathFinder,
        space: &S,
    ) -> TourEvent
    where
        S: TileSpace + ?Sized,
    {
        match self.phase {
            Phase::Finished => {
                let _ = self.mover.update(dt, map, pathfinder, space);
                TourEvent::Finished
            }
            Phase::Paused { index, remaining } => {
                let _ = self.mover.update(dt, map, pathfinder, space);
                let remaining = remaining - dt;
                self.phase = if remaining > 0.0 {
                    Phase::Paused { index, remaining }
                } else {
                    Phase::Ready
                };
                TourEvent::Paused { index }
            }
            Phase::Waiting { remaining } => {
                let _ = self.mover.update(dt, map, pathfinder, space);
                let remaining = remaining - dt;
                self.phase = if remaining > 0.0 {
                    Phase::Waiting { remaining }
                } else {
                    Phase::Ready
                };
                TourEvent::Waiting { index: self.next }
            }
            Phase::Ready => self.dispatch(dt, map, pathfinder, space),
            Phase::Walking => self.walk(dt, map, pathfinder, space),
        }
    }

    fn dispatch<S>(
        &mut self,
        dt: f32,
        map: &mut TileOccupancyMap,
        pathfinder: &PathFinder,
        space: &S,
    ) -> TourEvent
    where
        S: TileSpace + ?Sized,
    {
        let Some(waypoint) = self.script.waypoints.get(self.next).copied() else {
            info!(guide = self.mover.id().get(), "tour finished");
            self.phase = Phase::Finished;
            return TourEvent::Finished;
        };

        match self.mover.move_to(map, pathfinder, waypoint.cell) {
            MoveOrder::Started { steps, .. } => {
                debug!(
                    guide = self.mover.id().get(),
                    index = self.next,
                    steps,
                    "heading to waypoint"
                );
                self.phase = Phase::Walking;
                self.walk(dt, map, pathfinder, space)
            }
            MoveOrder::Arrived => self.arrive(waypoint),
            MoveOrder::Unreachable => self.miss(),
        }
    }

    fn walk<S>(
        &mut self,
        dt: f32,
        map: &mut TileOccupancyMap,
        pathfinder: &PathFinder,
        space: &S,
    ) -> TourEvent
    where
        S: TileSpace + ?Sized,
    {
        let index = self.next;
        match self.mover.update(dt, map, pathfinder, space) {
            StepOutcome::Arrived => match self.script.waypoints.get(index).copied() {
                Some(waypoint) => self.arrive(waypoint),
                None => {
                    self.phase = Phase::Ready;
                    TourEvent::Walking { index }
                }
            },
            StepOutcome::Stalled => self.miss(),
            StepOutcome::Idle => {
                self.phase = Phase::Ready;
                TourEvent::Walking { index }
            }
            StepOutcome::Moving | StepOutcome::Replanning => TourEvent::Walking { index },
        }
    }

    fn arrive(&mut self, waypoint: Waypoint) -> TourEvent {
        let index = self.next;
        if let Some(facing) = waypoint.facing {
            self.mover.face(facing);
        }
        debug!(guide = self.mover.id().get(), index, "reached waypoint");

        self.advance();
        self.phase = if waypoint.pause > 0.0 {
            Phase::Paused {
                index,
                remaining: waypoint.pause,
            }
        } else {
            Phase::Ready
        };
        TourEvent::ReachedWaypoint { index }
    }

    fn miss(&mut self) -> TourEvent {
        let index = self.next;
        match self.policy {
            MissPolicy::Skip => {
                debug!(guide = self.mover.id().get(), index, "skipping unreachable waypoint");
                self.advance();
                self.phase = Phase::Ready;
                TourEvent::SkippedWaypoint { index }
            }
            MissPolicy::Wait { retry_after } => {
                debug!(
                    guide = self.mover.id().get(),
                    index, retry_after, "waiting on unreachable waypoint"
                );
                self.phase = Phase::Waiting {
                    remaining: retry_after,
                };
                TourEvent::Waiting { index }
            }
        }
    }

    fn advance(&mut self) {
        self.next += 1;
        if self.script.looping && self.next >= self.script.waypoints.len() {
            self.next = 0;
        }
    }
}
