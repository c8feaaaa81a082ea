#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded wandering behaviour for ambient townsfolk.
//!
//! A [`Wanderer`] rests for a random dwell time, picks a random walkable cell
//! near where it stands and walks there using the shared [`Mover`]. Trips that
//! stall are retried against the same destination a bounded number of times
//! before the wanderer gives up and rests again. All randomness comes from a
//! per-agent ChaCha stream so runs with the same seed replay exactly.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use townwalk_core::{CellCoord, MoveOrder, MoverId, StepOutcome, TileSpace};
use townwalk_system_movement::{Mover, MoverConfig};
use townwalk_system_pathfinding::{PathFinder, RouteFallback};
use townwalk_world::TileOccupancyMap;
use tracing::{debug, trace};

/// Candidate cells sampled before a wanderer concedes it has nowhere to go.
const DESTINATION_SAMPLES: u32 = 16;

/// Tunables for a wandering agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WanderConfig {
    /// Translation speed in world units per second.
    pub speed: f32,
    /// Largest per-axis offset, in cells, between the wanderer and a new destination.
    pub radius: u32,
    /// Shortest rest between trips, in seconds.
    pub min_dwell: f32,
    /// Longest rest between trips, in seconds.
    pub max_dwell: f32,
    /// Retries of a stalled trip before a new destination is chosen.
    pub max_retries: u32,
    /// Seconds to wait before retrying a stalled trip.
    pub retry_after: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            speed: 48.0,
            radius: 6,
            min_dwell: 0.5,
            max_dwell: 3.0,
            max_retries: 3,
            retry_after: 0.75,
        }
    }
}

/// What the wanderer did during one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WanderEvent {
    /// Resting between trips.
    Resting,
    /// Set off toward a newly chosen destination.
    Departed {
        /// Requested destination.
        destination: CellCoord,
        /// Steps in the planned path.
        steps: usize,
    },
    /// Walking toward the current destination.
    Walking,
    /// Finished a trip.
    Arrived {
        /// Cell the wanderer ended up in.
        cell: CellCoord,
    },
    /// A trip stalled and will be retried after a short wait.
    Retrying {
        /// Destination being retried.
        destination: CellCoord,
        /// One-based retry counter.
        attempt: u32,
    },
    /// Abandoned a destination after exhausting its retries.
    GaveUp {
        /// Destination that was abandoned.
        destination: CellCoord,
    },
    /// No walkable destination could be found nearby.
    Stranded,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Resting { remaining: f32 },
    Walking { destination: CellCoord },
    Backoff { destination: CellCoord, remaining: f32 },
}

/// Autonomous agent that roams the map between random rests.
#[derive(Clone, Debug)]
pub struct Wanderer {
    mover: Mover,
    config: WanderConfig,
    rng: ChaCha8Rng,
    phase: Phase,
    retries: u32,
}

impl Wanderer {
    /// Spawns a wanderer at `position` with its own random stream derived from `seed`.
    ///
    /// The first trip starts after a random dwell.
    pub fn spawn<S>(
        id: MoverId,
        map: &mut TileOccupancyMap,
        space: &S,
        position: Vec2,
        config: WanderConfig,
        seed: u64,
    ) -> Self
    where
        S: TileSpace + ?Sized,
    {
        let mover_config = MoverConfig {
            speed: config.speed,
            fallback: RouteFallback::default_nearest(),
            ..MoverConfig::default()
        };
        let mover = Mover::spawn(id, map, space, position, mover_config);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let remaining = dwell(&mut rng, &config);

        Self {
            mover,
            config,
            rng,
            phase: Phase::Resting { remaining },
            retries: 0,
        }
    }

    /// Mover carrying the wanderer.
    #[must_use]
    pub fn mover(&self) -> &Mover {
        &self.mover
    }

    /// Tunables the wanderer was spawned with.
    #[must_use]
    pub const fn config(&self) -> &WanderConfig {
        &self.config
    }

    /// Destination of the trip in progress or awaiting retry.
    #[must_use]
    pub fn destination(&self) -> Option<CellCoord> {
        match self.phase {
            Phase::Walking { destination } | Phase::Backoff { destination, .. } => {
                Some(destination)
            }
            Phase::Resting { .. } => None,
        }
    }

    /// Reports whether the wanderer is resting between trips.
    #[must_use]
    pub fn is_resting(&self) -> bool {
        matches!(self.phase, Phase::Resting { .. })
    }

    /// Sends the wanderer to `destination` immediately, abandoning any rest or trip.
    ///
    /// Stalls on this trip are retried like any other.
    pub fn send_to(
        &mut self,
        map: &TileOccupancyMap,
        pathfinder: &PathFinder,
        destination: CellCoord,
    ) -> MoveOrder {
        self.retries = 0;
        self.depart(map, pathfinder, destination)
    }

    /// Advances the wanderer by `dt` seconds.
    pub fn update<S>(
        &mut self,
        dt: f32,
        map: &mut TileOccupancyMap,
        pathfinder: &PathFinder,
        space: &S,
    ) -> WanderEvent
    where
        S: TileSpace + ?Sized,
    {
        match self.phase {
            Phase::Resting { remaining } => {
                let _ = self.mover.update(dt, map, pathfinder, space);
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = Phase::Resting { remaining };
                    return WanderEvent::Resting;
                }
                self.roam(map, pathfinder)
            }
            Phase::Walking { destination } => match self.mover.update(dt, map, pathfinder, space)
            {
                StepOutcome::Arrived | StepOutcome::Idle => self.finish_trip(),
                StepOutcome::Stalled => self.stalled(destination),
                StepOutcome::Moving | StepOutcome::Replanning => WanderEvent::Walking,
            },
            Phase::Backoff {
                destination,
                remaining,
            } => {
                let _ = self.mover.update(dt, map, pathfinder, space);
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = Phase::Backoff {
                        destination,
                        remaining,
                    };
                    return WanderEvent::Walking;
                }
                match self.depart(map, pathfinder, destination) {
                    MoveOrder::Started { .. } => WanderEvent::Walking,
                    MoveOrder::Arrived => self.finish_trip(),
                    MoveOrder::Unreachable => self.stalled(destination),
                }
            }
        }
    }

    /// Releases the wanderer's cell as it leaves the map.
    pub fn despawn(self, map: &mut TileOccupancyMap) {
        self.mover.despawn(map);
    }

    fn roam(&mut self, map: &TileOccupancyMap, pathfinder: &PathFinder) -> WanderEvent {
        self.retries = 0;
        let Some(destination) = self.pick_destination(map) else {
            trace!(wanderer = self.mover.id().get(), "no walkable cell nearby");
            self.rest();
            return WanderEvent::Stranded;
        };

        match self.depart(map, pathfinder, destination) {
            MoveOrder::Started { steps, .. } => WanderEvent::Departed { destination, steps },
            MoveOrder::Arrived => self.finish_trip(),
            MoveOrder::Unreachable => {
                self.rest();
                WanderEvent::Stranded
            }
        }
    }

    fn depart(
        &mut self,
        map: &TileOccupancyMap,
        pathfinder: &PathFinder,
        destination: CellCoord,
    ) -> MoveOrder {
        let order = self.mover.move_to(map, pathfinder, destination);
        if let MoveOrder::Started { steps, goal } = order {
            debug!(
                wanderer = self.mover.id().get(),
                ?destination,
                ?goal,
                steps,
                "wandering"
            );
            self.phase = Phase::Walking { destination };
        }
        order
    }

    fn stalled(&mut self, destination: CellCoord) -> WanderEvent {
        if self.retries >= self.config.max_retries {
            debug!(
                wanderer = self.mover.id().get(),
                ?destination,
                retries = self.retries,
                "abandoning destination"
            );
            self.retries = 0;
            self.rest();
            return WanderEvent::GaveUp { destination };
        }

        self.retries += 1;
        self.phase = Phase::Backoff {
            destination,
            remaining: self.config.retry_after,
        };
        WanderEvent::Retrying {
            destination,
            attempt: self.retries,
        }
    }

    fn finish_trip(&mut self) -> WanderEvent {
        self.retries = 0;
        self.rest();
        WanderEvent::Arrived {
            cell: self.mover.cell(),
        }
    }

    fn rest(&mut self) {
        self.phase = Phase::Resting {
            remaining: dwell(&mut self.rng, &self.config),
        };
    }

    fn pick_destination(&mut self, map: &TileOccupancyMap) -> Option<CellCoord> {
        let origin = self.mover.cell();
        let radius = i32::try_from(self.config.radius).unwrap_or(i32::MAX).max(1);

        (0..DESTINATION_SAMPLES).find_map(|_| {
            let candidate = CellCoord::new(
                origin.column() + self.rng.gen_range(-radius..=radius),
                origin.row() + self.rng.gen_range(-radius..=radius),
            );
            (candidate != origin && map.is_walkable(candidate)).then_some(candidate)
        })
    }
}

fn dwell(rng: &mut ChaCha8Rng, config: &WanderConfig) -> f32 {
    let low = config.min_dwell.max(0.0);
    let high = config.max_dwell.max(low);
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use townwalk_core::GridGeometry;
    use townwalk_world::TileLayout;

    #[test]
    fn dwell_stays_within_configured_bounds() {
        let config = WanderConfig {
            min_dwell: 1.0,
            max_dwell: 2.0,
            ..WanderConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let value = dwell(&mut rng, &config);
            assert!((1.0..2.0).contains(&value), "dwell {value}");
        }
    }

    #[test]
    fn degenerate_dwell_range_is_constant() {
        let config = WanderConfig {
            min_dwell: 0.4,
            max_dwell: 0.1,
            ..WanderConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(dwell(&mut rng, &config), 0.4);
    }

    #[test]
    fn picked_destinations_are_walkable_and_nearby() {
        let mut map = TileOccupancyMap::new(TileLayout::open(20, 20));
        let space = GridGeometry::new(Vec2::ZERO, 8.0);
        let config = WanderConfig {
            radius: 3,
            ..WanderConfig::default()
        };
        let mut wanderer = Wanderer::spawn(
            MoverId::new(1),
            &mut map,
            &space,
            space.tile_to_world(CellCoord::new(10, 10)),
            config,
            99,
        );

        for _ in 0..100 {
            let cell = wanderer.pick_destination(&map).expect("open map has room");
            assert!(cell.chebyshev_distance(CellCoord::new(10, 10)) <= 3);
            assert_ne!(cell, CellCoord::new(10, 10));
            assert!(map.is_walkable(cell));
        }
    }
}
