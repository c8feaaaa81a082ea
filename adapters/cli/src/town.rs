//! Headless host that owns the shared occupancy map and ticks every mover.

use std::fmt;

use glam::Vec2;
use townwalk_core::{CellCoord, GridGeometry, MoverId, TileSpace};
use townwalk_system_movement::DEFAULT_SPEED;
use townwalk_system_pathfinding::PathFinder;
use townwalk_system_tour::{ScriptedWalker, TourEvent};
use townwalk_system_wander::{WanderConfig, WanderEvent, Wanderer};
use townwalk_world::TileOccupancyMap;
use tracing::{debug, info};

use crate::scenario::{validate_speed, Scenario, ScenarioError};

/// Role a mover plays in the town.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    Wanderer,
    Guide,
}

/// Running counters kept per mover.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    /// Trips begun.
    pub(crate) departures: u32,
    /// Trips or waypoints completed.
    pub(crate) arrivals: u32,
    /// Stalled trips retried, abandoned or skipped.
    pub(crate) setbacks: u32,
}

/// End-of-run snapshot of one mover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct MoverReport {
    pub(crate) id: MoverId,
    pub(crate) role: Role,
    pub(crate) cell: CellCoord,
    pub(crate) position: Vec2,
    pub(crate) tally: Tally,
}

impl fmt::Display for MoverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            Role::Wanderer => "wanderer",
            Role::Guide => "guide",
        };
        write!(
            f,
            "mover {:>2} {:<8} cell ({:>2}, {:>2}) at ({:>7.1}, {:>7.1}): {} departures, {} arrivals, {} setbacks",
            self.id.get(),
            role,
            self.cell.column(),
            self.cell.row(),
            self.position.x,
            self.position.y,
            self.tally.departures,
            self.tally.arrivals,
            self.tally.setbacks,
        )
    }
}

/// Town populated from a scenario.
#[derive(Debug)]
pub(crate) struct Town {
    map: TileOccupancyMap,
    space: GridGeometry,
    finder: PathFinder,
    folk: Vec<(Wanderer, Tally)>,
    guide: Option<(ScriptedWalker, Tally)>,
    ticks: u64,
}

impl Town {
    /// Builds the map and spawns every mover the scenario lists.
    ///
    /// Each wanderer draws from its own stream derived from `seed`.
    pub(crate) fn build(scenario: &Scenario, seed: u64) -> Result<Self, ScenarioError> {
        let mut map = TileOccupancyMap::new(scenario.tile_layout()?);
        let space = GridGeometry::new(Vec2::ZERO, scenario.tile_length);
        let mut next_id = 0_u32;

        let mut folk = Vec::with_capacity(scenario.agents.len());
        for (index, agent) in scenario.agents.iter().enumerate() {
            let who = format!("agent {index}");
            ensure_free(&map, &who, agent.cell)?;

            let defaults = WanderConfig::default();
            let config = WanderConfig {
                speed: validate_speed(&who, agent.speed.unwrap_or(defaults.speed))?,
                radius: agent.radius.unwrap_or(defaults.radius),
                ..defaults
            };
            let wanderer = Wanderer::spawn(
                MoverId::new(next_id),
                &mut map,
                &space,
                space.tile_to_world(agent.cell),
                config,
                seed.wrapping_add(u64::from(next_id)),
            );
            next_id += 1;
            folk.push((wanderer, Tally::default()));
        }

        let guide = match &scenario.tour {
            Some(tour) => {
                ensure_free(&map, "guide", tour.cell)?;
                let speed = validate_speed("guide", tour.speed.unwrap_or(DEFAULT_SPEED))?;
                let walker = ScriptedWalker::spawn(
                    MoverId::new(next_id),
                    &mut map,
                    &space,
                    space.tile_to_world(tour.cell),
                    speed,
                    tour.script(),
                    tour.miss_policy(),
                );
                Some((walker, Tally::default()))
            }
            None => None,
        };

        let (columns, rows) = map.dimensions();
        info!(
            columns,
            rows,
            wanderers = folk.len(),
            guide = guide.is_some(),
            "town built"
        );

        Ok(Self {
            map,
            space,
            finder: PathFinder::default(),
            folk,
            guide,
            ticks: 0,
        })
    }

    /// Advances every mover by `dt` seconds: wanderers first, then the guide.
    pub(crate) fn tick(&mut self, dt: f32) {
        for (wanderer, tally) in &mut self.folk {
            let event = wanderer.update(dt, &mut self.map, &self.finder, &self.space);
            match event {
                WanderEvent::Departed { .. } => tally.departures += 1,
                WanderEvent::Arrived { .. } => tally.arrivals += 1,
                WanderEvent::Retrying { .. } | WanderEvent::GaveUp { .. } => tally.setbacks += 1,
                WanderEvent::Resting | WanderEvent::Walking | WanderEvent::Stranded => {}
            }
        }

        if let Some((guide, tally)) = &mut self.guide {
            let was_walking = guide.mover().destination().is_some();
            let event = guide.update(dt, &mut self.map, &self.finder, &self.space);
            match event {
                TourEvent::Walking { index } if !was_walking => {
                    debug!(index, "guide set off");
                    tally.departures += 1;
                }
                TourEvent::ReachedWaypoint { .. } => tally.arrivals += 1,
                TourEvent::SkippedWaypoint { .. } => tally.setbacks += 1,
                TourEvent::Walking { .. }
                | TourEvent::Paused { .. }
                | TourEvent::Waiting { .. }
                | TourEvent::Finished => {}
            }
        }

        self.ticks += 1;
    }

    /// Number of ticks simulated so far.
    pub(crate) const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Occupancy shared by every mover.
    pub(crate) fn map(&self) -> &TileOccupancyMap {
        &self.map
    }

    /// Snapshot of every mover in host order.
    pub(crate) fn reports(&self) -> Vec<MoverReport> {
        let wanderers = self.folk.iter().map(|(wanderer, tally)| MoverReport {
            id: wanderer.mover().id(),
            role: Role::Wanderer,
            cell: wanderer.mover().cell(),
            position: wanderer.mover().world_position(),
            tally: *tally,
        });
        let guide = self.guide.iter().map(|(guide, tally)| MoverReport {
            id: guide.mover().id(),
            role: Role::Guide,
            cell: guide.mover().cell(),
            position: guide.mover().world_position(),
            tally: *tally,
        });
        wanderers.chain(guide).collect()
    }
}

fn ensure_free(map: &TileOccupancyMap, who: &str, cell: CellCoord) -> Result<(), ScenarioError> {
    if map.is_walkable(cell) {
        Ok(())
    } else {
        Err(ScenarioError::SpawnBlocked {
            who: who.to_owned(),
            column: cell.column(),
            row: cell.row(),
        })
    }
}
