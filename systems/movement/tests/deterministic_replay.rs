use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use glam::Vec2;
use townwalk_core::{CellCoord, Direction, GridGeometry, MoverId, StepOutcome, TileSpace};
use townwalk_system_movement::{Mover, MoverConfig};
use townwalk_system_pathfinding::{PathFinder, RouteFallback};
use townwalk_world::{TileLayout, TileOccupancyMap};

const LAYOUT: &str = "
    ..........
    ..##..#...
    ..#...#...
    ......#...
    ..........
    ###.......
    ..........
";

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(
        first
            .events
            .iter()
            .any(|event| event.outcome == Outcome::Arrived),
        "at least one mover should arrive"
    );
}

#[test]
fn crossing_movers_never_share_a_cell() {
    let mut harness = Harness::new();
    for tick in 0..900 {
        let _ = harness.tick(tick);
        let mut cells: Vec<CellCoord> = harness.movers.iter().map(Mover::cell).collect();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), harness.movers.len(), "cells collided on tick {tick}");
    }
}

fn replay() -> ReplayOutcome {
    let mut harness = Harness::new();
    let mut events = Vec::new();
    for tick in 0..900 {
        events.extend(harness.tick(tick));
    }

    let movers = harness
        .movers
        .iter()
        .map(|mover| MoverState {
            id: mover.id(),
            cell: mover.cell(),
            position_bits: (
                mover.world_position().x.to_bits(),
                mover.world_position().y.to_bits(),
            ),
            facing: mover.facing(),
        })
        .collect();

    ReplayOutcome { movers, events }
}

struct Harness {
    map: TileOccupancyMap,
    space: GridGeometry,
    finder: PathFinder,
    movers: Vec<Mover>,
    goals: Vec<[CellCoord; 2]>,
    legs: Vec<usize>,
}

impl Harness {
    fn new() -> Self {
        let mut map = TileOccupancyMap::new(TileLayout::parse(LAYOUT).expect("layout parses"));
        let space = GridGeometry::new(Vec2::new(-40.0, 8.0), 16.0);
        let finder = PathFinder::default();
        let config = MoverConfig {
            speed: 48.0,
            fallback: RouteFallback::default_nearest(),
            ..MoverConfig::default()
        };

        let goals = vec![
            [CellCoord::new(0, 0), CellCoord::new(9, 6)],
            [CellCoord::new(9, 6), CellCoord::new(0, 0)],
            [CellCoord::new(9, 0), CellCoord::new(0, 6)],
            [CellCoord::new(4, 3), CellCoord::new(9, 3)],
        ];
        let movers = goals
            .iter()
            .enumerate()
            .map(|(index, legs)| {
                let position = space.tile_to_world(legs[0]);
                Mover::spawn(
                    MoverId::new(index as u32),
                    &mut map,
                    &space,
                    position,
                    config,
                )
            })
            .collect();

        Self {
            map,
            space,
            finder,
            legs: vec![1; goals.len()],
            goals,
            movers,
        }
    }

    fn tick(&mut self, tick: u32) -> Vec<EventRecord> {
        let mut events = Vec::new();
        for (index, mover) in self.movers.iter_mut().enumerate() {
            if mover.destination().is_none() && !mover.is_moving() {
                let leg = self.legs[index];
                let _ = mover.move_to(&self.map, &self.finder, self.goals[index][leg]);
                self.legs[index] = 1 - leg;
            }

            let outcome = mover.update(1.0 / 30.0, &mut self.map, &self.finder, &self.space);
            if let Some(outcome) = Outcome::from_step(outcome) {
                events.push(EventRecord {
                    tick,
                    mover: mover.id(),
                    cell: mover.cell(),
                    outcome,
                });
            }
        }
        events
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    movers: Vec<MoverState>,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MoverState {
    id: MoverId,
    cell: CellCoord,
    position_bits: (u32, u32),
    facing: Direction,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EventRecord {
    tick: u32,
    mover: MoverId,
    cell: CellCoord,
    outcome: Outcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Outcome {
    Arrived,
    Replanning,
    Stalled,
}

impl Outcome {
    fn from_step(outcome: StepOutcome) -> Option<Self> {
        match outcome {
            StepOutcome::Arrived => Some(Self::Arrived),
            StepOutcome::Replanning => Some(Self::Replanning),
            StepOutcome::Stalled => Some(Self::Stalled),
            StepOutcome::Idle | StepOutcome::Moving => None,
        }
    }
}
