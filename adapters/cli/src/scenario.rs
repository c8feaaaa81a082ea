//! TOML scenario files describing a town and the people walking it.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;
use townwalk_core::{CellCoord, Direction};
use townwalk_system_tour::{MissPolicy, TourScript, Waypoint};
use townwalk_world::{LayoutError, TileLayout};

/// Scenario used when no file is supplied on the command line.
pub(crate) const BUILTIN_SCENARIO: &str = r#"
tile_length = 16.0
layout = """
################
#..............#
#..##....##....#
#..##....##....#
#..............#
#.......##.....#
#..#....##..#..#
#..#........#..#
#..............#
################
"""

[[agents]]
cell = { column = 1, row = 1 }

[[agents]]
cell = { column = 14, row = 1 }
speed = 40.0

[[agents]]
cell = { column = 1, row = 8 }
radius = 4

[[agents]]
cell = { column = 14, row = 8 }

[[agents]]
cell = { column = 7, row = 4 }
speed = 56.0

[tour]
cell = { column = 7, row = 1 }
looping = true
on_miss = "wait"
retry_after = 1.5

[[tour.waypoints]]
cell = { column = 12, row = 2 }

[[tour.waypoints]]
cell = { column = 5, row = 4 }
facing = "North"
pause = 1.0

[[tour.waypoints]]
cell = { column = 13, row = 7 }
facing = "East"

[[tour.waypoints]]
cell = { column = 2, row = 8 }
pause = 0.5
"#;

const DEFAULT_TILE_LENGTH: f32 = 16.0;
const DEFAULT_RETRY_AFTER: f32 = 1.0;

/// Failure to turn scenario text into a runnable town.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The file is not valid scenario TOML.
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    /// The ASCII layout is malformed.
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
    /// Tiles must have a positive, finite edge length.
    #[error("tile length must be positive, got {0}")]
    TileLength(f32),
    /// A mover speed is not positive and finite.
    #[error("{who} has invalid speed {speed}")]
    Speed {
        /// Which mover was misconfigured.
        who: String,
        /// Rejected speed.
        speed: f32,
    },
    /// A mover would spawn on a wall, off the map or on top of another mover.
    #[error("{who} cannot spawn at ({column}, {row})")]
    SpawnBlocked {
        /// Which mover failed to spawn.
        who: String,
        /// Column of the rejected cell.
        column: i32,
        /// Row of the rejected cell.
        row: i32,
    },
}

/// Whole scenario as written in TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_tile_length")]
    pub(crate) tile_length: f32,
    pub(crate) layout: String,
    #[serde(default)]
    pub(crate) agents: Vec<AgentEntry>,
    #[serde(default)]
    pub(crate) tour: Option<TourEntry>,
}

/// Wandering townsperson.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AgentEntry {
    pub(crate) cell: CellCoord,
    pub(crate) speed: Option<f32>,
    pub(crate) radius: Option<u32>,
}

/// Scripted tour guide.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TourEntry {
    pub(crate) cell: CellCoord,
    pub(crate) speed: Option<f32>,
    #[serde(default)]
    pub(crate) looping: bool,
    #[serde(default)]
    pub(crate) on_miss: MissSetting,
    pub(crate) retry_after: Option<f32>,
    #[serde(default)]
    pub(crate) waypoints: Vec<WaypointEntry>,
}

/// How the guide treats an unreachable stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MissSetting {
    Skip,
    #[default]
    Wait,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WaypointEntry {
    pub(crate) cell: CellCoord,
    pub(crate) facing: Option<Direction>,
    #[serde(default)]
    pub(crate) pause: f32,
}

fn default_tile_length() -> f32 {
    DEFAULT_TILE_LENGTH
}

impl Scenario {
    /// Parses scenario TOML.
    pub(crate) fn parse(source: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(source)?;
        if !(scenario.tile_length.is_finite() && scenario.tile_length > 0.0) {
            return Err(ScenarioError::TileLength(scenario.tile_length));
        }
        Ok(scenario)
    }

    /// Built-in demo town.
    pub(crate) fn builtin() -> Result<Self, ScenarioError> {
        Self::parse(BUILTIN_SCENARIO)
    }

    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to load scenario from {}", path.display()))
    }

    /// Walkable tiles described by the ASCII layout.
    pub(crate) fn tile_layout(&self) -> Result<TileLayout, ScenarioError> {
        Ok(TileLayout::parse(&self.layout)?)
    }
}

impl TourEntry {
    /// Waypoint script the guide follows.
    pub(crate) fn script(&self) -> TourScript {
        let waypoints = self
            .waypoints
            .iter()
            .map(|entry| {
                let waypoint = Waypoint::at(entry.cell).pause(entry.pause.max(0.0));
                match entry.facing {
                    Some(direction) => waypoint.facing(direction),
                    None => waypoint,
                }
            })
            .collect();
        TourScript::new(waypoints).looping(self.looping)
    }

    /// Reaction to unreachable stops.
    pub(crate) fn miss_policy(&self) -> MissPolicy {
        match self.on_miss {
            MissSetting::Skip => MissPolicy::Skip,
            MissSetting::Wait => MissPolicy::Wait {
                retry_after: self.retry_after.unwrap_or(DEFAULT_RETRY_AFTER).max(0.0),
            },
        }
    }
}

/// Rejects speeds that would never move a mover or would overflow positions.
pub(crate) fn validate_speed(who: &str, speed: f32) -> Result<f32, ScenarioError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(ScenarioError::Speed {
            who: who.to_owned(),
            speed,
        })
    }
}
