//! Live game data sources.
//!
//! A source answers one poll with either a [`GameSnapshot`] or a
//! [`SourceError`]. The phase tracker decides what a failure means; sources
//! only classify it.

pub mod live_client;
pub mod objectives;
pub mod replay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

pub use live_client::LiveClientSource;
pub use objectives::ObjectiveClock;
pub use replay::ReplaySource;

/// Outcome of one poll.
pub type PollResult = Result<GameSnapshot, SourceError>;

/// Event names the live client is known to report.
pub const KNOWN_EVENTS: &[&str] = &[
    "GameStart",
    "MinionsSpawning",
    "FirstBrick",
    "FirstBlood",
    "TurretKilled",
    "InhibKilled",
    "InhibRespawningSoon",
    "InhibRespawned",
    "DragonKill",
    "HeraldKill",
    "HordeKill",
    "AtakhanKill",
    "BaronKill",
    "ChampionKill",
    "Multikill",
    "Ace",
    "GameEnd",
];

/// One successful read of the game state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Elapsed game time in seconds
    pub game_time: f64,

    /// Whether the game has actually started (past loading)
    pub started: bool,

    /// Whether the source reports the game as over
    #[serde(default)]
    pub ended: bool,

    /// Events observed so far this game
    #[serde(default)]
    pub events: Vec<GameEvent>,

    /// Known objective timers
    #[serde(default)]
    pub objectives: Vec<ObjectiveTimer>,
}

impl GameSnapshot {
    /// Snapshot of a running game at `game_time` with no extras.
    #[must_use]
    pub fn at(game_time: f64) -> Self {
        Self {
            game_time,
            started: true,
            ..Self::default()
        }
    }

    /// Whether an event with this name (case-insensitive) is present.
    #[must_use]
    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Timer for the named objective (case-insensitive).
    #[must_use]
    pub fn objective(&self, name: &str) -> Option<&ObjectiveTimer> {
        self.objectives
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

/// A discrete in-game event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Event name, e.g. `DragonKill`
    pub name: String,
    /// Game time the event happened at
    #[serde(default)]
    pub time: f64,
    /// Source-assigned id, unique within a game
    #[serde(default)]
    pub id: u64,
}

/// Countdown to an objective's next spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTimer {
    /// Objective name
    pub name: String,
    /// Seconds until the next spawn (zero or negative once it is up)
    pub spawns_in: f64,
    /// Identifies which spawn `spawns_in` counts down to; changes exactly
    /// when a new spawn cycle begins
    pub occurrence: u64,
}

/// Something that can be polled for game state.
#[async_trait]
pub trait LiveDataSource: Send + Sync {
    /// Reads the current game state.
    async fn poll(&self) -> PollResult;
}

#[async_trait]
impl<T: LiveDataSource + ?Sized> LiveDataSource for std::sync::Arc<T> {
    async fn poll(&self) -> PollResult {
        (**self).poll().await
    }
}
