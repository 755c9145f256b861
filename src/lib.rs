//! `CueCaller` - spoken reminders for a live game
//!
//! Polls the game client's live data, tracks whether a game is running,
//! decides which user-authored cues are due and hands them to speech
//! synthesis and playback without ever blocking the polling loop.

pub mod cli;
pub mod config;
pub mod cue;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod observability;
pub mod phase;
pub mod source;
pub mod trigger;
