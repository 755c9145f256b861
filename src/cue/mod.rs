//! Cues, cue packs and their storage.
//!
//! - [`model`]: persisted `Cue` / `CuePack` shapes
//! - [`rule`]: the closed [`TriggerRule`] the evaluator consumes
//! - [`store`]: the live, copy-on-write active pack
//! - [`repository`]: pack persistence
//! - [`service`]: add/edit/remove and pack activation
//! - [`validation`]: offline pack checks
//! - [`watcher`]: reloads the live pack when pack files change

pub mod model;
pub mod repository;
pub mod rule;
pub mod service;
pub mod store;
pub mod validation;
pub mod watcher;

pub use model::{Cue, CuePack, PERSONAL_PACK_ID, TriggerType};
pub use repository::{CueRepository, MemoryRepository, YamlRepository};
pub use rule::TriggerRule;
pub use service::{CueEdit, NewCue, PackService};
pub use store::CueStore;
pub use watcher::PackWatcher;
