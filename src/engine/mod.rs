//! The live engine: polling loop, per-tick processing and the
//! notification feed.

pub mod notify;
pub mod scheduler;
pub mod tick;

pub use notify::{Notification, Notifier};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerState};
pub use tick::{TickDriver, TickOutcome};
