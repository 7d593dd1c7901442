//! Local activity log of pipeline actions.

pub mod logger;

pub use logger::{ActivityEntry, ActivityLog};
