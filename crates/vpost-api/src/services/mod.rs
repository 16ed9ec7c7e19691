//! Background services.

mod reaper;

pub use reaper::TimeoutReaper;
