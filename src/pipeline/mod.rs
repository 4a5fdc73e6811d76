//! Check-cycle orchestration.
//!
//! - `diff`: compare the current available set with the previous snapshot
//! - `check`: one poll → diff → notify → persist cycle
//! - `monitor`: the polling loop around it

pub mod check;
pub mod diff;
pub mod monitor;

pub use check::{CheckReport, CheckSummary, Monitor};
pub use diff::{DiffResult, diff};
pub use monitor::{Schedule, run_monitor, run_until};
