//! Command line: flags, dispatch into an [`actions::Action`], and telemetry.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

mod start;
pub use self::start::start;
