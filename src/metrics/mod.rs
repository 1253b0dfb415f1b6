//! # Command Metric Tracker
//!
//! In-flight counters per command kind, used for back-pressure decisions and
//! observability. Signals are fire-and-forget: they are published onto a
//! channel drained by a background task and must never block or fail the
//! owning workflow.

pub mod tracker;

pub use tracker::{CommandMetricTracker, TrackerGuard};
