//! SLA breach detection.
//!
//! The monitor sweeps active jobs on a schedule, evaluates the three
//! per-assignment clocks plus the job-level response clock, and turns
//! breaches into escalations, cancellations, and notifications exactly
//! once each.

mod monitor;

pub use monitor::{SlaMonitor, SlaMonitorConfig, SlaMonitorError, SlaMonitorResult, SweepReport};

#[cfg(test)]
mod tests;
