//! Time-based escalation of assigned incidents.
//!
//! The [`EscalationRegistry`] owns the set of ids waiting for evaluation; the
//! assigner registers HIGH incidents and the [`EscalationSweeper`] removes
//! them once they are escalated or no longer eligible.

pub mod registry;
pub mod sweeper;

pub use registry::EscalationRegistry;
pub use sweeper::{EscalationSweeper, SweepReport, SWEEP_JOB_NAME};
