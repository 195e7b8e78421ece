//! Event-driven incident lifecycle.
//!
//! Incidents enter through the [`processing::IncidentProcessor`], are
//! classified and assigned by event handlers wired together over an
//! [`messaging::EventBus`], and HIGH-priority incidents left unattended are
//! escalated by a periodic [`escalation::EscalationSweeper`].

pub mod api;
pub mod config;
pub mod error;
pub mod escalation;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod processing;
pub mod scheduler;
pub mod state;

pub use error::{AppError, Result};
