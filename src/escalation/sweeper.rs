use crate::error::{AppError, Result};
use crate::escalation::registry::EscalationRegistry;
use crate::metrics::LIFECYCLE_METRICS;
use crate::models::IncidentStatus;
use crate::scheduler::{Job, JobMetadata};
use crate::state::IncidentRepository;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const SWEEP_JOB_NAME: &str = "escalation-sweep";

/// Result of one pass over the pending set
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Distinct ids examined
    pub scanned: usize,

    /// Ids moved to ESCALATED
    pub escalated: Vec<String>,

    /// ASSIGNED ids still under the threshold
    pub still_pending: Vec<String>,

    /// Ids removed without escalation: missing, no longer ASSIGNED, corrupted
    /// or undecodable
    pub dropped: Vec<String>,

    /// Ids whose load or save failed; left pending for the next sweep
    pub failed: Vec<String>,
}

enum Decision {
    Escalated,
    Pending,
    Dropped(&'static str),
}

/// Escalates ASSIGNED incidents that have waited at least `threshold`
/// since assignment.
#[derive(Clone)]
pub struct EscalationSweeper {
    incidents: IncidentRepository,
    registry: EscalationRegistry,
    threshold: Duration,
}

impl EscalationSweeper {
    pub fn new(incidents: IncidentRepository, registry: EscalationRegistry, threshold: Duration) -> Self {
        Self {
            incidents,
            registry,
            threshold,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Sweep using the current wall clock
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep with an explicit `now`.
    ///
    /// Only the ids escalated or dropped in this pass are removed from the
    /// registry; ids registered while the pass runs are left alone.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let timer = LIFECYCLE_METRICS.sweep_duration.start_timer();
        let result = self.run(now).await;
        timer.observe_duration();

        let label = if result.is_ok() { "success" } else { "failure" };
        LIFECYCLE_METRICS.sweeps.with_label_values(&[label]).inc();
        result
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let pending = self.registry.snapshot().await?;
        let mut report = SweepReport::default();
        let mut seen = HashSet::new();

        for id in pending {
            if !seen.insert(id.clone()) {
                continue;
            }
            report.scanned += 1;

            match self.evaluate(&id, now).await {
                Ok(Decision::Escalated) => report.escalated.push(id),
                Ok(Decision::Pending) => report.still_pending.push(id),
                Ok(Decision::Dropped(reason)) => {
                    debug!(incident_id = %id, reason = reason, "Dropping id from pending escalations");
                    report.dropped.push(id);
                }
                Err(e) => {
                    warn!(incident_id = %id, error = %e, "Escalation check failed, will retry next sweep");
                    report.failed.push(id);
                }
            }
        }

        let finished: Vec<String> = report
            .escalated
            .iter()
            .chain(report.dropped.iter())
            .cloned()
            .collect();
        if !finished.is_empty() {
            self.registry.remove(finished).await?;
        }

        if report.scanned > 0 {
            info!(
                scanned = report.scanned,
                escalated = report.escalated.len(),
                still_pending = report.still_pending.len(),
                dropped = report.dropped.len(),
                failed = report.failed.len(),
                "Escalation sweep complete"
            );
        }

        Ok(report)
    }

    async fn evaluate(&self, id: &str, now: DateTime<Utc>) -> Result<Decision> {
        let mut incident = match self.incidents.load(id).await {
            Ok(Some(incident)) => incident,
            Ok(None) => return Ok(Decision::Dropped("missing")),
            Err(AppError::Serialization(reason)) => {
                error!(incident_id = %id, reason = %reason, "Incident record cannot be decoded");
                return Ok(Decision::Dropped("undecodable"));
            }
            Err(e) => return Err(e),
        };

        if incident.status != IncidentStatus::Assigned {
            return Ok(Decision::Dropped("not assigned"));
        }

        let Some(age) = incident.assignment_age(now) else {
            error!(incident_id = %id, "ASSIGNED incident has no assignedAt");
            return Ok(Decision::Dropped("corrupted"));
        };

        if age < self.threshold {
            return Ok(Decision::Pending);
        }

        match incident.escalate_at(now) {
            Ok(()) => {}
            Err(AppError::CorruptedState(reason)) => {
                error!(incident_id = %id, reason = %reason, "Refusing to escalate corrupted incident");
                return Ok(Decision::Dropped("corrupted"));
            }
            Err(e) => return Err(e),
        }

        self.incidents.save(&incident).await?;
        LIFECYCLE_METRICS.record_transition(IncidentStatus::Escalated);

        info!(
            incident_id = %id,
            waited_secs = age.num_seconds(),
            team = ?incident.assigned_team,
            "Incident escalated"
        );
        Ok(Decision::Escalated)
    }

    /// Scheduler job running one sweep per tick
    pub fn into_job(self: Arc<Self>, schedule: &str) -> Job {
        Job::new(JobMetadata::new(SWEEP_JOB_NAME, schedule), move || {
            let sweeper = self.clone();
            async move {
                sweeper
                    .sweep()
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
        })
    }
}
