use crate::error::Result;
use crate::escalation::EscalationRegistry;
use crate::messaging::IncidentClassified;
use crate::metrics::LIFECYCLE_METRICS;
use crate::models::{AssignedTeam, Category, IncidentStatus, Priority};
use crate::processing::{EventHandler, HandlerOutcome};
use crate::state::IncidentRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Owning team for a category, with HIGH priority always going to on-call
pub fn route_team(category: Category, priority: Priority) -> AssignedTeam {
    if priority == Priority::High {
        return AssignedTeam::OnCallSre;
    }

    match category {
        Category::Infra => AssignedTeam::InfraOps,
        Category::App => AssignedTeam::AppDev,
        Category::Security => AssignedTeam::SecurityOps,
        Category::General => AssignedTeam::L1Support,
    }
}

/// Consumes `incident-classified`, assigns a team and registers HIGH
/// incidents for escalation.
pub struct IncidentAssigner {
    incidents: IncidentRepository,
    registry: EscalationRegistry,
}

impl IncidentAssigner {
    pub fn new(incidents: IncidentRepository, registry: EscalationRegistry) -> Self {
        Self {
            incidents,
            registry,
        }
    }

    /// Handle one delivery with an explicit transition time
    pub async fn handle_at(&self, event: IncidentClassified, now: DateTime<Utc>) -> Result<HandlerOutcome> {
        let Some(mut incident) = self.incidents.load(&event.incident_id).await? else {
            warn!(incident_id = %event.incident_id, "Classified event for unknown incident");
            return Ok(HandlerOutcome::Skipped);
        };

        // The persisted classification wins over the event payload.
        let priority = incident.priority.unwrap_or(event.priority);
        if priority != event.priority {
            warn!(
                incident_id = %incident.id,
                stored = %priority,
                event = %event.priority,
                "Classified event disagrees with stored priority"
            );
        }

        match incident.status {
            IncidentStatus::Classified => {
                let category = incident.category_or_default();
                let team = route_team(category, priority);

                incident.assign_at(team, now)?;
                self.incidents.save(&incident).await?;
                LIFECYCLE_METRICS.record_transition(IncidentStatus::Assigned);

                info!(
                    incident_id = %incident.id,
                    team = %team,
                    category = %category,
                    priority = %priority,
                    "Incident assigned"
                );

                if priority == Priority::High {
                    self.registry.register(&incident.id).await?;
                }
                Ok(HandlerOutcome::Applied)
            }
            IncidentStatus::Assigned => {
                // Redelivery. Registration is idempotent, so repeat it in case
                // the first delivery failed after saving.
                debug!(incident_id = %incident.id, "Incident already assigned");
                if priority == Priority::High {
                    self.registry.register(&incident.id).await?;
                }
                Ok(HandlerOutcome::Replayed)
            }
            status => {
                warn!(
                    incident_id = %incident.id,
                    status = %status,
                    "Ignoring classified event for incident not awaiting assignment"
                );
                Ok(HandlerOutcome::Skipped)
            }
        }
    }
}

#[async_trait]
impl EventHandler for IncidentAssigner {
    type Event = IncidentClassified;

    const NAME: &'static str = "assigner";

    async fn handle(&self, event: IncidentClassified) -> Result<HandlerOutcome> {
        self.handle_at(event, Utc::now()).await
    }
}
