use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of an incident.
///
/// Transitions follow CREATED → CLASSIFIED → ASSIGNED → ESCALATED; RESOLVED
/// is terminal and reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Created,
    Classified,
    Assigned,
    Escalated,
    Resolved,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Infra,
    App,
    Security,
    #[default]
    General,
}

/// Where the incident was reported from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IncidentSource {
    User,
    Monitoring,
    Webhook,
}

/// Owning team
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
pub enum AssignedTeam {
    #[serde(rename = "INFRA-OPS")]
    #[strum(serialize = "INFRA-OPS")]
    InfraOps,
    #[serde(rename = "APP-DEV")]
    #[strum(serialize = "APP-DEV")]
    AppDev,
    #[serde(rename = "SECURITY-OPS")]
    #[strum(serialize = "SECURITY-OPS")]
    SecurityOps,
    #[serde(rename = "L1-SUPPORT")]
    #[strum(serialize = "L1-SUPPORT")]
    L1Support,
    #[serde(rename = "ON-CALL-SRE")]
    #[strum(serialize = "ON-CALL-SRE")]
    OnCallSre,
}

/// One audit record per applied transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEntry {
    Created {
        at: DateTime<Utc>,
    },
    Classified {
        priority: Priority,
        category: Category,
        at: DateTime<Utc>,
    },
    Assigned {
        team: AssignedTeam,
        category: Category,
        at: DateTime<Utc>,
    },
    Escalated {
        at: DateTime<Utc>,
    },
    Resolved {
        at: DateTime<Utc>,
    },
}

impl TimelineEntry {
    /// Status reached by the transition this entry records
    pub fn status(&self) -> IncidentStatus {
        match self {
            TimelineEntry::Created { .. } => IncidentStatus::Created,
            TimelineEntry::Classified { .. } => IncidentStatus::Classified,
            TimelineEntry::Assigned { .. } => IncidentStatus::Assigned,
            TimelineEntry::Escalated { .. } => IncidentStatus::Escalated,
            TimelineEntry::Resolved { .. } => IncidentStatus::Resolved,
        }
    }
}

/// Represents an incident as persisted in the state store.
///
/// Optional fields are populated progressively as transitions are applied;
/// [`Incident::validate`] checks that the fields required by the current
/// status are present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Unique identifier
    pub id: String,

    /// Current status
    pub status: IncidentStatus,

    /// Human-readable title
    pub title: String,

    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Reporting source
    pub source: IncidentSource,

    /// Set once at classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Set once at classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    /// Set at assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_team: Option<AssignedTeam>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classified_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Append-only audit log of transitions
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

impl Incident {
    /// Create a new incident with a generated id
    pub fn new(title: String, description: Option<String>, source: IncidentSource) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, description, source, Utc::now())
    }

    /// Create a CREATED record with a known id and creation time
    pub fn with_id(
        id: String,
        title: String,
        description: Option<String>,
        source: IncidentSource,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: IncidentStatus::Created,
            title,
            description,
            source,
            priority: None,
            category: None,
            assigned_team: None,
            created_at,
            classified_at: None,
            assigned_at: None,
            escalated_at: None,
            resolved_at: None,
            timeline: vec![TimelineEntry::Created { at: created_at }],
        }
    }

    /// Apply the CLASSIFIED transition
    pub fn classify_at(
        &mut self,
        priority: Priority,
        category: Category,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_transition(&[IncidentStatus::Created], IncidentStatus::Classified)?;

        self.priority = Some(priority);
        self.category = Some(category);
        self.classified_at = Some(at);
        self.push(
            IncidentStatus::Classified,
            TimelineEntry::Classified {
                priority,
                category,
                at,
            },
        );
        Ok(())
    }

    /// Apply the ASSIGNED transition
    pub fn assign_at(&mut self, team: AssignedTeam, at: DateTime<Utc>) -> Result<()> {
        self.ensure_transition(&[IncidentStatus::Classified], IncidentStatus::Assigned)?;

        self.assigned_team = Some(team);
        self.assigned_at = Some(at);
        self.push(
            IncidentStatus::Assigned,
            TimelineEntry::Assigned {
                team,
                category: self.category_or_default(),
                at,
            },
        );
        Ok(())
    }

    /// Apply the ESCALATED transition
    pub fn escalate_at(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.ensure_transition(&[IncidentStatus::Assigned], IncidentStatus::Escalated)?;

        self.escalated_at = Some(at);
        self.push(IncidentStatus::Escalated, TimelineEntry::Escalated { at });
        Ok(())
    }

    /// Apply the RESOLVED transition
    pub fn resolve_at(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.ensure_transition(
            &[
                IncidentStatus::Created,
                IncidentStatus::Classified,
                IncidentStatus::Assigned,
                IncidentStatus::Escalated,
            ],
            IncidentStatus::Resolved,
        )?;

        self.resolved_at = Some(at);
        self.push(IncidentStatus::Resolved, TimelineEntry::Resolved { at });
        Ok(())
    }

    /// Category used for routing; records classified without one route as GENERAL
    pub fn category_or_default(&self) -> Category {
        self.category.unwrap_or_default()
    }

    pub fn is_terminal(&self) -> bool {
        self.status == IncidentStatus::Resolved
    }

    /// Seconds elapsed since assignment, if assigned
    pub fn assignment_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.assigned_at.map(|assigned_at| now - assigned_at)
    }

    /// Check that the fields required by the current status are present and
    /// that the timeline ends with the current status.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            AppError::CorruptedState(format!(
                "incident {} is {} but has no {}",
                self.id, self.status, field
            ))
        };

        // Every status past CLASSIFIED carries the classification fields,
        // except a record resolved straight from CREATED.
        let classified = self.classified_at.is_some() || self.priority.is_some();
        let needs_classification = match self.status {
            IncidentStatus::Created => false,
            IncidentStatus::Classified | IncidentStatus::Assigned | IncidentStatus::Escalated => true,
            IncidentStatus::Resolved => classified,
        };
        if needs_classification {
            if self.priority.is_none() {
                return Err(missing("priority"));
            }
            if self.classified_at.is_none() {
                return Err(missing("classifiedAt"));
            }
        }

        let needs_assignment = match self.status {
            IncidentStatus::Assigned | IncidentStatus::Escalated => true,
            IncidentStatus::Resolved => self.assigned_at.is_some() || self.assigned_team.is_some(),
            _ => false,
        };
        if needs_assignment {
            if self.assigned_team.is_none() {
                return Err(missing("assignedTeam"));
            }
            if self.assigned_at.is_none() {
                return Err(missing("assignedAt"));
            }
        }

        if self.status == IncidentStatus::Escalated && self.escalated_at.is_none() {
            return Err(missing("escalatedAt"));
        }
        if self.status == IncidentStatus::Resolved && self.resolved_at.is_none() {
            return Err(missing("resolvedAt"));
        }

        match self.timeline.last() {
            Some(entry) if entry.status() == self.status => Ok(()),
            Some(entry) => Err(AppError::CorruptedState(format!(
                "incident {} is {} but its last timeline event is {}",
                self.id,
                self.status,
                entry.status()
            ))),
            None => Err(missing("timeline")),
        }
    }

    fn ensure_transition(&self, from: &[IncidentStatus], to: IncidentStatus) -> Result<()> {
        self.validate()?;

        if !from.contains(&self.status) {
            return Err(AppError::InvalidStateTransition(format!(
                "incident {} cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        Ok(())
    }

    fn push(&mut self, status: IncidentStatus, entry: TimelineEntry) {
        self.status = status;
        self.timeline.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn created() -> Incident {
        Incident::new(
            "Server CPU down".to_string(),
            Some("web-01 unreachable".to_string()),
            IncidentSource::User,
        )
    }

    #[test]
    fn test_incident_creation() {
        let incident = created();

        assert_eq!(incident.status, IncidentStatus::Created);
        assert_eq!(incident.timeline.len(), 1);
        assert_eq!(incident.timeline[0].status(), IncidentStatus::Created);
        assert!(incident.priority.is_none());
        assert!(incident.validate().is_ok());
    }

    #[test]
    fn test_full_lifecycle_appends_one_entry_per_transition() {
        let mut incident = created();
        let t0 = incident.created_at;

        incident
            .classify_at(Priority::High, Category::Infra, t0 + Duration::seconds(1))
            .unwrap();
        assert_eq!(incident.timeline.len(), 2);

        incident
            .assign_at(AssignedTeam::OnCallSre, t0 + Duration::seconds(2))
            .unwrap();
        assert_eq!(incident.timeline.len(), 3);

        incident.escalate_at(t0 + Duration::seconds(15)).unwrap();
        assert_eq!(incident.timeline.len(), 4);
        assert_eq!(incident.status, IncidentStatus::Escalated);

        for (entry, status) in incident.timeline.iter().zip([
            IncidentStatus::Created,
            IncidentStatus::Classified,
            IncidentStatus::Assigned,
            IncidentStatus::Escalated,
        ]) {
            assert_eq!(entry.status(), status);
        }
        assert!(incident.validate().is_ok());
    }

    #[test]
    fn test_escalation_requires_assigned() {
        let mut incident = created();
        let err = incident.escalate_at(Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
        assert_eq!(incident.timeline.len(), 1);
    }

    #[test]
    fn test_classification_is_set_once() {
        let mut incident = created();
        incident
            .classify_at(Priority::Low, Category::General, Utc::now())
            .unwrap();

        let err = incident
            .classify_at(Priority::High, Category::Infra, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
        assert_eq!(incident.priority, Some(Priority::Low));
    }

    #[test]
    fn test_resolve_from_any_non_terminal_status() {
        let mut incident = created();
        incident.resolve_at(Utc::now()).unwrap();
        assert!(incident.is_terminal());
        assert!(incident.validate().is_ok());

        let err = incident.resolve_at(Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    #[test]
    fn test_corrupted_record_is_rejected() {
        let mut incident = created();
        incident
            .classify_at(Priority::High, Category::App, Utc::now())
            .unwrap();
        incident.assign_at(AssignedTeam::OnCallSre, Utc::now()).unwrap();

        incident.assigned_at = None;
        let err = incident.escalate_at(Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::CorruptedState(_)));
    }

    #[test]
    fn test_wire_format() {
        let mut incident = created();
        let at = incident.created_at;
        incident.classify_at(Priority::High, Category::Infra, at).unwrap();
        incident.assign_at(AssignedTeam::OnCallSre, at).unwrap();

        let json = serde_json::to_value(&incident).unwrap();
        assert_eq!(json["status"], "ASSIGNED");
        assert_eq!(json["assignedTeam"], "ON-CALL-SRE");
        assert_eq!(json["source"], "user");
        assert_eq!(json["timeline"][1]["event"], "CLASSIFIED");
        assert_eq!(json["timeline"][1]["priority"], "HIGH");
        assert_eq!(json["timeline"][2]["team"], "ON-CALL-SRE");
        assert!(json.get("escalatedAt").is_none());

        let back: Incident = serde_json::from_value(json).unwrap();
        assert_eq!(back, incident);
    }

    #[test]
    fn test_strum_names_match_wire() {
        assert_eq!(AssignedTeam::L1Support.to_string(), "L1-SUPPORT");
        assert_eq!("SECURITY".parse::<Category>().unwrap(), Category::Security);
        assert_eq!(IncidentSource::Monitoring.to_string(), "monitoring");
        assert_eq!(IncidentStatus::Escalated.to_string(), "ESCALATED");
    }
}
