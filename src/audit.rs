//! Append-only audit trail.
//!
//! Entries are written in the same critical section as the state change they
//! describe and are never updated or deleted, not even by the hard-delete
//! sweep.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::machine::Status;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub case_number: i64,
    pub ts: NaiveDateTime,
    /// `None` when the scheduler performed the change.
    pub actor_id: Option<Uuid>,
    /// `None` only for the creation entry.
    pub from_state: Option<Status>,
    pub to_state: Status,
    pub reason: String,
}

impl AuditEntry {
    pub fn is_transition(&self) -> bool {
        self.from_state != Some(self.to_state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub case_number: i64,
    pub ts: NaiveDateTime,
    pub actor_id: Option<Uuid>,
    pub from_state: Option<Status>,
    pub to_state: Status,
    pub reason: String,
}

/// Checks the ordering guarantee for one case: timestamps never go back and
/// each entry starts where the previous one ended.
pub fn is_consistent_chain(entries: &[AuditEntry]) -> bool {
    entries.windows(2).all(|pair| {
        let (prior, next) = (&pair[0], &pair[1]);
        prior.case_number == next.case_number
            && prior.ts <= next.ts
            && next.from_state == Some(prior.to_state)
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn entry(id: i64, minute: u32, from: Option<Status>, to: Status) -> AuditEntry {
        AuditEntry {
            id,
            case_number: 1,
            ts: NaiveDate::from_ymd_opt(2026, 10, 1)
                .unwrap()
                .and_hms_opt(9, minute, 0)
                .unwrap(),
            actor_id: None,
            from_state: from,
            to_state: to,
            reason: String::new(),
        }
    }

    #[test]
    fn detects_broken_chain() {
        let good = vec![
            entry(1, 0, None, Status::AwaitingOfficerDefinition),
            entry(2, 1, Some(Status::AwaitingOfficerDefinition), Status::AwaitingAssignmentApproval),
        ];
        assert!(is_consistent_chain(&good));

        let broken = vec![
            entry(1, 0, None, Status::AwaitingOfficerDefinition),
            entry(2, 1, Some(Status::Preclusion), Status::UnderInvestigationPreclusion),
        ];
        assert!(!is_consistent_chain(&broken));
    }

    #[test]
    fn field_updates_are_not_transitions() {
        let update = entry(3, 2, Some(Status::Preclusion), Status::Preclusion);
        assert!(!update.is_transition());
        assert!(entry(1, 0, None, Status::AwaitingOfficerDefinition).is_transition());
    }
}
