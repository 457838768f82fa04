use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{PatdError, PatdResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    AwaitingOfficerDefinition,
    AwaitingAssignmentApproval,
    AwaitingAccusedAcknowledgement,
    AwaitingJustification,
    DeadlineExpired,
    Preclusion,
    UnderInvestigation,
    UnderInvestigationPreclusion,
    AwaitingSanctionApplication,
    AwaitingSanctionChange,
    CommanderReview,
    AwaitingNpdSignature,
    ReconsiderationWindow,
    UnderReconsideration,
    AwaitingBaseCommander,
    AwaitingReconsiderationNpdFill,
    AwaitingPublication,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Intake,
    Defense,
    Investigation,
    Decision,
    Final,
}

impl Status {
    pub const ALL: [Status; 18] = [
        Status::AwaitingOfficerDefinition,
        Status::AwaitingAssignmentApproval,
        Status::AwaitingAccusedAcknowledgement,
        Status::AwaitingJustification,
        Status::DeadlineExpired,
        Status::Preclusion,
        Status::UnderInvestigation,
        Status::UnderInvestigationPreclusion,
        Status::AwaitingSanctionApplication,
        Status::AwaitingSanctionChange,
        Status::CommanderReview,
        Status::AwaitingNpdSignature,
        Status::ReconsiderationWindow,
        Status::UnderReconsideration,
        Status::AwaitingBaseCommander,
        Status::AwaitingReconsiderationNpdFill,
        Status::AwaitingPublication,
        Status::Finalized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::AwaitingOfficerDefinition => "awaiting_officer_definition",
            Status::AwaitingAssignmentApproval => "awaiting_assignment_approval",
            Status::AwaitingAccusedAcknowledgement => "awaiting_accused_acknowledgement",
            Status::AwaitingJustification => "awaiting_justification",
            Status::DeadlineExpired => "deadline_expired",
            Status::Preclusion => "preclusion",
            Status::UnderInvestigation => "under_investigation",
            Status::UnderInvestigationPreclusion => "under_investigation_preclusion",
            Status::AwaitingSanctionApplication => "awaiting_sanction_application",
            Status::AwaitingSanctionChange => "awaiting_sanction_change",
            Status::CommanderReview => "commander_review",
            Status::AwaitingNpdSignature => "awaiting_npd_signature",
            Status::ReconsiderationWindow => "reconsideration_window",
            Status::UnderReconsideration => "under_reconsideration",
            Status::AwaitingBaseCommander => "awaiting_base_commander",
            Status::AwaitingReconsiderationNpdFill => "awaiting_reconsideration_npd_fill",
            Status::AwaitingPublication => "awaiting_publication",
            Status::Finalized => "finalized",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Status::AwaitingOfficerDefinition | Status::AwaitingAssignmentApproval => Phase::Intake,
            Status::AwaitingAccusedAcknowledgement
            | Status::AwaitingJustification
            | Status::DeadlineExpired => Phase::Defense,
            Status::Preclusion
            | Status::UnderInvestigation
            | Status::UnderInvestigationPreclusion
            | Status::AwaitingSanctionApplication
            | Status::AwaitingSanctionChange => Phase::Investigation,
            Status::CommanderReview | Status::AwaitingNpdSignature => Phase::Decision,
            Status::ReconsiderationWindow
            | Status::UnderReconsideration
            | Status::AwaitingBaseCommander
            | Status::AwaitingReconsiderationNpdFill
            | Status::AwaitingPublication
            | Status::Finalized => Phase::Final,
        }
    }

    pub fn is_timed(self) -> bool {
        matches!(self, Status::AwaitingJustification | Status::ReconsiderationWindow)
    }

    pub fn accepts_analysis(self) -> bool {
        matches!(
            self,
            Status::Preclusion
                | Status::UnderInvestigation
                | Status::UnderInvestigationPreclusion
                | Status::AwaitingSanctionApplication
                | Status::AwaitingSanctionChange
        )
    }

    /// Once the NPD is signed the case content is sealed; only the
    /// reconsideration flow and publication details may still change.
    pub fn is_sealed(self) -> bool {
        self.phase() == Phase::Final
    }

    pub fn requires_officer(self) -> bool {
        self != Status::AwaitingOfficerDefinition
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = PatdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| PatdError::validation(format!("unknown status {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    AssignOfficer,
    AcceptAssignment,
    DeclineAssignment,
    RecordAcknowledgement,
    SubmitDefense,
    DeadlineElapsed,
    ExtendDeadline,
    ProceedWithoutDefense,
    BeginInvestigation,
    CompleteAnalysis,
    RequestSanctionChange,
    ApplySanction,
    SubmitForReview,
    CommanderReturn,
    CommanderApprove,
    CollectSignatures,
    RequestReconsideration,
    WindowElapsed,
    SubmitReconsiderationReport,
    BaseCommanderDecision,
    CollectNpdSignatures,
    Publish,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::AssignOfficer => "assign_officer",
            Trigger::AcceptAssignment => "accept_assignment",
            Trigger::DeclineAssignment => "decline_assignment",
            Trigger::RecordAcknowledgement => "record_acknowledgement",
            Trigger::SubmitDefense => "submit_defense",
            Trigger::DeadlineElapsed => "deadline_elapsed",
            Trigger::ExtendDeadline => "extend_deadline",
            Trigger::ProceedWithoutDefense => "proceed_without_defense",
            Trigger::BeginInvestigation => "begin_investigation",
            Trigger::CompleteAnalysis => "complete_analysis",
            Trigger::RequestSanctionChange => "request_sanction_change",
            Trigger::ApplySanction => "apply_sanction",
            Trigger::SubmitForReview => "submit_for_review",
            Trigger::CommanderReturn => "commander_return",
            Trigger::CommanderApprove => "commander_approve",
            Trigger::CollectSignatures => "collect_signatures",
            Trigger::RequestReconsideration => "request_reconsideration",
            Trigger::WindowElapsed => "window_elapsed",
            Trigger::SubmitReconsiderationReport => "submit_reconsideration_report",
            Trigger::BaseCommanderDecision => "base_commander_decision",
            Trigger::CollectNpdSignatures => "collect_npd_signatures",
            Trigger::Publish => "publish",
        }
    }

    pub fn is_timer(self) -> bool {
        matches!(self, Trigger::DeadlineElapsed | Trigger::WindowElapsed)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table. `previous` is the status remembered on the
/// aggregate; it is only consulted by the commander return.
pub fn next_status(current: Status, trigger: Trigger, previous: Option<Status>) -> PatdResult<Status> {
    use Status::*;
    use Trigger::*;

    let target = match (current, trigger) {
        (AwaitingOfficerDefinition, AssignOfficer) => Some(AwaitingAssignmentApproval),
        (AwaitingAssignmentApproval, AcceptAssignment) => Some(AwaitingAccusedAcknowledgement),
        (AwaitingAssignmentApproval, DeclineAssignment) => Some(AwaitingOfficerDefinition),
        (AwaitingAccusedAcknowledgement, RecordAcknowledgement) => Some(AwaitingJustification),
        (AwaitingJustification, SubmitDefense) => Some(UnderInvestigation),
        (AwaitingJustification, DeadlineElapsed) => Some(DeadlineExpired),
        (DeadlineExpired, ExtendDeadline) => Some(AwaitingJustification),
        (DeadlineExpired, ProceedWithoutDefense) => Some(Preclusion),
        (Preclusion, BeginInvestigation) => Some(UnderInvestigationPreclusion),
        (
            Preclusion | UnderInvestigation | UnderInvestigationPreclusion | AwaitingSanctionChange,
            CompleteAnalysis,
        ) => Some(AwaitingSanctionApplication),
        (AwaitingSanctionApplication, RequestSanctionChange) => Some(AwaitingSanctionChange),
        (AwaitingSanctionChange, ApplySanction) => Some(AwaitingSanctionApplication),
        (AwaitingSanctionApplication, SubmitForReview) => Some(CommanderReview),
        (CommanderReview, CommanderReturn) => previous.filter(|status| *status != CommanderReview),
        (CommanderReview, CommanderApprove) => Some(AwaitingNpdSignature),
        (AwaitingNpdSignature, CollectSignatures) => Some(ReconsiderationWindow),
        (ReconsiderationWindow, RequestReconsideration) => Some(UnderReconsideration),
        (ReconsiderationWindow, WindowElapsed) => Some(AwaitingPublication),
        (UnderReconsideration, SubmitReconsiderationReport) => Some(AwaitingBaseCommander),
        (AwaitingBaseCommander, BaseCommanderDecision) => Some(AwaitingReconsiderationNpdFill),
        (AwaitingReconsiderationNpdFill, CollectNpdSignatures) => Some(AwaitingPublication),
        (AwaitingPublication, Publish) => Some(Finalized),
        _ => None,
    };

    target.ok_or_else(|| PatdError::guard(format!("{trigger} is not allowed from {current}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn happy_path_follows_table() {
        let steps = [
            (Trigger::AssignOfficer, Status::AwaitingAssignmentApproval),
            (Trigger::AcceptAssignment, Status::AwaitingAccusedAcknowledgement),
            (Trigger::RecordAcknowledgement, Status::AwaitingJustification),
            (Trigger::DeadlineElapsed, Status::DeadlineExpired),
            (Trigger::ProceedWithoutDefense, Status::Preclusion),
            (Trigger::CompleteAnalysis, Status::AwaitingSanctionApplication),
            (Trigger::SubmitForReview, Status::CommanderReview),
            (Trigger::CommanderApprove, Status::AwaitingNpdSignature),
            (Trigger::CollectSignatures, Status::ReconsiderationWindow),
            (Trigger::WindowElapsed, Status::AwaitingPublication),
            (Trigger::Publish, Status::Finalized),
        ];
        let mut current = Status::AwaitingOfficerDefinition;
        for (trigger, expected) in steps {
            current = next_status(current, trigger, None).unwrap();
            assert_eq!(current, expected);
        }
    }

    #[test]
    fn commander_return_restores_previous_status() {
        let restored = next_status(
            Status::CommanderReview,
            Trigger::CommanderReturn,
            Some(Status::AwaitingSanctionApplication),
        )
        .unwrap();
        assert_eq!(restored, Status::AwaitingSanctionApplication);
    }

    #[test]
    fn commander_return_without_memory_is_rejected() {
        let err = next_status(Status::CommanderReview, Trigger::CommanderReturn, None).unwrap_err();
        assert_eq!(err.kind(), "guard_violation");
    }

    #[test]
    fn unknown_pairs_are_guard_violations() {
        let err = next_status(Status::Finalized, Trigger::Publish, None).unwrap_err();
        assert_eq!(err.kind(), "guard_violation");
        assert!(next_status(Status::AwaitingJustification, Trigger::WindowElapsed, None).is_err());
    }

    #[test]
    fn no_transition_is_a_self_loop() {
        let triggers = [
            Trigger::AssignOfficer,
            Trigger::AcceptAssignment,
            Trigger::DeclineAssignment,
            Trigger::RecordAcknowledgement,
            Trigger::SubmitDefense,
            Trigger::DeadlineElapsed,
            Trigger::ExtendDeadline,
            Trigger::ProceedWithoutDefense,
            Trigger::BeginInvestigation,
            Trigger::CompleteAnalysis,
            Trigger::RequestSanctionChange,
            Trigger::ApplySanction,
            Trigger::SubmitForReview,
            Trigger::CommanderApprove,
            Trigger::CollectSignatures,
            Trigger::RequestReconsideration,
            Trigger::WindowElapsed,
            Trigger::SubmitReconsiderationReport,
            Trigger::BaseCommanderDecision,
            Trigger::CollectNpdSignatures,
            Trigger::Publish,
        ];
        for status in Status::ALL {
            for trigger in triggers {
                if let Ok(target) = next_status(status, trigger, None) {
                    assert_ne!(target, status, "{trigger} loops on {status}");
                }
            }
        }
    }

    #[test]
    fn timed_states_are_the_ticker_targets() {
        let timed: Vec<Status> = Status::ALL.into_iter().filter(|s| s.is_timed()).collect();
        assert_eq!(timed, vec![Status::AwaitingJustification, Status::ReconsiderationWindow]);
    }

    #[test]
    fn sealing_starts_with_reconsideration_window() {
        assert!(!Status::AwaitingNpdSignature.is_sealed());
        assert!(Status::ReconsiderationWindow.is_sealed());
        assert!(Status::Finalized.is_sealed());
    }
}
