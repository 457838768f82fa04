use crate::error::{PatdError, PatdResult};

pub mod admin;
pub mod decision;
pub mod defense;
pub mod intake;
pub mod investigation;
pub mod queries;
pub mod reconsideration;

pub use admin::{
    attach_file, list_attachments, restore, soft_delete, update_administrative,
    update_configuration, AdministrativeUpdate,
};
pub use decision::{
    commander_review, open_reconsideration_window, record_npd_signature, submit_for_review,
    CommanderAction,
};
pub use defense::{
    extend_deadline, proceed_without_defense, record_acknowledgement, submit_defense,
    summarize_defense,
};
pub use intake::{
    accept_assignment, assign_officer, assign_witnesses, create_patd, decline_assignment,
    rewrite_occurrence,
};
pub use investigation::{
    begin_investigation, request_sanction_change, run_analysis, set_applied_sanction, set_report,
    sign_as_officer, sign_as_witness, AnalysisOutcome,
};
pub use queries::{get_patd, history, list_patds};
pub use reconsideration::{
    base_commander_decision, collect_npd_signatures, publish,
    record_reconsideration_npd_signature, submit_reconsideration,
    submit_reconsideration_report, BaseCommanderDecision,
};

pub(crate) fn required_text(value: &str, what: &str) -> PatdResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(PatdError::validation(format!("{what} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}
