use crate::{
    artifacts::SignatureInput,
    clock,
    directory::Actor,
    error::{PatdError, PatdResult},
    machine::{Status, Trigger},
    policy::{self, Party},
    state::{AppState, Change},
};

use super::required_text;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommanderAction {
    Approve { password: String },
    Return { comment: String },
}

pub async fn submit_for_review(state: &AppState, actor: &Actor, case_number: i64) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::SubmitForReview, &patd)?;
    if patd.status != Status::AwaitingSanctionApplication {
        return Err(PatdError::guard(format!(
            "{} is not allowed from {}",
            Trigger::SubmitForReview,
            patd.status
        )));
    }
    if patd.signatures.officer.is_none() {
        return Err(PatdError::guard("the officer must sign before submitting"));
    }
    if patd.applied_sanction.is_none() {
        return Err(PatdError::validation("no sanction has been set"));
    }

    let configuration = state.configuration()?;
    if patd.commander_id.is_none() {
        patd.commander_id = configuration.default_commander_id;
    }
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::SubmitForReview),
        "submitted for commander review",
    )
}

/// Approval revalidates the commander's password; a return sends the case
/// back to where it was before the review, with the comment kept on it.
pub async fn commander_review(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    action: CommanderAction,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;

    let (trigger, reason) = match action {
        CommanderAction::Approve { password } => {
            policy::authorize(actor, Trigger::CommanderApprove, &patd)?;
            if patd.status != Status::CommanderReview {
                return Err(PatdError::guard(format!(
                    "{} is not allowed from {}",
                    Trigger::CommanderApprove,
                    patd.status
                )));
            }
            policy::verify_credential(state.directory.as_ref(), actor, &password)?;
            patd.commander_comment = None;
            if actor.personnel_id.is_some() {
                patd.commander_id = actor.personnel_id;
            }
            (Trigger::CommanderApprove, "approved by the commander".to_string())
        }
        CommanderAction::Return { comment } => {
            policy::authorize(actor, Trigger::CommanderReturn, &patd)?;
            let comment = required_text(&comment, "comment")?;
            patd.commander_comment = Some(comment.clone());
            (Trigger::CommanderReturn, format!("returned by the commander: {comment}"))
        }
    };

    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Transition(trigger), reason)
}

pub async fn record_npd_signature(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::Accused, &patd, "record_npd_signature")?;
    if patd.status != Status::AwaitingNpdSignature {
        return Err(PatdError::guard(format!(
            "the NPD cannot be signed in {}",
            patd.status
        )));
    }
    if patd.signatures.accused_acknowledgements.len() >= 2 {
        return Err(PatdError::guard("the accused already signed the NPD"));
    }

    let blob = state
        .artifacts
        .put_signature(case_number, "npd_accused", signature)
        .await?;
    patd.signatures.accused_acknowledgements.push(blob);
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "accused signed the NPD")
}

pub async fn open_reconsideration_window(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::CollectSignatures, &patd)?;
    if patd.status != Status::AwaitingNpdSignature {
        return Err(PatdError::guard(format!(
            "{} is not allowed from {}",
            Trigger::CollectSignatures,
            patd.status
        )));
    }
    if !patd.npd_signatures_complete() {
        return Err(PatdError::guard("the NPD is missing signatures"));
    }

    let configuration = state.configuration()?;
    let at = state.stamp(&patd);
    let deadline = clock::defense_deadline(at, configuration.reconsideration_business_days, 0)?;
    patd.reconsideration_opened_at = Some(at);
    patd.reconsideration_deadline = Some(deadline);

    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::CollectSignatures),
        format!("NPD signed; reconsideration open until {deadline}"),
    )
}
