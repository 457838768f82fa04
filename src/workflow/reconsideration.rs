use super::required_text;
use crate::{
    artifacts::SignatureInput,
    directory::Actor,
    error::{PatdError, PatdResult},
    machine::{Status, Trigger},
    policy::{self, Party},
    sanction::Sanction,
    state::{AppState, Change},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseCommanderDecision {
    Maintain,
    Change(Sanction),
}

pub async fn submit_reconsideration(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    text: &str,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::RequestReconsideration, &patd)?;
    if patd.status != Status::ReconsiderationWindow {
        return Err(PatdError::guard(format!(
            "{} is not allowed from {}",
            Trigger::RequestReconsideration,
            patd.status
        )));
    }

    let at = state.stamp(&patd);
    let deadline = patd.reconsideration_deadline.ok_or_else(|| {
        PatdError::internal(format!("case {case_number} has no reconsideration deadline"))
    })?;
    if at > deadline {
        return Err(PatdError::deadline(format!(
            "the reconsideration window of case {case_number} closed at {deadline}"
        )));
    }
    let text = required_text(text, "reconsideration request")?;
    let blob = state
        .artifacts
        .put_signature(case_number, "reconsideration", signature)
        .await?;

    patd.reconsideration_text = Some(text);
    patd.reconsideration_at = Some(at);
    patd.signatures.reconsideration = Some(blob);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::RequestReconsideration),
        "reconsideration requested",
    )
}

pub async fn submit_reconsideration_report(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    report: &str,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::SubmitReconsiderationReport, &patd)?;
    let report = required_text(report, "reconsideration report")?;

    patd.reconsideration_report = Some(report);
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::SubmitReconsiderationReport),
        "reconsideration report submitted",
    )
}

pub async fn base_commander_decision(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    decision: BaseCommanderDecision,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::BaseCommanderDecision, &patd)?;

    let reason = match decision {
        BaseCommanderDecision::Maintain => {
            patd.reconsidered_sanction = None;
            "sanction maintained by the base commander".to_string()
        }
        BaseCommanderDecision::Change(sanction) => {
            sanction.validate()?;
            patd.reconsidered_sanction = Some(sanction);
            patd.natureza = Some(sanction.natureza());
            format!("sanction changed by the base commander to {sanction}")
        }
    };

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::BaseCommanderDecision),
        reason,
    )
}

pub async fn record_reconsideration_npd_signature(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::Accused, &patd, "record_reconsideration_npd_signature")?;
    if patd.status != Status::AwaitingReconsiderationNpdFill {
        return Err(PatdError::guard(format!(
            "the reconsideration NPD cannot be signed in {}",
            patd.status
        )));
    }

    let blob = state
        .artifacts
        .put_signature(case_number, "reconsideration_npd", signature)
        .await?;
    patd.signatures.reconsideration_npd.push(blob);
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Update,
        "accused signed the reconsideration NPD",
    )
}

pub async fn collect_npd_signatures(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::CollectNpdSignatures, &patd)?;
    if patd.status != Status::AwaitingReconsiderationNpdFill {
        return Err(PatdError::guard(format!(
            "{} is not allowed from {}",
            Trigger::CollectNpdSignatures,
            patd.status
        )));
    }
    if patd.signatures.reconsideration_npd.is_empty() || patd.signatures.officer.is_none() {
        return Err(PatdError::guard("the reconsideration NPD is missing signatures"));
    }

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::CollectNpdSignatures),
        "reconsideration NPD completed",
    )
}

pub async fn publish(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    bulletin_ref: &str,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::Publish, &patd)?;
    let bulletin_ref = required_text(bulletin_ref, "bulletin reference")?;

    let at = state.stamp(&patd);
    patd.bulletin_ref = Some(bulletin_ref.clone());
    patd.published_at = Some(at);
    patd.terminated_at = Some(at);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::Publish),
        format!("published in {bulletin_ref}"),
    )
}
