use tracing::debug;

use super::required_text;
use crate::{
    analysis,
    artifacts::SignatureInput,
    clock,
    directory::Actor,
    error::{PatdError, PatdResult},
    machine::{Status, Trigger},
    policy::{self, Party},
    state::{AppState, Change},
};

pub async fn record_acknowledgement(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::RecordAcknowledgement, &patd)?;
    if patd.status != Status::AwaitingAccusedAcknowledgement {
        return Err(PatdError::guard(format!(
            "{} is not allowed from {}",
            Trigger::RecordAcknowledgement,
            patd.status
        )));
    }

    let configuration = state.configuration()?;
    let blob = state
        .artifacts
        .put_signature(case_number, "notification", signature)
        .await?;

    let at = state.stamp(&patd);
    let deadline = clock::defense_deadline(
        at,
        configuration.defense_business_days,
        configuration.deadline_extra_minutes,
    )?;
    patd.signatures.accused_acknowledgements.push(blob);
    patd.notified_at = Some(at);
    patd.deadline_start = Some(at);
    patd.deadline_end = Some(deadline);

    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::RecordAcknowledgement),
        format!("notification acknowledged; defense due {deadline}"),
    )
}

pub async fn submit_defense(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    text: &str,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::SubmitDefense, &patd)?;
    if patd.status != Status::AwaitingJustification {
        return Err(PatdError::guard(format!(
            "{} is not allowed from {}",
            Trigger::SubmitDefense,
            patd.status
        )));
    }

    let at = state.stamp(&patd);
    let deadline = patd
        .deadline_end
        .ok_or_else(|| PatdError::internal(format!("case {case_number} has no defense deadline")))?;
    if at > deadline {
        return Err(PatdError::deadline(format!(
            "the defense window of case {case_number} closed at {deadline}"
        )));
    }
    let text = required_text(text, "defense")?;
    let blob = state
        .artifacts
        .put_signature(case_number, "defense", signature)
        .await?;

    patd.defense = Some(text);
    patd.signatures.defense = Some(blob);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::SubmitDefense),
        "defense submitted",
    )
}

/// Adds business days to the current defense deadline. From
/// `deadline_expired` this reopens the window; while the window is still
/// open it only moves the deadline. Zero days changes nothing.
pub async fn extend_deadline(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    days: u32,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::ExtendDeadline, &patd)?;

    let change = match patd.status {
        Status::DeadlineExpired => Change::Transition(Trigger::ExtendDeadline),
        Status::AwaitingJustification => Change::Update,
        other => {
            return Err(PatdError::guard(format!(
                "{} is not allowed from {other}",
                Trigger::ExtendDeadline
            )))
        }
    };
    clock::check_business_days(days, "an extension")?;
    if days == 0 {
        debug!(case_number, "zero-day extension ignored");
        return Ok(());
    }

    let current = patd
        .deadline_end
        .ok_or_else(|| PatdError::internal(format!("case {case_number} has no defense deadline")))?;
    let configuration = state.configuration()?;
    let extended = clock::extend_deadline(current, days, configuration.deadline_extra_minutes)?;
    patd.deadline_end = Some(extended);

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        change,
        format!("deadline extended by {days} business day(s) to {extended}"),
    )
}

pub async fn proceed_without_defense(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::ProceedWithoutDefense, &patd)?;

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::ProceedWithoutDefense),
        "proceeding without defense",
    )
}

pub async fn summarize_defense(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<String> {
    let snapshot = state.load_live(case_number)?;
    policy::require(actor, Party::Officer, &snapshot, "summarize_defense")?;
    if snapshot.status.is_sealed() {
        return Err(PatdError::guard("the defense is sealed"));
    }
    let defense = snapshot
        .defense
        .as_deref()
        .ok_or_else(|| PatdError::validation("no defense was submitted"))?;

    let summary = analysis::summarize_defense(state.llm.as_ref(), defense).await?;

    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    if patd.version != snapshot.version {
        return Err(PatdError::Conflict(case_number));
    }
    patd.defense_summary = Some(summary.clone());
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "defense summarized")?;
    Ok(summary)
}
