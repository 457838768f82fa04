use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::info;

use super::required_text;
use crate::{
    analysis::{self, AnalysisInput},
    artifacts::SignatureInput,
    directory::Actor,
    error::{PatdError, PatdResult},
    machine::{Phase, Status, Trigger},
    patd::{Circumstances, Configuration, Patd, RegulatoryItem, WitnessSlot},
    policy::{self, Party},
    sanction::{behavior_delta, Natureza, Sanction, SanctionRecord},
    state::{AppState, Change},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    pub items: Vec<RegulatoryItem>,
    pub circumstances: Circumstances,
    pub suggested_sanction: Sanction,
    pub natureza: Natureza,
    pub justified: bool,
    pub rationale: String,
    pub behavior_delta: String,
}

pub(crate) fn prior_record(
    state: &AppState,
    patd: &Patd,
    configuration: &Configuration,
    now: NaiveDateTime,
) -> PatdResult<SanctionRecord> {
    let since = now - Duration::days(i64::from(configuration.reincidence_lookback_days));
    let history = state
        .store
        .sanction_history(patd.accused_id, since, patd.case_number)?;
    Ok(SanctionRecord::from_sanctions(&history))
}

pub async fn begin_investigation(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::BeginInvestigation, &patd)?;

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::BeginInvestigation),
        "investigation opened after preclusion",
    )
}

/// Classifies the case, weighs the circumstances and settles the sanction.
///
/// The model calls run without the case lock; their result is only written
/// if the case did not change in the meantime, so an abandoned or failed
/// call leaves no trace.
pub async fn run_analysis(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<AnalysisOutcome> {
    let snapshot = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::CompleteAnalysis, &snapshot)?;
    if !snapshot.status.accepts_analysis() {
        return Err(PatdError::guard(format!(
            "analysis is not allowed from {}",
            snapshot.status
        )));
    }

    let configuration = state.configuration()?;
    let record = prior_record(state, &snapshot, &configuration, state.clock.now())?;
    let result = analysis::analyze(
        state.llm.as_ref(),
        &AnalysisInput {
            transgression: &snapshot.transgression,
            defense: snapshot.defense.as_deref(),
            history: record,
        },
    )
    .await?;

    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    if patd.version != snapshot.version {
        return Err(PatdError::Conflict(case_number));
    }

    let sanction = result.sanction();
    let outcome = AnalysisOutcome {
        items: result.items.clone(),
        circumstances: result.circumstances.clone(),
        suggested_sanction: sanction,
        natureza: result.outcome.natureza(),
        justified: result.outcome.floored,
        rationale: result.summary(),
        behavior_delta: behavior_delta(&record, &sanction),
    };

    patd.items = outcome.items.clone();
    patd.circumstances = outcome.circumstances.clone();
    patd.natureza = Some(outcome.natureza);
    patd.suggested_sanction = Some(outcome.rationale.clone());
    patd.applied_sanction = Some(sanction);
    patd.justified = outcome.justified;
    patd.behavior_delta = Some(outcome.behavior_delta.clone());

    let change = if patd.status == Status::AwaitingSanctionApplication {
        Change::Update
    } else {
        Change::Transition(Trigger::CompleteAnalysis)
    };
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        change,
        format!("analysis completed: {sanction}"),
    )?;
    info!(case_number, %sanction, justified = outcome.justified, "analysis stored");
    Ok(outcome)
}

pub async fn set_applied_sanction(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    sanction: Sanction,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::Officer, &patd, "set_applied_sanction")?;
    sanction.validate()?;

    let change = match patd.status {
        Status::AwaitingSanctionApplication => Change::Update,
        Status::AwaitingSanctionChange => Change::Transition(Trigger::ApplySanction),
        other => {
            return Err(PatdError::guard(format!(
                "a sanction cannot be applied from {other}"
            )))
        }
    };

    let configuration = state.configuration()?;
    let at = state.stamp(&patd);
    let record = prior_record(state, &patd, &configuration, at)?;
    patd.applied_sanction = Some(sanction);
    patd.natureza = Some(sanction.natureza());
    patd.behavior_delta = Some(behavior_delta(&record, &sanction));
    if sanction.is_restrictive() {
        patd.justified = false;
    }

    state.commit(
        &mut patd,
        actor,
        at,
        change,
        format!("sanction set to {sanction}"),
    )
}

pub async fn request_sanction_change(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    reason: &str,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::RequestSanctionChange, &patd)?;
    let reason = required_text(reason, "reason")?;

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::RequestSanctionChange),
        format!("sanction change requested: {reason}"),
    )
}

pub async fn set_report(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    text: &str,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::Officer, &patd, "set_report")?;
    if !patd.status.accepts_analysis() {
        return Err(PatdError::guard(format!(
            "the report cannot be edited in {}",
            patd.status
        )));
    }

    patd.report = Some(required_text(text, "report")?);
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "report updated")
}

pub async fn sign_as_officer(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::Officer, &patd, "sign_as_officer")?;
    if patd.status.phase() == Phase::Intake || patd.status.is_sealed() {
        return Err(PatdError::guard(format!(
            "the officer cannot sign in {}",
            patd.status
        )));
    }

    let blob = state
        .artifacts
        .put_signature(case_number, "officer", signature)
        .await?;
    patd.signatures.officer = Some(blob);
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "officer signed")
}

pub async fn sign_as_witness(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    slot: WitnessSlot,
    signature: SignatureInput,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    let (witness, label) = match slot {
        WitnessSlot::First => (patd.witness1_id, "witness1"),
        WitnessSlot::Second => (patd.witness2_id, "witness2"),
    };
    if witness.is_none() || !actor.is_personnel(witness) {
        return Err(PatdError::guard(format!(
            "only the assigned {label} may sign that slot"
        )));
    }
    if patd.status.is_sealed() {
        return Err(PatdError::guard("the case is sealed"));
    }

    let blob = state
        .artifacts
        .put_signature(case_number, label, signature)
        .await?;
    match slot {
        WitnessSlot::First => patd.signatures.witness1 = Some(blob),
        WitnessSlot::Second => patd.signatures.witness2 = Some(blob),
    }
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, format!("{label} signed"))
}
