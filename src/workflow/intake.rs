use tracing::info;
use uuid::Uuid;

use super::required_text;
use crate::{
    analysis,
    audit::NewAuditEntry,
    directory::Actor,
    error::{PatdError, PatdResult},
    machine::{Phase, Trigger},
    patd::Patd,
    policy::{self, Party},
    state::{AppState, Change},
};

pub async fn create_patd(
    state: &AppState,
    actor: &Actor,
    accused_id: Uuid,
    transgression: &str,
) -> PatdResult<i64> {
    if !policy::is_staff(actor) {
        return Err(PatdError::guard("only Ouvidoria staff may open a case"));
    }
    let transgression = required_text(transgression, "transgression")?;
    state.directory.require_personnel(accused_id)?;

    let case_number = state.store.next_case_number()?;
    let now = state.clock.now();
    let patd = Patd::new(case_number, accused_id, transgression, now);
    patd.check_invariants()?;

    let audit = NewAuditEntry {
        case_number,
        ts: now,
        actor_id: actor.audit_id(),
        from_state: None,
        to_state: patd.status,
        reason: "case opened".to_string(),
    };
    state.store.insert_patd(&patd, &audit)?;
    info!(case_number, accused_id = %accused_id, "case opened");
    Ok(case_number)
}

pub async fn assign_officer(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    officer_id: Uuid,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::AssignOfficer, &patd)?;

    let officer = state.directory.require_personnel(officer_id)?;
    if !officer.is_officer {
        return Err(PatdError::validation(format!(
            "{} is not an officer",
            officer.display_name()
        )));
    }
    if officer_id == patd.accused_id {
        return Err(PatdError::validation("the accused cannot investigate their own case"));
    }

    patd.officer_id = Some(officer_id);
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::AssignOfficer),
        format!("officer {} assigned", officer.display_name()),
    )
}

pub async fn accept_assignment(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    password: &str,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::AcceptAssignment, &patd)?;
    policy::verify_credential(state.directory.as_ref(), actor, password)?;

    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::AcceptAssignment),
        "assignment accepted",
    )
}

pub async fn decline_assignment(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    reason: &str,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::authorize(actor, Trigger::DeclineAssignment, &patd)?;
    let reason = required_text(reason, "reason")?;

    patd.officer_id = None;
    patd.signatures.officer = None;
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(Trigger::DeclineAssignment),
        format!("assignment declined: {reason}"),
    )
}

/// Names up to two witnesses from the investigating sector. Changing a
/// witness discards the signature collected for that slot.
pub async fn assign_witnesses(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    witness1: Option<Uuid>,
    witness2: Option<Uuid>,
) -> PatdResult<()> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::OfficerOrStaff, &patd, "assign_witnesses")?;
    if matches!(patd.status.phase(), Phase::Decision | Phase::Final) {
        return Err(PatdError::guard(format!(
            "witnesses cannot change once the case is in {}",
            patd.status
        )));
    }
    if witness1.is_some() && witness1 == witness2 {
        return Err(PatdError::validation("the two witnesses must be different people"));
    }

    let configuration = state.configuration()?;
    for witness_id in [witness1, witness2].into_iter().flatten() {
        if witness_id == patd.accused_id || Some(witness_id) == patd.officer_id {
            return Err(PatdError::validation(
                "witnesses cannot be the accused or the responsible officer",
            ));
        }
        let witness = state.directory.require_personnel(witness_id)?;
        if !witness.belongs_to_sector(&configuration.investigating_sector) {
            return Err(PatdError::validation(format!(
                "{} does not belong to {}",
                witness.display_name(),
                configuration.investigating_sector
            )));
        }
    }

    if patd.witness1_id != witness1 {
        patd.signatures.witness1 = None;
    }
    if patd.witness2_id != witness2 {
        patd.signatures.witness2 = None;
    }
    patd.witness1_id = witness1;
    patd.witness2_id = witness2;

    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "witnesses assigned")
}

pub async fn rewrite_occurrence(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
) -> PatdResult<analysis::Rewrite> {
    let snapshot = state.load_live(case_number)?;
    policy::require(actor, Party::OfficerOrStaff, &snapshot, "rewrite_occurrence")?;
    if snapshot.status.is_sealed() {
        return Err(PatdError::guard("the occurrence is sealed"));
    }

    let rewrite = analysis::rewrite_occurrence(state.llm.as_ref(), &snapshot.transgression).await?;

    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    if patd.version != snapshot.version {
        return Err(PatdError::Conflict(case_number));
    }
    patd.formal_transgression = Some(rewrite.formal.clone());
    patd.affirmative_statement = Some(rewrite.affirmative.clone());
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "occurrence rewritten")?;
    Ok(rewrite)
}
