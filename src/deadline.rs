use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    directory::Actor,
    error::{PatdError, PatdResult},
    machine::{Status, Trigger},
    patd::{Patd, PatdFilter},
    policy,
    state::{AppState, Change},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub examined: usize,
    pub transitioned: usize,
    pub deferred: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub purged: usize,
    pub blobs_removed: usize,
    pub failed: usize,
}

fn timer_trigger(status: Status) -> Option<Trigger> {
    match status {
        Status::AwaitingJustification => Some(Trigger::DeadlineElapsed),
        Status::ReconsiderationWindow => Some(Trigger::WindowElapsed),
        _ => None,
    }
}

/// Fires the timer transition for one case if it is still due. The caller
/// holds the case lock.
fn expire(state: &AppState, actor: &Actor, case_number: i64, now: NaiveDateTime) -> PatdResult<bool> {
    let Some(mut patd) = state
        .store
        .find_patd(case_number)?
        .filter(|patd| !patd.is_deleted())
    else {
        return Ok(false);
    };
    let (Some(trigger), Some(deadline)) = (timer_trigger(patd.status), patd.active_deadline()) else {
        return Ok(false);
    };
    if now <= deadline {
        return Ok(false);
    }

    policy::authorize(actor, trigger, &patd)?;
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Transition(trigger),
        format!("deadline {deadline} elapsed"),
    )?;
    Ok(true)
}

/// One pass of the ticker. Cases locked by a user action are left for the
/// next tick, as are cases whose write hit a concurrent update.
pub async fn tick_deadlines(state: &AppState) -> PatdResult<TickReport> {
    let now = state.clock.now();
    let due = state.store.due_for_timer(now)?;
    let system = Actor::system();
    let mut report = TickReport::default();

    for candidate in due {
        report.examined += 1;
        let case_number = candidate.case_number;
        let Some(_guard) = state.locks.try_lock(case_number) else {
            debug!(case_number, "case is busy; deferring to the next tick");
            report.deferred += 1;
            continue;
        };

        match expire(state, &system, case_number, now) {
            Ok(true) => report.transitioned += 1,
            Ok(false) => {}
            Err(PatdError::Conflict(_)) => {
                debug!(case_number, "case changed concurrently; deferring to the next tick");
                report.deferred += 1;
            }
            Err(err) => {
                warn!(case_number, error = %err, "deadline transition failed");
                report.failed += 1;
            }
        }
    }

    if report.examined > 0 {
        info!(
            examined = report.examined,
            transitioned = report.transitioned,
            deferred = report.deferred,
            failed = report.failed,
            "deadline tick finished"
        );
    }
    Ok(report)
}

pub async fn expired_patds_snapshot(state: &AppState) -> PatdResult<Vec<Patd>> {
    let now = state.clock.now();
    let mut expired = state.store.list_patds(&PatdFilter {
        status: Some(Status::DeadlineExpired),
        ..Default::default()
    })?;
    expired.extend(state.store.due_for_timer(now)?.into_iter().filter(|patd| {
        patd.status == Status::AwaitingJustification
            && patd.deadline_end.map_or(false, |deadline| now > deadline)
    }));
    expired.sort_by_key(|patd| patd.case_number);
    Ok(expired)
}

/// Hard-deletes cases that have been in the trash longer than the
/// retention period, together with their artifact folder. Audit entries
/// are kept.
pub async fn sweep_soft_deleted(state: &AppState) -> PatdResult<SweepReport> {
    let configuration = state.configuration()?;
    let cutoff =
        state.clock.now() - Duration::days(i64::from(configuration.soft_delete_retention_days));
    let candidates = state.store.deleted_before(cutoff)?;
    let mut report = SweepReport::default();

    for candidate in candidates {
        let case_number = candidate.case_number;
        let guard = state.locks.lock(case_number).await;
        let still_expired = state
            .store
            .find_patd(case_number)?
            .and_then(|patd| patd.deleted_at)
            .map_or(false, |deleted_at| deleted_at < cutoff);
        if !still_expired {
            continue;
        }

        let result = async {
            let removed = state.artifacts.purge_case(case_number).await?;
            state.store.purge_patd(case_number)?;
            Ok::<_, PatdError>(removed)
        }
        .await;
        drop(guard);

        match result {
            Ok(removed) => {
                state.locks.forget(case_number);
                report.purged += 1;
                report.blobs_removed += removed;
                info!(case_number, removed, "soft-deleted case purged");
            }
            Err(err) => {
                warn!(case_number, error = %err, "failed to purge soft-deleted case");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
