use crate::{
    audit::AuditEntry,
    error::{PatdError, PatdResult},
    patd::{Patd, PatdFilter},
    state::AppState,
};

pub async fn get_patd(state: &AppState, case_number: i64, include_deleted: bool) -> PatdResult<Patd> {
    state
        .store
        .find_patd(case_number)?
        .filter(|patd| include_deleted || !patd.is_deleted())
        .ok_or_else(|| PatdError::case_not_found(case_number))
}

pub async fn list_patds(state: &AppState, filter: &PatdFilter) -> PatdResult<Vec<Patd>> {
    state.store.list_patds(filter)
}

/// The audit trail in timestamp order. Still answers after the case itself
/// was purged.
pub async fn history(state: &AppState, case_number: i64) -> PatdResult<Vec<AuditEntry>> {
    let entries = state.store.audit_trail(case_number)?;
    if entries.is_empty() {
        return Err(PatdError::case_not_found(case_number));
    }
    Ok(entries)
}
