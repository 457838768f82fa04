use tracing::info;

use crate::{
    directory::{Actor, Role},
    error::{PatdError, PatdResult},
    patd::{Attachment, Configuration},
    policy::{self, Party},
    state::{AppState, Change},
};

/// Protocol fields kept outside the sealed case content. `Some("")` clears
/// a field, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdministrativeUpdate {
    pub protocol_code: Option<String>,
    pub origin_letter_ref: Option<String>,
}

fn apply_text(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let trimmed = value.trim();
        *target = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
}

fn require_staff(actor: &Actor, action: &str) -> PatdResult<()> {
    if policy::is_staff(actor) {
        Ok(())
    } else {
        Err(PatdError::guard(format!("{action} requires Ouvidoria staff")))
    }
}

pub async fn soft_delete(state: &AppState, actor: &Actor, case_number: i64) -> PatdResult<()> {
    require_staff(actor, "soft_delete")?;
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;

    let at = state.stamp(&patd);
    patd.deleted_at = Some(at);
    state.commit(&mut patd, actor, at, Change::Update, "case moved to trash")
}

pub async fn restore(state: &AppState, actor: &Actor, case_number: i64) -> PatdResult<()> {
    require_staff(actor, "restore")?;
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state
        .store
        .find_patd(case_number)?
        .ok_or_else(|| PatdError::case_not_found(case_number))?;
    if !patd.is_deleted() {
        return Err(PatdError::validation(format!("case {case_number} is not deleted")));
    }

    patd.deleted_at = None;
    let at = state.stamp(&patd);
    state.commit(&mut patd, actor, at, Change::Update, "case restored from trash")
}

/// Allowed in every status, sealed cases included.
pub async fn update_administrative(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    update: AdministrativeUpdate,
) -> PatdResult<()> {
    require_staff(actor, "update_administrative")?;
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;

    apply_text(&mut patd.protocol_code, update.protocol_code);
    apply_text(&mut patd.origin_letter_ref, update.origin_letter_ref);
    let at = state.stamp(&patd);
    state.commit(
        &mut patd,
        actor,
        at,
        Change::Update,
        "administrative details updated",
    )
}

pub async fn update_configuration(
    state: &AppState,
    actor: &Actor,
    configuration: Configuration,
) -> PatdResult<Configuration> {
    if !actor.has_role(Role::Admin) {
        return Err(PatdError::guard("only administrators may change the configuration"));
    }
    configuration.validate()?;
    if let Some(commander_id) = configuration.default_commander_id {
        state.directory.require_personnel(commander_id)?;
    }

    let _guard = state.lock_configuration().await;
    state.store.save_configuration(&configuration)?;
    info!(
        defense_business_days = configuration.defense_business_days,
        deadline_extra_minutes = configuration.deadline_extra_minutes,
        "configuration updated"
    );
    Ok(configuration)
}

pub async fn attach_file(
    state: &AppState,
    actor: &Actor,
    case_number: i64,
    original_name: &str,
    bytes: Vec<u8>,
) -> PatdResult<Attachment> {
    let _guard = state.locks.lock(case_number).await;
    let mut patd = state.load_live(case_number)?;
    policy::require(actor, Party::OfficerOrStaff, &patd, "attach_file")?;
    if patd.status.is_sealed() {
        return Err(PatdError::guard(format!(
            "case {case_number} is sealed; attachments are closed"
        )));
    }

    let at = state.stamp(&patd);
    let attachment = state
        .artifacts
        .put_attachment(case_number, original_name, bytes, at)
        .await?;
    if let Err(err) = state.commit_attachment(&mut patd, actor, at, &attachment) {
        state.artifacts.discard(&attachment.storage_key).await;
        return Err(err);
    }
    Ok(attachment)
}

pub async fn list_attachments(state: &AppState, case_number: i64) -> PatdResult<Vec<Attachment>> {
    state.load_live(case_number)?;
    state.store.list_attachments(case_number)
}
