use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use tracing::warn;

use crate::{
    directory::{Actor, ActorDirectory, Role},
    error::{PatdError, PatdResult},
    machine::Trigger,
    patd::Patd,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Staff,
    Officer,
    OfficerOrStaff,
    Accused,
    Commander,
    BaseCommander,
    System,
}

pub fn required_party(trigger: Trigger) -> Party {
    match trigger {
        Trigger::AssignOfficer
        | Trigger::ExtendDeadline
        | Trigger::ProceedWithoutDefense
        | Trigger::Publish => Party::Staff,
        Trigger::AcceptAssignment
        | Trigger::DeclineAssignment
        | Trigger::BeginInvestigation
        | Trigger::CompleteAnalysis
        | Trigger::RequestSanctionChange
        | Trigger::ApplySanction
        | Trigger::SubmitForReview
        | Trigger::SubmitReconsiderationReport => Party::Officer,
        Trigger::CollectSignatures | Trigger::CollectNpdSignatures => Party::OfficerOrStaff,
        Trigger::RecordAcknowledgement
        | Trigger::SubmitDefense
        | Trigger::RequestReconsideration => Party::Accused,
        Trigger::CommanderReturn | Trigger::CommanderApprove => Party::Commander,
        Trigger::BaseCommanderDecision => Party::BaseCommander,
        Trigger::DeadlineElapsed | Trigger::WindowElapsed => Party::System,
    }
}

pub fn is_staff(actor: &Actor) -> bool {
    actor.has_role(Role::Ouvidoria) || actor.has_role(Role::Admin)
}

pub fn satisfies(actor: &Actor, party: Party, patd: &Patd) -> bool {
    match party {
        Party::System => actor.is_system(),
        _ if actor.is_system() => false,
        Party::Staff => is_staff(actor),
        Party::Officer => actor.is_personnel(patd.officer_id),
        Party::OfficerOrStaff => actor.is_personnel(patd.officer_id) || is_staff(actor),
        Party::Accused => actor.is_personnel(Some(patd.accused_id)),
        Party::Commander => actor.has_role(Role::Commander),
        Party::BaseCommander => actor.has_role(Role::BaseCommander),
    }
}

pub fn require(actor: &Actor, party: Party, patd: &Patd, action: &str) -> PatdResult<()> {
    if satisfies(actor, party, patd) {
        Ok(())
    } else {
        Err(PatdError::guard(format!(
            "{action} on case {} requires {party:?}",
            patd.case_number
        )))
    }
}

pub fn authorize(actor: &Actor, trigger: Trigger, patd: &Patd) -> PatdResult<()> {
    require(actor, required_party(trigger), patd, trigger.as_str())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|err| anyhow!(err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Checks the password against the caller's account at call time; a valid
/// session alone is not enough for password-bearing transitions.
pub fn verify_credential(
    directory: &dyn ActorDirectory,
    actor: &Actor,
    password: &str,
) -> PatdResult<()> {
    let account_id = actor.account_id.ok_or(PatdError::CredentialFailure)?;
    let account = directory
        .account(account_id)?
        .ok_or(PatdError::CredentialFailure)?;

    match verify_password(password, &account.password_hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PatdError::CredentialFailure),
        Err(err) => {
            warn!(account_id = %account.id, error = %err, "stored password hash is unreadable");
            Err(PatdError::CredentialFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use chrono::NaiveDate;
    use rand::rngs::OsRng;
    use uuid::Uuid;

    use super::*;
    use crate::{directory::Account, store::MemoryStore};

    fn case_with(accused: Uuid, officer: Uuid) -> Patd {
        let now = NaiveDate::from_ymd_opt(2026, 10, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut patd = Patd::new(1, accused, "Chegou atrasado".into(), now);
        patd.officer_id = Some(officer);
        patd
    }

    fn actor(personnel: Option<Uuid>, roles: &[Role]) -> Actor {
        Actor {
            account_id: Some(Uuid::new_v4()),
            personnel_id: personnel,
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn admin_acts_wherever_staff_may() {
        let patd = case_with(Uuid::new_v4(), Uuid::new_v4());
        assert!(authorize(&actor(None, &[Role::Admin]), Trigger::Publish, &patd).is_ok());
        assert!(authorize(&actor(None, &[Role::Ouvidoria]), Trigger::Publish, &patd).is_ok());
        assert!(authorize(&actor(None, &[Role::Commander]), Trigger::Publish, &patd).is_err());
    }

    #[test]
    fn only_the_assigned_officer_accepts() {
        let officer = Uuid::new_v4();
        let patd = case_with(Uuid::new_v4(), officer);
        let other = actor(Some(Uuid::new_v4()), &[Role::Officer]);
        assert!(authorize(&other, Trigger::AcceptAssignment, &patd).is_err());
        let assigned = actor(Some(officer), &[Role::Officer]);
        assert!(authorize(&assigned, Trigger::AcceptAssignment, &patd).is_ok());
    }

    #[test]
    fn timers_are_system_only() {
        let patd = case_with(Uuid::new_v4(), Uuid::new_v4());
        assert!(authorize(&Actor::system(), Trigger::DeadlineElapsed, &patd).is_ok());
        let staff = actor(None, &[Role::Ouvidoria, Role::Admin]);
        assert!(authorize(&staff, Trigger::DeadlineElapsed, &patd).is_err());
        assert!(authorize(&Actor::system(), Trigger::Publish, &patd).is_err());
    }

    #[test]
    fn credential_is_revalidated_against_the_account() {
        let store = MemoryStore::new();
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"correct horse", &salt)
            .unwrap()
            .to_string();
        let account = Account {
            id: Uuid::new_v4(),
            username: "cmt".into(),
            password_hash: hash,
            roles: vec![Role::Commander],
            personnel_id: None,
        };
        store.insert_account(account.clone()).unwrap();
        let caller = Actor::from_account(&account);

        assert!(verify_credential(&store, &caller, "correct horse").is_ok());
        let err = verify_credential(&store, &caller, "wrong").unwrap_err();
        assert_eq!(err.kind(), "credential_failure");
        assert!(verify_credential(&store, &Actor::system(), "correct horse").is_err());
    }
}
