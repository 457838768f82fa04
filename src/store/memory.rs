use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::PatdStore;
use crate::{
    audit::{AuditEntry, NewAuditEntry},
    directory::{Account, ActorDirectory, Personnel},
    error::{PatdError, PatdResult},
    machine::Status,
    patd::{Attachment, Configuration, Patd, PatdFilter},
    sanction::Sanction,
};

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    next_case_number: i64,
    next_audit_id: i64,
    patds: BTreeMap<i64, Patd>,
    audit: Vec<AuditEntry>,
    attachments: Vec<Attachment>,
    configuration: Configuration,
    personnel: HashMap<Uuid, Personnel>,
    accounts: HashMap<Uuid, Account>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_case_number: i64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_case_number: first_case_number,
                next_audit_id: 1,
                patds: BTreeMap::new(),
                audit: Vec::new(),
                attachments: Vec::new(),
                configuration: Configuration::default(),
                personnel: HashMap::new(),
                accounts: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> PatdResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| PatdError::internal("memory store mutex poisoned"))
    }

    pub fn insert_personnel(&self, personnel: Personnel) -> PatdResult<()> {
        let mut inner = self.lock()?;
        if inner
            .personnel
            .values()
            .any(|existing| existing.service_number == personnel.service_number)
        {
            return Err(PatdError::validation(format!(
                "service number {} already registered",
                personnel.service_number
            )));
        }
        inner.personnel.insert(personnel.id, personnel);
        Ok(())
    }

    pub fn insert_account(&self, account: Account) -> PatdResult<()> {
        self.lock()?.accounts.insert(account.id, account);
        Ok(())
    }
}

impl Inner {
    fn replace_versioned(
        &mut self,
        patd: &Patd,
        expected_version: i64,
        audit: &NewAuditEntry,
    ) -> PatdResult<()> {
        let stored = self
            .patds
            .get_mut(&patd.case_number)
            .ok_or_else(|| PatdError::case_not_found(patd.case_number))?;
        if stored.version != expected_version {
            return Err(PatdError::Conflict(patd.case_number));
        }
        *stored = patd.clone();
        self.append_audit(audit);
        Ok(())
    }

    fn append_audit(&mut self, entry: &NewAuditEntry) {
        let id = self.next_audit_id;
        self.next_audit_id += 1;
        self.audit.push(AuditEntry {
            id,
            case_number: entry.case_number,
            ts: entry.ts,
            actor_id: entry.actor_id,
            from_state: entry.from_state,
            to_state: entry.to_state,
            reason: entry.reason.clone(),
        });
    }
}

impl PatdStore for MemoryStore {
    fn next_case_number(&self) -> PatdResult<i64> {
        let mut inner = self.lock()?;
        let value = inner.next_case_number;
        inner.next_case_number += 1;
        Ok(value)
    }

    fn insert_patd(&self, patd: &Patd, audit: &NewAuditEntry) -> PatdResult<()> {
        let mut inner = self.lock()?;
        if inner.patds.contains_key(&patd.case_number) {
            return Err(PatdError::validation(format!(
                "case number {} already exists",
                patd.case_number
            )));
        }
        inner.patds.insert(patd.case_number, patd.clone());
        inner.append_audit(audit);
        Ok(())
    }

    fn find_patd(&self, case_number: i64) -> PatdResult<Option<Patd>> {
        Ok(self.lock()?.patds.get(&case_number).cloned())
    }

    fn save_patd(&self, patd: &Patd, expected_version: i64, audit: &NewAuditEntry) -> PatdResult<()> {
        self.lock()?.replace_versioned(patd, expected_version, audit)
    }

    fn list_patds(&self, filter: &PatdFilter) -> PatdResult<Vec<Patd>> {
        Ok(self
            .lock()?
            .patds
            .values()
            .filter(|patd| filter.matches(patd))
            .cloned()
            .collect())
    }

    fn due_for_timer(&self, now: NaiveDateTime) -> PatdResult<Vec<Patd>> {
        Ok(self
            .lock()?
            .patds
            .values()
            .filter(|patd| !patd.is_deleted() && patd.status.is_timed())
            .filter(|patd| patd.active_deadline().map_or(false, |deadline| deadline <= now))
            .cloned()
            .collect())
    }

    fn deleted_before(&self, cutoff: NaiveDateTime) -> PatdResult<Vec<Patd>> {
        Ok(self
            .lock()?
            .patds
            .values()
            .filter(|patd| patd.deleted_at.map_or(false, |deleted| deleted < cutoff))
            .cloned()
            .collect())
    }

    fn purge_patd(&self, case_number: i64) -> PatdResult<()> {
        let mut inner = self.lock()?;
        inner.patds.remove(&case_number);
        inner
            .attachments
            .retain(|attachment| attachment.case_number != case_number);
        Ok(())
    }

    fn sanction_history(
        &self,
        accused_id: Uuid,
        since: NaiveDateTime,
        exclude_case: i64,
    ) -> PatdResult<Vec<Sanction>> {
        Ok(self
            .lock()?
            .patds
            .values()
            .filter(|patd| patd.accused_id == accused_id && patd.case_number != exclude_case)
            .filter(|patd| !patd.is_deleted() && patd.status == Status::Finalized)
            .filter(|patd| patd.terminated_at.map_or(false, |ended| ended >= since))
            .filter_map(Patd::effective_sanction)
            .collect())
    }

    fn audit_trail(&self, case_number: i64) -> PatdResult<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .lock()?
            .audit
            .iter()
            .filter(|entry| entry.case_number == case_number)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.ts, entry.id));
        Ok(entries)
    }

    fn save_patd_with_attachment(
        &self,
        patd: &Patd,
        expected_version: i64,
        audit: &NewAuditEntry,
        attachment: &Attachment,
    ) -> PatdResult<()> {
        let mut inner = self.lock()?;
        inner.replace_versioned(patd, expected_version, audit)?;
        inner.attachments.push(attachment.clone());
        Ok(())
    }

    fn list_attachments(&self, case_number: i64) -> PatdResult<Vec<Attachment>> {
        Ok(self
            .lock()?
            .attachments
            .iter()
            .filter(|attachment| attachment.case_number == case_number)
            .cloned()
            .collect())
    }

    fn load_configuration(&self) -> PatdResult<Configuration> {
        Ok(self.lock()?.configuration.clone())
    }

    fn save_configuration(&self, configuration: &Configuration) -> PatdResult<()> {
        self.lock()?.configuration = configuration.clone();
        Ok(())
    }
}

impl ActorDirectory for MemoryStore {
    fn personnel(&self, id: Uuid) -> PatdResult<Option<Personnel>> {
        Ok(self.lock()?.personnel.get(&id).cloned())
    }

    fn account(&self, id: Uuid) -> PatdResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }
}
