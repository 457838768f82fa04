//! Persistence for proceedings, their audit trail and attachments.
//!
//! Writes use optimistic locking: `save_patd` only succeeds while the stored
//! version still equals the one the caller loaded, and the audit entry is
//! appended in the same transaction.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, NewAuditEntry},
    error::PatdResult,
    patd::{Attachment, Configuration, Patd, PatdFilter},
    sanction::Sanction,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait PatdStore: Send + Sync + 'static {
    fn next_case_number(&self) -> PatdResult<i64>;

    fn insert_patd(&self, patd: &Patd, audit: &NewAuditEntry) -> PatdResult<()>;

    /// Returns soft-deleted cases too; callers filter.
    fn find_patd(&self, case_number: i64) -> PatdResult<Option<Patd>>;

    /// Persists `patd` when the stored version equals `expected_version`,
    /// otherwise fails with `Conflict`.
    fn save_patd(&self, patd: &Patd, expected_version: i64, audit: &NewAuditEntry) -> PatdResult<()>;

    fn list_patds(&self, filter: &PatdFilter) -> PatdResult<Vec<Patd>>;

    fn due_for_timer(&self, now: NaiveDateTime) -> PatdResult<Vec<Patd>>;

    fn deleted_before(&self, cutoff: NaiveDateTime) -> PatdResult<Vec<Patd>>;

    /// Removes the case and its attachment rows. Audit entries stay.
    fn purge_patd(&self, case_number: i64) -> PatdResult<()>;

    /// Effective sanctions of the accused's finalized cases terminated at or
    /// after `since`, excluding `exclude_case`.
    fn sanction_history(
        &self,
        accused_id: Uuid,
        since: NaiveDateTime,
        exclude_case: i64,
    ) -> PatdResult<Vec<Sanction>>;

    fn audit_trail(&self, case_number: i64) -> PatdResult<Vec<AuditEntry>>;

    /// `save_patd` that also records `attachment` in the same transaction.
    fn save_patd_with_attachment(
        &self,
        patd: &Patd,
        expected_version: i64,
        audit: &NewAuditEntry,
        attachment: &Attachment,
    ) -> PatdResult<()>;

    fn list_attachments(&self, case_number: i64) -> PatdResult<Vec<Attachment>>;

    fn load_configuration(&self) -> PatdResult<Configuration>;

    fn save_configuration(&self, configuration: &Configuration) -> PatdResult<()>;
}
