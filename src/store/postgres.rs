use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use uuid::Uuid;

use super::PatdStore;
use crate::{
    audit::{AuditEntry, NewAuditEntry},
    db::{PgPool, PgPooledConnection},
    directory::{Account, ActorDirectory, Personnel},
    error::{PatdError, PatdResult},
    machine::Status,
    models::{
        AccountRow, AttachmentRow, AuditRow, ConfigurationRow, NewAuditRow, PatdRow, PersonnelRow,
        CONFIGURATION_ROW_ID,
    },
    patd::{Attachment, Configuration, Patd, PatdFilter},
    sanction::Sanction,
    schema::{accounts, attachments, audit_entries, configuration, patds, personnel},
};

#[derive(QueryableByName)]
struct SequenceValue {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> PatdResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| PatdError::Storage(format!("database pool error: {err}")))
    }
}

fn rows_into_domain(rows: Vec<PatdRow>) -> PatdResult<Vec<Patd>> {
    rows.into_iter().map(PatdRow::into_domain).collect()
}

fn update_versioned(
    conn: &mut PgConnection,
    row: &PatdRow,
    expected_version: i64,
    audit: &NewAuditEntry,
) -> PatdResult<()> {
    let updated = diesel::update(
        patds::table
            .filter(patds::case_number.eq(row.case_number))
            .filter(patds::version.eq(expected_version)),
    )
    .set(row)
    .execute(conn)?;

    if updated == 0 {
        return Err(PatdError::Conflict(row.case_number));
    }

    diesel::insert_into(audit_entries::table)
        .values(&NewAuditRow::from(audit))
        .execute(conn)?;
    Ok(())
}

impl PatdStore for PgStore {
    fn next_case_number(&self) -> PatdResult<i64> {
        let mut conn = self.conn()?;
        let next = diesel::sql_query("SELECT nextval('patd_case_number_seq') AS value")
            .get_result::<SequenceValue>(&mut conn)?;
        Ok(next.value)
    }

    fn insert_patd(&self, patd: &Patd, audit: &NewAuditEntry) -> PatdResult<()> {
        let row = PatdRow::from_domain(patd)?;
        let mut conn = self.conn()?;
        conn.transaction::<_, PatdError, _>(|conn| {
            diesel::insert_into(patds::table).values(&row).execute(conn)?;
            diesel::insert_into(audit_entries::table)
                .values(&NewAuditRow::from(audit))
                .execute(conn)?;
            Ok(())
        })
    }

    fn find_patd(&self, case_number: i64) -> PatdResult<Option<Patd>> {
        let mut conn = self.conn()?;
        patds::table
            .filter(patds::case_number.eq(case_number))
            .first::<PatdRow>(&mut conn)
            .optional()?
            .map(PatdRow::into_domain)
            .transpose()
    }

    fn save_patd(&self, patd: &Patd, expected_version: i64, audit: &NewAuditEntry) -> PatdResult<()> {
        let row = PatdRow::from_domain(patd)?;
        let mut conn = self.conn()?;
        conn.transaction::<_, PatdError, _>(|conn| update_versioned(conn, &row, expected_version, audit))
    }

    fn list_patds(&self, filter: &PatdFilter) -> PatdResult<Vec<Patd>> {
        let mut conn = self.conn()?;
        let mut query = patds::table.into_boxed();
        if !filter.include_deleted {
            query = query.filter(patds::deleted_at.is_null());
        }
        if let Some(status) = filter.status {
            query = query.filter(patds::status.eq(status.as_str()));
        }
        if let Some(accused_id) = filter.accused_id {
            query = query.filter(patds::accused_id.eq(accused_id));
        }
        let rows = query
            .order(patds::case_number.asc())
            .load::<PatdRow>(&mut conn)?;
        rows_into_domain(rows)
    }

    fn due_for_timer(&self, now: NaiveDateTime) -> PatdResult<Vec<Patd>> {
        let mut conn = self.conn()?;
        let rows = patds::table
            .filter(patds::deleted_at.is_null())
            .filter(
                patds::status
                    .eq(Status::AwaitingJustification.as_str())
                    .and(patds::deadline_end.le(now))
                    .or(patds::status
                        .eq(Status::ReconsiderationWindow.as_str())
                        .and(patds::reconsideration_deadline.le(now))),
            )
            .order(patds::case_number.asc())
            .load::<PatdRow>(&mut conn)?;
        rows_into_domain(rows)
    }

    fn deleted_before(&self, cutoff: NaiveDateTime) -> PatdResult<Vec<Patd>> {
        let mut conn = self.conn()?;
        let rows = patds::table
            .filter(patds::deleted_at.lt(cutoff))
            .order(patds::case_number.asc())
            .load::<PatdRow>(&mut conn)?;
        rows_into_domain(rows)
    }

    fn purge_patd(&self, case_number: i64) -> PatdResult<()> {
        let mut conn = self.conn()?;
        conn.transaction::<_, PatdError, _>(|conn| {
            diesel::delete(attachments::table.filter(attachments::case_number.eq(case_number)))
                .execute(conn)?;
            diesel::delete(patds::table.filter(patds::case_number.eq(case_number))).execute(conn)?;
            Ok(())
        })
    }

    fn sanction_history(
        &self,
        accused_id: Uuid,
        since: NaiveDateTime,
        exclude_case: i64,
    ) -> PatdResult<Vec<Sanction>> {
        let mut conn = self.conn()?;
        let rows = patds::table
            .filter(patds::accused_id.eq(accused_id))
            .filter(patds::case_number.ne(exclude_case))
            .filter(patds::deleted_at.is_null())
            .filter(patds::status.eq(Status::Finalized.as_str()))
            .filter(patds::terminated_at.ge(since))
            .load::<PatdRow>(&mut conn)?;
        Ok(rows_into_domain(rows)?
            .iter()
            .filter_map(Patd::effective_sanction)
            .collect())
    }

    fn audit_trail(&self, case_number: i64) -> PatdResult<Vec<AuditEntry>> {
        let mut conn = self.conn()?;
        audit_entries::table
            .filter(audit_entries::case_number.eq(case_number))
            .order((audit_entries::ts.asc(), audit_entries::id.asc()))
            .load::<AuditRow>(&mut conn)?
            .into_iter()
            .map(AuditRow::into_domain)
            .collect()
    }

    fn save_patd_with_attachment(
        &self,
        patd: &Patd,
        expected_version: i64,
        audit: &NewAuditEntry,
        attachment: &Attachment,
    ) -> PatdResult<()> {
        let row = PatdRow::from_domain(patd)?;
        let mut conn = self.conn()?;
        conn.transaction::<_, PatdError, _>(|conn| {
            update_versioned(conn, &row, expected_version, audit)?;
            diesel::insert_into(attachments::table)
                .values(&AttachmentRow::from(attachment))
                .execute(conn)?;
            Ok(())
        })
    }

    fn list_attachments(&self, case_number: i64) -> PatdResult<Vec<Attachment>> {
        let mut conn = self.conn()?;
        let rows = attachments::table
            .filter(attachments::case_number.eq(case_number))
            .order(attachments::created_at.asc())
            .load::<AttachmentRow>(&mut conn)?;
        Ok(rows.into_iter().map(Attachment::from).collect())
    }

    fn load_configuration(&self) -> PatdResult<Configuration> {
        let mut conn = self.conn()?;
        let row = configuration::table
            .find(CONFIGURATION_ROW_ID)
            .first::<ConfigurationRow>(&mut conn)
            .optional()?;
        Ok(row.map(ConfigurationRow::into_domain).unwrap_or_default())
    }

    fn save_configuration(&self, value: &Configuration) -> PatdResult<()> {
        let row = ConfigurationRow::from_domain(value, Utc::now().naive_utc())?;
        let mut conn = self.conn()?;
        diesel::insert_into(configuration::table)
            .values(&row)
            .on_conflict(configuration::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}

impl ActorDirectory for PgStore {
    fn personnel(&self, id: Uuid) -> PatdResult<Option<Personnel>> {
        let mut conn = self.conn()?;
        personnel::table
            .find(id)
            .first::<PersonnelRow>(&mut conn)
            .optional()?
            .map(PersonnelRow::into_domain)
            .transpose()
    }

    fn account(&self, id: Uuid) -> PatdResult<Option<Account>> {
        let mut conn = self.conn()?;
        accounts::table
            .find(id)
            .first::<AccountRow>(&mut conn)
            .optional()?
            .map(AccountRow::into_domain)
            .transpose()
    }
}
