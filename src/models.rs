use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, NewAuditEntry},
    directory::{Account, Personnel},
    error::{PatdError, PatdResult},
    machine::Status,
    patd::{Attachment, Configuration, Patd},
    sanction::{Natureza, Sanction},
    schema::*,
};

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = personnel)]
pub struct PersonnelRow {
    pub id: Uuid,
    pub service_number: String,
    pub rank: String,
    pub specialty: Option<String>,
    pub full_name: String,
    pub war_name: String,
    pub unit: Option<String>,
    pub sector: Option<String>,
    pub is_officer: bool,
    pub signature_ref: Option<String>,
}

impl PersonnelRow {
    pub fn into_domain(self) -> PatdResult<Personnel> {
        Ok(Personnel {
            id: self.id,
            service_number: self.service_number,
            rank: self.rank.parse()?,
            specialty: self.specialty,
            full_name: self.full_name,
            war_name: self.war_name,
            unit: self.unit,
            sector: self.sector,
            is_officer: self.is_officer,
            signature_ref: self.signature_ref,
        })
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = accounts)]
pub struct AccountRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub personnel_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AccountRow {
    pub fn into_domain(self) -> PatdResult<Account> {
        let roles = self
            .roles
            .iter()
            .map(|role| role.parse())
            .collect::<PatdResult<Vec<_>>>()?;
        Ok(Account {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            roles,
            personnel_id: self.personnel_id,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = configuration)]
pub struct ConfigurationRow {
    pub id: i32,
    pub default_commander_id: Option<Uuid>,
    pub defense_business_days: i32,
    pub deadline_extra_minutes: i64,
    pub reconsideration_business_days: i32,
    pub reincidence_lookback_days: i32,
    pub investigating_sector: String,
    pub soft_delete_retention_days: i32,
    pub updated_at: NaiveDateTime,
}

pub const CONFIGURATION_ROW_ID: i32 = 1;

impl ConfigurationRow {
    pub fn into_domain(self) -> Configuration {
        Configuration {
            default_commander_id: self.default_commander_id,
            defense_business_days: non_negative(self.defense_business_days),
            deadline_extra_minutes: self.deadline_extra_minutes,
            reconsideration_business_days: non_negative(self.reconsideration_business_days),
            reincidence_lookback_days: non_negative(self.reincidence_lookback_days),
            investigating_sector: self.investigating_sector,
            soft_delete_retention_days: non_negative(self.soft_delete_retention_days),
        }
    }

    pub fn from_domain(configuration: &Configuration, now: NaiveDateTime) -> PatdResult<Self> {
        Ok(Self {
            id: CONFIGURATION_ROW_ID,
            default_commander_id: configuration.default_commander_id,
            defense_business_days: to_i32(configuration.defense_business_days)?,
            deadline_extra_minutes: configuration.deadline_extra_minutes,
            reconsideration_business_days: to_i32(configuration.reconsideration_business_days)?,
            reincidence_lookback_days: to_i32(configuration.reincidence_lookback_days)?,
            investigating_sector: configuration.investigating_sector.clone(),
            soft_delete_retention_days: to_i32(configuration.soft_delete_retention_days)?,
            updated_at: now,
        })
    }
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_i32(value: u32) -> PatdResult<i32> {
    i32::try_from(value).map_err(|_| PatdError::validation(format!("{value} is out of range")))
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = patds, treat_none_as_null = true)]
pub struct PatdRow {
    pub id: Uuid,
    pub case_number: i64,
    pub accused_id: Uuid,
    pub officer_id: Option<Uuid>,
    pub witness1_id: Option<Uuid>,
    pub witness2_id: Option<Uuid>,
    pub commander_id: Option<Uuid>,
    pub transgression: String,
    pub formal_transgression: Option<String>,
    pub affirmative_statement: Option<String>,
    pub defense: Option<String>,
    pub defense_summary: Option<String>,
    pub reconsideration_text: Option<String>,
    pub report: Option<String>,
    pub reconsideration_report: Option<String>,
    pub items: Value,
    pub circumstances: Value,
    pub natureza: Option<String>,
    pub behavior_delta: Option<String>,
    pub suggested_sanction: Option<String>,
    pub applied_sanction: Option<Value>,
    pub reconsidered_sanction: Option<Value>,
    pub justified: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub notified_at: Option<NaiveDateTime>,
    pub deadline_start: Option<NaiveDateTime>,
    pub deadline_end: Option<NaiveDateTime>,
    pub reconsideration_opened_at: Option<NaiveDateTime>,
    pub reconsideration_deadline: Option<NaiveDateTime>,
    pub reconsideration_at: Option<NaiveDateTime>,
    pub terminated_at: Option<NaiveDateTime>,
    pub published_at: Option<NaiveDateTime>,
    pub signatures: Value,
    pub protocol_code: Option<String>,
    pub origin_letter_ref: Option<String>,
    pub bulletin_ref: Option<String>,
    pub commander_comment: Option<String>,
    pub status: String,
    pub previous_status: Option<String>,
    pub deleted_at: Option<NaiveDateTime>,
    pub version: i64,
}

impl PatdRow {
    pub fn from_domain(patd: &Patd) -> PatdResult<Self> {
        Ok(Self {
            id: patd.id,
            case_number: patd.case_number,
            accused_id: patd.accused_id,
            officer_id: patd.officer_id,
            witness1_id: patd.witness1_id,
            witness2_id: patd.witness2_id,
            commander_id: patd.commander_id,
            transgression: patd.transgression.clone(),
            formal_transgression: patd.formal_transgression.clone(),
            affirmative_statement: patd.affirmative_statement.clone(),
            defense: patd.defense.clone(),
            defense_summary: patd.defense_summary.clone(),
            reconsideration_text: patd.reconsideration_text.clone(),
            report: patd.report.clone(),
            reconsideration_report: patd.reconsideration_report.clone(),
            items: serde_json::to_value(&patd.items)?,
            circumstances: serde_json::to_value(&patd.circumstances)?,
            natureza: patd.natureza.map(|natureza| enum_key(&natureza)).transpose()?,
            behavior_delta: patd.behavior_delta.clone(),
            suggested_sanction: patd.suggested_sanction.clone(),
            applied_sanction: patd.applied_sanction.map(serde_json::to_value).transpose()?,
            reconsidered_sanction: patd
                .reconsidered_sanction
                .map(serde_json::to_value)
                .transpose()?,
            justified: patd.justified,
            created_at: patd.created_at,
            updated_at: patd.updated_at,
            notified_at: patd.notified_at,
            deadline_start: patd.deadline_start,
            deadline_end: patd.deadline_end,
            reconsideration_opened_at: patd.reconsideration_opened_at,
            reconsideration_deadline: patd.reconsideration_deadline,
            reconsideration_at: patd.reconsideration_at,
            terminated_at: patd.terminated_at,
            published_at: patd.published_at,
            signatures: serde_json::to_value(&patd.signatures)?,
            protocol_code: patd.protocol_code.clone(),
            origin_letter_ref: patd.origin_letter_ref.clone(),
            bulletin_ref: patd.bulletin_ref.clone(),
            commander_comment: patd.commander_comment.clone(),
            status: patd.status.as_str().to_string(),
            previous_status: patd.previous_status.map(|status| status.as_str().to_string()),
            deleted_at: patd.deleted_at,
            version: patd.version,
        })
    }

    pub fn into_domain(self) -> PatdResult<Patd> {
        Ok(Patd {
            id: self.id,
            case_number: self.case_number,
            accused_id: self.accused_id,
            officer_id: self.officer_id,
            witness1_id: self.witness1_id,
            witness2_id: self.witness2_id,
            commander_id: self.commander_id,
            transgression: self.transgression,
            formal_transgression: self.formal_transgression,
            affirmative_statement: self.affirmative_statement,
            defense: self.defense,
            defense_summary: self.defense_summary,
            reconsideration_text: self.reconsideration_text,
            report: self.report,
            reconsideration_report: self.reconsideration_report,
            items: serde_json::from_value(self.items)?,
            circumstances: serde_json::from_value(self.circumstances)?,
            natureza: self
                .natureza
                .as_deref()
                .map(str::parse::<Natureza>)
                .transpose()?,
            behavior_delta: self.behavior_delta,
            suggested_sanction: self.suggested_sanction,
            applied_sanction: self
                .applied_sanction
                .map(serde_json::from_value::<Sanction>)
                .transpose()?,
            reconsidered_sanction: self
                .reconsidered_sanction
                .map(serde_json::from_value::<Sanction>)
                .transpose()?,
            justified: self.justified,
            created_at: self.created_at,
            updated_at: self.updated_at,
            notified_at: self.notified_at,
            deadline_start: self.deadline_start,
            deadline_end: self.deadline_end,
            reconsideration_opened_at: self.reconsideration_opened_at,
            reconsideration_deadline: self.reconsideration_deadline,
            reconsideration_at: self.reconsideration_at,
            terminated_at: self.terminated_at,
            published_at: self.published_at,
            signatures: serde_json::from_value(self.signatures)?,
            protocol_code: self.protocol_code,
            origin_letter_ref: self.origin_letter_ref,
            bulletin_ref: self.bulletin_ref,
            commander_comment: self.commander_comment,
            status: self.status.parse::<Status>()?,
            previous_status: self
                .previous_status
                .as_deref()
                .map(str::parse::<Status>)
                .transpose()?,
            deleted_at: self.deleted_at,
            version: self.version,
        })
    }
}

fn enum_key<T: serde::Serialize>(value: &T) -> PatdResult<String> {
    match serde_json::to_value(value)? {
        Value::String(key) => Ok(key),
        other => Err(PatdError::internal(format!("expected string key, got {other}"))),
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = attachments)]
pub struct AttachmentRow {
    pub id: Uuid,
    pub case_number: i64,
    pub storage_key: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: String,
    pub created_at: NaiveDateTime,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Self {
            id: row.id,
            case_number: row.case_number,
            storage_key: row.storage_key,
            original_name: row.original_name,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            checksum: row.checksum,
            created_at: row.created_at,
        }
    }
}

impl From<&Attachment> for AttachmentRow {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id,
            case_number: attachment.case_number,
            storage_key: attachment.storage_key.clone(),
            original_name: attachment.original_name.clone(),
            content_type: attachment.content_type.clone(),
            size_bytes: attachment.size_bytes,
            checksum: attachment.checksum.clone(),
            created_at: attachment.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = audit_entries)]
pub struct AuditRow {
    pub id: i64,
    pub case_number: i64,
    pub ts: NaiveDateTime,
    pub actor_id: Option<Uuid>,
    pub from_state: Option<String>,
    pub to_state: String,
    pub reason: String,
}

impl AuditRow {
    pub fn into_domain(self) -> PatdResult<AuditEntry> {
        Ok(AuditEntry {
            id: self.id,
            case_number: self.case_number,
            ts: self.ts,
            actor_id: self.actor_id,
            from_state: self
                .from_state
                .as_deref()
                .map(str::parse::<Status>)
                .transpose()?,
            to_state: self.to_state.parse()?,
            reason: self.reason,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = audit_entries)]
pub struct NewAuditRow {
    pub case_number: i64,
    pub ts: NaiveDateTime,
    pub actor_id: Option<Uuid>,
    pub from_state: Option<String>,
    pub to_state: String,
    pub reason: String,
}

impl From<&NewAuditEntry> for NewAuditRow {
    fn from(entry: &NewAuditEntry) -> Self {
        Self {
            case_number: entry.case_number,
            ts: entry.ts,
            actor_id: entry.actor_id,
            from_state: entry.from_state.map(|status| status.as_str().to_string()),
            to_state: entry.to_state.as_str().to_string(),
            reason: entry.reason.clone(),
        }
    }
}
