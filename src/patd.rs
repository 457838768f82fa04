use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    clock,
    error::{PatdError, PatdResult},
    machine::Status,
    sanction::{Natureza, Sanction},
};

pub type BlobRef = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryItem {
    pub number: u32,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circumstances {
    pub aggravators: Vec<char>,
    pub mitigators: Vec<char>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    pub officer: Option<BlobRef>,
    pub witness1: Option<BlobRef>,
    pub witness2: Option<BlobRef>,
    /// First entry acknowledges the notification, the next ones the NPD.
    #[serde(default)]
    pub accused_acknowledgements: Vec<BlobRef>,
    pub defense: Option<BlobRef>,
    pub reconsideration: Option<BlobRef>,
    #[serde(default)]
    pub reconsideration_npd: Vec<BlobRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WitnessSlot {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patd {
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

    pub items: Vec<RegulatoryItem>,
    pub circumstances: Circumstances,
    pub natureza: Option<Natureza>,
    pub behavior_delta: Option<String>,

    pub suggested_sanction: Option<String>,
    pub applied_sanction: Option<Sanction>,
    pub reconsidered_sanction: Option<Sanction>,
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

    pub signatures: Signatures,

    pub protocol_code: Option<String>,
    pub origin_letter_ref: Option<String>,
    pub bulletin_ref: Option<String>,
    pub commander_comment: Option<String>,

    pub status: Status,
    pub previous_status: Option<Status>,
    pub deleted_at: Option<NaiveDateTime>,
    pub version: i64,
}

impl Patd {
    pub fn new(case_number: i64, accused_id: Uuid, transgression: String, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_number,
            accused_id,
            officer_id: None,
            witness1_id: None,
            witness2_id: None,
            commander_id: None,
            transgression,
            formal_transgression: None,
            affirmative_statement: None,
            defense: None,
            defense_summary: None,
            reconsideration_text: None,
            report: None,
            reconsideration_report: None,
            items: Vec::new(),
            circumstances: Circumstances::default(),
            natureza: None,
            behavior_delta: None,
            suggested_sanction: None,
            applied_sanction: None,
            reconsidered_sanction: None,
            justified: false,
            created_at: now,
            updated_at: now,
            notified_at: None,
            deadline_start: None,
            deadline_end: None,
            reconsideration_opened_at: None,
            reconsideration_deadline: None,
            reconsideration_at: None,
            terminated_at: None,
            published_at: None,
            signatures: Signatures::default(),
            protocol_code: None,
            origin_letter_ref: None,
            bulletin_ref: None,
            commander_comment: None,
            status: Status::AwaitingOfficerDefinition,
            previous_status: None,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The sanction that ends up published: the reconsidered one when the
    /// base commander changed it.
    pub fn effective_sanction(&self) -> Option<Sanction> {
        self.reconsidered_sanction.or(self.applied_sanction)
    }

    pub fn active_deadline(&self) -> Option<NaiveDateTime> {
        match self.status {
            Status::AwaitingJustification => self.deadline_end,
            Status::ReconsiderationWindow => self.reconsideration_deadline,
            _ => None,
        }
    }

    pub fn is_witness(&self, personnel_id: Uuid) -> bool {
        self.witness1_id == Some(personnel_id) || self.witness2_id == Some(personnel_id)
    }

    /// Officer, every assigned witness, and the accused (on top of the
    /// notification acknowledgement) must have signed the NPD.
    pub fn npd_signatures_complete(&self) -> bool {
        let witness_signed = |witness: Option<Uuid>, signature: &Option<BlobRef>| {
            witness.is_none() || signature.is_some()
        };
        self.signatures.officer.is_some()
            && witness_signed(self.witness1_id, &self.signatures.witness1)
            && witness_signed(self.witness2_id, &self.signatures.witness2)
            && self.signatures.accused_acknowledgements.len() >= 2
    }

    pub fn check_invariants(&self) -> PatdResult<()> {
        if self.status.requires_officer() && self.officer_id.is_none() {
            return Err(PatdError::internal(format!(
                "case {} has no responsible officer in {}",
                self.case_number, self.status
            )));
        }
        if self.previous_status == Some(self.status) {
            return Err(PatdError::internal(format!(
                "case {} remembers its own status as previous",
                self.case_number
            )));
        }
        for sanction in [self.applied_sanction, self.reconsidered_sanction]
            .into_iter()
            .flatten()
        {
            sanction.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatdFilter {
    pub status: Option<Status>,
    pub accused_id: Option<Uuid>,
    pub include_deleted: bool,
}

impl PatdFilter {
    pub fn matches(&self, patd: &Patd) -> bool {
        (self.include_deleted || !patd.is_deleted())
            && self.status.map_or(true, |status| patd.status == status)
            && self.accused_id.map_or(true, |accused| patd.accused_id == accused)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub default_commander_id: Option<Uuid>,
    pub defense_business_days: u32,
    pub deadline_extra_minutes: i64,
    pub reconsideration_business_days: u32,
    pub reincidence_lookback_days: u32,
    pub investigating_sector: String,
    pub soft_delete_retention_days: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_commander_id: None,
            defense_business_days: 5,
            deadline_extra_minutes: 0,
            reconsideration_business_days: 5,
            reincidence_lookback_days: 365,
            investigating_sector: "Ouvidoria".to_string(),
            soft_delete_retention_days: 30,
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> PatdResult<()> {
        if self.defense_business_days == 0 {
            return Err(PatdError::validation("defense window needs at least one business day"));
        }
        if self.reconsideration_business_days == 0 {
            return Err(PatdError::validation(
                "reconsideration window needs at least one business day",
            ));
        }
        clock::check_business_days(self.defense_business_days, "defense window")?;
        clock::check_business_days(self.reconsideration_business_days, "reconsideration window")?;
        clock::check_extra_minutes(self.deadline_extra_minutes)?;
        if self.investigating_sector.trim().is_empty() {
            return Err(PatdError::validation("investigating sector must be set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub case_number: i64,
    pub storage_key: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: String,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::sanction::SanctionType;

    fn sample() -> Patd {
        let now = NaiveDate::from_ymd_opt(2026, 10, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Patd::new(101, Uuid::new_v4(), "Atrasou-se para a formatura".into(), now)
    }

    #[test]
    fn fresh_case_satisfies_invariants() {
        let patd = sample();
        assert_eq!(patd.status, Status::AwaitingOfficerDefinition);
        patd.check_invariants().unwrap();
    }

    #[test]
    fn missing_officer_after_intake_is_detected() {
        let mut patd = sample();
        patd.status = Status::AwaitingAssignmentApproval;
        assert!(patd.check_invariants().is_err());
    }

    #[test]
    fn npd_requires_every_assigned_signer() {
        let mut patd = sample();
        patd.witness1_id = Some(Uuid::new_v4());
        patd.signatures.officer = Some("sig/officer".into());
        patd.signatures.accused_acknowledgements = vec!["sig/ack".into(), "sig/npd".into()];
        assert!(!patd.npd_signatures_complete());
        patd.signatures.witness1 = Some("sig/w1".into());
        assert!(patd.npd_signatures_complete());
    }

    #[test]
    fn reconsidered_sanction_wins() {
        let mut patd = sample();
        patd.applied_sanction = Some(Sanction::new(SanctionType::Detention, 4).unwrap());
        patd.reconsidered_sanction = Some(Sanction::reprimand());
        assert_eq!(patd.effective_sanction(), Some(Sanction::reprimand()));
    }

    #[test]
    fn default_filter_hides_deleted_cases() {
        let mut patd = sample();
        patd.deleted_at = Some(patd.created_at);
        assert!(!PatdFilter::default().matches(&patd));
        assert!(PatdFilter {
            include_deleted: true,
            ..Default::default()
        }
        .matches(&patd));
    }

    #[test]
    fn configuration_rejects_out_of_range_windows() {
        assert!(Configuration::default().validate().is_ok());

        let huge_offset = Configuration {
            deadline_extra_minutes: i64::MAX / 60,
            ..Configuration::default()
        };
        assert!(matches!(huge_offset.validate(), Err(PatdError::Validation(_))));

        let endless_window = Configuration {
            defense_business_days: u32::MAX,
            ..Configuration::default()
        };
        assert!(matches!(endless_window.validate(), Err(PatdError::Validation(_))));

        let endless_reconsideration = Configuration {
            reconsideration_business_days: clock::MAX_BUSINESS_DAYS + 1,
            ..Configuration::default()
        };
        assert!(endless_reconsideration.validate().is_err());
    }
}
