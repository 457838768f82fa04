use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PatdError, PatdResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    SegundaClasse,
    PrimeiraClasse,
    Cabo,
    TerceiroSargento,
    SegundoSargento,
    PrimeiroSargento,
    Suboficial,
    Aspirante,
    SegundoTenente,
    PrimeiroTenente,
    Capitao,
    Major,
    TenenteCoronel,
    Coronel,
    Brigadeiro,
    MajorBrigadeiro,
    TenenteBrigadeiro,
}

impl Rank {
    pub const ALL: [Rank; 17] = [
        Rank::SegundaClasse,
        Rank::PrimeiraClasse,
        Rank::Cabo,
        Rank::TerceiroSargento,
        Rank::SegundoSargento,
        Rank::PrimeiroSargento,
        Rank::Suboficial,
        Rank::Aspirante,
        Rank::SegundoTenente,
        Rank::PrimeiroTenente,
        Rank::Capitao,
        Rank::Major,
        Rank::TenenteCoronel,
        Rank::Coronel,
        Rank::Brigadeiro,
        Rank::MajorBrigadeiro,
        Rank::TenenteBrigadeiro,
    ];

    pub fn abbreviation(self) -> &'static str {
        match self {
            Rank::SegundaClasse => "S2",
            Rank::PrimeiraClasse => "S1",
            Rank::Cabo => "CB",
            Rank::TerceiroSargento => "3S",
            Rank::SegundoSargento => "2S",
            Rank::PrimeiroSargento => "1S",
            Rank::Suboficial => "SO",
            Rank::Aspirante => "ASP",
            Rank::SegundoTenente => "2T",
            Rank::PrimeiroTenente => "1T",
            Rank::Capitao => "CAP",
            Rank::Major => "MAJ",
            Rank::TenenteCoronel => "TC",
            Rank::Coronel => "CEL",
            Rank::Brigadeiro => "BRIG",
            Rank::MajorBrigadeiro => "MB",
            Rank::TenenteBrigadeiro => "TB",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl FromStr for Rank {
    type Err = PatdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Rank::ALL
            .into_iter()
            .find(|rank| rank.abbreviation() == normalized)
            .ok_or_else(|| PatdError::validation(format!("unknown rank {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: Uuid,
    /// SARAM, unique per member.
    pub service_number: String,
    pub rank: Rank,
    pub specialty: Option<String>,
    pub full_name: String,
    pub war_name: String,
    pub unit: Option<String>,
    pub sector: Option<String>,
    pub is_officer: bool,
    pub signature_ref: Option<String>,
}

impl Personnel {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.rank, self.war_name.to_uppercase())
    }

    pub fn belongs_to_sector(&self, sector: &str) -> bool {
        self.sector
            .as_deref()
            .map(|own| own.trim().eq_ignore_ascii_case(sector.trim()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ouvidoria,
    Officer,
    Commander,
    BaseCommander,
    Accused,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Ouvidoria => "ouvidoria",
            Role::Officer => "officer",
            Role::Commander => "commander",
            Role::BaseCommander => "base_commander",
            Role::Accused => "accused",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = PatdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ouvidoria" => Ok(Role::Ouvidoria),
            "officer" => Ok(Role::Officer),
            "commander" => Ok(Role::Commander),
            "base_commander" => Ok(Role::BaseCommander),
            "accused" => Ok(Role::Accused),
            "admin" => Ok(Role::Admin),
            other => Err(PatdError::validation(format!("unknown role {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub personnel_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub account_id: Option<Uuid>,
    pub personnel_id: Option<Uuid>,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            account_id: None,
            personnel_id: None,
            roles: Vec::new(),
        }
    }

    pub fn from_account(account: &Account) -> Self {
        Self {
            account_id: Some(account.id),
            personnel_id: account.personnel_id,
            roles: account.roles.clone(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.account_id.is_none()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_personnel(&self, personnel_id: Option<Uuid>) -> bool {
        match (self.personnel_id, personnel_id) {
            (Some(own), Some(other)) => own == other,
            _ => false,
        }
    }

    /// Identifier recorded in the audit log; `None` means the scheduler.
    pub fn audit_id(&self) -> Option<Uuid> {
        self.account_id
    }
}

pub trait ActorDirectory: Send + Sync + 'static {
    fn personnel(&self, id: Uuid) -> PatdResult<Option<Personnel>>;
    fn account(&self, id: Uuid) -> PatdResult<Option<Account>>;

    fn require_personnel(&self, id: Uuid) -> PatdResult<Personnel> {
        self.personnel(id)?
            .ok_or_else(|| PatdError::not_found(format!("personnel {id}")))
    }
}
