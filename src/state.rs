use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use anyhow::Context;
use chrono::{Duration, NaiveDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::{
    artifacts::ArtifactStore,
    audit::NewAuditEntry,
    clock::{Clock, SystemClock},
    config::{AppConfig, StorageSettings},
    db,
    directory::{Actor, ActorDirectory},
    error::{PatdError, PatdResult},
    llm::{LlmGateway, OpenAiGateway},
    machine::{next_status, Trigger},
    patd::{Attachment, Configuration, Patd},
    s3,
    storage::{LocalStorage, ObjectStorage, S3Storage},
    store::{PatdStore, PgStore},
};

/// One async mutex per case number. User actions wait for the lock; the
/// deadline ticker only tries it and defers on contention.
#[derive(Clone, Default)]
pub struct CaseLocks {
    inner: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl CaseLocks {
    fn entry(&self, case_number: i64) -> Arc<Mutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(case_number).or_default().clone()
    }

    pub async fn lock(&self, case_number: i64) -> OwnedMutexGuard<()> {
        self.entry(case_number).lock_owned().await
    }

    pub fn try_lock(&self, case_number: i64) -> Option<OwnedMutexGuard<()>> {
        self.entry(case_number).try_lock_owned().ok()
    }

    pub fn forget(&self, case_number: i64) {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.remove(&case_number);
    }
}

/// What a committed mutation did to the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Transition(Trigger),
    Update,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PatdStore>,
    pub directory: Arc<dyn ActorDirectory>,
    pub artifacts: ArtifactStore,
    pub llm: Arc<dyn LlmGateway>,
    pub clock: Arc<dyn Clock>,
    pub locks: CaseLocks,
    configuration_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PatdStore>,
        directory: Arc<dyn ActorDirectory>,
        artifacts: ArtifactStore,
        llm: Arc<dyn LlmGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            artifacts,
            llm,
            clock,
            locks: CaseLocks::default(),
            configuration_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn from_config(config: &AppConfig, pool_size: u32) -> anyhow::Result<Self> {
        let pool = db::init_pool_with_size(&config.database_url, pool_size)?;
        let applied = db::run_migrations(&pool).context("failed to migrate database")?;
        if applied > 0 {
            info!(applied, "database migrations applied");
        }

        let storage: Arc<dyn ObjectStorage> = match &config.storage {
            StorageSettings::Local { root } => Arc::new(LocalStorage::new(root.clone())),
            StorageSettings::S3(settings) => {
                let client = s3::build_client(settings).await?;
                Arc::new(S3Storage::new(client, settings.bucket.clone()))
            }
        };
        let store = Arc::new(PgStore::new(pool));
        let llm = Arc::new(OpenAiGateway::new(&config.llm)?);

        Ok(Self::new(
            store.clone(),
            store,
            ArtifactStore::new(storage),
            llm,
            Arc::new(SystemClock),
        ))
    }

    pub fn configuration(&self) -> PatdResult<Configuration> {
        self.store.load_configuration()
    }

    pub(crate) async fn lock_configuration(&self) -> OwnedMutexGuard<()> {
        self.configuration_lock.clone().lock_owned().await
    }

    pub fn load_live(&self, case_number: i64) -> PatdResult<Patd> {
        self.store
            .find_patd(case_number)?
            .filter(|patd| !patd.is_deleted())
            .ok_or_else(|| PatdError::case_not_found(case_number))
    }

    /// Timestamp for the next mutation of `patd`: the clock, nudged forward
    /// when needed so a case's history never goes back in time.
    pub fn stamp(&self, patd: &Patd) -> NaiveDateTime {
        let now = self.clock.now();
        let floor = patd.updated_at + Duration::microseconds(1);
        now.max(floor)
    }

    /// Applies the bookkeeping every mutation shares and persists the case
    /// together with its audit entry. The caller holds the case lock and
    /// has already applied its field changes to `patd`; on error nothing is
    /// written and the caller drops its copy.
    pub fn commit(
        &self,
        patd: &mut Patd,
        actor: &Actor,
        at: NaiveDateTime,
        change: Change,
        reason: impl Into<String>,
    ) -> PatdResult<()> {
        self.persist(patd, actor, at, change, reason.into(), None)
    }

    pub fn commit_attachment(
        &self,
        patd: &mut Patd,
        actor: &Actor,
        at: NaiveDateTime,
        attachment: &Attachment,
    ) -> PatdResult<()> {
        let reason = format!("attachment {} added", attachment.original_name);
        self.persist(patd, actor, at, Change::Update, reason, Some(attachment))
    }

    fn persist(
        &self,
        patd: &mut Patd,
        actor: &Actor,
        at: NaiveDateTime,
        change: Change,
        reason: String,
        attachment: Option<&Attachment>,
    ) -> PatdResult<()> {
        let from = patd.status;
        let to = match change {
            Change::Transition(trigger) => next_status(from, trigger, patd.previous_status)?,
            Change::Update => from,
        };

        let expected_version = patd.version;
        let at = at.max(patd.updated_at + Duration::microseconds(1));
        if to != from {
            patd.previous_status = Some(from);
            patd.status = to;
        }
        patd.updated_at = at;
        patd.version += 1;
        patd.check_invariants()?;

        let audit = NewAuditEntry {
            case_number: patd.case_number,
            ts: at,
            actor_id: actor.audit_id(),
            from_state: Some(from),
            to_state: to,
            reason: reason.clone(),
        };
        match attachment {
            Some(attachment) => {
                self.store
                    .save_patd_with_attachment(patd, expected_version, &audit, attachment)?
            }
            None => self.store.save_patd(patd, expected_version, &audit)?,
        }

        match change {
            Change::Transition(trigger) => info!(
                case_number = patd.case_number,
                %trigger,
                from = %from,
                to = %to,
                "case transitioned"
            ),
            Change::Update => info!(case_number = patd.case_number, %reason, "case updated"),
        }
        Ok(())
    }
}
