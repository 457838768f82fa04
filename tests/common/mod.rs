use std::collections::{HashMap, VecDeque};
use std::env;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use diesel::connection::SimpleConnection;
use once_cell::sync::Lazy;
use patd::artifacts::{ArtifactStore, SignatureInput};
use patd::clock::Clock;
use patd::db::{self, PgPool};
use patd::directory::{Account, Actor, Personnel, Rank, Role};
use patd::llm::{LlmGateway, LlmRequest};
use patd::storage::ObjectStorage;
use patd::store::MemoryStore;
use patd::workflow;
use patd::AppState;
use rand::rngs::OsRng;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const PASSWORD: &str = "senha-da-ouvidoria";

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: Option<String>) -> Result<()> {
        let stored = StoredObject {
            key: key.to_string(),
            bytes,
            content_type,
        };
        let mut guard = self.objects.lock().await;
        guard.insert(stored.key.clone(), stored);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let guard = self.objects.lock().await;
        guard
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| anyhow!("object {key} missing"))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let mut guard = self.objects.lock().await;
        guard.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut guard = self.objects.lock().await;
        let before = guard.len();
        guard.retain(|key, _| !key.starts_with(prefix));
        Ok(before - guard.len())
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }

    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }

    #[allow(dead_code)]
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let guard = self.objects.lock().await;
        let mut keys: Vec<String> = guard
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

/// Replays queued replies in order and records every request it saw.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: StdMutex<VecDeque<Result<String, String>>>,
    requests: StdMutex<Vec<LlmRequest>>,
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("request log poisoned"))?
            .push(request.clone());
        let next = self
            .replies
            .lock()
            .map_err(|_| anyhow!("reply queue poisoned"))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}

#[allow(dead_code)]
impl ScriptedLlm {
    pub fn reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn fail(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn pending(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Queues the three replies of one analysis run.
    pub fn script_analysis(&self, items: &[u32], aggravators: &[&str], mitigators: &[&str], suggestion: (&str, u32)) {
        let classified: Vec<_> = items.iter().map(|number| json!({ "number": number })).collect();
        self.reply(json!({ "items": classified }).to_string());
        self.reply(
            json!({
                "aggravators": aggravators,
                "mitigators": mitigators,
                "items": items,
                "natureza": "media",
            })
            .to_string(),
        );
        self.reply(
            json!({
                "type": suggestion.0,
                "days": suggestion.1,
                "explanation": "enquadramento conforme o RDAER",
            })
            .to_string(),
        );
    }
}

pub struct ManualClock {
    now: StdMutex<NaiveDateTime>,
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: StdMutex::new(start),
        }
    }

    pub fn set(&self, value: NaiveDateTime) {
        *self.now.lock().unwrap() = value;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap();
        *guard += by;
    }
}

#[allow(dead_code)]
#[derive(Clone)]
pub struct Member {
    pub personnel: Personnel,
    pub account: Account,
    pub actor: Actor,
}

#[allow(dead_code)]
impl Member {
    pub fn id(&self) -> Uuid {
        self.personnel.id
    }
}

/// The cast every scenario draws from.
#[allow(dead_code)]
pub struct Cast {
    pub staff: Member,
    pub admin: Member,
    pub accused: Member,
    pub officer: Member,
    pub other_officer: Member,
    pub commander: Member,
    pub base_commander: Member,
    pub witness1: Member,
    pub witness2: Member,
}

#[allow(dead_code)]
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<FakeStorage>,
    pub llm: Arc<ScriptedLlm>,
    pub clock: Arc<ManualClock>,
    pub cast: Cast,
}

/// Monday 5 October 2026, 09:00.
#[allow(dead_code)]
pub fn monday_morning() -> NaiveDateTime {
    at(2026, 10, 5, 9, 0)
}

#[allow(dead_code)]
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid test timestamp")
}

#[allow(dead_code)]
pub fn signature() -> SignatureInput {
    SignatureInput::DataUrl("data:image/png;base64,aGVsbG8=".to_string())
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::starting_at(monday_morning(), 1).await
    }

    pub async fn starting_at(start: NaiveDateTime, first_case_number: i64) -> Result<Self> {
        let store = Arc::new(MemoryStore::starting_at(first_case_number));
        let storage = Arc::new(FakeStorage::default());
        let llm = Arc::new(ScriptedLlm::default());
        let clock = Arc::new(ManualClock::new(start));

        let storage_for_state: Arc<dyn ObjectStorage> = storage.clone();
        let state = AppState::new(
            store.clone(),
            store.clone(),
            ArtifactStore::new(storage_for_state),
            llm.clone(),
            clock.clone(),
        );

        let cast = Cast {
            staff: enlist(&store, "ouvidoria", Rank::PrimeiroSargento, false, Some("Ouvidoria"), &[Role::Ouvidoria])?,
            admin: enlist(&store, "admin", Rank::Capitao, true, None, &[Role::Admin])?,
            accused: enlist(&store, "acusado", Rank::Cabo, false, Some("Hangar"), &[Role::Accused])?,
            officer: enlist(&store, "apurador", Rank::PrimeiroTenente, true, Some("Esquadrilha"), &[Role::Officer])?,
            other_officer: enlist(&store, "outro", Rank::SegundoTenente, true, Some("Esquadrilha"), &[Role::Officer])?,
            commander: enlist(&store, "comandante", Rank::TenenteCoronel, true, None, &[Role::Commander])?,
            base_commander: enlist(&store, "cmt_base", Rank::Coronel, true, None, &[Role::BaseCommander])?,
            witness1: enlist(&store, "testemunha1", Rank::TerceiroSargento, false, Some("Ouvidoria"), &[])?,
            witness2: enlist(&store, "testemunha2", Rank::Cabo, false, Some("ouvidoria"), &[])?,
        };

        Ok(Self {
            state,
            store,
            storage,
            llm,
            clock,
            cast,
        })
    }

    pub async fn open_case(&self, transgression: &str) -> Result<i64> {
        let case = workflow::create_patd(
            &self.state,
            &self.cast.staff.actor,
            self.cast.accused.id(),
            transgression,
        )
        .await?;
        Ok(case)
    }

    /// Opens a case and walks it to `awaiting_justification`.
    pub async fn notified_case(&self, transgression: &str) -> Result<i64> {
        let case = self.open_case(transgression).await?;
        workflow::assign_officer(&self.state, &self.cast.staff.actor, case, self.cast.officer.id()).await?;
        self.clock.advance(Duration::minutes(30));
        workflow::accept_assignment(&self.state, &self.cast.officer.actor, case, PASSWORD).await?;
        self.clock.advance(Duration::minutes(30));
        workflow::record_acknowledgement(&self.state, &self.cast.accused.actor, case, signature()).await?;
        Ok(case)
    }

    pub async fn patd(&self, case: i64) -> Result<patd::patd::Patd> {
        Ok(workflow::get_patd(&self.state, case, true).await?)
    }
}

fn enlist(
    store: &MemoryStore,
    username: &str,
    rank: Rank,
    is_officer: bool,
    sector: Option<&str>,
    roles: &[Role],
) -> Result<Member> {
    let personnel = Personnel {
        id: Uuid::new_v4(),
        service_number: format!("SARAM-{username}"),
        rank,
        specialty: None,
        full_name: format!("Militar {username}"),
        war_name: username.to_string(),
        unit: Some("BAAN".to_string()),
        sector: sector.map(str::to_string),
        is_officer,
        signature_ref: None,
    };
    let account = Account {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: hash_password(PASSWORD)?,
        roles: roles.to_vec(),
        personnel_id: Some(personnel.id),
    };
    store.insert_personnel(personnel.clone())?;
    store.insert_account(account.clone())?;
    let actor = Actor::from_account(&account);
    Ok(Member {
        personnel,
        account,
        actor,
    })
}

#[allow(dead_code)]
pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

/// Postgres pool for the store tests; `None` when no test database is
/// configured.
#[allow(dead_code)]
pub async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        return Ok(None);
    };
    let pool = db::init_pool_with_size(&database_url, db::DEFAULT_MAX_POOL_SIZE)?;
    let prepared = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        db::run_migrations(&prepared)?;
        let mut conn = prepared
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.batch_execute(
            "TRUNCATE TABLE audit_entries, attachments, patds, configuration, accounts, personnel RESTART IDENTITY CASCADE;",
        )
        .context("failed to truncate tables")?;
        Ok(())
    })
    .await
    .context("migration task panicked")??;
    Ok(Some(pool))
}

fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::Argon2;

    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string())
}
