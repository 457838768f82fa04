use std::{env, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Debug)]
pub struct S3Settings {
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub bucket: String,
}

#[derive(Clone, Debug)]
pub enum StorageSettings {
    Local { root: PathBuf },
    S3(S3Settings),
}

#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub storage: StorageSettings,
    pub llm: LlmSettings,
    pub deadline_tick_interval: Duration,
    pub sweep_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);

        let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());
        let storage = match backend.trim().to_ascii_lowercase().as_str() {
            "local" => StorageSettings::Local {
                root: env::var("STORAGE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./media")),
            },
            "s3" => StorageSettings::S3(S3Settings {
                endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                bucket: env::var("S3_BUCKET").context("S3_BUCKET must be set")?,
            }),
            other => bail!("STORAGE_BACKEND must be `local` or `s3`, got `{other}`"),
        };

        let llm = LlmSettings {
            endpoint: env::var("LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_LLM_ENDPOINT.to_string()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            api_key: env::var("LLM_API_KEY").ok().filter(|key| !key.trim().is_empty()),
            timeout: Duration::from_secs(
                env::var("LLM_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("LLM_TIMEOUT_SECONDS must be an integer")?,
            ),
        };

        let tick_seconds: u64 = env::var("DEADLINE_TICK_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("DEADLINE_TICK_SECONDS must be an integer")?;
        if tick_seconds == 0 || tick_seconds > 60 {
            bail!("DEADLINE_TICK_SECONDS must be between 1 and 60");
        }
        let sweep_hours: u64 = env::var("SWEEP_INTERVAL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("SWEEP_INTERVAL_HOURS must be an integer")?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            storage,
            llm,
            deadline_tick_interval: Duration::from_secs(tick_seconds),
            sweep_interval: Duration::from_secs(sweep_hours.max(1) * 3600),
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
