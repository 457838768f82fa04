use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{PatdError, PatdResult},
    patd::{Attachment, BlobRef},
    storage::ObjectStorage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Signature,
    Attachment,
}

impl ArtifactKind {
    fn folder(self) -> &'static str {
        match self {
            ArtifactKind::Signature => "signatures",
            ArtifactKind::Attachment => "attachments",
        }
    }
}

/// A captured signature, either as raw image bytes or as the
/// `data:image/png;base64,...` URL a canvas widget produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureInput {
    Bytes(Vec<u8>),
    DataUrl(String),
}

impl SignatureInput {
    pub fn decode(self) -> PatdResult<(Vec<u8>, String)> {
        let (bytes, content_type) = match self {
            SignatureInput::Bytes(bytes) => (bytes, "image/png".to_string()),
            SignatureInput::DataUrl(url) => decode_data_url(&url)?,
        };
        if bytes.is_empty() {
            return Err(PatdError::validation("signature is required"));
        }
        Ok((bytes, content_type))
    }
}

fn decode_data_url(url: &str) -> PatdResult<(Vec<u8>, String)> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| PatdError::validation("signature must be a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| PatdError::validation("malformed signature data URL"))?;
    let content_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| PatdError::validation("signature data URL must be base64 encoded"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| PatdError::validation(format!("invalid signature encoding: {err}")))?;
    let content_type = if content_type.is_empty() {
        "image/png"
    } else {
        content_type
    };
    Ok((bytes, content_type.to_string()))
}

pub fn case_prefix(case_number: i64) -> String {
    format!("patd_{case_number}/")
}

pub fn object_key(case_number: i64, kind: ArtifactKind, name: &str) -> String {
    format!(
        "{}{}/{}_{}",
        case_prefix(case_number),
        kind.folder(),
        Uuid::new_v4(),
        sanitize_name(name)
    )
}

fn sanitize_name(name: &str) -> String {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let sanitized: String = file_name
        .chars()
        .map(|ch| match ch {
            ch if ch.is_alphanumeric() => ch,
            '.' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Clone)]
pub struct ArtifactStore {
    storage: Arc<dyn ObjectStorage>,
}

impl ArtifactStore {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    pub async fn put_signature(
        &self,
        case_number: i64,
        label: &str,
        input: SignatureInput,
    ) -> PatdResult<BlobRef> {
        let (bytes, content_type) = input.decode()?;
        let extension = mime_guess::get_mime_extensions_str(&content_type)
            .and_then(|extensions| extensions.first())
            .copied()
            .unwrap_or("png");
        let key = object_key(
            case_number,
            ArtifactKind::Signature,
            &format!("{label}.{extension}"),
        );
        self.storage
            .put_object(&key, bytes, Some(content_type))
            .await?;
        Ok(key)
    }

    pub async fn put_attachment(
        &self,
        case_number: i64,
        original_name: &str,
        bytes: Vec<u8>,
        now: NaiveDateTime,
    ) -> PatdResult<Attachment> {
        if original_name.trim().is_empty() {
            return Err(PatdError::validation("attachment name is required"));
        }
        if bytes.is_empty() {
            return Err(PatdError::validation("attachment is empty"));
        }

        let checksum = hex::encode(Sha256::digest(&bytes));
        let size_bytes = i64::try_from(bytes.len()).map_err(PatdError::internal)?;
        let content_type = mime_guess::from_path(original_name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        let key = object_key(case_number, ArtifactKind::Attachment, original_name);

        self.storage
            .put_object(&key, bytes, content_type.clone())
            .await?;

        Ok(Attachment {
            id: Uuid::new_v4(),
            case_number,
            storage_key: key,
            original_name: original_name.to_string(),
            content_type,
            size_bytes,
            checksum,
            created_at: now,
        })
    }

    pub async fn read(&self, key: &str) -> PatdResult<Vec<u8>> {
        Ok(self.storage.get_object(key).await?)
    }

    pub async fn discard(&self, key: &str) {
        if let Err(err) = self.storage.delete_object(key).await {
            warn!(key, error = %err, "failed to discard orphaned blob");
        }
    }

    /// Removes the whole case folder; returns the number of blobs deleted.
    pub async fn purge_case(&self, case_number: i64) -> PatdResult<usize> {
        let removed = self.storage.delete_prefix(&case_prefix(case_number)).await?;
        info!(case_number, removed, "case artifacts removed");
        Ok(removed)
    }
}
