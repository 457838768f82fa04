use thiserror::Error;

pub type PatdResult<T> = Result<T, PatdError>;

#[derive(Debug, Error)]
pub enum PatdError {
    #[error("transition not permitted: {0}")]
    GuardViolation(String),
    #[error("outside of allowed window: {0}")]
    DeadlineViolation(String),
    #[error("credential verification failed")]
    CredentialFailure,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("analysis failed: {0}")]
    AiFailure(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("case {0} was modified concurrently")]
    Conflict(i64),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PatdError {
    pub fn guard(message: impl Into<String>) -> Self {
        Self::GuardViolation(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn deadline(message: impl Into<String>) -> Self {
        Self::DeadlineViolation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn case_not_found(case_number: i64) -> Self {
        Self::NotFound(format!("case {case_number}"))
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        Self::Internal(error.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::GuardViolation(_) => "guard_violation",
            Self::DeadlineViolation(_) => "deadline_violation",
            Self::CredentialFailure => "credential_failure",
            Self::Validation(_) => "validation_error",
            Self::AiFailure(_) => "ai_failure",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<diesel::result::Error> for PatdError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => PatdError::not_found("record"),
            _ => PatdError::Storage(value.to_string()),
        }
    }
}

impl From<anyhow::Error> for PatdError {
    fn from(value: anyhow::Error) -> Self {
        PatdError::internal(format!("{value:#}"))
    }
}

impl From<std::io::Error> for PatdError {
    fn from(value: std::io::Error) -> Self {
        PatdError::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for PatdError {
    fn from(value: serde_json::Error) -> Self {
        PatdError::internal(value)
    }
}
