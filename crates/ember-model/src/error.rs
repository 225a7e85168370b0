use thiserror::Error;

/// Normalized error kinds shared by the repository, permission, voice,
/// call-registry and service layers.
///
/// HTTP handlers map these to status codes; WebSocket intent handlers wrap
/// them in a directed error event. Neither surface ever forwards a raw
/// database error string to a client.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("already exists: {0}")]
    AlreadyExists(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    #[error("busy")]
    Busy,

    #[error("wrong state: {0}")]
    WrongState(&'static str),

    #[error("rate limited")]
    RateLimited,

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// A short machine-readable tag for the error kind, used in WebSocket error
/// events and as a basis for HTTP status mapping. Permission denials and
/// missing rows both surface as `not_found` where leaking existence would
/// itself be a privilege leak; callers decide which to use at the call site.
impl DomainError {
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::AlreadyExists(_) => "already_exists",
            DomainError::Unauthorized => "unauthorized",
            DomainError::Forbidden => "forbidden",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::Conflict(_) => "conflict",
            DomainError::CapacityExceeded(_) => "capacity_exceeded",
            DomainError::Busy => "busy",
            DomainError::WrongState(_) => "wrong_state",
            DomainError::RateLimited => "rate_limited",
            DomainError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DomainError::NotFound("row"),
            other => DomainError::Internal(other.into()),
        }
    }
}
