use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// Domain invariant breached by a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    ManagerBusy,
    AgentBusy,
    InvalidRole,
    InvalidManagerRole,
    InvalidMemberRole,
    ManagerIsMember,
    InvalidSpecialty,
    InvalidPayment,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::ManagerBusy => "manager_busy",
            ViolationKind::AgentBusy => "agent_busy",
            ViolationKind::InvalidRole => "invalid_role",
            ViolationKind::InvalidManagerRole => "invalid_manager_role",
            ViolationKind::InvalidMemberRole => "invalid_member_role",
            ViolationKind::ManagerIsMember => "manager_is_member",
            ViolationKind::InvalidSpecialty => "invalid_specialty",
            ViolationKind::InvalidPayment => "invalid_payment",
        }
    }
}

/// Deletion blocked by an active reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedKind {
    AsManager,
    AsMember,
}

impl ProtectedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectedKind::AsManager => "protected_as_manager",
            ProtectedKind::AsMember => "protected_as_member",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{}: {}", .0.as_str(), .1)]
    Violation(ViolationKind, String),
    #[error("{}: {}", .0.as_str(), .1)]
    Protected(ProtectedKind, String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("integrity error: {0}")]
    Integrity(String),
}

impl AppError {
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn violation(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self::Violation(kind, message.into())
    }

    pub fn protected(kind: ProtectedKind, message: impl Into<String>) -> Self {
        Self::Protected(kind, message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    /// Post-guard constraint breach. The surrounding transaction must abort.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }

    /// Classifies a store error raised by a racing writer: unique-constraint
    /// breaches become recoverable conflicts, anything else stays a database
    /// error.
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(message.into()),
            _ => Self::Database(err),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Violation(_, _) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Protected(_, _) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();
        let error = match &self {
            AppError::AuthFailed(_) => "auth_failed",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Violation(kind, _) => kind.as_str(),
            AppError::Protected(kind, _) => kind.as_str(),
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration",
            AppError::Token(_) => "token",
            AppError::Database(_) => "database",
            AppError::Integrity(_) => "integrity",
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Integrity(value.to_string())
    }
}
