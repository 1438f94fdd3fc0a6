use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Account and authentication errors
/// - E2xxx: Profile and photo errors
/// - E3xxx: Likes, feed and match errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    BadRequest,
    PayloadTooLarge,

    // Accounts (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    EmailNotConfirmed,
    TokenExpired,
    TokenInvalid,
    PasswordTooWeak,
    InvalidEmail,
    ConfirmationTokenInvalid,
    ResetTokenInvalid,
    ResetTokenExpired,
    AccountLocked,
    AccountDeactivated,
    WrongPassword,
    PasswordReused,

    // Profiles (E2xxx)
    ProfileNotFound,
    ProfileAlreadyExists,
    Underage,
    InvalidAgeRange,
    CityNotFound,
    PhotoUploadFailed,
    PhotoLimitReached,
    PhotoNotFound,
    LastPhotoRequired,
    UnsupportedPhoto,

    // Likes and matches (E3xxx)
    CannotLikeSelf,
    UserNotFound,
    MatchNotFound,
    ProfileRequired,
    PhotoRequired,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::BadRequest => "E0005",
            Self::PayloadTooLarge => "E0006",

            // Accounts
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::EmailNotConfirmed => "E1003",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",
            Self::PasswordTooWeak => "E1006",
            Self::InvalidEmail => "E1007",
            Self::ConfirmationTokenInvalid => "E1008",
            Self::ResetTokenInvalid => "E1009",
            Self::ResetTokenExpired => "E1010",
            Self::AccountLocked => "E1011",
            Self::AccountDeactivated => "E1012",
            Self::WrongPassword => "E1013",
            Self::PasswordReused => "E1014",

            // Profiles
            Self::ProfileNotFound => "E2001",
            Self::ProfileAlreadyExists => "E2002",
            Self::Underage => "E2003",
            Self::InvalidAgeRange => "E2004",
            Self::CityNotFound => "E2005",
            Self::PhotoUploadFailed => "E2006",
            Self::PhotoLimitReached => "E2007",
            Self::PhotoNotFound => "E2008",
            Self::LastPhotoRequired => "E2009",
            Self::UnsupportedPhoto => "E2010",

            // Likes and matches
            Self::CannotLikeSelf => "E3001",
            Self::UserNotFound => "E3002",
            Self::MatchNotFound => "E3003",
            Self::ProfileRequired => "E3004",
            Self::PhotoRequired => "E3005",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::PhotoUploadFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::InvalidEmail | Self::Underage | Self::InvalidAgeRange
            | Self::CityNotFound | Self::PhotoLimitReached | Self::LastPhotoRequired
            | Self::UnsupportedPhoto | Self::CannotLikeSelf | Self::PhotoRequired
            | Self::WrongPassword | Self::PasswordReused | Self::ResetTokenExpired => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::PhotoNotFound
            | Self::UserNotFound | Self::MatchNotFound | Self::ProfileRequired
            | Self::ConfirmationTokenInvalid | Self::ResetTokenInvalid => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::EmailNotConfirmed | Self::AccountLocked
            | Self::AccountDeactivated => StatusCode::UNAUTHORIZED,
            Self::EmailAlreadyExists | Self::ProfileAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The code this error is reported with on the wire.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// True when the underlying database error is a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            AppError::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_keep_their_guidance_status() {
        assert_eq!(ErrorCode::ProfileRequired.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::PhotoRequired.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(ErrorCode::ProfileAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn code_reports_database_not_found_as_not_found() {
        let err = AppError::from(diesel::result::Error::NotFound);
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn validation_variant_uses_validation_code() {
        let err = AppError::Validation("bad".into());
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.to_string(), "validation error: bad");
    }
}
