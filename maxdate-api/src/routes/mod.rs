pub mod auth;
pub mod cities;
pub mod health;
pub mod likes;
pub mod photos;
pub mod profiles;
pub mod users;

use validator::Validate;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

/// Runs derive-based DTO validation, reporting field errors as details.
pub(crate) fn validate_request<T: Validate>(req: &T) -> AppResult<()> {
    req.validate().map_err(|e| {
        AppError::with_details(
            ErrorCode::ValidationError,
            "request validation failed",
            serde_json::to_value(&e).unwrap_or_default(),
        )
    })
}
