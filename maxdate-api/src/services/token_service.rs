use uuid::Uuid;

use maxdate_shared::errors::AppError;
use maxdate_shared::middleware::JwtKeys;
use maxdate_shared::types::auth::{AccessToken, Claims};

pub fn create_access_token(
    keys: &JwtKeys,
    user_id: Uuid,
    email: &str,
    ttl_secs: i64,
) -> Result<AccessToken, AppError> {
    let claims = Claims::new(user_id, email, ttl_secs);
    let token = keys.sign(&claims)?;
    Ok(AccessToken::bearer(token, ttl_secs))
}
