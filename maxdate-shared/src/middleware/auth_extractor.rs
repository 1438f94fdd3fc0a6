use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

/// HS256 signing material shared by the token issuer and the extractor.
#[derive(Clone)]
pub struct JwtKeys {
    secret: Arc<str>,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self { secret: Arc::from(secret) }
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired, "token has expired")
            }
            _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
        })?;

        Ok(token_data.claims)
    }
}

/// Lets states wrapped in `Arc` hand out keys without violating orphan rules downstream.
impl<T> FromRef<Arc<T>> for JwtKeys
where
    JwtKeys: FromRef<T>,
{
    fn from_ref(state: &Arc<T>) -> Self {
        JwtKeys::from_ref(state.as_ref())
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = JwtKeys::from_ref(state).verify(token)?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn signed_token_verifies_with_same_secret() {
        let keys = JwtKeys::new("secret");
        let id = Uuid::new_v4();
        let token = keys.sign(&Claims::new(id, "anna@test.ru", 300)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let token = JwtKeys::new("one")
            .sign(&Claims::new(Uuid::new_v4(), "anna@test.ru", 300))
            .unwrap();
        let err = JwtKeys::new("two").verify(&token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = JwtKeys::new("secret");
        let token = keys.sign(&Claims::new(Uuid::new_v4(), "anna@test.ru", -120)).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err().code(), ErrorCode::TokenExpired);
    }

    #[test]
    fn bearer_scheme_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
    }
}
