use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{db::users as db_users, error::AppError, models::User, routes::AppState};

const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub kind: TokenKind,
    /// 같은 초에 발급된 토큰도 서로 다르게 만드는 고유값
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization token is required")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
    #[error("Authorization token has expired")]
    ExpiredToken,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

/// Bearer 토큰으로 인증된 요청의 사용자
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let claims = verify_token(token, TokenKind::Access, &state.jwt_secret)?;

        // 토큰 발급 뒤에 계정이 삭제되었을 수 있음
        let user = db_users::find_by_id(&state.pool, &claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser(user.into()))
    }
}

fn create_token(
    user_id: &str,
    kind: TokenKind,
    ttl: Duration,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        kind,
        jti: uuid::Uuid::now_v7().to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn create_access_token(
    user_id: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(
        user_id,
        TokenKind::Access,
        Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
        secret,
    )
}

pub fn create_refresh_token(
    user_id: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    create_token(
        user_id,
        TokenKind::Refresh,
        Duration::days(REFRESH_TOKEN_TTL_DAYS),
        secret,
    )
}

/// 서명과 만료를 검증하고, 토큰 종류가 기대한 것과 다르면 거부합니다.
pub fn verify_token(token: &str, kind: TokenKind, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    if token_data.claims.kind != kind {
        return Err(AuthError::InvalidToken);
    }

    Ok(token_data.claims)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn access_token_round_trips_subject() {
        let token = create_access_token("user-1", SECRET).unwrap();
        let claims = verify_token(&token, TokenKind::Access, SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let token = create_refresh_token("user-1", SECRET).unwrap();
        assert!(matches!(
            verify_token(&token, TokenKind::Access, SECRET),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_access_token("user-1", SECRET).unwrap();
        assert!(verify_token(&token, TokenKind::Access, "other").is_err());
    }

    #[test]
    fn hash_token_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
    }
}
