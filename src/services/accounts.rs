//! # 계정 서비스
//!
//! 이메일/비밀번호 계정의 가입, 로그인, 토큰 갱신, 로그아웃을 처리합니다.
//! HTTP 핸들러(`routes::auth`)와 상태를 가진 세션(`session::Session`)이
//! 같은 함수를 공유합니다.
//!
//! - 비밀번호는 Argon2id로 해싱해 저장합니다.
//! - access 토큰(15분)과 refresh 토큰(7일)은 JWT입니다.
//! - refresh 토큰은 SHA-256 해시만 DB에 저장하고, 갱신할 때마다 교체합니다.

use crate::{
    db::users as db_users,
    error::AppError,
    middleware::auth::{
        create_access_token, create_refresh_token, hash_token, verify_token, TokenKind,
        REFRESH_TOKEN_TTL_DAYS,
    },
    models::{AuthResponse, User, UserRecord},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

const MIN_PASSWORD_LENGTH: usize = 8;
const EXPIRES_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub async fn register(
    pool: &SqlitePool,
    jwt_secret: &str,
    email: &str,
    password: &str,
) -> Result<AuthResponse, AppError> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if db_users::find_by_email(pool, email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    let user_id = uuid::Uuid::now_v7().to_string();
    let user = db_users::create_user(pool, &user_id, email, &password_hash).await?;
    tracing::info!(user_id = %user.id, "registered new account");

    issue_tokens(pool, jwt_secret, user).await
}

pub async fn login(
    pool: &SqlitePool,
    jwt_secret: &str,
    email: &str,
    password: &str,
) -> Result<AuthResponse, AppError> {
    let user = db_users::find_by_email(pool, email.trim())
        .await?
        .ok_or(AppError::Unauthorized("Invalid email or password".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password hash parse error: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    issue_tokens(pool, jwt_secret, user).await
}

/// refresh 토큰을 검증하고 새 토큰 쌍으로 교체합니다. 이전 refresh 토큰은 폐기됩니다.
pub async fn refresh(
    pool: &SqlitePool,
    jwt_secret: &str,
    refresh_token: &str,
) -> Result<AuthResponse, AppError> {
    verify_token(refresh_token, TokenKind::Refresh, jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let (user_id, expires_at) = db_users::redeem_refresh_token(pool, &hash_token(refresh_token))
        .await?
        .ok_or(AppError::Unauthorized("Refresh token not found or revoked".to_string()))?;

    let expires = chrono::NaiveDateTime::parse_from_str(&expires_at, EXPIRES_AT_FORMAT)
        .map_err(|e| AppError::Internal(format!("Date parse error: {}", e)))?;
    if expires.and_utc() < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db_users::find_by_id(pool, &user_id)
        .await?
        .ok_or(AppError::Unauthorized("User not found".to_string()))?;

    issue_tokens(pool, jwt_secret, user).await
}

/// 사용자의 모든 refresh 토큰을 폐기합니다.
pub async fn logout(pool: &SqlitePool, user_id: &str) -> Result<(), AppError> {
    let revoked = db_users::delete_user_refresh_tokens(pool, user_id).await?;
    tracing::debug!(user_id, revoked, "revoked refresh tokens");
    Ok(())
}

/// access 토큰의 주인을 찾습니다.
pub async fn user_for_access_token(
    pool: &SqlitePool,
    jwt_secret: &str,
    access_token: &str,
) -> Result<User, AppError> {
    let claims = verify_token(access_token, TokenKind::Access, jwt_secret)?;

    let user = db_users::find_by_id(pool, &claims.sub)
        .await?
        .ok_or(AppError::Unauthorized("User not found".to_string()))?;

    Ok(user.into())
}

async fn issue_tokens(
    pool: &SqlitePool,
    jwt_secret: &str,
    user: UserRecord,
) -> Result<AuthResponse, AppError> {
    let access_token = create_access_token(&user.id, jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
    let refresh_token = create_refresh_token(&user.id, jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    let expires_at = (Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS))
        .format(EXPIRES_AT_FORMAT)
        .to_string();

    db_users::store_refresh_token(pool, &user.id, &hash_token(&refresh_token), &expires_at)
        .await?;

    Ok(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    const SECRET: &str = "accounts-test-secret";

    #[tokio::test]
    async fn register_then_login() {
        let pool = db::connect_in_memory().await.unwrap();

        let registered = register(&pool, SECRET, "reader@example.com", "correct horse")
            .await
            .unwrap();
        let logged_in = login(&pool, SECRET, "reader@example.com", "correct horse")
            .await
            .unwrap();

        assert_eq!(registered.user, logged_in.user);
        assert_eq!(registered.user.email, "reader@example.com");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let pool = db::connect_in_memory().await.unwrap();
        register(&pool, SECRET, "reader@example.com", "correct horse")
            .await
            .unwrap();

        let result = login(&pool, SECRET, "reader@example.com", "wrong horse").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let pool = db::connect_in_memory().await.unwrap();

        let bad_email = register(&pool, SECRET, "not-an-email", "long enough").await;
        assert!(matches!(bad_email, Err(AppError::BadRequest(_))));

        let short_password = register(&pool, SECRET, "a@example.com", "short").await;
        assert!(matches!(short_password, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let pool = db::connect_in_memory().await.unwrap();
        register(&pool, SECRET, "a@example.com", "long enough").await.unwrap();

        let again = register(&pool, SECRET, "a@example.com", "long enough").await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn refresh_rotates_the_token() {
        let pool = db::connect_in_memory().await.unwrap();
        let first = register(&pool, SECRET, "a@example.com", "long enough")
            .await
            .unwrap();

        let second = refresh(&pool, SECRET, &first.refresh_token).await.unwrap();
        assert_eq!(second.user.id, first.user.id);

        // 이전 refresh 토큰은 이미 사용됨
        let reused = refresh(&pool, SECRET, &first.refresh_token).await;
        assert!(matches!(reused, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn logout_revokes_refresh_tokens() {
        let pool = db::connect_in_memory().await.unwrap();
        let auth = register(&pool, SECRET, "a@example.com", "long enough")
            .await
            .unwrap();

        logout(&pool, &auth.user.id).await.unwrap();

        let result = refresh(&pool, SECRET, &auth.refresh_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn concurrent_refresh_redeems_the_token_once() {
        let pool = db::connect_in_memory().await.unwrap();
        let auth = register(&pool, SECRET, "a@example.com", "long enough")
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            refresh(&pool, SECRET, &auth.refresh_token),
            refresh(&pool, SECRET, &auth.refresh_token),
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let rejected = if first.is_ok() { second } else { first };
        assert!(matches!(rejected, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected_and_removed() {
        let pool = db::connect_in_memory().await.unwrap();
        let auth = register(&pool, SECRET, "a@example.com", "long enough")
            .await
            .unwrap();
        sqlx::query("UPDATE refresh_tokens SET expires_at = '2000-01-01T00:00:00.000Z'")
            .execute(&pool)
            .await
            .unwrap();

        let result = refresh(&pool, SECRET, &auth.refresh_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
