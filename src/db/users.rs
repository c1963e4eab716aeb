use crate::error::AppError;
use crate::models::UserRecord;
use sqlx::SqlitePool;

pub async fn create_user(
    pool: &SqlitePool,
    id: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRecord, AppError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES (?, ?, ?)
        RETURNING id, email, password_hash, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_unique(e, "Email already exists"))
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRecord>, AppError> {
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, password_hash, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<UserRecord>, AppError> {
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, password_hash, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn store_refresh_token(
    pool: &SqlitePool,
    user_id: &str,
    token_hash: &str,
    expires_at: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(uuid::Uuid::now_v7().to_string())
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// refresh 토큰을 한 번만 쓸 수 있게 꺼냅니다.
///
/// 행을 지우면서 (user_id, expires_at)을 돌려주는 한 문장이라, 같은 토큰으로
/// 동시에 갱신해도 둘 중 하나만 `Some`을 받습니다.
pub async fn redeem_refresh_token(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<(String, String)>, AppError> {
    let row = sqlx::query_as::<_, (String, String)>(
        "DELETE FROM refresh_tokens WHERE token_hash = ? RETURNING user_id, expires_at",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_user_refresh_tokens(pool: &SqlitePool, user_id: &str) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
