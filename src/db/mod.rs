//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 서재 클라이언트와 인증 서비스가 호출하는 SQL 쿼리 함수들입니다.
//!
//! 각 하위 모듈:
//! - `books`: 공유 도서 카탈로그 조회/생성
//! - `library`: 사용자 서재 항목(`user_books`) CRUD
//! - `tags`: 사용자별 태그와 서재 항목-태그 연결
//! - `users`: 사용자 계정과 refresh 토큰
//!
//! 조회 함수는 `&SqlitePool`을, 쓰기 함수는 트랜잭션 안에서 호출되도록
//! `&mut SqliteConnection`을 받습니다. 트랜잭션은 `&mut *tx`로 넘깁니다.

pub mod books;
pub mod library;
pub mod tags;
pub mod users;

pub use books::*;
pub use library::*;
pub use tags::*;

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// `./migrations` 폴더의 SQL 파일들을 컴파일 타임에 포함합니다.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 5;

/// 데이터베이스에 연결하고 아직 적용되지 않은 마이그레이션을 실행합니다.
///
/// 파일이 없으면 생성하고, 외래키 제약(ON DELETE CASCADE 등)을 켭니다.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    tracing::info!("Running database migrations...");
    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// 인메모리 데이터베이스에 연결합니다 (테스트용).
///
/// 인메모리 DB는 연결마다 따로 생기므로 연결을 하나로 제한하고,
/// 유휴 연결이 닫혀 데이터가 사라지지 않도록 수명 제한을 끕니다.
pub async fn connect_in_memory() -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}
