//! # 에러 처리 모듈
//!
//! 서재 클라이언트, 인증 세션, HTTP 계층이 공유하는 에러 타입을 정의합니다.
//!
//! 에러 분류:
//! - 검증 실패(`BadRequest`): 원격 호출 전에 동기적으로 보고됩니다.
//! - 저장소 실패(`Database`): 로그에 기록되고, 로컬 상태는 마지막 정상 값으로 유지됩니다.
//! - 확인 거절(`Declined`): 에러가 아닌 중단이지만 실패로 반환됩니다.
//!
//! `IntoResponse` 구현으로 HTTP 응답으로도 자동 변환됩니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스가 없거나 현재 사용자의 소유가 아님 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 입력값 검증 실패 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 로그인된 사용자가 없는 상태에서 사용자 범위 작업을 시도함 (HTTP 401)
    #[error("No user is signed in")]
    NotSignedIn,

    /// 사용자가 확인 요청을 거절함 (HTTP 409)
    #[error("Operation was declined")]
    Declined,

    /// 유니크 제약 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: `?`로 sqlx::Error를 자동 변환합니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 마이그레이션 실패 (HTTP 500)
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl AppError {
    /// 유니크 제약 위반이면 `Conflict`로, 아니면 그대로 `Database`로 감쌉니다.
    pub fn from_unique(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl IntoResponse for AppError {
    /// 내부 에러(Database, Migration, Internal)는 로그에만 자세히 남기고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::NotSignedIn => {
                (StatusCode::UNAUTHORIZED, "not_signed_in", self.to_string())
            }
            AppError::Declined => (StatusCode::CONFLICT, "declined", self.to_string()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
        };

        // { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
