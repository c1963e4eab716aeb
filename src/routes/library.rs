//! # 서재 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/library | `list_library` | 서재 전체와 태그 목록 |
//! | POST | /api/v1/library | `add_book` | 책 추가 |
//! | PATCH | /api/v1/library/{id} | `update_book` | 항목 수정 (태그 교체) |
//! | DELETE | /api/v1/library/{id}?confirm=true | `delete_book` | 항목 삭제 |
//! | PUT | /api/v1/library/{id}/shelf | `move_to_shelf` | 책장 이동 |
//! | GET | /api/v1/tags | `list_tags` | 사용 중인 태그 이름 |
//!
//! 핸들러마다 bearer 토큰의 사용자로 `LibraryClient`를 만들고 작업을 위임합니다.
//! 변경 작업은 재조회된 `{ books, tags }`를 응답합니다.

use crate::{
    error::AppError,
    library::LibraryClient,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
    session::FixedUser,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

/// 삭제 확인 쿼리 파라미터. `confirm=true`가 없으면 거절로 처리합니다.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

fn client_for(state: &AppState, user: User) -> LibraryClient {
    LibraryClient::new(state.pool.clone(), &FixedUser::new(user))
}

pub async fn list_library(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<LibrarySnapshot>, AppError> {
    let client = client_for(&state, user);
    client.fetch_all().await?;
    Ok(Json(client.snapshot()))
}

pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<String>>, AppError> {
    let client = client_for(&state, user);
    client.fetch_all().await?;
    Ok(Json(client.tags()))
}

pub async fn add_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<AddBookInput>,
) -> Result<(StatusCode, Json<LibrarySnapshot>), AppError> {
    let client = client_for(&state, user);
    client.add_book(&input).await?;
    Ok((StatusCode::CREATED, Json(client.snapshot())))
}

pub async fn update_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateBookInput>,
) -> Result<Json<LibrarySnapshot>, AppError> {
    let client = client_for(&state, user);
    client.update_book(&id, &input).await?;
    Ok(Json(client.snapshot()))
}

pub async fn delete_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<LibrarySnapshot>, AppError> {
    let client = client_for(&state, user);
    client.delete_book(&id, |_| params.confirm).await?;
    Ok(Json(client.snapshot()))
}

pub async fn move_to_shelf(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MoveShelfRequest>,
) -> Result<Json<LibrarySnapshot>, AppError> {
    let client = client_for(&state, user);
    client.move_to_shelf(&id, req.shelf).await?;
    Ok(Json(client.snapshot()))
}
