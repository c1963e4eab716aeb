//! # 라우트 핸들러 모듈
//!
//! 서재 클라이언트를 프레젠테이션 계층에 HTTP JSON API로 노출합니다.
//!
//! 각 하위 모듈:
//! - `auth`: 가입, 로그인, 토큰 갱신, 로그아웃, 내 정보
//! - `library`: 서재 조회와 변경 (요청마다 인증된 사용자의 `LibraryClient`를 만듦)
//! - `health`: 서버 상태 확인

pub mod auth;
pub mod health;
pub mod library;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use sqlx::SqlitePool;

/// 모든 핸들러가 공유하는 상태
///
/// `SqlitePool`은 내부적으로 Arc를 쓰므로 clone해도 같은 풀을 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// JWT 토큰 서명용 비밀키
    pub jwt_secret: String,
}

/// `/api/v1` 아래에 붙는 API 라우터
pub fn api_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    Router::new()
        .merge(auth_routes)
        .route("/library", get(library::list_library).post(library::add_book))
        .route(
            "/library/{id}",
            patch(library::update_book).delete(library::delete_book),
        )
        .route("/library/{id}/shelf", put(library::move_to_shelf))
        .route("/tags", get(library::list_tags))
        .route("/health", get(health::health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn app() -> Router {
        let pool = db::connect_in_memory().await.unwrap();
        api_router(AppState {
            pool,
            jwt_secret: "routes-test-secret".to_string(),
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn library_requires_a_token() {
        let response = app()
            .await
            .oneshot(Request::get("/library").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let response = app()
            .await
            .oneshot(
                Request::get("/library")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_then_add_and_decline_delete() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(
                Request::post("/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{ "email": "reader@example.com", "password": "long enough" }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let auth: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let bearer = format!("Bearer {}", auth["access_token"].as_str().unwrap());

        let response = app
            .clone()
            .oneshot(
                Request::post("/library")
                    .header(header::AUTHORIZATION, &bearer)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{ "title": "Dune", "author": "Frank Herbert", "tags": ["sci-fi"] }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let snapshot: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot["tags"], serde_json::json!(["sci-fi"]));
        let id = snapshot["books"][0]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::delete(format!("/library/{id}"))
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
