use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
    services::accounts,
};
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let auth = accounts::register(&state.pool, &state.jwt_secret, &req.email, &req.password).await?;
    Ok(Json(auth))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let auth = accounts::login(&state.pool, &state.jwt_secret, &req.email, &req.password).await?;
    Ok(Json(auth))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let auth = accounts::refresh(&state.pool, &state.jwt_secret, &req.refresh_token).await?;
    Ok(Json(auth))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    // 이 사용자의 refresh 토큰을 모두 폐기. access 토큰은 만료될 때까지 유효
    accounts::logout(&state.pool, &user.id).await?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
