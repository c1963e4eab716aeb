//! # Shelfwise
//!
//! 개인 독서 기록 앱의 데이터 접근 클라이언트입니다.
//!
//! - [`session`]: 인증 세션과 사용자 변경 구독 (`AuthProvider`)
//! - [`library`]: 현재 사용자의 서재를 읽고 바꾸는 `LibraryClient`
//! - [`db`]: SQLite 쿼리 계층
//! - [`routes`]: 서재 기능을 노출하는 HTTP JSON API

pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

pub use error::AppError;
pub use library::LibraryClient;
pub use session::{AuthProvider, FixedUser, Session, Subscription};
