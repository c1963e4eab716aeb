//! # 데이터 모델 모듈
//!
//! - `book`: 도서, 서재 항목, 뷰 모델, 변경 요청
//! - `tag`: 사용자별 태그
//! - `user`: 사용자 신원과 인증 요청/응답
//!
//! `pub use X::*;`로 재공개하므로 `crate::models::LibraryBook`처럼 짧게 접근합니다.

pub mod book;
pub mod tag;
pub mod user;

pub use book::*;
pub use tag::*;
pub use user::*;
