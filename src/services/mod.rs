//! # 서비스 계층
//!
//! 여러 진입점(HTTP 핸들러, 세션)이 공유하는 비즈니스 로직입니다.
//! - `accounts`: 계정 가입, 로그인, 토큰 갱신, 로그아웃
pub mod accounts;
