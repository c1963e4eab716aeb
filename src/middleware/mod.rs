//! 요청 인증(bearer 토큰) 관련 모듈
pub mod auth;
