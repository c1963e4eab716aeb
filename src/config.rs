//! # 애플리케이션 설정(Configuration) 모듈
//!
//! `.env` 파일이나 시스템 환경변수에서 서버 설정값을 읽습니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: JWT 토큰 서명에 사용할 비밀키 (필수)
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호
//! - `FRONTEND_DIST`: 빌드된 프론트엔드 정적 파일 디렉토리

use std::env;

/// 애플리케이션 전체 설정
///
/// 서버 시작 시 한 번 읽어서 공유합니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/shelfwise.db")
    pub database_url: String,
    pub jwt_secret: String,
    /// 기본값: "0.0.0.0"
    pub host: String,
    /// 기본값: 3000
    pub port: u16,
    /// 기본값: "../frontend/dist"
    pub frontend_dist: String,
}

impl Config {
    /// 환경변수에서 설정을 읽습니다.
    ///
    /// `DATABASE_URL`과 `JWT_SECRET`이 없으면 `VarError`를 반환합니다.
    /// 나머지는 기본값이 있습니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_port(env::var("PORT").ok().as_deref()),
            frontend_dist: env::var("FRONTEND_DIST")
                .unwrap_or_else(|_| "../frontend/dist".to_string()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 포트 문자열을 파싱합니다. 없거나 잘못된 값이면 3000.
fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|p| p.trim().parse().ok()).unwrap_or(3000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_to_default() {
        assert_eq!(parse_port(None), 3000);
        assert_eq!(parse_port(Some("not-a-port")), 3000);
        assert_eq!(parse_port(Some("70000")), 3000);
        assert_eq!(parse_port(Some(" 8080 ")), 8080);
    }

    #[test]
    fn addr_joins_host_and_port() {
        let config = Config {
            database_url: "sqlite::memory:".into(),
            jwt_secret: "secret".into(),
            host: "127.0.0.1".into(),
            port: 4000,
            frontend_dist: "dist".into(),
        };
        assert_eq!(config.addr(), "127.0.0.1:4000");
    }
}
