//! # 태그 모델 정의
//!
//! 태그는 사용자별 라벨입니다. 같은 사용자 안에서 이름이 유일하며,
//! 다른 사용자와 공유되지 않습니다.

use serde::{Deserialize, Serialize};

/// 태그 엔티티 - DB의 `tags` 테이블 한 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: String,
    /// 태그를 소유한 사용자
    pub user_id: String,
    /// 태그 이름 (예: "fantasy", "book-club")
    pub name: String,
}
