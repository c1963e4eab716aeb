//! # 태그 데이터베이스 쿼리 모듈
//!
//! 사용자별 태그와 서재 항목-태그 관계를 관리합니다.
//!
//! ## 테이블 구조
//! - `tags`: 태그 엔티티 (id, user_id, name), (user_id, name)이 유일
//! - `user_book_tags`: 서재 항목과 태그의 다대다(N:M) 관계 테이블
//!
//! 태그는 처음 사용될 때 생성되고, 더 이상 쓰이지 않아도 삭제하지 않습니다.

use crate::error::AppError;
use crate::models::Tag;
use sqlx::SqliteConnection;

/// 사용자의 태그를 이름으로 찾습니다.
pub async fn find_tag(
    conn: &mut SqliteConnection,
    user_id: &str,
    name: &str,
) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(
        "SELECT id, user_id, name FROM tags WHERE user_id = ? AND name = ?",
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(tag)
}

/// 새 태그를 생성하고 생성된 행을 반환합니다.
pub async fn insert_tag(
    conn: &mut SqliteConnection,
    user_id: &str,
    name: &str,
) -> Result<Tag, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    let tag = sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (id, user_id, name) VALUES (?, ?, ?) RETURNING id, user_id, name",
    )
    .bind(&id)
    .bind(user_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(tag)
}

/// 태그를 찾고, 없으면 생성합니다.
pub async fn find_or_create_tag(
    conn: &mut SqliteConnection,
    user_id: &str,
    name: &str,
) -> Result<Tag, AppError> {
    match find_tag(conn, user_id, name).await? {
        Some(tag) => Ok(tag),
        None => insert_tag(conn, user_id, name).await,
    }
}

/// 서재 항목에 태그를 연결합니다.
///
/// `INSERT OR IGNORE`: 이미 같은 (user_book_id, tag_id) 연결이 있으면 무시합니다.
/// 입력 태그 목록에 같은 이름이 두 번 들어와도 연결은 하나만 남습니다.
pub async fn link_tag(
    conn: &mut SqliteConnection,
    user_book_id: &str,
    tag_id: &str,
) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO user_book_tags (user_book_id, tag_id) VALUES (?, ?)")
        .bind(user_book_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// 서재 항목의 태그 연결을 모두 끊습니다. 태그 자체는 남습니다.
pub async fn clear_entry_tags(
    conn: &mut SqliteConnection,
    user_book_id: &str,
) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM user_book_tags WHERE user_book_id = ?")
        .bind(user_book_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// 이름 목록의 각 태그를 찾거나 만든 뒤 서재 항목에 연결합니다.
///
/// 앞뒤 공백은 잘라내고 빈 이름은 건너뜁니다.
/// 요청은 하나씩 순서대로 실행되며, 하나라도 실패하면 즉시 에러를 반환합니다.
/// 호출자가 트랜잭션을 롤백하므로 일부만 연결된 상태는 남지 않습니다.
pub async fn attach_tags(
    conn: &mut SqliteConnection,
    user_id: &str,
    user_book_id: &str,
    names: &[String],
) -> Result<(), AppError> {
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let tag = find_or_create_tag(conn, user_id, name).await?;
        link_tag(conn, user_book_id, &tag.id).await?;
    }

    Ok(())
}
