//! # 서재 항목(`user_books`) 쿼리
//!
//! 모든 쓰기 쿼리는 항목 ID와 함께 소유자 ID(`user_id`)로 범위를 제한합니다.
//! 다른 사용자의 항목 ID를 알아도 수정하거나 삭제할 수 없습니다.

use crate::error::AppError;
use crate::models::{EntryRow, LibraryEntry, Shelf};
use sqlx::{SqliteConnection, SqlitePool};

/// 새 서재 항목에 기록할 값
#[derive(Debug, Clone)]
pub struct NewEntry<'a> {
    pub shelf: Shelf,
    pub rating: Option<i64>,
    pub spice_rating: Option<i64>,
    pub form: &'a str,
    pub note: &'a str,
}

/// 사용자의 서재 전체를 도서, 태그 이름과 함께 조회합니다.
///
/// ```text
/// user_books ──→ books          (N:1, INNER JOIN)
/// user_books ←── user_book_tags ──→ tags   (N:M, LEFT JOIN)
/// ```
///
/// 태그가 없는 항목도 `tag_name = NULL`인 한 행으로 포함됩니다.
/// 최근 추가된 항목이 먼저 오고, 같은 항목의 행들은 붙어서 나옵니다.
pub async fn list_entry_rows(pool: &SqlitePool, user_id: &str) -> Result<Vec<EntryRow>, AppError> {
    let rows = sqlx::query_as::<_, EntryRow>(
        r#"
        SELECT ub.id, ub.book_id, b.title, b.author, b.pages,
               ub.shelf, ub.rating, ub.spice_rating, ub.form, ub.note,
               ub.created_at, t.name AS tag_name
        FROM user_books ub
        JOIN books b ON b.id = ub.book_id
        LEFT JOIN user_book_tags ubt ON ubt.user_book_id = ub.id
        LEFT JOIN tags t ON t.id = ubt.tag_id
        WHERE ub.user_id = ?
        ORDER BY ub.created_at DESC, ub.rowid DESC, t.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// 사용자의 서재에 도서를 추가하고 생성된 항목을 반환합니다.
///
/// 같은 사용자가 같은 도서를 두 번 추가하면 `UNIQUE(user_id, book_id)` 위반으로
/// `AppError::Conflict`가 반환됩니다.
pub async fn insert_entry(
    conn: &mut SqliteConnection,
    user_id: &str,
    book_id: &str,
    entry: &NewEntry<'_>,
) -> Result<LibraryEntry, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query_as::<_, LibraryEntry>(
        r#"
        INSERT INTO user_books (id, user_id, book_id, shelf, rating, spice_rating, form, note)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, user_id, book_id, shelf, rating, spice_rating, form, note, created_at
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(book_id)
    .bind(entry.shelf)
    .bind(entry.rating)
    .bind(entry.spice_rating)
    .bind(entry.form)
    .bind(entry.note)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::from_unique(e, "This book is already in your library"))
}

/// 서재 항목의 책장/평점/스파이스 평점/형태/메모를 한 번에 교체합니다.
///
/// ## 반환값
/// - `true`: 소유자의 항목이 수정됨
/// - `false`: 해당 ID의 항목이 없거나 다른 사용자의 항목
pub async fn update_entry(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
    entry: &NewEntry<'_>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE user_books
        SET shelf = ?, rating = ?, spice_rating = ?, form = ?, note = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(entry.shelf)
    .bind(entry.rating)
    .bind(entry.spice_rating)
    .bind(entry.form)
    .bind(entry.note)
    .bind(id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 책장만 바꿉니다. 다른 필드와 태그는 그대로입니다.
pub async fn update_shelf(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
    shelf: Shelf,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE user_books SET shelf = ? WHERE id = ? AND user_id = ?")
        .bind(shelf)
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 서재 항목을 삭제합니다.
///
/// 태그 연결(`user_book_tags`)은 `ON DELETE CASCADE`로 함께 삭제되고,
/// 공유 도서(`books`)와 태그(`tags`)는 남습니다.
pub async fn delete_entry(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM user_books WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
