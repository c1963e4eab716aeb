//! # 도서 카탈로그 쿼리
//!
//! `books`는 모든 사용자가 공유하는 테이블입니다. 같은 (제목, 저자)는
//! 한 행만 존재하며, 처음 서재에 추가될 때 생성됩니다.

use crate::error::AppError;
use crate::models::Book;
use sqlx::SqliteConnection;

/// 제목과 저자가 정확히 일치하는 도서를 찾습니다.
pub async fn find_book(
    conn: &mut SqliteConnection,
    title: &str,
    author: &str,
) -> Result<Option<Book>, AppError> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        SELECT id, title, author, pages, created_at
        FROM books
        WHERE title = ? AND author = ?
        "#,
    )
    .bind(title)
    .bind(author)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(book)
}

/// 새 도서를 생성하고 생성된 행을 반환합니다.
///
/// `RETURNING` 절로 INSERT와 동시에 DB 기본값(created_at)이 채워진 행을 받습니다.
pub async fn insert_book(
    conn: &mut SqliteConnection,
    title: &str,
    author: &str,
    pages: Option<i64>,
) -> Result<Book, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    let book = sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (id, title, author, pages)
        VALUES (?, ?, ?, ?)
        RETURNING id, title, author, pages, created_at
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(author)
    .bind(pages) // None이면 SQL NULL
    .fetch_one(&mut *conn)
    .await?;

    Ok(book)
}

/// 도서를 찾고, 없으면 생성합니다.
///
/// 이미 있는 도서의 페이지 수는 갱신하지 않습니다.
pub async fn find_or_create_book(
    conn: &mut SqliteConnection,
    title: &str,
    author: &str,
    pages: Option<i64>,
) -> Result<Book, AppError> {
    if let Some(book) = find_book(conn, title, author).await? {
        return Ok(book);
    }

    let book = insert_book(conn, title, author, pages).await?;
    tracing::debug!(book_id = %book.id, "created catalog book");
    Ok(book)
}
