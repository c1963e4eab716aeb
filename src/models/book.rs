//! # 도서 및 서재 모델 정의
//!
//! ## 구조체 역할
//! - `Shelf`: 서재 항목의 읽기 상태 ("to-read" / "reading" / "read")
//! - `Book`: 여러 사용자가 공유하는 도서 카탈로그 (`books` 테이블)
//! - `LibraryEntry`: 한 사용자의 서재 항목 (`user_books` 테이블)
//! - `EntryRow`: 서재 항목 + 도서 + 태그 이름 하나를 JOIN한 결과 행
//! - `LibraryBook`: 화면 표시용으로 평탄화한 뷰 모델
//! - `AddBookInput`, `UpdateBookInput`, `MoveShelfRequest`: 변경 요청 본문

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 서재 항목의 읽기 상태
///
/// DB에는 TEXT로 저장됩니다 (`to-read`, `reading`, `read`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
pub enum Shelf {
    #[default]
    ToRead,
    Reading,
    Read,
}

impl Shelf {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shelf::ToRead => "to-read",
            Shelf::Reading => "reading",
            Shelf::Read => "read",
        }
    }
}

impl fmt::Display for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shelf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to-read" => Ok(Shelf::ToRead),
            "reading" => Ok(Shelf::Reading),
            "read" => Ok(Shelf::Read),
            other => Err(format!("Unknown shelf: {other}")),
        }
    }
}

/// 공유 도서 카탈로그 - `books` 테이블 한 행
///
/// 처음 추가될 때 생성되며, 서재 클라이언트는 수정하거나 삭제하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub pages: Option<i64>,
    pub created_at: String,
}

/// 사용자의 서재 항목 - `user_books` 테이블 한 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LibraryEntry {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub shelf: Shelf,
    pub rating: Option<i64>,
    pub spice_rating: Option<i64>,
    pub form: String,
    pub note: String,
    pub created_at: String,
}

/// 서재 조회 쿼리의 결과 행
///
/// `user_book_tags`를 LEFT JOIN하므로 태그가 N개인 항목은 N개의 행으로,
/// 태그가 없는 항목은 `tag_name = None`인 한 행으로 나타납니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    pub id: String,
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub pages: Option<i64>,
    pub shelf: Shelf,
    pub rating: Option<i64>,
    pub spice_rating: Option<i64>,
    pub form: String,
    pub note: String,
    pub created_at: String,
    pub tag_name: Option<String>,
}

/// 화면 표시용 서재 항목 (서재 항목 + 도서 + 태그 이름)
///
/// 조회할 때마다 다시 계산되며 저장되지 않습니다.
/// `tags`는 태그가 없어도 항상 빈 목록입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryBook {
    pub id: String,
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub pages: Option<i64>,
    pub shelf: Shelf,
    pub rating: Option<i64>,
    pub spice_rating: Option<i64>,
    pub form: String,
    pub note: String,
    pub tags: Vec<String>,
    pub created_at: String,
}

impl From<EntryRow> for LibraryBook {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            book_id: row.book_id,
            title: row.title,
            author: row.author,
            pages: row.pages,
            shelf: row.shelf,
            rating: row.rating,
            spice_rating: row.spice_rating,
            form: row.form,
            note: row.note,
            tags: row.tag_name.into_iter().collect(),
            created_at: row.created_at,
        }
    }
}

/// 책 추가 요청 - `POST /api/v1/library`
///
/// 제목과 저자만 필수이고 나머지는 기본값이 적용됩니다.
/// (shelf: to-read, form: ebook, note: 빈 문자열)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBookInput {
    pub title: String,
    pub author: String,
    pub pages: Option<i64>,
    pub shelf: Option<Shelf>,
    #[serde(default, deserialize_with = "rating_from_json")]
    pub rating: Option<i64>,
    #[serde(default, deserialize_with = "rating_from_json")]
    pub spice_rating: Option<i64>,
    pub form: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 서재 항목 수정 요청 - `PATCH /api/v1/library/{id}`
///
/// 부분 업데이트가 아니라 전체 교체입니다. 태그 목록도 통째로 바뀝니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookInput {
    pub shelf: Shelf,
    #[serde(default, deserialize_with = "rating_from_json")]
    pub rating: Option<i64>,
    #[serde(default, deserialize_with = "rating_from_json")]
    pub spice_rating: Option<i64>,
    pub form: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 평점은 숫자나 숫자 문자열(`4`, `"4"`)로 받습니다. 빈 문자열과 `null`은 "평가 안 함"입니다.
fn rating_from_json<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRating {
        Number(i64),
        Text(String),
    }

    match Option::<RawRating>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawRating::Number(n)) => Ok(Some(n)),
        Some(RawRating::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid rating: {text:?}")))
        }
    }
}

/// 책장 이동 요청 - `PUT /api/v1/library/{id}/shelf`
#[derive(Debug, Deserialize)]
pub struct MoveShelfRequest {
    pub shelf: Shelf,
}

/// 서재 상태 스냅샷. HTTP 응답 본문으로 사용됩니다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LibrarySnapshot {
    pub books: Vec<LibraryBook>,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shelf_uses_kebab_case_names() {
        assert_eq!(serde_json::to_string(&Shelf::ToRead).unwrap(), "\"to-read\"");
        assert_eq!("reading".parse::<Shelf>().unwrap(), Shelf::Reading);
        assert_eq!(Shelf::Read.to_string(), "read");
        assert!("done".parse::<Shelf>().is_err());
    }

    #[test]
    fn add_input_defaults_missing_fields() {
        let input: AddBookInput =
            serde_json::from_str(r#"{ "title": "Dune", "author": "Frank Herbert" }"#).unwrap();
        assert!(input.tags.is_empty());
        assert_eq!(input.shelf, None);
        assert_eq!(input.form, None);
    }

    #[test]
    fn ratings_accept_numeric_strings() {
        let input: AddBookInput = serde_json::from_str(
            r#"{ "title": "Dune", "author": "Frank Herbert", "rating": "4", "spice_rating": 2 }"#,
        )
        .unwrap();
        assert_eq!(input.rating, Some(4));
        assert_eq!(input.spice_rating, Some(2));

        let update: UpdateBookInput =
            serde_json::from_str(r#"{ "shelf": "read", "rating": "", "spice_rating": null }"#)
                .unwrap();
        assert_eq!(update.rating, None);
        assert_eq!(update.spice_rating, None);

        let bad = serde_json::from_str::<AddBookInput>(
            r#"{ "title": "Dune", "author": "Frank Herbert", "rating": "four" }"#,
        );
        assert!(bad.is_err());
    }
}
