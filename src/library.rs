//! # 서재 클라이언트
//!
//! 로그인한 사용자의 서재를 불러오고 변경하는 클라이언트입니다.
//!
//! ## 상태
//! - 현재 사용자 (인증 제공자에서 받아옴)
//! - 서재 항목 목록 (최근 추가 순)
//! - 모든 항목에 쓰인 태그 이름 (중복 없이 알파벳순)
//!
//! ## 작업 흐름
//! 모든 변경 작업은 같은 순서를 따릅니다.
//! ```text
//! 검증 ─→ 트랜잭션 안에서 (id + user_id) 조건으로 변경 ─→ 커밋 ─→ fetch_all()로 전체 재조회
//! ```
//! 로컬 상태를 부분적으로 고치지 않고 항상 DB에서 다시 읽어옵니다.
//! 여러 단계로 이루어진 작업(도서 조회/생성 → 항목 추가 → 태그 연결)은 하나의
//! 트랜잭션이라서, 중간에 실패하면 전부 롤백됩니다.
//!
//! ## 세션 연동
//! 생성 시 현재 사용자를 읽고 세션 변경을 구독합니다. 로그아웃하거나 다른 사용자로
//! 바뀌면 서재 목록과 태그 목록을 즉시 비웁니다. 구독은 클라이언트가 drop될 때 해제됩니다.

use crate::{
    db::{self, NewEntry},
    error::AppError,
    models::*,
    session::{AuthProvider, Subscription},
};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEFAULT_FORM: &str = "ebook";
const MAX_RATING: i64 = 5;

#[derive(Debug, Default)]
struct LibraryState {
    user: Option<User>,
    books: Vec<LibraryBook>,
    tags: Vec<String>,
}

impl LibraryState {
    /// 세션 변경을 반영합니다. 사용자가 바뀌면(로그아웃 포함) 목록을 비웁니다.
    fn apply_session(&mut self, user: Option<&User>) {
        let same_user = match (&self.user, user) {
            (Some(current), Some(next)) => current.id == next.id,
            (None, None) => true,
            _ => false,
        };
        if !same_user {
            self.books.clear();
            self.tags.clear();
        }
        self.user = user.cloned();
    }
}

/// 사용자 서재 클라이언트
pub struct LibraryClient {
    pool: SqlitePool,
    state: Arc<RwLock<LibraryState>>,
    _subscription: Subscription,
}

impl LibraryClient {
    /// 인증 제공자에 연결된 클라이언트를 만듭니다. 아직 아무것도 불러오지 않습니다.
    pub fn new(pool: SqlitePool, auth: &dyn AuthProvider) -> Self {
        let state = Arc::new(RwLock::new(LibraryState::default()));

        // 읽기 전에 먼저 구독해야 그 사이의 변경을 놓치지 않음
        let shared = Arc::clone(&state);
        let subscription = auth.subscribe(Box::new(move |user: Option<&User>| {
            write_state(&shared).apply_session(user);
        }));

        write_state(&state).apply_session(auth.current_user().as_ref());

        Self {
            pool,
            state,
            _subscription: subscription,
        }
    }

    /// 클라이언트를 만들고, 로그인되어 있으면 서재를 바로 불러옵니다.
    pub async fn connect(pool: SqlitePool, auth: &dyn AuthProvider) -> Self {
        let client = Self::new(pool, auth);
        client.refresh().await;
        client
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn books(&self) -> Vec<LibraryBook> {
        self.read().books.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.read().tags.clone()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        let state = self.read();
        LibrarySnapshot {
            books: state.books.clone(),
            tags: state.tags.clone(),
        }
    }

    /// 사용자의 서재 전체를 다시 불러옵니다.
    ///
    /// - 로그인되어 있지 않으면 아무것도 하지 않습니다.
    /// - 실패하면 에러를 로그에 남기고 기존 목록은 그대로 둡니다.
    /// - 조회 중에 세션이 바뀌었다면 결과를 버립니다.
    pub async fn fetch_all(&self) -> Result<(), AppError> {
        let Some(user) = self.user() else {
            return Ok(());
        };

        let rows = db::list_entry_rows(&self.pool, &user.id)
            .await
            .inspect_err(|e| tracing::error!(user_id = %user.id, "Failed to fetch library: {}", e))?;

        self.apply_fetched(&user.id, rows);
        Ok(())
    }

    /// 서재에 책을 추가합니다.
    ///
    /// 1. 제목과 저자로 공유 도서를 찾고, 없으면 생성
    /// 2. 사용자 서재 항목 생성 (기본값: to-read, ebook, 빈 메모)
    /// 3. 태그마다 찾거나 생성한 뒤 항목에 연결
    /// 4. 전체 재조회
    ///
    /// 제목이나 저자가 비어 있으면 DB를 건드리지 않고 `BadRequest`를 반환합니다.
    pub async fn add_book(&self, input: &AddBookInput) -> Result<LibraryEntry, AppError> {
        let user = self.require_user()?;

        let title = input.title.trim();
        let author = input.author.trim();
        if title.is_empty() || author.is_empty() {
            return Err(AppError::BadRequest(
                "Title and author are required".to_string(),
            ));
        }
        let entry = NewEntry {
            shelf: input.shelf.unwrap_or_default(),
            rating: normalize_rating(input.rating, "rating")?,
            spice_rating: normalize_rating(input.spice_rating, "spice rating")?,
            form: form_or_default(input.form.as_deref()),
            note: input.note.as_deref().unwrap_or_default(),
        };

        let created = async {
            let mut tx = self.pool.begin().await?;
            let book = db::find_or_create_book(&mut tx, title, author, input.pages).await?;
            let created = db::insert_entry(&mut tx, &user.id, &book.id, &entry).await?;
            db::attach_tags(&mut tx, &user.id, &created.id, &input.tags).await?;
            tx.commit().await?;
            Ok::<_, AppError>(created)
        }
        .await
        .inspect_err(|e| tracing::error!(user_id = %user.id, "Failed to add book: {}", e))?;

        tracing::info!(user_id = %user.id, entry_id = %created.id, "added book to library");
        self.refresh().await;
        Ok(created)
    }

    /// 서재 항목의 책장/평점/스파이스 평점/형태/메모를 교체하고 태그를 통째로 바꿉니다.
    ///
    /// 기존 태그 연결을 모두 지우고 새 목록으로 다시 연결합니다.
    /// 쓰이지 않게 된 태그는 삭제하지 않습니다.
    pub async fn update_book(&self, entry_id: &str, input: &UpdateBookInput) -> Result<(), AppError> {
        let user = self.require_user()?;

        let entry = NewEntry {
            shelf: input.shelf,
            rating: normalize_rating(input.rating, "rating")?,
            spice_rating: normalize_rating(input.spice_rating, "spice rating")?,
            form: form_or_default(input.form.as_deref()),
            note: input.note.as_deref().unwrap_or_default(),
        };

        async {
            let mut tx = self.pool.begin().await?;
            if !db::update_entry(&mut tx, entry_id, &user.id, &entry).await? {
                return Err(AppError::NotFound);
            }
            db::clear_entry_tags(&mut tx, entry_id).await?;
            db::attach_tags(&mut tx, &user.id, entry_id, &input.tags).await?;
            tx.commit().await?;
            Ok::<(), AppError>(())
        }
        .await
        .inspect_err(|e| tracing::error!(user_id = %user.id, entry_id, "Failed to update book: {}", e))?;

        self.refresh().await;
        Ok(())
    }

    /// 서재 항목을 삭제합니다.
    ///
    /// 먼저 `confirm`으로 사용자 확인을 받습니다. 거절하면 DB를 건드리지 않고
    /// `AppError::Declined`를 반환합니다. 공유 도서와 태그는 남습니다.
    pub async fn delete_book<F>(&self, entry_id: &str, confirm: F) -> Result<(), AppError>
    where
        F: FnOnce(&str) -> bool,
    {
        let user = self.require_user()?;

        let prompt = match self.read().books.iter().find(|b| b.id == entry_id) {
            Some(book) => format!("Remove \"{}\" from your library?", book.title),
            None => "Remove this book from your library?".to_string(),
        };
        if !confirm(&prompt) {
            tracing::debug!(entry_id, "delete declined");
            return Err(AppError::Declined);
        }

        async {
            let mut tx = self.pool.begin().await?;
            if !db::delete_entry(&mut tx, entry_id, &user.id).await? {
                return Err(AppError::NotFound);
            }
            tx.commit().await?;
            Ok::<(), AppError>(())
        }
        .await
        .inspect_err(|e| tracing::error!(user_id = %user.id, entry_id, "Failed to delete book: {}", e))?;

        tracing::info!(user_id = %user.id, entry_id, "removed book from library");
        self.refresh().await;
        Ok(())
    }

    /// 책장만 옮깁니다. 평점, 메모, 태그는 그대로입니다.
    pub async fn move_to_shelf(&self, entry_id: &str, shelf: Shelf) -> Result<(), AppError> {
        let user = self.require_user()?;

        async {
            let mut tx = self.pool.begin().await?;
            if !db::update_shelf(&mut tx, entry_id, &user.id, shelf).await? {
                return Err(AppError::NotFound);
            }
            tx.commit().await?;
            Ok::<(), AppError>(())
        }
        .await
        .inspect_err(|e| tracing::error!(user_id = %user.id, entry_id, "Failed to move book: {}", e))?;

        self.refresh().await;
        Ok(())
    }

    /// 조회 결과를 상태에 반영합니다. 조회를 시작한 사용자가 여전히 현재 사용자일 때만
    /// 반영하고, 그 여부를 반환합니다.
    fn apply_fetched(&self, user_id: &str, rows: Vec<EntryRow>) -> bool {
        let books = flatten_rows(rows);
        let tags = distinct_tags(&books);

        let mut state = self.write();
        if state.user.as_ref().map(|u| u.id.as_str()) != Some(user_id) {
            tracing::debug!(user_id, "session changed during fetch; discarding result");
            return false;
        }
        tracing::debug!(user_id, books = books.len(), tags = tags.len(), "library loaded");
        state.books = books;
        state.tags = tags;
        true
    }

    /// 변경 후 재조회. 실패는 `fetch_all`이 이미 로그에 남겼으므로 무시합니다.
    async fn refresh(&self) {
        let _ = self.fetch_all().await;
    }

    fn require_user(&self) -> Result<User, AppError> {
        self.user().ok_or(AppError::NotSignedIn)
    }

    fn read(&self) -> RwLockReadGuard<'_, LibraryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LibraryState> {
        write_state(&self.state)
    }
}

fn write_state(state: &RwLock<LibraryState>) -> RwLockWriteGuard<'_, LibraryState> {
    state.write().unwrap_or_else(|e| e.into_inner())
}

/// JOIN 결과 행들을 서재 항목 하나당 하나의 `LibraryBook`으로 합칩니다.
///
/// 같은 항목의 행들은 연달아 나온다고 가정합니다 (`list_entry_rows`의 정렬).
/// 행의 순서는 유지되고, 태그가 없는 항목의 `tags`는 빈 목록입니다.
pub fn flatten_rows(rows: Vec<EntryRow>) -> Vec<LibraryBook> {
    let mut books: Vec<LibraryBook> = Vec::new();

    for row in rows {
        match books.last_mut() {
            Some(last) if last.id == row.id => {
                if let Some(tag) = row.tag_name {
                    last.tags.push(tag);
                }
            }
            _ => books.push(row.into()),
        }
    }

    books
}

/// 모든 항목의 태그 이름 합집합 (중복 없이 알파벳순)
pub fn distinct_tags(books: &[LibraryBook]) -> Vec<String> {
    books
        .iter()
        .flat_map(|book| book.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 없거나 0인 평점은 "평가 안 함"으로 저장합니다. 1~5를 벗어나면 거부합니다.
fn normalize_rating(value: Option<i64>, field: &str) -> Result<Option<i64>, AppError> {
    match value {
        None | Some(0) => Ok(None),
        Some(v) if (1..=MAX_RATING).contains(&v) => Ok(Some(v)),
        Some(v) => Err(AppError::BadRequest(format!(
            "{field} must be between 0 and {MAX_RATING}, got {v}"
        ))),
    }
}

fn form_or_default(form: Option<&str>) -> &str {
    form.filter(|f| !f.is_empty()).unwrap_or(DEFAULT_FORM)
}
