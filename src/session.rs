//! # 인증 세션
//!
//! 서재 클라이언트가 의존하는 인증 제공자(`AuthProvider`)와 그 구현들입니다.
//!
//! - `AuthProvider`: "현재 사용자 조회"와 "세션 변경 구독" 두 가지만 요구합니다.
//! - `Subscription`: 구독 핸들. drop되면 리스너가 등록 해제됩니다.
//! - `Session`: 로그인/로그아웃 상태를 가진 단일 사용자 세션 (앱 하나 = 세션 하나)
//! - `FixedUser`: 이미 인증된 한 사용자. HTTP 요청 하나를 처리할 때 사용합니다.
//!
//! ## 알림 흐름
//! ```text
//! Session::sign_in() ─→ 상태 교체 ─→ Listeners::notify(Some(user)) ─→ 각 리스너
//! Session::sign_out() ─→ 상태 제거 ─→ Listeners::notify(None)       ─→ 각 리스너
//! ```

use crate::{error::AppError, models::User, services::accounts};
use sqlx::SqlitePool;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, RwLock, Weak,
};

/// 세션이 바뀔 때 호출되는 콜백. 로그아웃이면 `None`을 받습니다.
pub type SessionListener = Box<dyn Fn(Option<&User>) + Send + Sync>;

/// 서재 클라이언트가 사용하는 인증 제공자
pub trait AuthProvider: Send + Sync {
    /// 현재 로그인된 사용자. 없으면 `None`
    fn current_user(&self) -> Option<User>;

    /// 세션 변경 알림을 구독합니다. 반환된 핸들이 살아 있는 동안만 알림을 받습니다.
    fn subscribe(&self, listener: SessionListener) -> Subscription;
}

/// 등록된 세션 리스너 목록
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<dyn Fn(Option<&User>) + Send + Sync>)>>,
}

impl Listeners {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 리스너를 등록하고, drop 시 등록을 해제하는 핸들을 반환합니다.
    pub fn register(self: &Arc<Self>, listener: SessionListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::from(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(self),
        }
    }

    /// 모든 리스너를 호출합니다.
    ///
    /// 잠금을 푼 뒤에 호출하므로 리스너 안에서 구독을 해제해도 교착되지 않습니다.
    pub fn notify(&self, user: Option<&User>) {
        let listeners: Vec<_> = self.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(user);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Arc<dyn Fn(Option<&User>) + Send + Sync>)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 세션 변경 구독 핸들
///
/// 리스너 목록을 약한 참조(`Weak`)로 들고 있어서, 제공자가 먼저 사라져도 안전합니다.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// 아무것도 등록하지 않은 핸들. 세션이 바뀌지 않는 제공자가 반환합니다.
    pub fn inert() -> Self {
        Self {
            id: 0,
            listeners: Weak::new(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &(self.listeners.strong_count() > 0))
            .finish()
    }
}

/// 세션 토큰과 사용자
#[derive(Debug, Clone)]
struct SessionState {
    user: User,
    access_token: String,
    refresh_token: String,
}

/// 로그인 상태를 가진 단일 사용자 세션
///
/// 브라우저의 인증 클라이언트처럼 동작합니다. 로그인, 토큰 갱신, 로그아웃 때마다
/// 구독자에게 새 사용자(또는 `None`)를 알립니다.
pub struct Session {
    pool: SqlitePool,
    jwt_secret: String,
    state: RwLock<Option<SessionState>>,
    /// 상태 교체부터 알림까지 묶어서, 리스너가 상태가 바뀐 순서대로 알림을 받게 합니다.
    notify_lock: Mutex<()>,
    listeners: Arc<Listeners>,
}

impl Session {
    pub fn new(pool: SqlitePool, jwt_secret: impl Into<String>) -> Self {
        Self {
            pool,
            jwt_secret: jwt_secret.into(),
            state: RwLock::new(None),
            notify_lock: Mutex::new(()),
            listeners: Listeners::new(),
        }
    }

    /// 새 계정을 만들고 바로 로그인합니다.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AppError> {
        let auth = accounts::register(&self.pool, &self.jwt_secret, email, password).await?;
        Ok(self.establish(auth.user, auth.access_token, auth.refresh_token))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AppError> {
        let auth = accounts::login(&self.pool, &self.jwt_secret, email, password).await?;
        Ok(self.establish(auth.user, auth.access_token, auth.refresh_token))
    }

    /// 저장해 둔 토큰으로 세션을 복원합니다 (예: 앱 재시작 후).
    pub async fn restore(&self, access_token: &str, refresh_token: &str) -> Result<User, AppError> {
        let user =
            accounts::user_for_access_token(&self.pool, &self.jwt_secret, access_token).await?;
        Ok(self.establish(user, access_token.to_string(), refresh_token.to_string()))
    }

    /// refresh 토큰으로 토큰 쌍을 교체합니다.
    ///
    /// 갱신이 거부되면(만료, 폐기) 세션을 잃은 것으로 보고 로그아웃 상태가 됩니다.
    pub async fn refresh(&self) -> Result<(), AppError> {
        let refresh_token = self
            .read()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AppError::NotSignedIn)?;

        match accounts::refresh(&self.pool, &self.jwt_secret, &refresh_token).await {
            Ok(auth) => {
                self.establish(auth.user, auth.access_token, auth.refresh_token);
                Ok(())
            }
            Err(e @ AppError::Unauthorized(_)) => {
                tracing::warn!("Session refresh rejected: {}", e);
                self.replace(None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// 로그아웃합니다.
    ///
    /// 로컬 세션은 항상 지우고 구독자에게 알립니다. 서버 측 토큰 폐기에
    /// 실패하면 그 에러를 반환합니다.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let Some(previous) = self.replace(None) else {
            return Ok(());
        };

        accounts::logout(&self.pool, &previous.user.id)
            .await
            .inspect_err(|e| tracing::error!("Failed to revoke refresh tokens: {}", e))
    }

    /// 현재 access 토큰 (HTTP API 호출용)
    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token.clone())
    }

    fn establish(&self, user: User, access_token: String, refresh_token: String) -> User {
        self.replace(Some(SessionState {
            user: user.clone(),
            access_token,
            refresh_token,
        }));
        tracing::info!(user_id = %user.id, "session established");
        user
    }

    /// 세션 상태를 교체하고 구독자에게 알린 뒤 이전 상태를 반환합니다.
    ///
    /// 리스너 안에서 세션을 다시 바꾸면 교착됩니다. 상태 조회(`current_user`)는 괜찮습니다.
    fn replace(&self, next: Option<SessionState>) -> Option<SessionState> {
        let _ordered = self.notify_lock.lock().unwrap_or_else(|e| e.into_inner());
        let user = next.as_ref().map(|s| s.user.clone());
        let previous = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *state, next)
        };
        self.listeners.notify(user.as_ref());
        previous
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<SessionState>> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl AuthProvider for Session {
    fn current_user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.listeners.register(listener)
    }
}

/// 이미 인증된, 바뀌지 않는 사용자
///
/// HTTP 핸들러가 bearer 토큰으로 확인한 사용자를 서재 클라이언트에 넘길 때 씁니다.
#[derive(Debug, Clone)]
pub struct FixedUser(User);

impl FixedUser {
    pub fn new(user: User) -> Self {
        Self(user)
    }
}

impl AuthProvider for FixedUser {
    fn current_user(&self) -> Option<User> {
        Some(self.0.clone())
    }

    fn subscribe(&self, _listener: SessionListener) -> Subscription {
        Subscription::inert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::sync::atomic::AtomicUsize;

    const SECRET: &str = "session-test-secret";

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn dropping_subscription_stops_notifications() {
        let listeners = Listeners::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let subscription = listeners.register(Box::new(move |_: Option<&User>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        listeners.notify(Some(&user("a")));
        drop(subscription);
        listeners.notify(None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn subscription_outliving_listeners_is_harmless() {
        let listeners = Listeners::new();
        let subscription = listeners.register(Box::new(|_: Option<&User>| {}));
        drop(listeners);
        drop(subscription);
    }

    #[test]
    fn fixed_user_never_changes() {
        let provider = FixedUser::new(user("a"));
        let _subscription = provider.subscribe(Box::new(|_: Option<&User>| panic!("never notified")));
        assert_eq!(provider.current_user(), Some(user("a")));
    }

    #[tokio::test]
    async fn session_notifies_sign_in_and_sign_out() {
        let pool = db::connect_in_memory().await.unwrap();
        let session = Session::new(pool, SECRET);

        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _subscription = session.subscribe(Box::new(move |user: Option<&User>| {
            sink.lock().unwrap().push(user.map(|u| u.email.clone()));
        }));

        let user = session.sign_up("reader@example.com", "long enough").await.unwrap();
        assert_eq!(session.current_user(), Some(user));
        assert!(session.access_token().is_some());

        session.sign_out().await.unwrap();
        assert_eq!(session.current_user(), None);
        assert_eq!(session.access_token(), None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("reader@example.com".to_string()), None]
        );
    }

    #[tokio::test]
    async fn restore_uses_existing_tokens() {
        let pool = db::connect_in_memory().await.unwrap();
        let auth = accounts::register(&pool, SECRET, "a@example.com", "long enough")
            .await
            .unwrap();

        let session = Session::new(pool, SECRET);
        let user = session
            .restore(&auth.access_token, &auth.refresh_token)
            .await
            .unwrap();
        assert_eq!(user, auth.user);

        session.refresh().await.unwrap();
        assert_eq!(session.current_user(), Some(auth.user));
    }

    #[tokio::test]
    async fn rejected_refresh_signs_out() {
        let pool = db::connect_in_memory().await.unwrap();
        let auth = accounts::register(&pool, SECRET, "a@example.com", "long enough")
            .await
            .unwrap();
        accounts::logout(&pool, &auth.user.id).await.unwrap();

        let session = Session::new(pool, SECRET);
        session
            .restore(&auth.access_token, &auth.refresh_token)
            .await
            .unwrap();

        assert!(session.refresh().await.is_err());
        assert_eq!(session.current_user(), None);
    }

    #[tokio::test]
    async fn refresh_without_session_fails() {
        let pool = db::connect_in_memory().await.unwrap();
        let session = Session::new(pool, SECRET);
        assert!(matches!(session.refresh().await, Err(AppError::NotSignedIn)));
    }

    #[tokio::test]
    async fn overlapping_changes_notify_in_state_order() {
        let pool = db::connect_in_memory().await.unwrap();
        let session = Session::new(pool, SECRET);

        // 로그인 알림을 늦게 처리하는 리스너가 먼저 등록됨
        let _slow = session.subscribe(Box::new(|user: Option<&User>| {
            if user.is_some() {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
        }));
        let last_seen: Arc<Mutex<Option<String>>> = Arc::default();
        let sink = Arc::clone(&last_seen);
        let _recorder = session.subscribe(Box::new(move |user: Option<&User>| {
            *sink.lock().unwrap() = user.map(|u| u.id.clone());
        }));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                session.replace(Some(SessionState {
                    user: user("bob"),
                    access_token: "access".to_string(),
                    refresh_token: "refresh".to_string(),
                }));
            });
            scope.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(50));
                session.replace(None);
            });
        });

        assert_eq!(session.current_user(), None);
        assert_eq!(*last_seen.lock().unwrap(), None);
    }
}
