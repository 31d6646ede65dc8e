//! `Session` and `SessionPool`: per-identity state that outlives a
//! single task, kept warm across tasks sharing the same session id
//! (spec §4.7).

use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Anything a session may carry (e.g. a decoded JWT claims struct, a
/// per-session DAO handle) (spec §4.7 "SessionField"). Each field can
/// report whether it has expired, attempt to refresh itself in place,
/// and release any resources it holds when the session is torn down.
///
/// The defaults treat a field as never expiring and having nothing to
/// clean up, so any `Any + Send + Sync` value can be stored as a field
/// (the blanket impl below) without opting into the lifecycle; fields
/// that do carry a TTL (e.g. `AuthenticatedUser` wrapping a token
/// expiry) override `is_expired`/`refresh`.
pub trait SessionField: Any + Send + Sync {
    /// Whether this field should be considered expired without
    /// attempting a refresh (spec §4.7 "is_expired").
    fn is_expired(&self) -> bool {
        false
    }

    /// Attempt to renew this field in place; returns `true` if it is
    /// valid (no longer expired) afterward (spec §4.7 "refresh").
    fn refresh(&self) -> bool {
        !self.is_expired()
    }

    /// Release anything this field holds (spec §4.7 "destroy"), called
    /// when its session is evicted.
    fn destroy(&self) {}

    /// Safe-downcast hook (spec-internal): lets [`Session::get`] recover
    /// the concrete type from an `Arc<dyn SessionField>` without
    /// `unsafe`, the same technique the `downcast-rs` crate uses for
    /// `Arc<dyn Trait>` -> `Arc<dyn Any>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> SessionField for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Per-identity state, addressed by a stable session id (spec §3
/// "Session") — typically the authorization subject claim. Fields are
/// resolved once and reused by later tasks that carry the same session
/// id, until the pool evicts it.
pub struct Session {
    id: String,
    fields: RwLock<HashMap<TypeId, Arc<dyn SessionField>>>,
    last_touched: Mutex<Instant>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: RwLock::new(HashMap::new()),
            last_touched: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetch a previously-set field of type `T`, if any.
    pub fn get<T: SessionField>(&self) -> Option<Arc<T>> {
        let fields = self.fields.read().expect("session fields lock poisoned");
        fields.get(&TypeId::of::<T>()).and_then(|f| f.clone().into_any().downcast::<T>().ok())
    }

    /// Set (or replace) a field of type `T`.
    pub fn set<T: SessionField>(&self, value: T) {
        let mut fields = self.fields.write().expect("session fields lock poisoned");
        fields.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// True iff any field, after one `refresh()` attempt, still reports
    /// itself expired (spec §4.7 "a session is expired iff...",
    /// eviction predicate (i)).
    pub fn is_expired(&self) -> bool {
        let fields = self.fields.read().expect("session fields lock poisoned");
        fields.values().any(|field| field.is_expired() && !field.refresh())
    }

    /// Release every field's resources (spec §4.7 "destroy"), called by
    /// the pool right before dropping an evicted or stale session.
    pub fn destroy(&self) {
        let fields = self.fields.read().expect("session fields lock poisoned");
        for field in fields.values() {
            field.destroy();
        }
    }

    fn touch(&self) {
        *self.last_touched.lock().expect("session touch lock poisoned") = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_touched.lock().expect("session touch lock poisoned").elapsed()
    }
}

/// Concurrent session store with insertion-order eviction (spec §4.7
/// "upsert / eviction / inactivity sweep"), modeled on the teacher's
/// DashMap-backed `TtlCache`.
pub struct SessionPool {
    sessions: DashMap<String, Arc<Session>>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
    max_idle: Duration,
}

impl SessionPool {
    pub fn new(capacity: usize, max_idle: Duration) -> Self {
        Self { sessions: DashMap::new(), order: Mutex::new(VecDeque::new()), capacity, max_idle }
    }

    /// Fetch the session for `id`, rebuilding it via `fields_getter` if
    /// absent or expired (spec §4.7 "upsert"):
    ///
    /// 1. If present and not expired, touch its last-active timestamp
    ///    and return it.
    /// 2. If present but expired (predicate (i)), destroy it and fall
    ///    through to step 3 as if absent.
    /// 3. Otherwise evict the oldest entry if the pool is at capacity,
    ///    build a fresh session via `fields_getter(id)` (which may
    ///    perform I/O, e.g. decoding a credential), store it, and
    ///    return it.
    pub async fn upsert<F, Fut>(&self, id: &str, fields_getter: F) -> Arc<Session>
    where
        F: FnOnce(&str) -> Fut,
        Fut: Future<Output = Session>,
    {
        if let Some(existing) = self.sessions.get(id).map(|e| e.clone()) {
            if existing.is_expired() {
                existing.destroy();
                self.remove(id);
            } else {
                existing.touch();
                return existing;
            }
        }

        self.evict_if_full();
        let session = Arc::new(fields_getter(id).await);
        self.sessions.insert(id.to_string(), session.clone());
        self.order.lock().expect("session order lock poisoned").push_back(id.to_string());
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| {
            s.touch();
            s.clone()
        })
    }

    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
        self.order.lock().expect("session order lock poisoned").retain(|k| k != id);
    }

    /// Evict every session that is either idle for longer than
    /// `max_idle` (predicate (ii)) or has an expired field that didn't
    /// survive a refresh attempt (predicate (i)) (spec §4.7 "inactivity
    /// / expiry sweep"). Transports call this periodically rather than
    /// the pool scheduling its own timer (spec §9: no background
    /// singletons).
    pub async fn sweep_expired(&self) {
        let snapshot: Vec<(String, Arc<Session>)> =
            self.sessions.iter().map(|entry| (entry.key().clone(), entry.value().clone())).collect();

        let mut stale = Vec::new();
        for (id, session) in snapshot {
            if session.idle_for() > self.max_idle || session.is_expired() {
                stale.push((id, session));
            }
        }
        for (id, session) in stale {
            session.destroy();
            self.remove(&id);
        }
    }

    fn evict_if_full(&self) {
        if self.capacity == 0 {
            return;
        }
        while self.sessions.len() >= self.capacity {
            let oldest = {
                let mut order = self.order.lock().expect("session order lock poisoned");
                order.pop_front()
            };
            match oldest {
                Some(id) => {
                    if let Some((_, session)) = self.sessions.remove(&id) {
                        session.destroy();
                    }
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn bare_session(id: &str) -> Session {
        Session::new(id)
    }

    #[tokio::test]
    async fn upsert_creates_then_reuses_same_session() {
        let pool = SessionPool::new(10, Duration::from_secs(60));
        let a = pool.upsert("user-1", bare_session).await;
        let b = pool.upsert("user-1", bare_session).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn session_fields_round_trip_by_type() {
        let session = Session::new("user-1");
        session.set(42u32);
        session.set("hello".to_string());
        assert_eq!(*session.get::<u32>().unwrap(), 42);
        assert_eq!(*session.get::<String>().unwrap(), "hello");
        assert!(session.get::<bool>().is_none());
    }

    #[tokio::test]
    async fn pool_evicts_oldest_when_over_capacity() {
        let pool = SessionPool::new(2, Duration::from_secs(60));
        pool.upsert("a", bare_session).await;
        pool.upsert("b", bare_session).await;
        pool.upsert("c", bare_session).await;
        assert_eq!(pool.len(), 2);
        assert!(pool.get("a").is_none());
        assert!(pool.get("b").is_some());
        assert!(pool.get("c").is_some());
    }

    #[tokio::test]
    async fn sweep_expired_removes_idle_sessions() {
        let pool = SessionPool::new(10, Duration::from_millis(1));
        pool.upsert("stale", bare_session).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.sweep_expired().await;
        assert!(pool.is_empty());
    }

    struct AlwaysExpired;

    impl SessionField for AlwaysExpired {
        fn is_expired(&self) -> bool {
            true
        }

        fn refresh(&self) -> bool {
            false
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test]
    async fn upsert_rebuilds_a_session_whose_field_stays_expired_after_refresh() {
        let pool = SessionPool::new(10, Duration::from_secs(60));
        let first = pool.upsert("user-1", bare_session).await;
        first.set(AlwaysExpired);

        let second = pool.upsert("user-1", bare_session).await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.get::<AlwaysExpired>().is_none());
    }

    #[tokio::test]
    async fn sweep_expired_also_removes_sessions_with_expired_fields() {
        let pool = SessionPool::new(10, Duration::from_secs(60));
        let session = pool.upsert("user-1", bare_session).await;
        session.set(AlwaysExpired);
        pool.sweep_expired().await;
        assert!(pool.is_empty());
    }
}
