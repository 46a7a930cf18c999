//! In-memory session store with expiry and per-key serialization.
//!
//! Sessions live in a fixed number of shards, each a map from id to a
//! per-session mutex. A turn holds only its own session's mutex, so turns
//! on different sessions run in parallel while turns on the same session
//! are serialized. Snapshot callers (`get_or_create` + `save`) are guarded
//! by a revision counter instead: a save against a stale revision fails.
//!
//! Expired sessions are swept one shard per access (round-robin), and
//! optionally by a [`SessionReaper`] thread. A sweep step examines at most
//! [`SWEEP_BATCH`] entries of its shard and resumes from a per-shard cursor
//! on the next visit. Sweeps never block on a session that is mid-turn.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::session::Session;

/// Number of independently locked shards.
pub const SHARD_COUNT: usize = 16;

/// Entries examined per shard in one sweep step.
pub const SWEEP_BATCH: usize = 64;

/// Cap for timeouts too large to represent.
const MAX_TIMEOUT_DAYS: i64 = 365 * 100;

/// Reaper sleep granularity for shutdown responsiveness.
const REAPER_SLEEP_GRANULARITY: Duration = Duration::from_millis(100);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Stale revision for session {id}: saved from {given}, store is at {current}")]
    Stale { id: String, given: u64, current: u64 },

    #[error("Session store lock poisoned")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Slots and shards
// ═══════════════════════════════════════════════════════════

struct Slot {
    session: Session,
    /// Set once the slot is unlinked from its shard. A caller that was
    /// waiting on the mutex must treat the session as gone.
    retired: bool,
}

type SlotRef = Arc<Mutex<Slot>>;
type Shard = RwLock<HashMap<String, SlotRef>>;

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

pub struct SessionStore {
    shards: Vec<Shard>,
    hasher: RandomState,
    timeout: chrono::Duration,
    sweep_cursor: AtomicUsize,
    /// Resume position inside each shard for the next sweep step.
    shard_offsets: Vec<AtomicUsize>,
    batch_size: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct SweepBatch {
    visited: usize,
    removed: usize,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
            timeout: chrono::Duration::from_std(timeout)
                .unwrap_or_else(|_| chrono::Duration::days(MAX_TIMEOUT_DAYS)),
            sweep_cursor: AtomicUsize::new(0),
            shard_offsets: (0..SHARD_COUNT).map(|_| AtomicUsize::new(0)).collect(),
            batch_size: SWEEP_BATCH,
        }
    }

    pub fn timeout(&self) -> chrono::Duration {
        self.timeout
    }

    /// A session is expired once it has been idle for longer than the timeout.
    pub fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_activity > self.timeout
    }

    // ── Turn access ─────────────────────────────────────────

    /// Run `f` on the live session for `id`, holding that session's lock
    /// for the whole call. An absent, unknown or expired id gets a fresh
    /// session with a newly generated id. Refreshes `last_activity`.
    pub fn with_session<R>(
        &self,
        id: Option<&str>,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, StoreError> {
        self.with_session_at(id, Utc::now(), f)
    }

    pub fn with_session_at<R>(
        &self,
        id: Option<&str>,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, StoreError> {
        self.sweep_step_at(now);

        if let Some(slot) = id.map(|id| self.lookup(id)).transpose()?.flatten() {
            let mut guard = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
            if !guard.retired {
                if !self.is_expired(&guard.session, now) {
                    return Ok(Self::touch_and_run(&mut guard.session, now, f));
                }
                guard.retired = true;
                let expired_id = guard.session.id.clone();
                drop(guard);
                self.unlink(&expired_id, &slot)?;
                tracing::debug!(session_id = %expired_id, "Session expired");
            }
        }

        let slot = self.create(now)?;
        let mut guard = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(Self::touch_and_run(&mut guard.session, now, f))
    }

    fn touch_and_run<R>(
        session: &mut Session,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Session) -> R,
    ) -> R {
        session.last_activity = now;
        session.revision += 1;
        f(session)
    }

    // ── Snapshot access ─────────────────────────────────────

    /// Snapshot of the live session for `id`, creating one as in
    /// [`with_session`](Self::with_session). Pair with [`save`](Self::save).
    pub fn get_or_create(&self, id: Option<&str>) -> Result<Session, StoreError> {
        self.get_or_create_at(id, Utc::now())
    }

    pub fn get_or_create_at(
        &self,
        id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        self.with_session_at(id, now, |session| session.clone())
    }

    /// Replace the stored session. Fails with `Stale` when another write
    /// happened since the snapshot was taken.
    pub fn save(&self, session: Session) -> Result<(), StoreError> {
        self.save_at(session, Utc::now())
    }

    pub fn save_at(&self, mut session: Session, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.sweep_step_at(now);

        let slot = self
            .lookup(&session.id)?
            .ok_or_else(|| StoreError::NotFound(session.id.clone()))?;
        let mut guard = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        if guard.retired || self.is_expired(&guard.session, now) {
            return Err(StoreError::NotFound(session.id));
        }
        if guard.session.revision != session.revision {
            return Err(StoreError::Stale {
                id: session.id,
                given: session.revision,
                current: guard.session.revision,
            });
        }
        session.revision += 1;
        guard.session = session;
        Ok(())
    }

    /// Read-only lookup. Does not refresh activity and never creates.
    pub fn get(&self, id: &str) -> Result<Session, StoreError> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(&self, id: &str, now: DateTime<Utc>) -> Result<Session, StoreError> {
        self.sweep_step_at(now);

        let slot = self
            .lookup(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let guard = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        if guard.retired || self.is_expired(&guard.session, now) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(guard.session.clone())
    }

    /// Drop a session outright. Returns whether it was present.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let Some(slot) = self.lookup(id)? else {
            return Ok(false);
        };
        let mut guard = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        if guard.retired {
            return Ok(false);
        }
        guard.retired = true;
        drop(guard);
        self.unlink(id, &slot)
    }

    /// Stored sessions, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().map_or(0, |map| map.len()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Expiry sweeps ───────────────────────────────────────

    /// Sweep the next batch of the next shard in round-robin order.
    /// Returns sessions removed.
    pub fn sweep_step_at(&self, now: DateTime<Utc>) -> usize {
        let idx = self.sweep_cursor.fetch_add(1, Ordering::Relaxed) % SHARD_COUNT;
        let offset = self.shard_offsets[idx].load(Ordering::Relaxed);
        let batch = self.sweep_batch(idx, offset, now);
        let next = if batch.visited < self.batch_size {
            0
        } else {
            offset + batch.visited - batch.removed
        };
        self.shard_offsets[idx].store(next, Ordering::Relaxed);
        batch.removed
    }

    /// Sweep every shard completely, one batch at a time.
    pub fn sweep_all_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for idx in 0..SHARD_COUNT {
            let mut offset = 0;
            loop {
                let batch = self.sweep_batch(idx, offset, now);
                removed += batch.removed;
                if batch.visited < self.batch_size {
                    break;
                }
                offset += batch.visited - batch.removed;
            }
        }
        removed
    }

    /// Examine up to `batch_size` entries of shard `idx` starting at
    /// `offset`. Candidates are collected under the read lock; the write
    /// lock is taken per removal only.
    fn sweep_batch(&self, idx: usize, offset: usize, now: DateTime<Utc>) -> SweepBatch {
        let (visited, candidates) = {
            let Ok(map) = self.shards[idx].read() else {
                tracing::warn!(shard = idx, "Skipping sweep of poisoned shard");
                return SweepBatch::default();
            };
            let mut visited = 0;
            let mut candidates = Vec::new();
            for (id, slot) in map.iter().skip(offset).take(self.batch_size) {
                visited += 1;
                if self.is_reapable(slot, now) {
                    candidates.push((id.clone(), Arc::clone(slot)));
                }
            }
            (visited, candidates)
        };

        let mut removed = 0;
        for (id, slot) in candidates {
            // Re-check: a turn may have refreshed the session since.
            if self.retire_if_reapable(&slot, now) && self.unlink(&id, &slot).unwrap_or(false) {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(shard = idx, removed, "Swept expired sessions");
        }
        SweepBatch { visited, removed }
    }

    fn is_reapable(&self, slot: &SlotRef, now: DateTime<Utc>) -> bool {
        match slot.try_lock() {
            Ok(guard) => guard.retired || self.is_expired(&guard.session, now),
            // Mid-turn: certainly not idle.
            Err(TryLockError::WouldBlock) => false,
            Err(TryLockError::Poisoned(_)) => true,
        }
    }

    fn retire_if_reapable(&self, slot: &SlotRef, now: DateTime<Utc>) -> bool {
        match slot.try_lock() {
            Ok(mut guard) => {
                if guard.retired || self.is_expired(&guard.session, now) {
                    guard.retired = true;
                    true
                } else {
                    false
                }
            }
            Err(TryLockError::WouldBlock) => false,
            Err(TryLockError::Poisoned(_)) => true,
        }
    }

    // ── Internals ───────────────────────────────────────────

    fn shard(&self, id: &str) -> &Shard {
        let idx = (self.hasher.hash_one(id) % SHARD_COUNT as u64) as usize;
        &self.shards[idx]
    }

    fn lookup(&self, id: &str) -> Result<Option<SlotRef>, StoreError> {
        let map = self.shard(id).read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(id).cloned())
    }

    fn create(&self, now: DateTime<Utc>) -> Result<SlotRef, StoreError> {
        let id = Uuid::new_v4().to_string();
        let slot = Arc::new(Mutex::new(Slot {
            session: Session::new(id.clone(), now),
            retired: false,
        }));
        self.shard(&id)
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(id.clone(), Arc::clone(&slot));
        tracing::info!(session_id = %id, "Session created");
        Ok(slot)
    }

    /// Remove `id` from its shard if it still maps to `slot`.
    fn unlink(&self, id: &str, slot: &SlotRef) -> Result<bool, StoreError> {
        let mut map = self.shard(id).write().map_err(|_| StoreError::LockPoisoned)?;
        if map.get(id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            map.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

// ═══════════════════════════════════════════════════════════
// SessionReaper — background expiry
// ═══════════════════════════════════════════════════════════

/// Handle for the background reaper thread.
///
/// Stops on `shutdown()` or when dropped.
pub struct SessionReaper {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SessionReaper {
    /// Sweep all shards of `store` every `interval`.
    pub fn start(store: Arc<SessionStore>, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let handle = std::thread::spawn(move || {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Session reaper started");
            reaper_loop(&store, interval, &flag);
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for SessionReaper {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn reaper_loop(store: &SessionStore, interval: Duration, shutdown: &AtomicBool) {
    let mut last_sweep = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(REAPER_SLEEP_GRANULARITY.min(interval));
        if last_sweep.elapsed() < interval {
            continue;
        }
        last_sweep = Instant::now();
        store.sweep_all_at(Utc::now());
    }
    tracing::info!("Session reaper shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Speaker;
    use std::collections::HashSet;

    const THIRTY_MIN: Duration = Duration::from_secs(30 * 60);

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    #[test]
    fn absent_id_always_yields_fresh_session() {
        let store = SessionStore::new(THIRTY_MIN);
        let mut ids = HashSet::new();
        for _ in 0..50 {
            let session = store.get_or_create_at(None, t0()).unwrap();
            assert!(ids.insert(session.id));
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn existing_id_returns_same_session() {
        let store = SessionStore::new(THIRTY_MIN);
        let first = store.get_or_create_at(None, t0()).unwrap();
        let again = store
            .get_or_create_at(Some(&first.id), t0() + minutes(5))
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.last_activity, t0() + minutes(5));
    }

    #[test]
    fn unknown_id_gets_generated_id() {
        let store = SessionStore::new(THIRTY_MIN);
        let session = store.get_or_create_at(Some("made-up"), t0()).unwrap();
        assert_ne!(session.id, "made-up");
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn expired_id_yields_different_session() {
        let store = SessionStore::new(THIRTY_MIN);
        let first = store.get_or_create_at(None, t0()).unwrap();
        let later = store
            .get_or_create_at(Some(&first.id), t0() + minutes(31))
            .unwrap();
        assert_ne!(later.id, first.id);
        assert!(matches!(
            store.get_at(&first.id, t0() + minutes(31)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let store = SessionStore::new(THIRTY_MIN);
        let first = store.get_or_create_at(None, t0()).unwrap();
        let same = store
            .get_or_create_at(Some(&first.id), t0() + minutes(30))
            .unwrap();
        assert_eq!(same.id, first.id);
    }

    #[test]
    fn get_does_not_refresh_activity() {
        let store = SessionStore::new(THIRTY_MIN);
        let first = store.get_or_create_at(None, t0()).unwrap();
        let seen = store.get_at(&first.id, t0() + minutes(20)).unwrap();
        assert_eq!(seen.last_activity, t0());
        // Still keyed to the first activity time.
        assert!(store.get_at(&first.id, t0() + minutes(31)).is_err());
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = SessionStore::new(THIRTY_MIN);
        assert!(matches!(
            store.get_at("nope", t0()),
            Err(StoreError::NotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn save_replaces_session() {
        let store = SessionStore::new(THIRTY_MIN);
        let mut session = store.get_or_create_at(None, t0()).unwrap();
        session.push_entry(Speaker::Patient, "hello", t0());
        store.save_at(session.clone(), t0()).unwrap();

        let stored = store.get_at(&session.id, t0()).unwrap();
        assert_eq!(stored.conversation.len(), 1);
        assert_eq!(stored.revision, session.revision + 1);
    }

    #[test]
    fn stale_save_is_rejected() {
        let store = SessionStore::new(THIRTY_MIN);
        let created = store.get_or_create_at(None, t0()).unwrap();
        let mut a = store.get_or_create_at(Some(&created.id), t0()).unwrap();
        let mut b = a.clone();

        a.push_entry(Speaker::Patient, "first", t0());
        store.save_at(a, t0()).unwrap();

        b.push_entry(Speaker::Patient, "second", t0());
        assert!(matches!(
            store.save_at(b, t0()),
            Err(StoreError::Stale { .. })
        ));

        let stored = store.get_at(&created.id, t0()).unwrap();
        assert_eq!(stored.conversation[0].text, "first");
    }

    #[test]
    fn save_of_unknown_session_is_not_found() {
        let store = SessionStore::new(THIRTY_MIN);
        let orphan = Session::new("orphan".into(), t0());
        assert!(matches!(
            store.save_at(orphan, t0()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_turns_on_one_session_never_lose_updates() {
        let store = Arc::new(SessionStore::new(THIRTY_MIN));
        let id = store.get_or_create(None).unwrap().id;

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store
                            .with_session(Some(&id), |s| {
                                s.push_entry(Speaker::Patient, format!("{t}-{i}"), Utc::now());
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let session = store.get(&id).unwrap();
        assert_eq!(session.conversation.len(), 400);
    }

    #[test]
    fn concurrent_snapshot_saves_never_lose_updates() {
        let store = Arc::new(SessionStore::new(THIRTY_MIN));
        let id = store.get_or_create(None).unwrap().id;

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    let mut done = 0;
                    while done < 25 {
                        let mut snapshot = store.get_or_create(Some(&id)).unwrap();
                        snapshot.push_entry(Speaker::Patient, format!("{t}"), Utc::now());
                        match store.save(snapshot) {
                            Ok(()) => done += 1,
                            Err(StoreError::Stale { .. }) => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(store.get(&id).unwrap().conversation.len(), 100);
    }

    #[test]
    fn sweeps_remove_only_expired_sessions() {
        let store = SessionStore::new(THIRTY_MIN);
        let old = store.get_or_create_at(None, t0()).unwrap();
        let fresh = store.get_or_create_at(None, t0() + minutes(25)).unwrap();

        let removed = store.sweep_all_at(t0() + minutes(40));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get_at(&fresh.id, t0() + minutes(40)).is_ok());
        assert!(store.get_at(&old.id, t0() + minutes(40)).is_err());
    }

    #[test]
    fn round_robin_sweep_eventually_covers_every_shard() {
        let store = SessionStore::new(THIRTY_MIN);
        for _ in 0..40 {
            store.get_or_create_at(None, t0()).unwrap();
        }
        let later = t0() + minutes(60);
        let removed: usize = (0..SHARD_COUNT).map(|_| store.sweep_step_at(later)).sum();
        assert_eq!(removed, 40);
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_step_visits_a_bounded_batch() {
        let mut store = SessionStore::new(THIRTY_MIN);
        store.batch_size = 2;
        for _ in 0..100 {
            store.get_or_create_at(None, t0()).unwrap();
        }
        let later = t0() + minutes(60);

        let first = store.sweep_step_at(later);
        assert!(first <= 2, "removed {first} in one step");
        assert_eq!(store.len(), 100 - first);

        let rest = store.sweep_all_at(later);
        assert_eq!(first + rest, 100);
        assert!(store.is_empty());
    }

    #[test]
    fn repeated_steps_resume_within_a_shard() {
        let mut store = SessionStore::new(THIRTY_MIN);
        store.batch_size = 1;
        for _ in 0..64 {
            store.get_or_create_at(None, t0()).unwrap();
        }
        let later = t0() + minutes(60);
        let mut removed = 0;
        for _ in 0..SHARD_COUNT * 64 {
            removed += store.sweep_step_at(later);
        }
        assert_eq!(removed, 64);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_unlinks_session() {
        let store = SessionStore::new(THIRTY_MIN);
        let session = store.get_or_create_at(None, t0()).unwrap();
        assert!(store.remove(&session.id).unwrap());
        assert!(!store.remove(&session.id).unwrap());
        assert!(store.get_at(&session.id, t0()).is_err());
    }

    #[test]
    fn reaper_sweeps_in_background() {
        let store = Arc::new(SessionStore::new(THIRTY_MIN));
        let long_ago = Utc::now() - minutes(120);
        for _ in 0..5 {
            store.get_or_create_at(None, long_ago).unwrap();
        }

        let reaper = SessionReaper::start(Arc::clone(&store), Duration::from_millis(10));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !store.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        drop(reaper);
        assert!(store.is_empty());
    }

    #[test]
    fn reaper_shutdown_flag() {
        let reaper = SessionReaper {
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: None,
        };
        reaper.shutdown();
        assert!(reaper.shutdown.load(Ordering::Relaxed));
    }
}
