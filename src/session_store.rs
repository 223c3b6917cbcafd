//! Server-side session store.
//!
//! Holds one [`SessionContext`] per client, keyed by the SHA-256 hash of
//! an opaque bearer token (the raw token only ever lives in the client's
//! cookie). Key properties:
//! - Requests for the same session serialize on a per-session mutex
//! - Requests for different sessions never contend beyond the map lookup
//! - Sessions expire after a fixed TTL since last access

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::session_context::{SessionContext, SessionValue};

// ═══════════════════════════════════════════════════════════
// SessionToken: opaque client credential
// ═══════════════════════════════════════════════════════════

/// Opaque session token carried by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a random token (URL-safe base64, 32 bytes of entropy).
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a token received from a client.
    pub fn from_client(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(&self) -> TokenDigest {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        TokenDigest(hasher.finalize().into())
    }

    /// Short, non-reversible identifier safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let digest = self.digest();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&digest.0[..6])
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken({})", self.fingerprint())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TokenDigest([u8; 32]);

// ═══════════════════════════════════════════════════════════
// SessionSlot: one client's state behind its own lock
// ═══════════════════════════════════════════════════════════

struct SessionSlot {
    context: SessionContext,
    last_access: Instant,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            context: SessionContext::new(),
            last_access: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_access) > ttl
    }

    /// Start over if the slot outlived its TTL, then mark it used.
    fn refresh(&mut self, ttl: Duration) {
        let now = Instant::now();
        if self.is_expired(ttl, now) {
            self.context = SessionContext::new();
        }
        self.last_access = now;
    }
}

type SharedSlot = Arc<Mutex<SessionSlot>>;

fn lock_slot(slot: &SharedSlot) -> MutexGuard<'_, SessionSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

/// All live sessions.
pub struct SessionStore {
    slots: RwLock<HashMap<TokenDigest, SharedSlot>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ── Lifecycle ────────────────────────────────────────

    /// Issue a fresh token bound to an empty session.
    pub fn create(&self) -> SessionToken {
        let token = SessionToken::generate();
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.digest(), Arc::new(Mutex::new(SessionSlot::new())));
        tracing::debug!(session = %token.fingerprint(), "Session created");
        token
    }

    /// Whether `token` names a live (unexpired) session.
    pub fn contains(&self, token: &SessionToken) -> bool {
        match self.existing_slot(token) {
            Some(slot) => !lock_slot(&slot).is_expired(self.ttl, Instant::now()),
            None => false,
        }
    }

    /// Remove every key and forget the session.
    pub fn invalidate(&self, token: &SessionToken) {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token.digest());
        if let Some(slot) = removed {
            // Clear under the slot lock so a request still holding the
            // slot cannot observe stale state after logout.
            lock_slot(&slot).context.clear();
            tracing::debug!(session = %token.fingerprint(), "Session invalidated");
        }
    }

    /// Drop every session whose TTL has elapsed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        // try_lock: a slot busy with a request is in use, so not expired.
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => !guard.is_expired(self.ttl, now),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => {
                !poisoned.into_inner().is_expired(self.ttl, now)
            }
            Err(std::sync::TryLockError::WouldBlock) => true,
        });
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = slots.len(), "Expired sessions swept");
        }
        removed
    }

    /// Number of sessions held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Exclusive access ─────────────────────────────────

    /// Run `f` against the session while holding its lock.
    ///
    /// Creates the session on first access. The lock is released when `f`
    /// returns or unwinds.
    pub fn with_session<F, R>(&self, token: &SessionToken, f: F) -> R
    where
        F: FnOnce(&mut SessionContext) -> R,
    {
        loop {
            let slot = self.slot_or_insert(token);
            let mut guard = lock_slot(&slot);
            if !self.reattach(token, &slot) {
                continue;
            }
            guard.refresh(self.ttl);
            return f(&mut guard.context);
        }
    }

    /// Copy of the session's current state, if it is live.
    pub fn snapshot(&self, token: &SessionToken) -> Option<SessionContext> {
        let slot = self.existing_slot(token)?;
        let guard = lock_slot(&slot);
        if guard.is_expired(self.ttl, Instant::now()) {
            return None;
        }
        Some(guard.context.clone())
    }

    // ── Key/value access ─────────────────────────────────

    /// Read one value. Absence (including an expired session) is `None`.
    pub fn get(&self, token: &SessionToken, key: &str) -> Option<SessionValue> {
        let slot = self.existing_slot(token)?;
        let mut guard = lock_slot(&slot);
        if guard.is_expired(self.ttl, Instant::now()) {
            return None;
        }
        guard.last_access = Instant::now();
        guard.context.get(key).cloned()
    }

    /// Bind `value` under `key`, creating the session if needed.
    pub fn set(&self, token: &SessionToken, key: &str, value: SessionValue) {
        self.with_session(token, |ctx| ctx.set(key, value));
    }

    /// Remove `key`. No-op if the key or session is absent.
    pub fn delete(&self, token: &SessionToken, key: &str) {
        if let Some(slot) = self.existing_slot(token) {
            let mut guard = lock_slot(&slot);
            guard.refresh(self.ttl);
            guard.context.delete(key);
        }
    }

    // ── Slot lookup ──────────────────────────────────────

    fn existing_slot(&self, token: &SessionToken) -> Option<SharedSlot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token.digest())
            .cloned()
    }

    /// Keep `slot` stored under `token` once its lock is held.
    ///
    /// A sweep or invalidation may drop the entry between lookup and lock;
    /// the slot is put back so the caller's writes stay reachable. Returns
    /// false if a different slot now owns the token.
    fn reattach(&self, token: &SessionToken, slot: &SharedSlot) -> bool {
        let digest = token.digest();
        let attached = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&digest)
            .map(|current| Arc::ptr_eq(current, slot));
        if let Some(attached) = attached {
            return attached;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        match slots.get(&digest) {
            Some(current) => Arc::ptr_eq(current, slot),
            None => {
                slots.insert(digest, Arc::clone(slot));
                tracing::debug!(session = %token.fingerprint(), "Session slot reattached");
                true
            }
        }
    }

    fn slot_or_insert(&self, token: &SessionToken) -> SharedSlot {
        if let Some(slot) = self.existing_slot(token) {
            return slot;
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(token.digest())
            .or_insert_with(|| Arc::new(Mutex::new(SessionSlot::new())))
            .clone()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
