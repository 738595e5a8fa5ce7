//! Parsed-document cache so operator edits can rebuild rows without re-parsing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::model::{Authority, FieldValues};

/// Decides when a cached entry is stale.
pub trait ExpiryPolicy: Send + Sync {
    fn is_expired(&self, age: Duration) -> bool;
}

/// Entries expire once they are at least `ttl` old.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub ttl: Duration,
}

impl TtlPolicy {
    pub fn new(ttl: Duration) -> Self {
        TtlPolicy { ttl }
    }
}

impl ExpiryPolicy for TtlPolicy {
    fn is_expired(&self, age: Duration) -> bool {
        age >= self.ttl
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExpire;

impl ExpiryPolicy for NeverExpire {
    fn is_expired(&self, _age: Duration) -> bool {
        false
    }
}

/// What a preview needs to rebuild both rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedParse {
    pub authority: Authority,
    /// Extracted values before any override.
    pub fields: FieldValues,
    pub source_name: Option<String>,
}

#[derive(Debug)]
struct Entry {
    parse: CachedParse,
    created: Instant,
}

pub struct PreviewCache<P: ExpiryPolicy> {
    entries: Mutex<HashMap<Uuid, Entry>>,
    policy: P,
}

impl<P: ExpiryPolicy> PreviewCache<P> {
    pub fn new(policy: P) -> Self {
        PreviewCache {
            entries: Mutex::new(HashMap::new()),
            policy,
        }
    }

    // A panic while holding the lock leaves the map itself consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, parse: CachedParse) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            Entry {
                parse,
                created: Instant::now(),
            },
        );
        debug!(%id, "preview cached");
        id
    }

    /// Live entry for `id`. Stale entries are evicted on access.
    pub fn get(&self, id: &Uuid) -> Option<CachedParse> {
        let mut entries = self.lock();
        let expired = entries
            .get(id)
            .map(|e| self.policy.is_expired(e.created.elapsed()))?;
        if expired {
            entries.remove(id);
            debug!(%id, "preview expired");
            return None;
        }
        entries.get(id).map(|e| e.parse.clone())
    }

    pub fn remove(&self, id: &Uuid) -> Option<CachedParse> {
        self.lock().remove(id).map(|e| e.parse)
    }

    /// Drop every stale entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !self.policy.is_expired(e.created.elapsed()));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
