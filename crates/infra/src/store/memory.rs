//! Process-local TTL store.
//!
//! Implements `EphemeralStateStore` over a mutex-guarded map. Entries
//! expire lazily on read, with a sweep on writes to bound growth.
//! Correct for a single service instance; multi-instance deployments
//! need a shared store (Redis) behind the same port.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use inboxflow_common::error::AuthResult;
use inboxflow_core::auth::ports::EphemeralStateStore;

/// Sweep the whole map once the entry count crosses this threshold.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// In-memory `EphemeralStateStore` for tests and single-instance
/// deployments.
#[derive(Debug, Default)]
pub struct InMemoryTtlStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryTtlStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map only means another thread panicked mid-write;
        // the data itself is strings and safe to keep serving.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep(entries: &mut HashMap<String, Entry>) {
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, entry| entry.is_live());
        }
    }

    /// Number of live entries (expired ones are dropped first).
    #[must_use]
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.is_live());
        entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EphemeralStateStore for InMemoryTtlStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let mut entries = self.lock();
        Self::sweep(&mut entries);
        entries.insert(
            key.to_string(),
            Entry { value: value.to_string(), expires_at: Instant::now() + ttl },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> AuthResult<bool> {
        let mut entries = self.lock();
        Self::sweep(&mut entries);

        match entries.get(key) {
            Some(entry) if entry.is_live() => Ok(false),
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry { value: value.to_string(), expires_at: Instant::now() + ttl },
                );
                Ok(true)
            }
        }
    }
}
