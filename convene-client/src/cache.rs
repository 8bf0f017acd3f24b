//! Per-session query cache.
//!
//! One cache is created per signed-in session and handed to the
//! [`DataClient`](crate::DataClient). Entries are plain JSON, so the whole
//! cache can be dehydrated into a snapshot on the server and hydrated on
//! the client for the first page load.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use convene_core::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::query::{InvalidationTarget, QueryKey};

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    updated_at: Timestamp,
}

/// Serializable snapshot of a cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehydratedState {
    pub queries: Vec<DehydratedQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehydratedQuery {
    pub key: QueryKey,
    pub data: Value,
    pub updated_at: Timestamp,
}

#[derive(Debug)]
pub struct QueryCache {
    entries: RwLock<BTreeMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
}

fn read<T>(lock: &RwLock<T>) -> ClientResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| ClientError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> ClientResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| ClientError::LockPoisoned)
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Cached data for `key` if it is still fresh.
    pub fn get_fresh(&self, key: &QueryKey) -> ClientResult<Option<Value>> {
        self.get_fresh_at(key, Utc::now())
    }

    pub fn get_fresh_at(&self, key: &QueryKey, now: Timestamp) -> ClientResult<Option<Value>> {
        let entries = read(&self.entries)?;
        Ok(entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.data.clone()))
    }

    /// Cached data for `key`, fresh or not.
    pub fn get(&self, key: &QueryKey) -> ClientResult<Option<Value>> {
        Ok(read(&self.entries)?.get(key).map(|entry| entry.data.clone()))
    }

    pub fn set(&self, key: QueryKey, data: Value) -> ClientResult<()> {
        self.set_at(key, data, Utc::now())
    }

    pub fn set_at(&self, key: QueryKey, data: Value, updated_at: Timestamp) -> ClientResult<()> {
        write(&self.entries)?.insert(key, CacheEntry { data, updated_at });
        Ok(())
    }

    /// Drop every entry the target matches. Returns how many were dropped.
    pub fn invalidate(&self, target: &InvalidationTarget) -> ClientResult<usize> {
        self.invalidate_all(std::slice::from_ref(target))
    }

    pub fn invalidate_all(&self, targets: &[InvalidationTarget]) -> ClientResult<usize> {
        let mut entries = write(&self.entries)?;
        let before = entries.len();
        entries.retain(|key, _| !targets.iter().any(|target| target.matches(key)));
        Ok(before - entries.len())
    }

    pub fn clear(&self) -> ClientResult<()> {
        write(&self.entries)?.clear();
        Ok(())
    }

    pub fn len(&self) -> ClientResult<usize> {
        Ok(read(&self.entries)?.len())
    }

    pub fn is_empty(&self) -> ClientResult<bool> {
        Ok(read(&self.entries)?.is_empty())
    }

    pub fn dehydrate(&self) -> ClientResult<DehydratedState> {
        let entries = read(&self.entries)?;
        let queries = entries
            .iter()
            .map(|(key, entry)| DehydratedQuery {
                key: key.clone(),
                data: entry.data.clone(),
                updated_at: entry.updated_at,
            })
            .collect();
        Ok(DehydratedState { queries })
    }

    /// Merge a snapshot into this cache.
    ///
    /// An entry already present and at least as recent as the snapshot's
    /// copy is kept. Returns how many entries were written.
    pub fn hydrate(&self, state: DehydratedState) -> ClientResult<usize> {
        let mut entries = write(&self.entries)?;
        let mut written = 0;
        for query in state.queries {
            let newer = entries
                .get(&query.key)
                .map_or(true, |existing| existing.updated_at < query.updated_at);
            if newer {
                entries.insert(
                    query.key,
                    CacheEntry {
                        data: query.data,
                        updated_at: query.updated_at,
                    },
                );
                written += 1;
            }
        }
        Ok(written)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Timestamp) -> bool {
        match (now - entry.updated_at).to_std() {
            Ok(age) => age < self.stale_time,
            // Written "in the future" relative to `now`.
            Err(_) => true,
        }
    }
}
