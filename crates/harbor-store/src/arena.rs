//! The versioned storage arena.

use crate::error::{StoreError, UpdateError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A stored value together with its version.
///
/// The version starts at 1 on insert and increments on every successful
/// write. Callers hand the version back when writing; a mismatch means
/// someone else wrote in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// The stored value.
    pub value: T,
    /// Write version, starting at 1.
    pub version: u64,
}

type Entry<T> = Arc<Mutex<Versioned<T>>>;

/// An in-memory map of versioned entries with per-key write serialization.
///
/// The outer lock only guards the map structure (insert/remove/lookup);
/// entry mutations lock the individual entry. Writes to different keys
/// therefore proceed independently, while writes to the same key serialize.
#[derive(Debug)]
pub struct Arena<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> Arena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new entry at version 1.
    ///
    /// Fails if the key is already present.
    pub fn insert(&self, key: impl Into<String>, value: T) -> Result<u64, StoreError> {
        let key = key.into();
        let mut map = write_map(&self.entries);
        if map.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        map.insert(key, Arc::new(Mutex::new(Versioned { value, version: 1 })));
        Ok(1)
    }

    /// Read a snapshot of an entry.
    pub fn get(&self, key: &str) -> Option<Versioned<T>> {
        let map = read_map(&self.entries);
        let entry = map.get(key)?;
        let value = lock_entry(entry).clone();
        Some(value)
    }

    /// Replace an entry's value if its version still matches.
    ///
    /// Returns the new version on success. A version mismatch returns
    /// [`StoreError::VersionConflict`] and leaves the entry untouched; the
    /// caller should re-read and decide whether to retry.
    pub fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: T,
    ) -> Result<u64, StoreError> {
        let map = read_map(&self.entries);
        let entry = map
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let mut guard = lock_entry(entry);
        if guard.version != expected_version {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected: expected_version,
                actual: guard.version,
            });
        }
        guard.value = value;
        guard.version += 1;
        Ok(guard.version)
    }

    /// Atomically read, transform, and write an entry.
    ///
    /// The closure runs under the entry lock, so no other writer can slip
    /// in between the read and the write. Returning `Err` from the closure
    /// rejects the update and leaves the entry untouched.
    pub fn update<E>(
        &self,
        key: &str,
        f: impl FnOnce(&T) -> Result<T, E>,
    ) -> Result<Versioned<T>, UpdateError<E>> {
        let map = read_map(&self.entries);
        let entry = map
            .get(key)
            .ok_or_else(|| UpdateError::NotFound(key.to_string()))?;
        let mut guard = lock_entry(entry);
        let next = f(&guard.value).map_err(UpdateError::Rejected)?;
        guard.value = next;
        guard.version += 1;
        Ok(guard.clone())
    }

    /// Remove an entry if its version still matches.
    pub fn remove(&self, key: &str, expected_version: u64) -> Result<T, StoreError> {
        let mut map = write_map(&self.entries);
        let entry = map
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?
            .clone();
        let guard = lock_entry(&entry);
        if guard.version != expected_version {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected: expected_version,
                actual: guard.version,
            });
        }
        let value = guard.value.clone();
        drop(guard);
        map.remove(key);
        Ok(value)
    }

    /// Atomically write one entry and remove another.
    ///
    /// Both version checks must pass, otherwise nothing happens. Holding
    /// the map write lock for the duration keeps any other writer off both
    /// keys until the commit lands.
    pub fn replace_and_remove(
        &self,
        write_key: &str,
        expected_version: u64,
        value: T,
        remove_key: &str,
        remove_expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut map = write_map(&self.entries);
        let target = map
            .get(write_key)
            .ok_or_else(|| StoreError::NotFound(write_key.to_string()))?
            .clone();
        let source = map
            .get(remove_key)
            .ok_or_else(|| StoreError::NotFound(remove_key.to_string()))?;
        {
            let guard = lock_entry(source);
            if guard.version != remove_expected_version {
                return Err(StoreError::VersionConflict {
                    key: remove_key.to_string(),
                    expected: remove_expected_version,
                    actual: guard.version,
                });
            }
        }
        let mut guard = lock_entry(&target);
        if guard.version != expected_version {
            return Err(StoreError::VersionConflict {
                key: write_key.to_string(),
                expected: expected_version,
                actual: guard.version,
            });
        }
        guard.value = value;
        guard.version += 1;
        let new_version = guard.version;
        drop(guard);
        map.remove(remove_key);
        Ok(new_version)
    }

    /// Find the first entry whose value matches the predicate.
    ///
    /// Linear scan; secondary lookups over this arena are expected to be
    /// rare relative to keyed access.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<(String, Versioned<T>)> {
        let map = read_map(&self.entries);
        for (key, entry) in map.iter() {
            let guard = lock_entry(entry);
            if pred(&guard.value) {
                return Some((key.clone(), guard.clone()));
            }
        }
        None
    }

    /// Snapshot every entry, unordered.
    pub fn snapshot(&self) -> Vec<(String, Versioned<T>)> {
        let map = read_map(&self.entries);
        map.iter()
            .map(|(key, entry)| (key.clone(), lock_entry(entry).clone()))
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        read_map(&self.entries).len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        read_map(&self.entries).is_empty()
    }
}

// Lock helpers that recover from poisoning: a panicked writer leaves the
// data in whatever state it reached, which versioning already makes safe
// to observe.

fn read_map<T>(lock: &RwLock<HashMap<String, Entry<T>>>) -> RwLockReadGuard<'_, HashMap<String, Entry<T>>> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_map<T>(lock: &RwLock<HashMap<String, Entry<T>>>) -> RwLockWriteGuard<'_, HashMap<String, Entry<T>>> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn lock_entry<T>(entry: &Entry<T>) -> MutexGuard<'_, Versioned<T>> {
    entry.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_insert_and_get() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 10).unwrap();

        let entry = arena.get("a").unwrap();
        assert_eq!(entry.value, 10);
        assert_eq!(entry.version, 1);
        assert!(arena.get("missing").is_none());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 1).unwrap();
        assert_eq!(
            arena.insert("a", 2),
            Err(StoreError::AlreadyExists("a".to_string()))
        );
    }

    #[test]
    fn test_compare_and_swap_detects_stale_write() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 1).unwrap();

        // First writer succeeds, second writer's version is stale.
        assert_eq!(arena.compare_and_swap("a", 1, 2), Ok(2));
        assert_eq!(
            arena.compare_and_swap("a", 1, 3),
            Err(StoreError::VersionConflict {
                key: "a".to_string(),
                expected: 1,
                actual: 2,
            })
        );
        assert_eq!(arena.get("a").unwrap().value, 2);
    }

    #[test]
    fn test_update_applies_closure() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 5).unwrap();

        let updated = arena.update("a", |v| Ok::<_, ()>(v + 3)).unwrap();
        assert_eq!(updated.value, 8);
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn test_update_rejection_leaves_entry_untouched() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 5).unwrap();

        let result = arena.update("a", |_| Err::<i64, _>("nope"));
        assert_eq!(result, Err(UpdateError::Rejected("nope")));

        let entry = arena.get("a").unwrap();
        assert_eq!(entry.value, 5);
        assert_eq!(entry.version, 1);
    }

    #[test]
    fn test_remove_checks_version() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 1).unwrap();
        arena.compare_and_swap("a", 1, 2).unwrap();

        assert!(matches!(
            arena.remove("a", 1),
            Err(StoreError::VersionConflict { .. })
        ));
        assert_eq!(arena.remove("a", 2), Ok(2));
        assert!(arena.get("a").is_none());
    }

    #[test]
    fn test_replace_and_remove_is_all_or_nothing() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("target", 1).unwrap();
        arena.insert("source", 2).unwrap();

        // Stale source version: nothing changes.
        let result = arena.replace_and_remove("target", 1, 99, "source", 7);
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert_eq!(arena.get("target").unwrap().value, 1);
        assert!(arena.get("source").is_some());

        // Matching versions: write and delete land together.
        arena
            .replace_and_remove("target", 1, 99, "source", 1)
            .unwrap();
        assert_eq!(arena.get("target").unwrap().value, 99);
        assert!(arena.get("source").is_none());
    }

    #[test]
    fn test_find_by_value() {
        let arena: Arena<i64> = Arena::new();
        arena.insert("a", 1).unwrap();
        arena.insert("b", 2).unwrap();

        let (key, entry) = arena.find(|v| *v == 2).unwrap();
        assert_eq!(key, "b");
        assert_eq!(entry.value, 2);
        assert!(arena.find(|v| *v == 9).is_none());
    }

    #[test]
    fn test_concurrent_updates_serialize_per_key() {
        let arena: Arc<Arena<i64>> = Arc::new(Arena::new());
        arena.insert("counter", 0).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let arena = Arc::clone(&arena);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    arena.update("counter", |v| Ok::<_, ()>(v + 1)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let entry = arena.get("counter").unwrap();
        assert_eq!(entry.value, 800);
        assert_eq!(entry.version, 801);
    }
}
