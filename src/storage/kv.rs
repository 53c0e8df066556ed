//! 通用键值存储
//!
//! Values are kept serialized (serde_json bytes) behind one `RwLock`, so
//! callers only ever receive decoded copies and never a reference into the
//! map. Every operation checks its [`OpContext`] before taking the lock, and
//! scans check it again on every iteration.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::OpContext;
use crate::errors::{StorageError, StorageResult};

/// Outcome for one key of a [`KeyValueStore::batch_set`] call.
#[derive(Debug, Clone)]
pub struct KeyResult {
    pub key: String,
    pub result: StorageResult<()>,
}

#[derive(Debug, Default)]
pub struct KeyValueStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> StorageResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| StorageError::serialize(format!("decode value of key {}: {}", key, e)))
}

fn encode<T: Serialize>(key: &str, value: &T) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| StorageError::serialize(format!("encode value of key {}: {}", key, e)))
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn is_exist(&self, ctx: &OpContext, key: &str) -> StorageResult<bool> {
        ctx.check()?;
        Ok(self.data.read().contains_key(key))
    }

    pub fn get<T: DeserializeOwned>(&self, ctx: &OpContext, key: &str) -> StorageResult<T> {
        ctx.check()?;
        let guard = self.data.read();
        match guard.get(key) {
            Some(bytes) => decode(key, bytes),
            None => Err(StorageError::not_found(format!("key {} not found", key))),
        }
    }

    /// Store `value` under `key`.
    ///
    /// With `overwrite == false` the existence check and the insert happen
    /// under the same write guard: of any number of concurrent callers for a
    /// fresh key exactly one succeeds and the rest get `DuplicateKey`.
    pub fn set<T: Serialize>(
        &self,
        ctx: &OpContext,
        key: &str,
        value: &T,
        overwrite: bool,
    ) -> StorageResult<()> {
        ctx.check()?;
        let bytes = encode(key, value)?;

        let mut guard = self.data.write();
        match guard.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if !overwrite {
                    return Err(StorageError::duplicate_key(format!(
                        "key {} already exists",
                        key
                    )));
                }
                slot.insert(bytes);
            }
            Entry::Vacant(slot) => {
                slot.insert(bytes);
            }
        }
        Ok(())
    }

    /// Store many values; one [`KeyResult`] per input item, in input order.
    ///
    /// A failing key never stops the others. If `ctx` finishes midway, the
    /// keys not yet written report `Cancelled`.
    pub fn batch_set<T: Serialize>(
        &self,
        ctx: &OpContext,
        items: &[(String, T)],
        overwrite: bool,
    ) -> Vec<KeyResult> {
        let encoded: Vec<StorageResult<Vec<u8>>> =
            items.iter().map(|(key, value)| encode(key, value)).collect();

        let mut results = Vec::with_capacity(items.len());
        if let Err(e) = ctx.check() {
            results.extend(items.iter().map(|(key, _)| KeyResult {
                key: key.clone(),
                result: Err(e.clone()),
            }));
            return results;
        }

        let mut guard = self.data.write();
        for ((key, _), bytes) in items.iter().zip(encoded) {
            let result = ctx.check().and_then(|_| {
                let bytes = bytes?;
                match guard.entry(key.clone()) {
                    Entry::Occupied(_) if !overwrite => Err(StorageError::duplicate_key(format!(
                        "key {} already exists",
                        key
                    ))),
                    Entry::Occupied(mut slot) => {
                        slot.insert(bytes);
                        Ok(())
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(bytes);
                        Ok(())
                    }
                }
            });
            results.push(KeyResult {
                key: key.clone(),
                result,
            });
        }
        results
    }

    /// Atomic read-modify-write of one value.
    ///
    /// `apply` returns whether it changed the value; only then is it written
    /// back. Returns the value as stored after the call.
    pub fn update<T, F>(&self, ctx: &OpContext, key: &str, apply: F) -> StorageResult<(T, bool)>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> bool,
    {
        ctx.check()?;
        let mut guard = self.data.write();
        let bytes = guard
            .get_mut(key)
            .ok_or_else(|| StorageError::not_found(format!("key {} not found", key)))?;

        let mut value: T = decode(key, bytes)?;
        let changed = apply(&mut value);
        if changed {
            *bytes = encode(key, &value)?;
        }
        Ok((value, changed))
    }

    /// Read-modify-write of many values as one unit.
    ///
    /// Every changed value is staged first and written back only after all
    /// keys were processed, so a decode or encode failure leaves the store
    /// untouched. Missing keys are skipped, repeated keys handled once.
    /// Returns how many values changed.
    pub fn batch_update<T, F>(&self, ctx: &OpContext, keys: &[String], mut apply: F) -> StorageResult<usize>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut T) -> bool,
    {
        ctx.check()?;
        let mut guard = self.data.write();

        let mut seen = HashSet::with_capacity(keys.len());
        let mut staged = Vec::new();
        for key in keys {
            if !seen.insert(key.as_str()) {
                continue;
            }
            let Some(bytes) = guard.get(key) else {
                continue;
            };
            let mut value: T = decode(key, bytes)?;
            if apply(&mut value) {
                staged.push((key, encode(key, &value)?));
            }
        }

        let changed = staged.len();
        for (key, bytes) in staged {
            if let Some(slot) = guard.get_mut(key) {
                *slot = bytes;
            }
        }
        Ok(changed)
    }

    /// Full scan returning every value matching `predicate`.
    ///
    /// Fails on the first value that does not decode as `T`.
    pub fn filter_all<T, P>(&self, ctx: &OpContext, mut predicate: P) -> StorageResult<Vec<T>>
    where
        T: DeserializeOwned,
        P: FnMut(&T) -> bool,
    {
        ctx.check()?;
        let guard = self.data.read();
        let mut out = Vec::new();
        for (key, bytes) in guard.iter() {
            ctx.check()?;
            let value: T = decode(key, bytes)?;
            if predicate(&value) {
                out.push(value);
            }
        }
        Ok(out)
    }

    pub fn get_all<T: DeserializeOwned>(&self, ctx: &OpContext) -> StorageResult<Vec<T>> {
        self.filter_all(ctx, |_: &T| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageErrorKind;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        n: u32,
    }

    fn item(name: &str, n: u32) -> Item {
        Item {
            name: name.to_string(),
            n,
        }
    }

    #[test]
    fn test_set_get_roundtrip() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "a", &item("a", 1), false).unwrap();

        let got: Item = store.get(&ctx, "a").unwrap();
        assert_eq!(got, item("a", 1));
        assert!(store.is_exist(&ctx, "a").unwrap());
        assert!(!store.is_exist(&ctx, "b").unwrap());
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        let err = store.get::<Item>(&ctx, "nope").unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::NotFound);
    }

    #[test]
    fn test_set_without_overwrite_rejects_existing() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "a", &item("a", 1), false).unwrap();

        let err = store.set(&ctx, "a", &item("a", 2), false).unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::DuplicateKey);
        assert_eq!(store.get::<Item>(&ctx, "a").unwrap().n, 1);

        store.set(&ctx, "a", &item("a", 3), true).unwrap();
        assert_eq!(store.get::<Item>(&ctx, "a").unwrap().n, 3);
    }

    #[test]
    fn test_concurrent_set_single_winner() {
        let store = Arc::new(KeyValueStore::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let ctx = OpContext::background();
                    store.set(&ctx, "contended", &item("x", i), false)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let dups = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is(StorageErrorKind::DuplicateKey)))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(dups, 31);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_batch_set_partial_failure() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "k2", &item("old", 0), false).unwrap();

        let items: Vec<(String, Item)> = (1..=3)
            .map(|i| (format!("k{}", i), item("new", i)))
            .collect();
        let results = store.batch_set(&ctx, &items, false);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].key, "k1");
        assert!(results[0].result.is_ok());
        assert_eq!(
            results[1].result.as_ref().unwrap_err().kind(),
            StorageErrorKind::DuplicateKey
        );
        assert!(results[2].result.is_ok());
        assert_eq!(store.get::<Item>(&ctx, "k2").unwrap().name, "old");
    }

    #[test]
    fn test_batch_set_cancelled_writes_nothing() {
        let ctx = OpContext::background();
        ctx.cancel();
        let store = KeyValueStore::new();

        let items = vec![("a".to_string(), item("a", 1)), ("b".to_string(), item("b", 2))];
        let results = store.batch_set(&ctx, &items, true);

        assert!(results.iter().all(|r| matches!(
            &r.result,
            Err(e) if e.is(StorageErrorKind::Cancelled)
        )));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_applies_only_on_change() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "a", &item("a", 1), false).unwrap();

        let (value, changed) = store
            .update(&ctx, "a", |v: &mut Item| {
                v.n += 1;
                true
            })
            .unwrap();
        assert!(changed);
        assert_eq!(value.n, 2);

        let (value, changed) = store.update(&ctx, "a", |_: &mut Item| false).unwrap();
        assert!(!changed);
        assert_eq!(value.n, 2);

        let err = store.update(&ctx, "zz", |_: &mut Item| true).unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::NotFound);
    }

    #[test]
    fn test_batch_update_counts_changes() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        for i in 0..4 {
            store.set(&ctx, &format!("k{}", i), &item("x", i), false).unwrap();
        }

        let keys: Vec<String> = ["k0", "k1", "k1", "k3", "missing"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        let changed = store
            .batch_update(&ctx, &keys, |v: &mut Item| {
                if v.n % 2 == 1 {
                    v.name = "odd".to_string();
                    true
                } else {
                    false
                }
            })
            .unwrap();

        assert_eq!(changed, 2);
        assert_eq!(store.get::<Item>(&ctx, "k1").unwrap().name, "odd");
        assert_eq!(store.get::<Item>(&ctx, "k3").unwrap().name, "odd");
        assert_eq!(store.get::<Item>(&ctx, "k0").unwrap().name, "x");
        assert_eq!(store.get::<Item>(&ctx, "k2").unwrap().name, "x");
    }

    #[test]
    fn test_batch_update_failure_writes_nothing() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "a", &item("a", 1), false).unwrap();
        store.set(&ctx, "bad", &"just a string", false).unwrap();

        let keys = vec!["a".to_string(), "bad".to_string()];
        let err = store
            .batch_update(&ctx, &keys, |v: &mut Item| {
                v.n = 99;
                true
            })
            .unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Serialize);
        assert_eq!(store.get::<Item>(&ctx, "a").unwrap().n, 1);

        let done = OpContext::background();
        done.cancel();
        let err = store
            .batch_update(&done, &keys[..1], |v: &mut Item| {
                v.n = 99;
                true
            })
            .unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Cancelled);
        assert_eq!(store.get::<Item>(&ctx, "a").unwrap().n, 1);
    }

    #[test]
    fn test_filter_all_and_get_all() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        for i in 0..10 {
            store.set(&ctx, &format!("k{}", i), &item("x", i), false).unwrap();
        }

        let even: Vec<Item> = store.filter_all(&ctx, |v: &Item| v.n % 2 == 0).unwrap();
        assert_eq!(even.len(), 5);

        let all: Vec<Item> = store.get_all(&ctx).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_filter_all_fails_on_undecodable_value() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "good", &item("x", 1), false).unwrap();
        store.set(&ctx, "bad", &"just a string", false).unwrap();

        let err = store.get_all::<Item>(&ctx).unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Serialize);
    }

    #[test]
    fn test_cancelled_context_rejects_everything() {
        let ctx = OpContext::background();
        let store = KeyValueStore::new();
        store.set(&ctx, "a", &item("a", 1), false).unwrap();

        let done = OpContext::background();
        done.cancel();
        assert!(store.get::<Item>(&done, "a").is_err());
        assert!(store.set(&done, "b", &item("b", 1), false).is_err());
        assert!(store.get_all::<Item>(&done).is_err());
        assert_eq!(store.len(), 1);
    }
}
