//! In-memory storage backend
//!
//! Records live in a [`KeyValueStore`] keyed by short identifier. Durability
//! comes from snapshot backup/restore around the process lifetime.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use super::kv::KeyValueStore;
use super::models::{BatchItem, ShortLink};
use super::StorageBackend;
use crate::config::StorageKind;
use crate::context::OpContext;
use crate::errors::{StorageError, StorageErrorKind, StorageResult};

/// `(url, owner_uuid)`
type SlotKey = (String, String);

#[derive(Default)]
pub struct MemoryBackend {
    store: KeyValueStore,
    /// `(url, owner)` → short identifier of the record holding that slot.
    /// Held across the slot check and the store write of every insert.
    slots: Mutex<HashMap<SlotKey, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Insert, or resolve the collision with whatever already holds the slot
    /// or the key.
    ///
    /// `Ok((stored, false))` when `(url, owner)` is already stored, under any
    /// identifier (its `updated_at` is refreshed);
    /// `Err((holder, DuplicateKey))` when the identifier is taken by another
    /// slot.
    fn insert_or_touch(
        &self,
        ctx: &OpContext,
        link: ShortLink,
    ) -> Result<(ShortLink, bool), (Option<ShortLink>, StorageError)> {
        let mut slots = self.slots.lock();
        let slot = (link.url.clone(), link.owner_uuid.clone());

        if let Some(id) = slots.get(&slot) {
            let (stored, _) = self
                .store
                .update(ctx, id, |stored: &mut ShortLink| {
                    stored.updated_at = Utc::now();
                    true
                })
                .map_err(|e| (None, e))?;
            return Ok((stored, false));
        }

        match self.store.set(ctx, &link.short_identifier, &link, false) {
            Ok(()) => {
                slots.insert(slot, link.short_identifier.clone());
                Ok((link, true))
            }
            Err(e) if e.is(StorageErrorKind::DuplicateKey) => {
                let holder = self.store.get(ctx, &link.short_identifier).ok();
                Err((
                    holder,
                    StorageError::duplicate_key(format!(
                        "short identifier {} is taken by another url",
                        link.short_identifier
                    )),
                ))
            }
            Err(e) => Err((None, e)),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    async fn create(&self, ctx: &OpContext, link: ShortLink) -> StorageResult<(ShortLink, bool)> {
        self.insert_or_touch(ctx, link).map_err(|(_, e)| e)
    }

    async fn batch_create(
        &self,
        ctx: &OpContext,
        links: Vec<ShortLink>,
    ) -> StorageResult<Vec<BatchItem>> {
        ctx.check()?;

        let items = links
            .into_iter()
            .map(|link| match self.insert_or_touch(ctx, link.clone()) {
                Ok((stored, true)) => BatchItem::ok(stored),
                Ok((stored, false)) => BatchItem::failed(
                    stored,
                    StorageError::duplicate_key(format!(
                        "url {} already shortened for this owner",
                        link.url
                    )),
                ),
                Err((stored, e)) => BatchItem::failed(stored.unwrap_or(link), e),
            })
            .collect::<Vec<_>>();

        debug!(
            "Memory batch create: {} items, {} inserted",
            items.len(),
            items.iter().filter(|i| i.is_ok()).count()
        );
        Ok(items)
    }

    async fn get_by_short_identifier(&self, ctx: &OpContext, id: &str) -> StorageResult<ShortLink> {
        self.store.get(ctx, id).map_err(|e| match e.kind() {
            StorageErrorKind::NotFound => {
                StorageError::not_found(format!("short identifier {} not found", id))
            }
            _ => e,
        })
    }

    async fn get_by_url(
        &self,
        ctx: &OpContext,
        owner: &str,
        url: &str,
    ) -> StorageResult<ShortLink> {
        self.store
            .filter_all(ctx, |l: &ShortLink| l.url == url && l.owner_uuid == owner)?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(format!("url {} not found", url)))
    }

    async fn get_all_by_owner(&self, ctx: &OpContext, owner: &str) -> StorageResult<Vec<ShortLink>> {
        if owner.is_empty() {
            return Ok(Vec::new());
        }
        let mut links = self
            .store
            .filter_all(ctx, |l: &ShortLink| l.owner_uuid == owner)?;
        links.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.short_identifier.cmp(&b.short_identifier))
        });
        Ok(links)
    }

    async fn get_all(&self, ctx: &OpContext) -> StorageResult<Vec<ShortLink>> {
        self.store.get_all(ctx)
    }

    async fn soft_delete_by_keys_owner(
        &self,
        ctx: &OpContext,
        owner: &str,
        keys: &[String],
    ) -> StorageResult<usize> {
        let now = Utc::now();
        let deleted = self.store.batch_update(ctx, keys, |l: &mut ShortLink| {
            if l.owner_uuid == owner && l.deleted_at.is_none() {
                l.deleted_at = Some(now);
                true
            } else {
                false
            }
        })?;

        debug!("Memory soft delete: {}/{} records marked", deleted, keys.len());
        Ok(deleted)
    }

    async fn ping(&self, ctx: &OpContext) -> StorageResult<()> {
        ctx.check()
    }
}
