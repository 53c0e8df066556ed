//! Short link engine
//!
//! Business logic over a [`StorageBackend`]: identifier derivation, idempotent
//! create, batch create with per-item outcomes, lookup, listing, soft delete
//! and snapshots. Storage errors are translated to [`ServiceError`] here.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::snapshot::{self, RestoreReport};
use crate::context::OpContext;
use crate::errors::{ServiceError, ServiceErrorKind, ServiceResult, StorageErrorKind};
use crate::storage::{Backend, ShortLink, StorageBackend};
use crate::utils::short_id;

// ============ Batch DTOs ============

/// Outcome for one URL of a batch create, at the URL's input position.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub url: String,
    /// The stored record; also set for duplicates.
    pub link: Option<ShortLink>,
    pub error: Option<ServiceError>,
}

impl BatchOutcome {
    pub fn is_created(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_duplicate(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.is(ServiceErrorKind::DuplicateKey))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchCreateResult {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchCreateResult {
    pub fn created(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_created()).count()
    }

    pub fn duplicates(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_duplicate()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.created() - self.duplicates()
    }
}

// ============ ShortLinkEngine Implementation ============

/// 短链接引擎
pub struct ShortLinkEngine<S: StorageBackend = Backend> {
    storage: Arc<S>,
    short_id_length: usize,
}

impl<S: StorageBackend> Clone for ShortLinkEngine<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            short_id_length: self.short_id_length,
        }
    }
}

impl<S: StorageBackend> ShortLinkEngine<S> {
    pub fn new(storage: Arc<S>, short_id_length: usize) -> Self {
        Self {
            storage,
            short_id_length,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn short_id_length(&self) -> usize {
        self.short_id_length
    }

    fn check(ctx: &OpContext) -> ServiceResult<()> {
        ctx.check().map_err(ServiceError::from)
    }

    /// Shorten `url` for `owner`.
    ///
    /// Idempotent per `(url, owner)`: a repeat returns the stored record and
    /// `false`.
    pub async fn create(
        &self,
        ctx: &OpContext,
        owner: &str,
        url: &str,
    ) -> ServiceResult<(ShortLink, bool)> {
        Self::check(ctx)?;
        let id = short_id::derive(url, owner, self.short_id_length);

        let (link, is_new) = self
            .storage
            .create(ctx, ShortLink::new(url, id, owner))
            .await
            .map_err(|e| {
                match e.kind() {
                    StorageErrorKind::Cancelled => {}
                    StorageErrorKind::DuplicateKey => {
                        debug!("Identifier clash creating {}: {}", url, e)
                    }
                    _ => error!("Create failed for {}: {}", url, e),
                }
                ServiceError::from(e)
            })?;

        if is_new {
            info!("Created short link {} -> {}", link.short_identifier, link.url);
        } else {
            debug!("Short link {} already exists", link.short_identifier);
        }
        Ok((link, is_new))
    }

    /// Owner-less create: steps through counter-suffixed candidates until one
    /// is free or already holds `url`.
    pub async fn create_anonymous(
        &self,
        ctx: &OpContext,
        url: &str,
    ) -> ServiceResult<(ShortLink, bool)> {
        Self::check(ctx)?;

        for candidate in short_id::candidates(url, self.short_id_length) {
            match self
                .storage
                .create(ctx, ShortLink::new(url, candidate.as_str(), ""))
                .await
            {
                Ok((link, is_new)) => {
                    if is_new {
                        info!("Created anonymous short link {} -> {}", link.short_identifier, url);
                    }
                    return Ok((link, is_new));
                }
                Err(e) if e.is(StorageErrorKind::DuplicateKey) => {
                    debug!("Candidate {} taken, trying next", candidate);
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!("No free identifier for {} after {} attempts", url, short_id::MAX_DERIVE_ATTEMPTS);
        Err(ServiceError::generation_exhausted(format!(
            "no free identifier for {} after {} attempts",
            url,
            short_id::MAX_DERIVE_ATTEMPTS
        )))
    }

    /// Shorten many URLs for `owner`; one outcome per URL in input order.
    ///
    /// Fails as a whole only when the batch could not run.
    pub async fn batch_create(
        &self,
        ctx: &OpContext,
        owner: &str,
        urls: &[String],
    ) -> ServiceResult<BatchCreateResult> {
        Self::check(ctx)?;
        if urls.is_empty() {
            return Ok(BatchCreateResult::default());
        }

        let links: Vec<ShortLink> = urls
            .iter()
            .map(|url| {
                ShortLink::new(
                    url.as_str(),
                    short_id::derive(url, owner, self.short_id_length),
                    owner,
                )
            })
            .collect();

        let items = self.storage.batch_create(ctx, links).await.map_err(|e| {
            if !e.is(StorageErrorKind::Cancelled) {
                error!("Batch create of {} urls failed: {}", urls.len(), e);
            }
            ServiceError::from(e)
        })?;

        let outcomes = urls
            .iter()
            .zip(items)
            .map(|(url, item)| BatchOutcome {
                url: url.clone(),
                link: Some(item.link),
                error: item.error.map(ServiceError::from),
            })
            .collect();

        let result = BatchCreateResult { outcomes };
        info!(
            "Batch create for {}: {} created, {} duplicates, {} failed",
            owner,
            result.created(),
            result.duplicates(),
            result.failed()
        );
        Ok(result)
    }

    /// Look up a record, soft-deleted ones included.
    pub async fn get_by_short_identifier(
        &self,
        ctx: &OpContext,
        id: &str,
    ) -> ServiceResult<ShortLink> {
        Self::check(ctx)?;
        self.storage
            .get_by_short_identifier(ctx, id)
            .await
            .map_err(|e| {
                match e.kind() {
                    StorageErrorKind::NotFound => debug!("Short identifier {} not found", id),
                    StorageErrorKind::Cancelled => {}
                    _ => error!("Lookup of {} failed: {}", id, e),
                }
                ServiceError::from(e)
            })
    }

    /// Redirect lookup: a soft-deleted record is `Gone`.
    pub async fn resolve(&self, ctx: &OpContext, id: &str) -> ServiceResult<ShortLink> {
        let link = self.get_by_short_identifier(ctx, id).await?;
        if link.is_deleted() {
            return Err(ServiceError::gone(format!("short identifier {} was deleted", id)));
        }
        Ok(link)
    }

    pub async fn get_by_url(&self, ctx: &OpContext, owner: &str, url: &str) -> ServiceResult<ShortLink> {
        Self::check(ctx)?;
        Ok(self.storage.get_by_url(ctx, owner, url).await?)
    }

    pub async fn get_all_by_owner(&self, ctx: &OpContext, owner: &str) -> ServiceResult<Vec<ShortLink>> {
        Self::check(ctx)?;
        Ok(self.storage.get_all_by_owner(ctx, owner).await?)
    }

    /// Soft-delete `ids` owned by `owner`. Unknown or foreign ids are ignored.
    /// Returns how many records were actually marked.
    pub async fn mark_deleted(&self, ctx: &OpContext, owner: &str, ids: &[String]) -> ServiceResult<usize> {
        Self::check(ctx)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let marked = self
            .storage
            .soft_delete_by_keys_owner(ctx, owner, ids)
            .await
            .map_err(|e| {
                if !e.is(StorageErrorKind::Cancelled) {
                    error!("Soft delete for {} failed: {}", owner, e);
                }
                ServiceError::from(e)
            })?;
        info!(
            "Marked {} of {} short links deleted for {}",
            marked,
            ids.len(),
            owner
        );
        Ok(marked)
    }

    /// Write a snapshot of every record to `path`.
    pub async fn backup(&self, ctx: &OpContext, path: &Path) -> ServiceResult<usize> {
        Self::check(ctx)?;
        snapshot::backup(self.storage.as_ref(), ctx, path).await
    }

    /// Load the snapshot at `path`, `batch_size` lines per storage batch.
    pub async fn restore(
        &self,
        ctx: &OpContext,
        path: &Path,
        batch_size: usize,
    ) -> ServiceResult<RestoreReport> {
        Self::check(ctx)?;
        snapshot::restore(self.storage.as_ref(), ctx, path, batch_size).await
    }

    pub async fn ping(&self, ctx: &OpContext) -> ServiceResult<()> {
        Self::check(ctx)?;
        Ok(self.storage.ping(ctx).await?)
    }
}
