use async_trait::async_trait;

use crate::config::{StorageConfig, StorageKind};
use crate::context::OpContext;
use crate::errors::{Result, StorageResult};

pub mod backend;
pub mod kv;
pub mod memory;
pub mod models;

pub use backend::SeaOrmBackend;
pub use kv::{KeyResult, KeyValueStore};
pub use memory::MemoryBackend;
pub use models::{BatchItem, ShortLink};

/// 存储后端统一接口
///
/// Soft-deleted records are returned as stored; filtering them is up to the
/// caller.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Upsert keyed by `(url, owner_uuid)`. Returns the stored record and
    /// whether it was inserted by this call.
    async fn create(&self, ctx: &OpContext, link: ShortLink) -> StorageResult<(ShortLink, bool)>;

    /// One [`BatchItem`] per input, in input order. A top-level error means
    /// the batch could not run at all.
    async fn batch_create(
        &self,
        ctx: &OpContext,
        links: Vec<ShortLink>,
    ) -> StorageResult<Vec<BatchItem>>;

    async fn get_by_short_identifier(&self, ctx: &OpContext, id: &str) -> StorageResult<ShortLink>;

    async fn get_by_url(&self, ctx: &OpContext, owner: &str, url: &str)
    -> StorageResult<ShortLink>;

    async fn get_all_by_owner(&self, ctx: &OpContext, owner: &str) -> StorageResult<Vec<ShortLink>>;

    async fn get_all(&self, ctx: &OpContext) -> StorageResult<Vec<ShortLink>>;

    /// Set `deleted_at` on the listed records owned by `owner`. Unknown keys,
    /// foreign keys and already deleted records are skipped silently.
    ///
    /// All or nothing: on error no record is marked. Returns how many
    /// records were marked by this call.
    async fn soft_delete_by_keys_owner(
        &self,
        ctx: &OpContext,
        owner: &str,
        keys: &[String],
    ) -> StorageResult<usize>;

    async fn ping(&self, ctx: &OpContext) -> StorageResult<()>;
}

/// 运行时选定的后端
pub enum Backend {
    Memory(MemoryBackend),
    Relational(SeaOrmBackend),
}

macro_rules! delegate {
    ($self:ident, $b:ident => $call:expr) => {
        match $self {
            Backend::Memory($b) => $call,
            Backend::Relational($b) => $call,
        }
    };
}

#[async_trait]
impl StorageBackend for Backend {
    fn kind(&self) -> StorageKind {
        delegate!(self, b => b.kind())
    }

    async fn create(&self, ctx: &OpContext, link: ShortLink) -> StorageResult<(ShortLink, bool)> {
        delegate!(self, b => b.create(ctx, link).await)
    }

    async fn batch_create(
        &self,
        ctx: &OpContext,
        links: Vec<ShortLink>,
    ) -> StorageResult<Vec<BatchItem>> {
        delegate!(self, b => b.batch_create(ctx, links).await)
    }

    async fn get_by_short_identifier(&self, ctx: &OpContext, id: &str) -> StorageResult<ShortLink> {
        delegate!(self, b => b.get_by_short_identifier(ctx, id).await)
    }

    async fn get_by_url(
        &self,
        ctx: &OpContext,
        owner: &str,
        url: &str,
    ) -> StorageResult<ShortLink> {
        delegate!(self, b => b.get_by_url(ctx, owner, url).await)
    }

    async fn get_all_by_owner(&self, ctx: &OpContext, owner: &str) -> StorageResult<Vec<ShortLink>> {
        delegate!(self, b => b.get_all_by_owner(ctx, owner).await)
    }

    async fn get_all(&self, ctx: &OpContext) -> StorageResult<Vec<ShortLink>> {
        delegate!(self, b => b.get_all(ctx).await)
    }

    async fn soft_delete_by_keys_owner(
        &self,
        ctx: &OpContext,
        owner: &str,
        keys: &[String],
    ) -> StorageResult<usize> {
        delegate!(self, b => b.soft_delete_by_keys_owner(ctx, owner, keys).await)
    }

    async fn ping(&self, ctx: &OpContext) -> StorageResult<()> {
        delegate!(self, b => b.ping(ctx).await)
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<Backend> {
        match config.backend {
            StorageKind::Memory => Ok(Backend::Memory(MemoryBackend::new())),
            StorageKind::Relational => {
                // 从 URL 自动推断数据库类型
                let db_kind = backend::infer_backend_from_url(&config.database_url)?;
                let storage = SeaOrmBackend::new(config, db_kind).await?;
                Ok(Backend::Relational(storage))
            }
        }
    }
}
