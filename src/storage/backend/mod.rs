//! SeaORM storage backend
//!
//! Relational storage for short links on SQLite or PostgreSQL. The schema is
//! owned by the `migration` crate and applied once when the backend is built.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use strum::{AsRefStr, Display};
use tracing::info;

use super::StorageBackend;
use super::models::{BatchItem, ShortLink};
use crate::config::{StorageConfig, StorageKind};
use crate::context::OpContext;
use crate::errors::{Result, ShorturlError, StorageResult};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_shortlink, shortlink_to_active_model};

/// 关系型数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    Postgres,
}

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<DatabaseKind> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok(DatabaseKind::Sqlite)
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok(DatabaseKind::Postgres)
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Err(ShorturlError::database_config(
            "MySQL/MariaDB 不受支持: urls 表需要在 TEXT 列上建立唯一索引",
        ))
    } else {
        Err(ShorturlError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmBackend {
    db: DatabaseConnection,
    db_kind: DatabaseKind,
    retry_config: retry::RetryConfig,
    batch_chunk_size: usize,
    max_workers: usize,
}

impl SeaOrmBackend {
    pub async fn new(config: &StorageConfig, db_kind: DatabaseKind) -> Result<Self> {
        let database_url = config.database_url.as_str();
        if database_url.is_empty() {
            return Err(ShorturlError::database_config("database_url 未设置"));
        }

        let db = match db_kind {
            DatabaseKind::Sqlite => connect_sqlite(database_url).await?,
            DatabaseKind::Postgres => {
                connect_generic(database_url, db_kind, config.pool_size).await?
            }
        };

        run_migrations(&db).await?;

        let storage = SeaOrmBackend {
            db,
            db_kind,
            retry_config: retry::RetryConfig::from(config),
            batch_chunk_size: config.batch_chunk_size.max(1),
            max_workers: config.max_workers.max(1),
        };

        info!(
            "{} storage initialized (chunk size {}, {} workers)",
            storage.db_kind.as_ref().to_uppercase(),
            storage.batch_chunk_size,
            storage.max_workers
        );
        Ok(storage)
    }

    pub fn db_kind(&self) -> DatabaseKind {
        self.db_kind
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl StorageBackend for SeaOrmBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Relational
    }

    async fn create(&self, ctx: &OpContext, link: ShortLink) -> StorageResult<(ShortLink, bool)> {
        self.insert_link(ctx, &link).await
    }

    async fn batch_create(
        &self,
        ctx: &OpContext,
        links: Vec<ShortLink>,
    ) -> StorageResult<Vec<BatchItem>> {
        self.insert_links(ctx, links).await
    }

    async fn get_by_short_identifier(&self, ctx: &OpContext, id: &str) -> StorageResult<ShortLink> {
        self.find_by_short_identifier(ctx, id).await
    }

    async fn get_by_url(
        &self,
        ctx: &OpContext,
        owner: &str,
        url: &str,
    ) -> StorageResult<ShortLink> {
        self.find_by_url(ctx, owner, url).await
    }

    async fn get_all_by_owner(&self, ctx: &OpContext, owner: &str) -> StorageResult<Vec<ShortLink>> {
        self.find_all_by_owner(ctx, owner).await
    }

    async fn get_all(&self, ctx: &OpContext) -> StorageResult<Vec<ShortLink>> {
        self.find_all(ctx).await
    }

    async fn soft_delete_by_keys_owner(
        &self,
        ctx: &OpContext,
        owner: &str,
        keys: &[String],
    ) -> StorageResult<usize> {
        self.mark_deleted(ctx, owner, keys).await
    }

    async fn ping(&self, ctx: &OpContext) -> StorageResult<()> {
        let db = &self.db;
        retry::with_retry("ping", self.retry_config, ctx, || db.ping()).await
    }
}
