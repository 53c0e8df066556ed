//! Query operations for SeaOrmBackend
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::converters::model_to_shortlink;
use super::{SeaOrmBackend, retry};
use crate::context::OpContext;
use crate::errors::{StorageError, StorageResult};
use crate::storage::ShortLink;

use migration::entities::url;

impl SeaOrmBackend {
    pub(super) async fn find_by_short_identifier(
        &self,
        ctx: &OpContext,
        id: &str,
    ) -> StorageResult<ShortLink> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get({})", id), self.retry_config, ctx, || {
            url::Entity::find()
                .filter(url::Column::ShortIdentifier.eq(id))
                .one(db)
        })
        .await?;

        model
            .map(model_to_shortlink)
            .ok_or_else(|| StorageError::not_found(format!("short identifier {} not found", id)))
    }

    pub(super) async fn find_by_url(
        &self,
        ctx: &OpContext,
        owner: &str,
        target: &str,
    ) -> StorageResult<ShortLink> {
        let db = &self.db;
        let model = retry::with_retry("get_by_url", self.retry_config, ctx, || {
            url::Entity::find()
                .filter(url::Column::Url.eq(target))
                .filter(url::Column::VisitorUuid.eq(owner))
                .one(db)
        })
        .await?;

        model
            .map(model_to_shortlink)
            .ok_or_else(|| StorageError::not_found(format!("url {} not found", target)))
    }

    /// 按 owner 列出，按插入顺序
    pub(super) async fn find_all_by_owner(
        &self,
        ctx: &OpContext,
        owner: &str,
    ) -> StorageResult<Vec<ShortLink>> {
        if owner.is_empty() {
            ctx.check()?;
            return Ok(Vec::new());
        }

        let db = &self.db;
        let models = retry::with_retry("get_all_by_owner", self.retry_config, ctx, || {
            url::Entity::find()
                .filter(url::Column::VisitorUuid.eq(owner))
                .order_by_asc(url::Column::Id)
                .all(db)
        })
        .await?;

        Ok(models.into_iter().map(model_to_shortlink).collect())
    }

    pub(super) async fn find_all(&self, ctx: &OpContext) -> StorageResult<Vec<ShortLink>> {
        let db = &self.db;
        let models = retry::with_retry("get_all", self.retry_config, ctx, || {
            url::Entity::find().order_by_asc(url::Column::Id).all(db)
        })
        .await?;

        Ok(models.into_iter().map(model_to_shortlink).collect())
    }
}
