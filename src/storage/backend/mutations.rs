//! Mutation operations for SeaOrmBackend
//!
//! This module contains all write database operations.

use chrono::Utc;
use futures_util::{StreamExt, TryStreamExt, stream};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info, warn};

use super::SeaOrmBackend;
use super::converters::{model_to_shortlink, shortlink_to_active_model};
use super::retry;
use crate::context::OpContext;
use crate::errors::{StorageError, StorageErrorKind, StorageResult};
use crate::storage::{BatchItem, ShortLink};

use migration::entities::url;

/// `ON CONFLICT DO NOTHING` 未插入任何行
fn is_not_inserted(err: &DbErr) -> bool {
    if matches!(err, DbErr::RecordNotInserted) {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("no rows") || msg.contains("record not inserted")
}

/// Insert keyed by `(url, visitor_uuid)`.
///
/// On conflict the existing row gets a fresh `updated_at` and is returned with
/// `false`. A clash on `short_identifier` alone surfaces as a unique
/// violation.
pub async fn upsert<C>(db: &C, link: &ShortLink) -> Result<(url::Model, bool), DbErr>
where
    C: ConnectionTrait,
{
    let inserted = url::Entity::insert(shortlink_to_active_model(link))
        .on_conflict(
            OnConflict::columns([url::Column::Url, url::Column::VisitorUuid])
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;

    match inserted {
        Ok(res) => {
            let model = url::Model {
                id: res.last_insert_id,
                short_identifier: link.short_identifier.clone(),
                url: link.url.clone(),
                visitor_uuid: link.owner_uuid.clone(),
                created_at: link.created_at,
                updated_at: link.updated_at,
                deleted_at: link.deleted_at,
            };
            Ok((model, true))
        }
        Err(e) if is_not_inserted(&e) => {
            url::Entity::update_many()
                .col_expr(url::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(url::Column::Url.eq(link.url.as_str()))
                .filter(url::Column::VisitorUuid.eq(link.owner_uuid.as_str()))
                .exec(db)
                .await?;

            let existing = url::Entity::find()
                .filter(url::Column::Url.eq(link.url.as_str()))
                .filter(url::Column::VisitorUuid.eq(link.owner_uuid.as_str()))
                .one(db)
                .await?
                .ok_or_else(|| {
                    DbErr::RecordNotFound(format!(
                        "conflicting row for {} vanished",
                        link.short_identifier
                    ))
                })?;
            Ok((existing, false))
        }
        Err(e) => Err(e),
    }
}

impl SeaOrmBackend {
    pub(super) async fn insert_link(
        &self,
        ctx: &OpContext,
        link: &ShortLink,
    ) -> StorageResult<(ShortLink, bool)> {
        let db = &self.db;
        let (model, is_new) = retry::with_retry(
            &format!("create({})", link.short_identifier),
            self.retry_config,
            ctx,
            || upsert(db, link),
        )
        .await?;

        if is_new {
            debug!("Short link created: {}", model.short_identifier);
        }
        Ok((model_to_shortlink(model), is_new))
    }

    /// 单个位置的批量插入结果
    async fn insert_batch_item(&self, ctx: &OpContext, link: ShortLink) -> BatchItem {
        match self.insert_link(ctx, &link).await {
            Ok((stored, true)) => BatchItem::ok(stored),
            Ok((stored, false)) => BatchItem::failed(
                stored,
                StorageError::duplicate_key(format!(
                    "url {} already shortened for this owner",
                    link.url
                )),
            ),
            Err(e) if e.is(StorageErrorKind::DuplicateKey) => {
                // 标识符已被其他 url 占用，槽位携带占用者
                let holder = self
                    .find_by_short_identifier(ctx, &link.short_identifier)
                    .await
                    .unwrap_or(link);
                BatchItem::failed(holder, e)
            }
            Err(e) => {
                warn!("Batch create item {} failed: {}", link.short_identifier, e);
                BatchItem::failed(link, e)
            }
        }
    }

    async fn insert_chunk(&self, ctx: &OpContext, chunk: Vec<ShortLink>) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(chunk.len());
        for link in chunk {
            items.push(self.insert_batch_item(ctx, link).await);
        }
        items
    }

    /// 分块并发批量插入
    ///
    /// Chunks run on at most `max_workers` concurrent workers; results are
    /// merged back in input order.
    pub(super) async fn insert_links(
        &self,
        ctx: &OpContext,
        links: Vec<ShortLink>,
    ) -> StorageResult<Vec<BatchItem>> {
        ctx.check()?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        // 系统性故障（连接不可用）作为整体错误返回
        {
            let db = &self.db;
            retry::with_retry("batch_create/ping", self.retry_config, ctx, || db.ping()).await?;
        }

        let total = links.len();
        let chunks: Vec<Vec<ShortLink>> = links
            .chunks(self.batch_chunk_size)
            .map(|c| c.to_vec())
            .collect();

        let mut merged: Vec<(usize, Vec<BatchItem>)> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| async move { (index, self.insert_chunk(ctx, chunk).await) })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;
        merged.sort_by_key(|(index, _)| *index);

        let items: Vec<BatchItem> = merged.into_iter().flat_map(|(_, items)| items).collect();
        info!(
            "Batch create: {} items, {} inserted",
            total,
            items.iter().filter(|i| i.is_ok()).count()
        );
        Ok(items)
    }

    /// 事务内分块并发软删除
    ///
    /// All chunks share one transaction and fan in at a single point; the
    /// transaction commits only when every chunk succeeded.
    pub(super) async fn mark_deleted(
        &self,
        ctx: &OpContext,
        owner: &str,
        keys: &[String],
    ) -> StorageResult<usize> {
        ctx.check()?;
        if keys.is_empty() {
            return Ok(0);
        }

        let txn = ctx.run(async { Ok(self.db.begin().await?) }).await?;
        let now = Utc::now();

        let fan_in = async {
            stream::iter(keys.chunks(self.batch_chunk_size).map(<[String]>::to_vec))
                .map(|chunk| {
                    let txn = &txn;
                    async move {
                        url::Entity::update_many()
                            .col_expr(url::Column::DeletedAt, Expr::value(now))
                            .filter(url::Column::ShortIdentifier.is_in(chunk.iter().cloned()))
                            .filter(url::Column::VisitorUuid.eq(owner))
                            .filter(url::Column::DeletedAt.is_null())
                            .exec(txn)
                            .await
                            .map(|res| res.rows_affected)
                    }
                })
                .buffer_unordered(self.max_workers)
                .try_fold(0u64, |acc, n| async move { Ok(acc + n) })
                .await
                .map_err(StorageError::from)
        };

        let outcome = tokio::select! {
            biased;
            _ = ctx.done() => Err(ctx.cancellation_error()),
            r = fan_in => r,
        };

        match outcome {
            Ok(affected) => {
                txn.commit().await?;
                info!(
                    "Soft deleted {} of {} requested links for owner {}",
                    affected,
                    keys.len(),
                    owner
                );
                Ok(affected as usize)
            }
            Err(e) => {
                warn!("Soft delete rolled back: {}", e);
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
