use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

/// 短链接记录
///
/// Field names double as the snapshot line format, so renaming one is a
/// format change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    /// Backend-assigned row id; absent for in-memory records.
    #[serde(default)]
    pub id: Option<i64>,
    pub url: String,
    pub short_identifier: String,
    #[serde(default)]
    pub owner_uuid: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Set once on soft delete, never cleared afterwards.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    pub fn new(
        url: impl Into<String>,
        short_identifier: impl Into<String>,
        owner_uuid: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            url: url.into(),
            short_identifier: short_identifier.into(),
            owner_uuid: owner_uuid.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 批量创建中单个位置的结果
///
/// On a duplicate the slot still carries the stored record, alongside
/// `StorageError::DuplicateKey`.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub link: ShortLink,
    pub error: Option<StorageError>,
}

impl BatchItem {
    pub fn ok(link: ShortLink) -> Self {
        Self { link, error: None }
    }

    pub fn failed(link: ShortLink, error: StorageError) -> Self {
        Self {
            link,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
