use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::config::{AppConfig, StorageKind};
use crate::context::OpContext;
use crate::errors::Result;
use crate::services::ShortLinkEngine;
use crate::storage::StorageBackend;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 退出前保存快照（仅内存后端）
pub async fn finalize_engine(engine: &ShortLinkEngine, config: &AppConfig) -> Result<()> {
    if engine.storage().kind() != StorageKind::Memory {
        return Ok(());
    }

    let ctx = OpContext::with_timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS));
    let path = Path::new(&config.storage.file_storage_path);
    let written = engine.backup(&ctx, path).await?;
    info!("Shutdown snapshot saved: {} records", written);
    Ok(())
}
