use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{AppConfig, StorageKind};
use crate::context::OpContext;
use crate::errors::Result;
use crate::services::ShortLinkEngine;
use crate::storage::{StorageBackend, StorageFactory};

/// 构建存储后端与引擎；内存后端在此从快照恢复
pub async fn prepare_engine(config: &AppConfig) -> Result<ShortLinkEngine> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let backend = StorageFactory::create(&config.storage).await?;
    info!("Using storage backend: {}", backend.kind());

    let engine = ShortLinkEngine::new(Arc::new(backend), config.engine.short_id_length);

    if engine.storage().kind() == StorageKind::Memory {
        let path = Path::new(&config.storage.file_storage_path);
        let report = engine
            .restore(
                &OpContext::background(),
                path,
                config.storage.restore_batch_size,
            )
            .await?;
        info!(
            "Loaded {} records from snapshot {} ({} duplicates, {} failed)",
            report.restored,
            path.display(),
            report.duplicates,
            report.failed
        );
    }

    debug!("Startup completed in {:?}", start_time.elapsed());
    Ok(engine)
}
