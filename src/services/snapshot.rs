//! Snapshot backup and restore
//!
//! A snapshot is a JSON-lines file, one [`ShortLink`] per line. Backups are
//! written to `<path>.tmp` and renamed into place, so a reader never sees a
//! half-written file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, error, info, warn};

use crate::context::OpContext;
use crate::errors::{ServiceError, ServiceResult, StorageErrorKind};
use crate::storage::{ShortLink, StorageBackend};

/// Counts reported by [`restore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    /// Lines whose record was already present.
    pub duplicates: usize,
    pub failed: usize,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.restored + self.duplicates + self.failed
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> ServiceError {
    ServiceError::snapshot(format!("{} {}: {}", action, path.display(), e))
}

/// Write every stored record to `path`. Returns the number of records written.
pub async fn backup<S>(storage: &S, ctx: &OpContext, path: &Path) -> ServiceResult<usize>
where
    S: StorageBackend + ?Sized,
{
    let links = storage.get_all(ctx).await.map_err(|e| {
        error!("Backup aborted, could not read records: {}", e);
        ServiceError::from(e)
    })?;

    let tmp = tmp_path(path);
    let written = write_lines(ctx, &tmp, &links).await;
    if let Err(e) = written {
        error!("Backup to {} failed: {}", path.display(), e);
        discard_tmp(&tmp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        error!("Backup rename failed: {}", e);
        discard_tmp(&tmp).await;
        return Err(io_error("rename snapshot to", path, e));
    }

    info!("Backup completed: {} records -> {}", links.len(), path.display());
    Ok(links.len())
}

async fn discard_tmp(tmp: &Path) {
    match fs::remove_file(tmp).await {
        Ok(()) => debug!("Removed partial snapshot {}", tmp.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial snapshot {}: {}", tmp.display(), e),
    }
}

async fn write_lines(ctx: &OpContext, tmp: &Path, links: &[ShortLink]) -> ServiceResult<()> {
    let file = fs::File::create(tmp)
        .await
        .map_err(|e| io_error("create", tmp, e))?;
    let mut writer = BufWriter::new(file);

    for link in links {
        ctx.check()?;
        let mut line = serde_json::to_vec(link)
            .map_err(|e| ServiceError::snapshot(format!("encode {}: {}", link.short_identifier, e)))?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(|e| io_error("write", tmp, e))?;
    }

    writer.flush().await.map_err(|e| io_error("flush", tmp, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| io_error("sync", tmp, e))?;
    Ok(())
}

/// Re-insert the records stored in `path`, `batch_size` lines at a time.
///
/// A missing file is created empty. Blank lines are skipped; records already
/// present count as duplicates. A line that is not a valid record aborts the
/// restore.
pub async fn restore<S>(
    storage: &S,
    ctx: &OpContext,
    path: &Path,
    batch_size: usize,
) -> ServiceResult<RestoreReport>
where
    S: StorageBackend + ?Sized,
{
    let batch_size = batch_size.max(1);
    let file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .await
        .map_err(|e| io_error("open", path, e))?;

    let mut lines = BufReader::new(file).lines();
    let mut report = RestoreReport::default();
    let mut batch: Vec<ShortLink> = Vec::with_capacity(batch_size);
    let mut line_no = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_error("read", path, e))?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let link: ShortLink = serde_json::from_str(&line).map_err(|e| {
            error!("Restore aborted at line {}: {}", line_no, e);
            ServiceError::snapshot(format!(
                "{} line {}: invalid record: {}",
                path.display(),
                line_no,
                e
            ))
        })?;
        batch.push(link);

        if batch.len() >= batch_size {
            flush_batch(storage, ctx, &mut batch, &mut report).await?;
        }
    }
    flush_batch(storage, ctx, &mut batch, &mut report).await?;

    info!(
        "Restore completed from {}: {} restored, {} duplicates, {} failed",
        path.display(),
        report.restored,
        report.duplicates,
        report.failed
    );
    Ok(report)
}

async fn flush_batch<S>(
    storage: &S,
    ctx: &OpContext,
    batch: &mut Vec<ShortLink>,
    report: &mut RestoreReport,
) -> ServiceResult<()>
where
    S: StorageBackend + ?Sized,
{
    if batch.is_empty() {
        return Ok(());
    }

    let items = storage
        .batch_create(ctx, std::mem::take(batch))
        .await
        .map_err(|e| {
            error!("Restore aborted, batch insert failed: {}", e);
            ServiceError::from(e)
        })?;

    for item in items {
        match item.error {
            None => report.restored += 1,
            Some(e) if e.is(StorageErrorKind::DuplicateKey) => {
                debug!("Restore skipped duplicate {}", item.link.short_identifier);
                report.duplicates += 1;
            }
            Some(e) => {
                warn!("Restore failed for {}: {}", item.link.short_identifier, e);
                report.failed += 1;
            }
        }
    }
    Ok(())
}
