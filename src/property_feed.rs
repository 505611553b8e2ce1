use crate::params::SharedParams;
use crate::properties::{load_property_file, report_batch};
use anyhow::Context;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const DEFAULT_POLL: Duration = Duration::from_millis(500);

/// Watches a property file from a background thread and publishes every change
/// into [`SharedParams`] as one snapshot.
pub struct PropertyFeed {
    stop: Arc<AtomicBool>,
    applied: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

/// Identity of one version of the file, by content only. Same-length rewrites
/// inside the filesystem's mtime granularity still register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    digest: u64,
}

fn file_stamp(path: &Path) -> Option<FileStamp> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Some(FileStamp {
        len: bytes.len() as u64,
        digest: hasher.finish(),
    })
}

impl PropertyFeed {
    /// The file's current contents are treated as already applied; only later
    /// changes are published.
    pub fn spawn(path: PathBuf, params: Arc<SharedParams>, poll: Duration) -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let applied = Arc::new(AtomicU64::new(0));
        let stop_for_thread = Arc::clone(&stop);
        let applied_for_thread = Arc::clone(&applied);
        let baseline = file_stamp(&path);

        let handle = std::thread::Builder::new()
            .name("property-feed".to_string())
            .spawn(move || {
                watch_loop(
                    &path,
                    &params,
                    baseline,
                    poll,
                    &stop_for_thread,
                    &applied_for_thread,
                )
            })
            .context("spawn property feed thread")?;

        Ok(Self {
            stop,
            applied,
            handle: Some(handle),
        })
    }

    /// Updates published so far.
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }
}

impl Drop for PropertyFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn watch_loop(
    path: &Path,
    params: &SharedParams,
    mut last: Option<FileStamp>,
    poll: Duration,
    stop: &AtomicBool,
    applied: &AtomicU64,
) {
    let source = path.display().to_string();
    // Sleep in short slices so Drop does not wait a full poll interval.
    let slice = poll.min(Duration::from_millis(50)).max(Duration::from_millis(1));

    while !stop.load(Ordering::Relaxed) {
        let mut waited = Duration::ZERO;
        while waited < poll && !stop.load(Ordering::Relaxed) {
            std::thread::sleep(slice);
            waited += slice;
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let stamp = file_stamp(path);
        if stamp == last {
            continue;
        }
        last = stamp;
        if stamp.is_none() {
            tracing::debug!(source = %source, "property file disappeared; keeping current values");
            continue;
        }

        match load_property_file(path) {
            Ok(batch) => {
                report_batch(&source, &batch);
                if !batch.updates.is_empty() {
                    let next = params.apply_all(&batch.updates);
                    applied.fetch_add(batch.updates.len() as u64, Ordering::Relaxed);
                    tracing::debug!(
                        speed = next.noise.speed,
                        background = %next.colors.background,
                        edge = %next.colors.edge,
                        "published parameter snapshot"
                    );
                }
            }
            Err(err) => tracing::warn!(source = %source, "reading property file failed: {err}"),
        }
    }
}
