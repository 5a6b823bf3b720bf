//! Reload requests and the theme directory watcher.
//!
//! Filesystem notifications are turned into [`ReloadRequest`] messages on a
//! bounded channel of capacity one. While a reload is running at most one
//! more request can be pending; anything beyond that coalesces into it.
//! [`run_reloads`] drains the channel and re-runs the same [`Loader::load`]
//! entry point used for the first render.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::LoaderError;
use crate::pipeline::{LoadedTheme, Loader};

/// Why a reload was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadRequest {
    FileChanged(PathBuf),
    Manual,
}

/// Outcome of one reload, reported to the consumer.
#[derive(Debug)]
pub enum ReloadEvent {
    Reloaded(LoadedTheme),
    Failed(LoaderError),
}

/// Sending side of the reload channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<ReloadRequest>,
}

impl ReloadHandle {
    /// Queue a reload. Returns `false` when the request was coalesced into
    /// one already pending, or the reload loop has gone away.
    pub fn request(&self, request: ReloadRequest) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(request)) => {
                tracing::trace!("Reload already pending, coalescing {:?}", request);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Reload loop stopped, dropping request");
                false
            }
        }
    }
}

/// Receiving side of the reload channel.
#[derive(Debug)]
pub struct ReloadQueue {
    rx: mpsc::Receiver<ReloadRequest>,
}

impl ReloadQueue {
    pub async fn next(&mut self) -> Option<ReloadRequest> {
        self.rx.recv().await
    }
}

pub fn reload_channel() -> (ReloadHandle, ReloadQueue) {
    let (tx, rx) = mpsc::channel(1);
    (ReloadHandle { tx }, ReloadQueue { rx })
}

/// Re-run the pipeline for every queued request until either side closes.
pub async fn run_reloads(
    loader: Arc<Loader>,
    mut queue: ReloadQueue,
    events: mpsc::UnboundedSender<ReloadEvent>,
) {
    while let Some(request) = queue.next().await {
        tracing::info!("Reloading theme ({:?})", request);
        let event = match loader.load().await {
            Ok(loaded) => ReloadEvent::Reloaded(loaded),
            Err(e) => {
                tracing::error!("Theme reload failed: {}", e);
                ReloadEvent::Failed(e)
            }
        };
        if events.send(event).is_err() {
            tracing::debug!("Reload observer gone, stopping");
            break;
        }
    }
}

#[cfg(feature = "runtime")]
pub use watcher::{watch_theme, ThemeWatcher};

#[cfg(feature = "runtime")]
mod watcher {
    use std::path::Path;

    use notify::{RecommendedWatcher, RecursiveMode, Watcher};

    use super::{ReloadHandle, ReloadRequest};
    use crate::error::{LoaderError, Result};

    /// Keeps the directory watch alive. Dropping it stops notifications.
    pub struct ThemeWatcher {
        _watcher: RecommendedWatcher,
    }

    /// Watch `dir` recursively, turning every change into a reload request.
    pub fn watch_theme(dir: &Path, handle: ReloadHandle) -> Result<ThemeWatcher> {
        let watch_error = |e: notify::Error| LoaderError::Watch {
            path: dir.to_path_buf(),
            message: e.to_string(),
        };

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if event.kind.is_access() {
                        return;
                    }
                    let path = event.paths.into_iter().next().unwrap_or_default();
                    tracing::debug!("Theme file changed: {:?}", path);
                    handle.request(ReloadRequest::FileChanged(path));
                }
                Err(e) => tracing::warn!("Theme watcher error: {}", e),
            })
            .map_err(watch_error)?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(watch_error)?;
        tracing::info!("Watching {:?} for changes", dir);

        Ok(ThemeWatcher { _watcher: watcher })
    }
}
