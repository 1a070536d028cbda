//! Debounced hot-reload loop.
//!
//! Change notifications come from a [`ChangeSource`]; bursts arriving within
//! the debounce window are coalesced into one reload.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::RuntimeResult;

/// A stream of changed paths.
#[async_trait]
pub trait ChangeSource: Send {
    /// Next changed path, or `None` once the source is exhausted.
    async fn next_change(&mut self) -> Option<PathBuf>;

    /// Release the underlying watch handles.
    async fn close(&mut self);
}

/// Sending half of a [`ChannelChangeSource`].
#[derive(Clone, Debug)]
pub struct ChangeSender {
    tx: mpsc::Sender<PathBuf>,
}

impl ChangeSender {
    /// Report a change. Returns `false` if the source was closed.
    pub async fn notify(&self, path: impl Into<PathBuf>) -> bool {
        self.tx.send(path.into()).await.is_ok()
    }
}

/// A [`ChangeSource`] fed through a bounded channel, for watchers running on
/// their own task.
#[derive(Debug)]
pub struct ChannelChangeSource {
    rx: mpsc::Receiver<PathBuf>,
    closed: bool,
}

impl ChannelChangeSource {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Create a connected sender and source.
pub fn channel(buffer: usize) -> (ChangeSender, ChannelChangeSource) {
    let (tx, rx) = mpsc::channel(buffer);
    (ChangeSender { tx }, ChannelChangeSource { rx, closed: false })
}

#[async_trait]
impl ChangeSource for ChannelChangeSource {
    async fn next_change(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
        self.closed = true;
    }
}

/// Watch `source` and call `on_change` with each coalesced batch of changes.
///
/// Reloads run one at a time on the calling task. A failed reload is logged
/// and the loop keeps watching. The loop ends when `shutdown` completes or the
/// source is exhausted; pending changes are then dropped and the source is
/// closed. Returns the number of successful reloads.
pub async fn watch_and_reload<S, F>(
    source: &mut S,
    debounce: Duration,
    shutdown: F,
    mut on_change: impl FnMut(&[PathBuf]) -> RuntimeResult<()>,
) -> RuntimeResult<usize>
where
    S: ChangeSource + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut reloads = 0usize;

    'watch: loop {
        let first = tokio::select! {
            _ = &mut shutdown => break 'watch,
            change = source.next_change() => change,
        };
        let Some(first) = first else {
            break 'watch;
        };

        let mut batch = vec![first];
        let window = tokio::time::sleep(debounce);
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut shutdown => break 'watch,
                _ = &mut window => break,
                change = source.next_change() => match change {
                    Some(path) => batch.push(path),
                    None => break,
                },
            }
        }
        batch.sort();
        batch.dedup();

        info!(changes = batch.len(), "reloading after code change");
        match on_change(&batch) {
            Ok(()) => reloads += 1,
            Err(err) => warn!(error = %err, "reload failed; keeping previous tree"),
        }
    }

    source.close().await;
    debug!(reloads, "watch loop stopped");
    Ok(reloads)
}
