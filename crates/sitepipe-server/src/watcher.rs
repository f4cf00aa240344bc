//! File watching for rebuilds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use sitepipe_build::TaskKind;

/// Quiet period after the last change before a rebuild is requested.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// A source change and the task that has to rerun for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub task: TaskKind,
    pub path: PathBuf,
}

/// File watcher for the source tree.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `source_dir` recursively.
    ///
    /// Returns the watcher and a channel to receive events. Dropping the
    /// watcher stops the events.
    pub fn new(
        source_dir: &Path,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        // notify reports paths under the directory it was given, so classify
        // against the same canonical root.
        let root = source_dir.canonicalize()?;

        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(std::io::Error::other)?;

        std::thread::spawn(move || forward_debounced(&root, &sync_rx, &async_tx));

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Forward classified events once the source tree has been quiet for
/// [`DEBOUNCE`], one event per affected task.
///
/// Every change inside a burst extends the quiet period, so the last write
/// of a burst is always followed by a rebuild.
fn forward_debounced(
    root: &Path,
    sync_rx: &mpsc::Receiver<notify::Event>,
    async_tx: &async_mpsc::Sender<WatchEvent>,
) {
    while let Ok(first) = sync_rx.recv() {
        let mut pending: HashMap<TaskKind, PathBuf> = HashMap::new();
        collect(root, first, &mut pending);

        let disconnected = loop {
            match sync_rx.recv_timeout(DEBOUNCE) {
                Ok(event) => collect(root, event, &mut pending),
                Err(mpsc::RecvTimeoutError::Timeout) => break false,
                Err(mpsc::RecvTimeoutError::Disconnected) => break true,
            }
        };

        let mut batch: Vec<WatchEvent> = pending
            .into_iter()
            .map(|(task, path)| WatchEvent { task, path })
            .collect();
        batch.sort_by_key(|event| event.task.name());

        for event in batch {
            if async_tx.blocking_send(event).is_err() {
                return;
            }
        }

        if disconnected {
            return;
        }
    }
}

/// Record the tasks a notify event touches, keeping the latest path per task.
fn collect(root: &Path, event: notify::Event, pending: &mut HashMap<TaskKind, PathBuf>) {
    for path in &event.paths {
        if let Some(watch_event) = classify_event(root, path, &event.kind) {
            pending.insert(watch_event.task, watch_event.path);
        }
    }
}

/// Classify a notify event into the task it affects.
fn classify_event(root: &Path, path: &Path, kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_) => {
            TaskKind::for_source(root, path).map(|task| WatchEvent {
                task,
                path: path.to_path_buf(),
            })
        }
        _ => None,
    }
}
