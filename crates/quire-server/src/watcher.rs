//! Content root watching for development mode.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use quire_content::{is_allowed_extension, ContentRoot};
use tokio::sync::mpsc as async_mpsc;

use crate::error::ServerError;

/// A change to an eligible file, relative to the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// File appeared
    Added(PathBuf),

    /// File contents or metadata changed
    Changed(PathBuf),

    /// File went away
    Removed(PathBuf),
}

impl ContentEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Added(path) | Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Recursive watcher over a content root.
pub struct ContentWatcher {
    _watcher: RecommendedWatcher,
}

impl ContentWatcher {
    /// Start watching `root`.
    ///
    /// Returns the watcher and a channel of events. Events stop when the
    /// watcher is dropped.
    pub fn new(
        root: &ContentRoot,
    ) -> Result<(Self, async_mpsc::Receiver<ContentEvent>), ServerError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| ServerError::Watch(e.to_string()))?;

        watcher
            .watch(root.path(), RecursiveMode::Recursive)
            .map_err(|e| ServerError::Watch(e.to_string()))?;

        let root_path = root.path().to_path_buf();
        std::thread::spawn(move || {
            let debounce = Duration::from_millis(100);
            let mut last_seen: Option<(ContentEvent, Instant)> = None;

            while let Ok(event) = sync_rx.recv() {
                for path in &event.paths {
                    let Some(content_event) = classify_event(&root_path, path, &event.kind)
                    else {
                        continue;
                    };

                    // Editors emit bursts of identical events for one save.
                    let now = Instant::now();
                    if let Some((previous, at)) = &last_seen {
                        if *previous == content_event && now.duration_since(*at) < debounce {
                            continue;
                        }
                    }
                    last_seen = Some((content_event.clone(), now));

                    if async_tx.blocking_send(content_event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Map a notify event on `path` to a content event, if it concerns an
/// eligible file under `root`.
fn classify_event(root: &Path, path: &Path, kind: &EventKind) -> Option<ContentEvent> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    if !is_allowed_extension(ext) {
        return None;
    }

    let relative = path.strip_prefix(root).ok()?.to_path_buf();

    match kind {
        EventKind::Create(_) => Some(ContentEvent::Added(relative)),
        EventKind::Remove(_) => Some(ContentEvent::Removed(relative)),
        EventKind::Modify(_) => Some(ContentEvent::Changed(relative)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classifies_only_eligible_files() {
        let root = Path::new("/srv/docs");
        let create = EventKind::Create(notify::event::CreateKind::File);

        assert_eq!(
            classify_event(root, Path::new("/srv/docs/pages/a.mdx"), &create),
            Some(ContentEvent::Added(PathBuf::from("pages/a.mdx")))
        );
        assert_eq!(
            classify_event(root, Path::new("/srv/docs/notes.txt"), &create),
            None
        );
        assert_eq!(
            classify_event(root, Path::new("/elsewhere/a.mdx"), &create),
            None
        );
        assert_eq!(
            classify_event(
                root,
                Path::new("/srv/docs/b.md"),
                &EventKind::Remove(notify::event::RemoveKind::File)
            ),
            Some(ContentEvent::Removed(PathBuf::from("b.md")))
        );
    }

    #[tokio::test]
    async fn watches_content_changes() {
        let temp = tempdir().unwrap();
        let root = ContentRoot::open(temp.path()).unwrap();

        // Create the watcher first (so it catches file creation)
        let (watcher, mut rx) = ContentWatcher::new(&root).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(root.path().join("test.mdx"), "# Created").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        let event = event
            .expect("timeout waiting for file watch event")
            .expect("channel should not be closed");
        assert_eq!(event.path(), Path::new("test.mdx"));
    }
}
