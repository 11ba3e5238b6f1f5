// src/watch/watcher.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{Result, WhenChangedError};
use crate::fs::FileSystem;
use crate::types::{ChangeEvent, ChangeKind};
use crate::watch::matcher::PathMatcher;
use crate::watch::targets::collect_subdirs;

type SharedWatcher = Arc<Mutex<RecommendedWatcher>>;

/// Handle for the filesystem subscription.
///
/// Keeps the underlying `RecommendedWatcher` alive. Calling [`close`] (or
/// dropping the handle) releases every registration, after which the intake
/// task drains and reports [`RuntimeEvent::SourceClosed`].
///
/// [`close`]: WatcherHandle::close
pub struct WatcherHandle {
    inner: SharedWatcher,
    registered: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Directories currently registered with the event source.
    pub fn registered(&self) -> Vec<PathBuf> {
        match self.registered.lock() {
            Ok(set) => set.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Unsubscribe from every registered directory and drop the watcher.
    pub fn close(self) {
        let dirs = self.registered();
        if let Ok(mut watcher) = self.inner.lock() {
            for dir in &dirs {
                if let Err(err) = watcher.unwatch(dir) {
                    debug!(?dir, error = %err, "unwatch failed (directory probably gone)");
                }
            }
        }
        info!(count = dirs.len(), "file watcher closed");
    }
}

/// Default quiet period used to collapse a burst of notifications.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(50);

/// Settings the intake task needs besides the runtime channel.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub fs: Arc<dyn FileSystem>,
    /// Used to decide whether a freshly created directory should be
    /// registered (recursive mode only).
    pub matcher: PathMatcher,
    /// Time to keep collecting after the first notification of a burst.
    /// Everything gathered is collapsed to one change per path.
    pub settle: Duration,
}

impl IntakeSettings {
    pub fn new(fs: Arc<dyn FileSystem>, matcher: PathMatcher) -> Self {
        Self {
            fs,
            matcher,
            settle: DEFAULT_SETTLE,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// Register `dirs` (non-recursively, one subscription per directory) and
/// spawn the intake task that turns raw notifications into
/// [`RuntimeEvent`]s.
pub fn spawn_watcher(
    dirs: Vec<PathBuf>,
    settings: IntakeSettings,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    // Closure called synchronously by notify whenever an event arrives.
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if raw_tx.send(res).is_err() {
                // We can't log via tracing reliably from the notify thread
                // during teardown, so fall back to stderr.
                eprintln!("when-changed: intake task gone; dropping file event");
            }
        },
        Config::default(),
    )
    .map_err(|source| WhenChangedError::Watch {
        path: PathBuf::new(),
        source,
    })?;

    let inner: SharedWatcher = Arc::new(Mutex::new(watcher));
    let registered = Arc::new(Mutex::new(BTreeSet::new()));

    for dir in &dirs {
        register_dir(&inner, &registered, dir)?;
    }
    info!(count = dirs.len(), settle = ?settings.settle, "file watcher started");

    let intake = Intake {
        settings,
        watcher: Arc::downgrade(&inner),
        registered: Arc::clone(&registered),
    };

    tokio::spawn(async move {
        while let Some(first) = raw_rx.recv().await {
            let mut batch = vec![first];
            if !intake.settings.settle.is_zero() {
                tokio::time::sleep(intake.settings.settle).await;
            }
            while let Ok(more) = raw_rx.try_recv() {
                batch.push(more);
            }

            // Directory enumeration and mtime lookups hit the disk.
            let worker = intake.clone();
            let processed = tokio::task::spawn_blocking(move || worker.process(batch)).await;
            let events = match processed {
                Ok(events) => events,
                Err(err) => {
                    warn!(error = %err, "intake worker failed; dropping a batch of events");
                    continue;
                }
            };

            for event in events {
                if runtime_tx.send(event).await.is_err() {
                    debug!("runtime channel closed; stopping intake");
                    return;
                }
            }
        }
        debug!("notify channel closed; event source finished");
        let _ = runtime_tx.send(RuntimeEvent::SourceClosed).await;
    });

    Ok(WatcherHandle { inner, registered })
}

fn register_dir(
    watcher: &SharedWatcher,
    registered: &Mutex<BTreeSet<PathBuf>>,
    dir: &Path,
) -> Result<()> {
    let mut guard = watcher
        .lock()
        .map_err(|_| WhenChangedError::Startup("watcher mutex poisoned".to_string()))?;
    guard
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|source| WhenChangedError::Watch {
            path: dir.to_path_buf(),
            source,
        })?;
    if let Ok(mut set) = registered.lock() {
        set.insert(dir.to_path_buf());
    }
    debug!(?dir, "registered directory");
    Ok(())
}

/// Blocking half of the intake: directory bookkeeping and batch settling.
#[derive(Clone)]
struct Intake {
    settings: IntakeSettings,
    watcher: Weak<Mutex<RecommendedWatcher>>,
    registered: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl Intake {
    fn process(&self, batch: Vec<notify::Result<Event>>) -> Vec<RuntimeEvent> {
        let mut out = Vec::new();
        let mut changes = Vec::new();

        for res in batch {
            match res {
                Ok(event) => {
                    debug!(?event, "received notify event");
                    for change in classify(&event) {
                        self.track_directories(&change);
                        changes.push(change);
                    }
                }
                Err(err) => out.push(RuntimeEvent::TransportError(err.to_string())),
            }
        }

        let settled = settle_batch(self.settings.fs.as_ref(), changes);
        out.extend(settled.into_iter().map(RuntimeEvent::FileChanged));
        out
    }

    /// Keep the registrations in line with directories appearing and
    /// disappearing below the targets.
    fn track_directories(&self, change: &ChangeEvent) {
        match change.kind {
            ChangeKind::Created => self.on_created(&change.path),
            ChangeKind::Removed => self.on_vanished(&change.path),
            // Both halves of a rename arrive as `Renamed`.
            ChangeKind::Renamed if self.settings.fs.is_dir(&change.path) => {
                self.on_created(&change.path)
            }
            ChangeKind::Renamed => self.on_vanished(&change.path),
            _ => {}
        }
    }

    /// In recursive mode a new directory (and anything already inside it) is
    /// subscribed. Known paths are subscribed again: the directory behind
    /// them may have been replaced.
    fn on_created(&self, path: &Path) {
        let settings = &self.settings;
        if !settings.matcher.recursive()
            || !settings.fs.is_dir(path)
            || !settings.matcher.is_interested(path)
        {
            return;
        }
        let Some(watcher) = self.watcher.upgrade() else {
            return;
        };

        let mut dirs = BTreeSet::new();
        collect_subdirs(settings.fs.as_ref(), path, settings.matcher.excludes(), &mut dirs);
        for dir in dirs {
            if let Err(err) = register_dir(&watcher, &self.registered, &dir) {
                warn!(error = %err, "failed to register new directory");
            }
        }
    }

    /// Forget a registered directory (and everything below it) once it is
    /// gone, so that a directory re-created at the same path is subscribed
    /// afresh.
    fn on_vanished(&self, path: &Path) {
        if self.settings.fs.is_dir(path) {
            return;
        }

        let gone: Vec<PathBuf> = match self.registered.lock() {
            Ok(mut set) => {
                let gone: Vec<PathBuf> =
                    set.iter().filter(|d| d.starts_with(path)).cloned().collect();
                for dir in &gone {
                    set.remove(dir);
                }
                gone
            }
            Err(_) => return,
        };
        if gone.is_empty() {
            return;
        }

        if let Some(watcher) = self.watcher.upgrade() {
            if let Ok(mut guard) = watcher.lock() {
                for dir in &gone {
                    // The kernel usually dropped the watch already.
                    if let Err(err) = guard.unwatch(dir) {
                        debug!(?dir, error = %err, "unwatch of vanished directory failed");
                    }
                }
            }
        }
        debug!(?path, count = gone.len(), "forgot vanished directories");
    }
}

/// Collapse a burst of changes to one per path (first-seen order) and stamp
/// each survivor with the file's current modification time.
pub fn settle_batch(fs: &dyn FileSystem, changes: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    coalesce(changes)
        .into_iter()
        .map(|change| stamp_modified(fs, change))
        .collect()
}

/// One change per path, in the order paths were first seen.
///
/// A write right after a create stays a create, and a permission change
/// never hides a content change.
pub fn coalesce(changes: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    let mut out: Vec<ChangeEvent> = Vec::with_capacity(changes.len());

    for change in changes {
        match index.get(&change.path) {
            Some(&at) => out[at].kind = merge_kinds(out[at].kind, change.kind),
            None => {
                index.insert(change.path.clone(), out.len());
                out.push(change);
            }
        }
    }
    out
}

fn merge_kinds(earlier: ChangeKind, later: ChangeKind) -> ChangeKind {
    match (earlier, later) {
        (ChangeKind::Created, ChangeKind::Modified | ChangeKind::ChmodChanged) => {
            ChangeKind::Created
        }
        (kind, ChangeKind::ChmodChanged) => kind,
        (_, kind) => kind,
    }
}

fn stamp_modified(fs: &dyn FileSystem, change: ChangeEvent) -> ChangeEvent {
    if change.kind == ChangeKind::Removed {
        return change;
    }
    match fs.modified(&change.path) {
        Some(at) => change.with_modified_at(at),
        None => change,
    }
}

/// Map one raw notify event onto zero or more [`ChangeEvent`]s, one per path.
///
/// Access notifications and events of unknown kind are dropped.
pub fn classify(event: &Event) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::ChmodChanged,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .iter()
        .map(|p| ChangeEvent::new(p.clone(), kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RenameMode};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut ev = Event::new(kind);
        for p in paths {
            ev = ev.add_path(PathBuf::from(p));
        }
        ev
    }

    #[test]
    fn classifies_raw_kinds() {
        let cases = [
            (EventKind::Create(CreateKind::File), ChangeKind::Created),
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                ChangeKind::Modified,
            ),
            (EventKind::Modify(ModifyKind::Any), ChangeKind::Modified),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                ChangeKind::ChmodChanged,
            ),
            (
                EventKind::Remove(notify::event::RemoveKind::File),
                ChangeKind::Removed,
            ),
        ];
        for (raw, expected) in cases {
            let out = classify(&event(raw, &["/p/a"]));
            assert_eq!(out, vec![ChangeEvent::new("/p/a", expected)]);
        }
    }

    #[test]
    fn rename_with_both_paths_yields_two_events() {
        let out = classify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old", "/p/new"],
        ));
        assert_eq!(
            out,
            vec![
                ChangeEvent::new("/p/old", ChangeKind::Renamed),
                ChangeEvent::new("/p/new", ChangeKind::Renamed),
            ]
        );
    }

    #[test]
    fn access_events_are_dropped() {
        let out = classify(&event(EventKind::Access(AccessKind::Any), &["/p/a"]));
        assert!(out.is_empty());
    }

    #[test]
    fn write_after_create_collapses_into_one_create() {
        let out = coalesce(vec![
            ChangeEvent::new("/p/a", ChangeKind::Created),
            ChangeEvent::new("/p/a", ChangeKind::Modified),
            ChangeEvent::new("/p/a", ChangeKind::ChmodChanged),
        ]);
        assert_eq!(out, vec![ChangeEvent::new("/p/a", ChangeKind::Created)]);
    }

    #[test]
    fn repeated_writes_collapse_per_path_in_first_seen_order() {
        let out = coalesce(vec![
            ChangeEvent::new("/p/b", ChangeKind::Modified),
            ChangeEvent::new("/p/a", ChangeKind::Modified),
            ChangeEvent::new("/p/b", ChangeKind::Modified),
        ]);
        assert_eq!(
            out,
            vec![
                ChangeEvent::new("/p/b", ChangeKind::Modified),
                ChangeEvent::new("/p/a", ChangeKind::Modified),
            ]
        );
    }

    #[test]
    fn chmod_never_hides_a_content_change() {
        let out = coalesce(vec![
            ChangeEvent::new("/p/a", ChangeKind::ChmodChanged),
            ChangeEvent::new("/p/a", ChangeKind::Modified),
            ChangeEvent::new("/p/a", ChangeKind::ChmodChanged),
        ]);
        assert_eq!(out, vec![ChangeEvent::new("/p/a", ChangeKind::Modified)]);
    }

    #[test]
    fn later_removal_wins() {
        let out = coalesce(vec![
            ChangeEvent::new("/p/a", ChangeKind::Created),
            ChangeEvent::new("/p/a", ChangeKind::Removed),
        ]);
        assert_eq!(out, vec![ChangeEvent::new("/p/a", ChangeKind::Removed)]);
    }

    #[test]
    fn settling_stamps_mtime_except_for_removals() {
        use crate::fs::mock::MockFileSystem;
        use std::time::SystemTime;

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        let fs = MockFileSystem::new();
        fs.add_file_modified_at("/p/a", at);

        let out = settle_batch(
            &fs,
            vec![
                ChangeEvent::new("/p/a", ChangeKind::Modified),
                ChangeEvent::new("/p/gone", ChangeKind::Removed),
            ],
        );
        assert_eq!(out[0].modified_at, Some(at));
        assert_eq!(out[1].modified_at, None);
    }
}
