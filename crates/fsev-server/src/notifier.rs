//! The notifier adapter over the OS file-change facility.
//!
//! [`Notifier`] bridges the synchronous `notify` backend into bounded tokio
//! channels. The backend invokes its callback on a dedicated thread; raw
//! events are mapped to [`Action`] bitsets there and forwarded with
//! `blocking_send`, so a slow consumer applies backpressure to the backend
//! instead of growing an unbounded queue.
//!
//! The error stream is shared: the backend publishes its own failures into
//! it, and the server publishes request-construction and handler failures
//! through cloned senders, so one consumer drains every failure. The
//! channel is buffered and loop-side producers never block on it.

use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use smallvec::SmallVec;
use tokio::sync::mpsc;

use fsev_core::{Action, FxHashSet, ServeError, WatchConfig};

/// One raw filesystem event, mapped but not yet enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// The affected path.
    pub path: Utf8PathBuf,
    /// The operations reported by the backend.
    pub action: Action,
}

/// A handle over the OS notification backend.
///
/// # Lifecycle
///
/// 1. **Creation**: [`Notifier::new`] starts the backend and wires the
///    event and error channels.
/// 2. **Subscription**: [`Notifier::add`] subscribes one directory at a
///    time; the watch list records every success.
/// 3. **Teardown**: [`Notifier::close`] (or drop) stops the backend, which
///    closes the event stream and lets the serve loop finish cleanly.
pub struct Notifier {
    watcher: Option<RecommendedWatcher>,
    // The serve loop selects over both streams at once, which needs
    // disjoint borrows rather than accessor calls.
    pub(crate) events: mpsc::Receiver<RawEvent>,
    pub(crate) errors: mpsc::Receiver<ServeError>,
    error_tx: mpsc::Sender<ServeError>,
    watched: FxHashSet<Utf8PathBuf>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("watched", &self.watched.len())
            .field("is_open", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Starts the notification backend.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::WatchingPath`] when the backend cannot be
    /// created.
    pub fn new(config: &WatchConfig) -> Result<Self, ServeError> {
        let (event_tx, events) = mpsc::channel(config.channel_capacity.max(1));
        let (error_tx, errors) = mpsc::channel(config.error_capacity.max(1));

        let backend_errors = error_tx.clone();
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for raw in raw_events(event) {
                        if event_tx.blocking_send(raw).is_err() {
                            // Consumer is gone, the backend is shutting down.
                            return;
                        }
                    }
                }
                Err(error) => {
                    let paths = error.paths.clone();
                    let path = paths
                        .first()
                        .and_then(|p| Utf8Path::from_path(p))
                        .map_or_else(Utf8PathBuf::new, Utf8Path::to_owned);
                    let _ = backend_errors.try_send(ServeError::watching_path(path, error));
                }
            }
        })
        .map_err(|e| ServeError::watching_path(Utf8PathBuf::new(), e))?;

        Ok(Self {
            watcher: Some(watcher),
            events,
            errors,
            error_tx,
            watched: FxHashSet::default(),
        })
    }

    /// Subscribes one directory.
    ///
    /// Subscriptions are non-recursive: the walker already enumerated the
    /// tree, and per-directory subscriptions keep the ignore list and the
    /// depth clamp authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::WatchingPath`] naming the path on failure, and
    /// when called after [`close`](Notifier::close).
    pub fn add(&mut self, path: &Utf8Path) -> Result<(), ServeError> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Err(ServeError::watching_path(
                path,
                std::io::Error::new(std::io::ErrorKind::Other, "notifier is closed"),
            ));
        };

        watcher
            .watch(path.as_std_path(), RecursiveMode::NonRecursive)
            .map_err(|e| ServeError::watching_path(path, e))?;

        self.watched.insert(path.to_owned());
        Ok(())
    }

    /// Returns the event stream.
    pub fn events(&mut self) -> &mut mpsc::Receiver<RawEvent> {
        &mut self.events
    }

    /// Returns the error stream.
    pub fn errors(&mut self) -> &mut mpsc::Receiver<ServeError> {
        &mut self.errors
    }

    /// Returns a sender for publishing errors into the shared stream.
    ///
    /// Handler workers hold clones of this sender; the serve loop itself
    /// only ever uses `try_send` on it.
    #[must_use]
    pub fn error_sender(&self) -> mpsc::Sender<ServeError> {
        self.error_tx.clone()
    }

    /// Returns the currently-subscribed paths in sorted order.
    #[must_use]
    pub fn watch_list(&self) -> Vec<&Utf8Path> {
        let mut paths: Vec<&Utf8Path> = self.watched.iter().map(Utf8PathBuf::as_path).collect();
        paths.sort_unstable();
        paths
    }

    /// Stops the backend and closes the event stream.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        // Dropping the backend drops the callback and its event sender,
        // which drains into a closed stream observed by the serve loop.
        self.watcher = None;
    }
}

/// Maps one backend event onto raw events.
///
/// A rename observed end to end carries both paths and splits into RENAME
/// for the source and CREATE for the destination. Kinds with no mapping
/// (access notifications, catch-all events) produce nothing. Non-UTF-8
/// paths are logged and skipped.
fn raw_events(event: notify::Event) -> SmallVec<[RawEvent; 2]> {
    let mut raws = SmallVec::new();

    if matches!(event.kind, EventKind::Modify(ModifyKind::Name(RenameMode::Both))) {
        let mut paths = event.paths.into_iter();
        if let (Some(from), Some(to)) = (paths.next(), paths.next()) {
            push_raw(&mut raws, from, Action::RENAME);
            push_raw(&mut raws, to, Action::CREATE);
        }
        return raws;
    }

    let Some(action) = action_for(&event.kind) else {
        return raws;
    };
    for path in event.paths {
        push_raw(&mut raws, path, action);
    }
    raws
}

fn push_raw(raws: &mut SmallVec<[RawEvent; 2]>, path: std::path::PathBuf, action: Action) {
    match Utf8PathBuf::from_path_buf(path) {
        Ok(path) => raws.push(RawEvent { path, action }),
        Err(path) => {
            tracing::warn!(path = %path.display(), "skipping non-UTF-8 path in file event");
        }
    }
}

/// Maps a backend event kind onto the action bitset.
fn action_for(kind: &EventKind) -> Option<Action> {
    match kind {
        EventKind::Create(_) => Some(Action::CREATE),
        EventKind::Remove(_) => Some(Action::REMOVE),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Action::RENAME),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Action::CREATE),
        EventKind::Modify(ModifyKind::Name(_)) => Some(Action::RENAME),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(Action::CHMOD),
        EventKind::Modify(_) => Some(Action::WRITE),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
