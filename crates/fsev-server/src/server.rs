//! The event server and its serve loop.
//!
//! `listen_and_serve` walks the root, subscribes every surviving directory,
//! and then multiplexes over the notifier's event and error streams. Each
//! event becomes a request dispatched on its own task, so slow handlers
//! never stall the loop; handler failures are published back into the
//! shared error stream and reach the configured error handler together
//! with backend failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tokio::sync::{mpsc, watch};

use fsev_core::path::{current_dir_utf8, expand_user};
use fsev_core::{Action, FxHashMap, ServeError, ServerConfig};
use fsev_router::{default_mux, Handler, RequestContext};

use crate::builder::build_request;
use crate::error_handler::{ErrorHandler, LoggingErrorHandler};
use crate::ignore::IgnoreFilter;
use crate::notifier::{Notifier, RawEvent};
use crate::walker::DirectoryWalker;

/// The write-suppression table is pruned once it grows past this many
/// entries.
const SUPPRESSOR_PRUNE_LEN: usize = 256;

/// Why the serve loop ended.
enum LoopEnd {
    /// `close()` was called.
    Closed,
    /// The backend went away and drained the event stream.
    EventsDrained,
    /// The error stream drained while serving.
    ErrorsDrained,
}

/// Drops the write events that echo a fresh create.
///
/// A create on most platforms surfaces as a create followed by one or more
/// writes for the same logical change. Writes landing inside the window
/// after a create on the same path are dropped; later writes are genuine
/// in-place edits and pass through. A zero window disables suppression.
pub(crate) struct WriteSuppressor {
    window: Duration,
    recent_creates: FxHashMap<Utf8PathBuf, Instant>,
}

impl WriteSuppressor {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            recent_creates: FxHashMap::default(),
        }
    }

    /// Returns `true` if the event should be dropped.
    pub(crate) fn should_drop(&mut self, raw: &RawEvent) -> bool {
        if self.window.is_zero() {
            return false;
        }

        if raw.action.contains(Action::CREATE) {
            self.recent_creates.insert(raw.path.clone(), Instant::now());
            if self.recent_creates.len() > SUPPRESSOR_PRUNE_LEN {
                let window = self.window;
                self.recent_creates.retain(|_, seen| seen.elapsed() <= window);
            }
            return false;
        }

        raw.action == Action::WRITE
            && self
                .recent_creates
                .get(&raw.path)
                .is_some_and(|seen| seen.elapsed() <= self.window)
    }
}

/// A filesystem-event server.
///
/// Built once, then driven by [`listen_and_serve`](Server::listen_and_serve)
/// until [`close`](Server::close) is called or the notification backend goes
/// away. The server is immutable while serving and can be shared behind an
/// [`Arc`], which is how `close` is reached from another task.
///
/// # Examples
///
/// ```no_run
/// use fsev_router::{handler_fn, ServeMux};
/// use fsev_server::Server;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), fsev_core::ServeError> {
/// let mux = Arc::new(ServeMux::new());
/// mux.register(
///     "/srv/incoming/**/*.mp4",
///     Arc::new(handler_fn(|ctx| async move {
///         println!("new clip: {}", ctx.request().path);
///         Ok(())
///     })),
/// )?;
///
/// let server = Server::builder("/srv/incoming").handler(mux).build();
/// server.listen_and_serve().await
/// # }
/// ```
pub struct Server {
    root: Utf8PathBuf,
    handler: Option<Arc<dyn Handler>>,
    error_handler: Arc<dyn ErrorHandler>,
    config: ServerConfig,
    ignore: IgnoreFilter,
    hostname: String,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("hostname", &self.hostname)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Creates a server over `root` with default settings.
    ///
    /// An empty root means the current working directory; a leading `~` is
    /// expanded when serving starts. Without an explicit handler the server
    /// dispatches through the process-wide default mux.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self::builder(root).build()
    }

    /// Starts building a server over `root`.
    #[must_use]
    pub fn builder(root: impl Into<Utf8PathBuf>) -> ServerBuilder {
        ServerBuilder {
            root: root.into(),
            handler: None,
            error_handler: None,
            config: ServerConfig::default(),
        }
    }

    /// Walks the root, subscribes the watch set, and serves events.
    ///
    /// Runs until [`close`](Server::close) is called (clean shutdown) or the
    /// notification backend drains its streams.
    ///
    /// # Errors
    ///
    /// Startup failures (root resolution, walk, subscription unless `skip`
    /// is set) abort and are returned. A drained error stream while serving
    /// returns [`ServeError::Internal`]. Runtime failures are delivered to
    /// the error handler instead.
    pub async fn listen_and_serve(&self) -> Result<(), ServeError> {
        let root = self.resolve_root()?;

        let directories = DirectoryWalker::new(&root, &self.ignore)
            .with_max_depth(self.config.max_depth)
            .collect_dirs()?;

        let mut notifier = Notifier::new(&self.config.watch)?;
        for directory in &directories {
            if let Err(error) = notifier.add(directory) {
                if self.config.skip {
                    tracing::warn!(path = %directory, error = %error, "skipping unwatchable directory");
                    continue;
                }
                return Err(error);
            }
        }

        tracing::info!(
            root = %root,
            watched = notifier.watch_list().len(),
            "listening for filesystem events"
        );
        tracing::debug!(watch_list = ?notifier.watch_list(), "subscribed directories");

        self.serve_loop(notifier).await
    }

    /// Ends the current [`listen_and_serve`](Server::listen_and_serve) call.
    ///
    /// Idempotent. The serve loop tears down every subscription and returns
    /// `Ok`; in-flight handler invocations finish on their own tasks.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn serve_loop(&self, mut notifier: Notifier) -> Result<(), ServeError> {
        let handler = self.effective_handler();
        let timeout = self.config.handler_timeout_ms.map(Duration::from_millis);
        let error_tx = notifier.error_sender();
        let mut suppressor =
            WriteSuppressor::new(Duration::from_millis(self.config.watch.write_suppress_ms));

        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow() {
            notifier.close();
            return Ok(());
        }

        let end = loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break LoopEnd::Closed,
                maybe_event = notifier.events.recv() => match maybe_event {
                    Some(raw) => {
                        if !suppressor.should_drop(&raw) {
                            self.dispatch(raw, &handler, &error_tx, timeout);
                        }
                    }
                    None => break LoopEnd::EventsDrained,
                },
                maybe_error = notifier.errors.recv() => match maybe_error {
                    Some(error) => self.error_handler.handle_error(&error),
                    None => break LoopEnd::ErrorsDrained,
                },
            }
        };

        match end {
            LoopEnd::Closed => {
                notifier.close();
                tracing::debug!("server closed, shutting down");
                Ok(())
            }
            LoopEnd::EventsDrained => {
                tracing::debug!("event stream drained, shutting down");
                Ok(())
            }
            LoopEnd::ErrorsDrained => Err(ServeError::Internal("error stream closed unexpectedly")),
        }
    }

    /// Builds the request for one raw event and spawns its handler.
    fn dispatch(
        &self,
        raw: RawEvent,
        handler: &Arc<dyn Handler>,
        error_tx: &mpsc::Sender<ServeError>,
        timeout: Option<Duration>,
    ) {
        let request = match build_request(raw, &self.hostname, timeout) {
            Ok(request) => request,
            Err(error) => {
                // The loop is also the stream's consumer, so it must never
                // block on a full buffer here.
                if error_tx.try_send(error).is_err() {
                    tracing::warn!("error stream full, dropping request-construction failure");
                }
                return;
            }
        };

        tracing::trace!(path = %request.path, action = %request.action, "dispatching request");

        let ctx = RequestContext::new(request);
        let handler = Arc::clone(handler);
        let error_tx = error_tx.clone();
        tokio::spawn(async move {
            let deadline = ctx.request().timeout;
            let result = match deadline {
                Some(limit) => match tokio::time::timeout(limit, handler.serve(&ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(ServeError::handling_request(
                        ctx.request().path.clone(),
                        "handler deadline exceeded",
                    )),
                },
                None => handler.serve(&ctx).await,
            };

            if let Err(error) = result {
                // Workers may block; the loop drains the stream concurrently.
                if error_tx.send(error).await.is_err() {
                    tracing::debug!("error stream closed before handler error delivery");
                }
            }
        });
    }

    fn effective_handler(&self) -> Arc<dyn Handler> {
        match &self.handler {
            Some(handler) => Arc::clone(handler),
            None => default_mux(),
        }
    }

    /// Resolves the configured root to an absolute path.
    fn resolve_root(&self) -> Result<Utf8PathBuf, ServeError> {
        let raw = self.root.as_str();
        if raw.is_empty() {
            return current_dir_utf8()
                .map_err(|e| ServeError::listening_directory(Utf8PathBuf::new(), e));
        }

        let expanded =
            expand_user(raw).map_err(|e| ServeError::listening_directory(self.root.clone(), e))?;
        if !expanded.is_absolute() {
            return Err(ServeError::listening_directory(
                self.root.clone(),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "root path must be absolute",
                ),
            ));
        }
        Ok(expanded)
    }
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    root: Utf8PathBuf,
    handler: Option<Arc<dyn Handler>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    config: ServerConfig,
}

impl ServerBuilder {
    /// Sets the root handler. Without one, the default mux serves.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the error handler. Without one, failures are logged.
    #[must_use]
    pub fn error_handler(mut self, error_handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    /// Clamps the walk depth. `0` means unbounded, matching a recursive
    /// watch of the whole tree.
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = (max_depth > 0).then_some(max_depth);
        self
    }

    /// Keeps serving when a directory cannot be subscribed.
    #[must_use]
    pub const fn skip(mut self, skip: bool) -> Self {
        self.config.skip = skip;
        self
    }

    /// Sets the glob patterns excluded from watching.
    ///
    /// `.git` directories are always excluded in addition to this list.
    #[must_use]
    pub fn ignore(mut self, patterns: Vec<String>) -> Self {
        self.config.ignore = patterns;
        self
    }

    /// Bounds every handler invocation with a deadline.
    #[must_use]
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.config.handler_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Replaces the whole configuration in one step.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Finalizes the server, caching the host identity.
    #[must_use]
    pub fn build(self) -> Server {
        let ignore = IgnoreFilter::new(self.config.ignore.clone());
        let hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_default();
        let (shutdown, _) = watch::channel(false);

        Server {
            root: self.root,
            handler: self.handler,
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::new(LoggingErrorHandler)),
            config: self.config,
            ignore,
            hostname,
            shutdown,
        }
    }
}

/// Builds a default server over `root` and serves events with `handler`.
///
/// Passing `None` dispatches through the process-wide default mux, so
/// programs that registered routes with [`fsev_router::handle`] need no
/// explicit wiring.
///
/// # Errors
///
/// Propagates startup and shutdown failures from
/// [`Server::listen_and_serve`].
pub async fn listen_and_serve(
    root: impl Into<Utf8PathBuf>,
    handler: Option<Arc<dyn Handler>>,
) -> Result<(), ServeError> {
    let mut builder = Server::builder(root);
    if let Some(handler) = handler {
        builder = builder.handler(handler);
    }
    builder.build().listen_and_serve().await
}
