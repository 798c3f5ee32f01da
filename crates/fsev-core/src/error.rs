//! Error types for the fsev workspace.
//!
//! This module provides the [`ServeError`] type shared by every component of
//! the event server: walking and subscribing at startup, route registration,
//! request construction, and handler dispatch all report through it, so a
//! single error handler sees failures uniformly.

use camino::Utf8PathBuf;

/// A boxed error suitable for carrying arbitrary failure causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while serving filesystem events.
///
/// # Error Recovery Strategy
///
/// - **Listening errors** ([`ServeError::ListeningDirectory`]): Fatal - abort startup
/// - **Watching errors** ([`ServeError::WatchingPath`]): Fatal unless the server
///   is configured to skip unwatchable paths
/// - **Registration errors** ([`ServeError::RegisteringPath`]): Fatal - routes are
///   configured before serving starts
/// - **Handling errors** ([`ServeError::HandlingRequest`], [`ServeError::Other`]):
///   Recoverable - delivered to the error handler, serving continues
/// - **I/O errors** ([`ServeError::Io`]): Recoverable - the offending event is
///   dropped, serving continues
/// - **Internal errors** ([`ServeError::Internal`]): Fatal - the server loop
///   cannot make progress
///
/// # Examples
///
/// ```
/// use fsev_core::ServeError;
/// use camino::Utf8PathBuf;
///
/// let err = ServeError::handling_request("/tmp/file.txt", "no handler registered");
/// assert!(err.is_recoverable());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("/tmp/file.txt"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Root resolution, directory traversal, or ignore-glob compilation failed.
    #[error("cannot listen to changes from directory {path}: {source}")]
    ListeningDirectory {
        /// The root the server was asked to listen on.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// The notifier could not be created or a directory could not be subscribed.
    #[error("cannot watch the path {path}: {source}")]
    WatchingPath {
        /// The directory that could not be watched.
        path: Utf8PathBuf,
        /// The underlying notification-backend failure.
        #[source]
        source: BoxError,
    },

    /// A route registration precondition failed.
    ///
    /// Raised for empty patterns, patterns that stay relative after tilde
    /// expansion, patterns that fail to compile, and duplicates of an
    /// already-registered compiled pattern.
    #[error("cannot register the pattern {pattern:?}: {reason}")]
    RegisteringPath {
        /// The offending pattern as supplied by the caller.
        pattern: String,
        /// Explanation of the rejected precondition.
        reason: String,
    },

    /// A request could not be handled.
    ///
    /// Raised when no registered route matches the request path, or when a
    /// handler exceeded its deadline.
    #[error("cannot handle the request for {path}: {reason}")]
    HandlingRequest {
        /// The request path that could not be served.
        path: Utf8PathBuf,
        /// Explanation of the dispatch failure.
        reason: String,
    },

    /// The server loop cannot make progress anymore.
    ///
    /// Raised when the error stream drains while the server is still serving.
    #[error("cannot serve requests anymore: {0}")]
    Internal(&'static str),

    /// A path is not valid UTF-8.
    ///
    /// Paths are UTF-8 throughout the workspace. Events on non-representable
    /// paths are reported and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred while enriching an event.
    ///
    /// Stat and content-detection failures during request construction.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error produced by user handler code.
    #[error(transparent)]
    Other(BoxError),
}

impl ServeError {
    /// Creates a new [`ServeError::ListeningDirectory`] error.
    #[inline]
    pub fn listening_directory(path: impl Into<Utf8PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::ListeningDirectory {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a new [`ServeError::WatchingPath`] error.
    #[inline]
    pub fn watching_path(path: impl Into<Utf8PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::WatchingPath {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a new [`ServeError::RegisteringPath`] error.
    #[inline]
    pub fn registering_path(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RegisteringPath {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ServeError::HandlingRequest`] error.
    #[inline]
    pub fn handling_request(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::HandlingRequest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an arbitrary handler failure.
    #[inline]
    pub fn other(source: impl Into<BoxError>) -> Self {
        Self::Other(source.into())
    }

    /// Returns `true` if this error is recoverable (serving can continue).
    ///
    /// Recoverable errors are event-specific: the affected event is dropped
    /// or its handler failed, but the server keeps dispatching.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::HandlingRequest { .. } | Self::NonUtf8Path(_) | Self::Io(_) | Self::Other(_)
        )
    }

    /// Returns `true` if this error is fatal (serving should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the filesystem path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::ListeningDirectory { path, .. }
            | Self::WatchingPath { path, .. }
            | Self::HandlingRequest { path, .. } => Some(path),
            Self::RegisteringPath { .. }
            | Self::Internal(_)
            | Self::NonUtf8Path(_)
            | Self::Io(_)
            | Self::Other(_) => None,
        }
    }
}
