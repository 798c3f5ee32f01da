//! The request record delivered to handlers.
//!
//! A [`Request`] is the unit of work of the event server: one filesystem
//! change, enriched with stat metadata and a detected media type. Requests
//! are immutable after construction and are handed to exactly one handler
//! invocation.

use std::time::{Duration, SystemTime};

use camino::Utf8PathBuf;

use crate::mime::MimeDescriptor;

bitflags::bitflags! {
    /// The set of filesystem operations reported by a single event.
    ///
    /// A source event may set more than one bit: a rename observed end to
    /// end reports `RENAME` on the old path and `CREATE` on the new one,
    /// and some platforms fold metadata updates into the same event as the
    /// write that caused them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Action: u8 {
        /// An entry was created.
        const CREATE = 1 << 0;
        /// An entry's content was written.
        const WRITE = 1 << 1;
        /// An entry was removed.
        const REMOVE = 1 << 2;
        /// An entry was renamed away.
        const RENAME = 1 << 3;
        /// An entry's permissions or metadata changed.
        const CHMOD = 1 << 4;
    }
}

impl Action {
    /// Returns `true` if the affected entry no longer exists at this path.
    ///
    /// Requests for such events skip the stat: there is nothing left to
    /// inspect.
    #[inline]
    #[must_use]
    pub const fn entry_is_gone(self) -> bool {
        self.intersects(Self::REMOVE.union(Self::RENAME))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, flag) in [
            ("CREATE", Self::CREATE),
            ("WRITE", Self::WRITE),
            ("REMOVE", Self::REMOVE),
            ("RENAME", Self::RENAME),
            ("CHMOD", Self::CHMOD),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

/// A single enriched filesystem-change event.
///
/// Constructed by the server's request builder and delivered to one handler.
/// Stat-derived fields (`is_dir`, `size`, `mode`, the stat portion of
/// `last_modified`) are absent when the action indicates the entry is gone.
///
/// # Invariants
///
/// - `path` is non-empty and absolute.
/// - `action` is never empty.
/// - `is_dir` implies an empty `mimetype`.
///
/// # Examples
///
/// ```
/// use fsev_core::{Action, MimeDescriptor, Request};
/// use camino::Utf8PathBuf;
///
/// let request = Request::builder(Utf8PathBuf::from("/tmp/clip.mp4"), Action::CREATE)
///     .size(1024)
///     .mimetype(MimeDescriptor::new("video/mp4", ".mp4"))
///     .hostname("media-box")
///     .build();
///
/// assert_eq!(request.path.as_str(), "/tmp/clip.mp4");
/// assert!(request.action.contains(Action::CREATE));
/// assert_eq!(request.mimetype.extension(), ".mp4");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// Absolute path of the affected entry.
    pub path: Utf8PathBuf,

    /// The operations reported by the source event.
    pub action: Action,

    /// Whether the entry is a directory. `false` when the stat was skipped.
    pub is_dir: bool,

    /// Entry size in bytes. `0` when the stat was skipped.
    pub size: u64,

    /// Unix permission bits, when available on the platform.
    pub mode: Option<u32>,

    /// Detected media type. Empty for directories and gone entries.
    pub mimetype: MimeDescriptor,

    /// Stat mtime, or the event's wall-clock time when the stat was skipped.
    pub last_modified: SystemTime,

    /// Wall-clock time at which this request was constructed.
    pub date: SystemTime,

    /// Host identity at construction time.
    pub hostname: String,

    /// Optional per-request handler deadline.
    pub timeout: Option<Duration>,
}

impl Request {
    /// Starts building a request for `path` and `action`.
    #[must_use]
    pub fn builder(path: Utf8PathBuf, action: Action) -> RequestBuilder {
        RequestBuilder {
            path,
            action,
            is_dir: false,
            size: 0,
            mode: None,
            mimetype: MimeDescriptor::empty(),
            last_modified: None,
            hostname: String::new(),
            timeout: None,
        }
    }

    /// Returns the file extension of the request path, if any.
    #[inline]
    #[must_use]
    pub fn path_extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the final path component, if any.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// Builder for [`Request`].
///
/// Fields not supplied keep the stat-less defaults described on [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    path: Utf8PathBuf,
    action: Action,
    is_dir: bool,
    size: u64,
    mode: Option<u32>,
    mimetype: MimeDescriptor,
    last_modified: Option<SystemTime>,
    hostname: String,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    /// Marks the entry as a directory.
    #[must_use]
    pub const fn dir(mut self, is_dir: bool) -> Self {
        self.is_dir = is_dir;
        self
    }

    /// Sets the entry size in bytes.
    #[must_use]
    pub const fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Sets the Unix permission bits.
    #[must_use]
    pub const fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the detected media type.
    #[must_use]
    pub fn mimetype(mut self, mimetype: MimeDescriptor) -> Self {
        self.mimetype = mimetype;
        self
    }

    /// Sets the stat mtime.
    #[must_use]
    pub const fn last_modified(mut self, mtime: SystemTime) -> Self {
        self.last_modified = Some(mtime);
        self
    }

    /// Sets the host identity.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Sets the per-request handler deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Finalizes the request, stamping the construction time.
    #[must_use]
    pub fn build(self) -> Request {
        let now = SystemTime::now();
        Request {
            path: self.path,
            action: self.action,
            is_dir: self.is_dir,
            size: self.size,
            mode: self.mode,
            mimetype: self.mimetype,
            last_modified: self.last_modified.unwrap_or(now),
            date: now,
            hostname: self.hostname,
            timeout: self.timeout,
        }
    }
}

/// Formats a request the way the logging middleware prints it.
impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({} bytes, {})",
            self.action,
            self.path,
            self.size,
            if self.mimetype.is_empty() {
                "no media type"
            } else {
                self.mimetype.mime()
            }
        )
    }
}
