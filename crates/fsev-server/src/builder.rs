//! Enrichment of raw events into requests.
//!
//! The builder turns a [`RawEvent`] into the [`Request`] handed to handlers:
//! it stats the entry (unless the action says the entry is gone), detects
//! the media type, and stamps host identity and timestamps. Failures here
//! are reported to the error stream and the event is dropped; handlers only
//! ever see fully-formed requests.

use std::time::Duration;

use fsev_core::mime::detect_path;
use fsev_core::{MimeDescriptor, Request, ServeError};

use crate::notifier::RawEvent;

/// Builds the request for one raw event.
///
/// When the action contains REMOVE or RENAME the stat is skipped: the entry
/// no longer exists at this path, so the request carries the stat-less
/// defaults and `last_modified` falls back to construction time.
///
/// # Errors
///
/// Returns [`ServeError::Io`] when the stat or the content detection fails;
/// the caller publishes the error and drops the event.
pub(crate) fn build_request(
    raw: RawEvent,
    hostname: &str,
    timeout: Option<Duration>,
) -> Result<Request, ServeError> {
    let RawEvent { path, action } = raw;

    let metadata = if action.entry_is_gone() {
        None
    } else {
        Some(std::fs::metadata(path.as_std_path())?)
    };

    let mimetype = match &metadata {
        Some(meta) if !meta.is_dir() => detect_path(&path)?,
        _ => MimeDescriptor::empty(),
    };

    let mut builder = Request::builder(path, action)
        .mimetype(mimetype)
        .hostname(hostname);

    if let Some(meta) = &metadata {
        builder = builder.dir(meta.is_dir()).size(meta.len());
        if let Some(mode) = permission_bits(meta) {
            builder = builder.mode(mode);
        }
        if let Ok(mtime) = meta.modified() {
            builder = builder.last_modified(mtime);
        }
    }

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build())
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode())
}

#[cfg(not(unix))]
fn permission_bits(_meta: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use fsev_core::Action;
    use tempfile::TempDir;

    fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_owned()).expect("utf-8 temp path")
    }

    #[test]
    fn test_build_request_stats_existing_file() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let path = root.join("notes.md");
        std::fs::write(&path, b"# title\n\nbody\n").expect("write file");

        let raw = RawEvent {
            path: path.clone(),
            action: Action::CREATE,
        };
        let request = build_request(raw, "media-box", None).expect("build succeeds");

        assert_eq!(request.path, path);
        assert!(!request.is_dir);
        assert_eq!(request.size, 14);
        assert_eq!(request.hostname, "media-box");
        assert_eq!(request.mimetype.extension(), ".md");
        assert!(!request.action.is_empty());
        #[cfg(unix)]
        assert!(request.mode.is_some());
    }

    #[test]
    fn test_build_request_directory_has_empty_mime() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);

        let raw = RawEvent {
            path: root.clone(),
            action: Action::CREATE,
        };
        let request = build_request(raw, "media-box", None).expect("build succeeds");

        assert!(request.is_dir);
        assert!(request.mimetype.is_empty());
    }

    #[test]
    fn test_build_request_skips_stat_for_removed_entry() {
        let raw = RawEvent {
            path: Utf8PathBuf::from("/nonexistent/fsev-builder-test/gone.txt"),
            action: Action::REMOVE,
        };
        let request = build_request(raw, "media-box", None).expect("build succeeds");

        assert!(!request.is_dir);
        assert_eq!(request.size, 0);
        assert!(request.mode.is_none());
        assert!(request.mimetype.is_empty());
        assert_eq!(request.last_modified, request.date);
    }

    #[test]
    fn test_build_request_skips_stat_for_renamed_entry() {
        let raw = RawEvent {
            path: Utf8PathBuf::from("/nonexistent/fsev-builder-test/moved.txt"),
            action: Action::RENAME,
        };
        assert!(build_request(raw, "media-box", None).is_ok());
    }

    #[test]
    fn test_build_request_missing_file_is_error() {
        let raw = RawEvent {
            path: Utf8PathBuf::from("/nonexistent/fsev-builder-test/new.txt"),
            action: Action::CREATE,
        };
        let err = build_request(raw, "media-box", None).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_build_request_applies_timeout() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let path = root.join("clip.bin");
        std::fs::write(&path, b"\x00\x01").expect("write file");

        let raw = RawEvent {
            path,
            action: Action::CREATE,
        };
        let request =
            build_request(raw, "media-box", Some(Duration::from_secs(30))).expect("build");
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_build_request_uses_stat_mtime() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let path = root.join("old.txt");
        std::fs::write(&path, b"text").expect("write file");

        let raw = RawEvent {
            path: path.clone(),
            action: Action::WRITE,
        };
        let request = build_request(raw, "media-box", None).expect("build succeeds");

        let meta = std::fs::metadata(path.as_std_path()).expect("stat");
        assert_eq!(request.last_modified, meta.modified().expect("mtime"));
    }
}
