//! Path utilities shared by the server and the router.
//!
//! Root paths and route patterns both accept a leading `~`, expanded against
//! the user's home directory. Expansion is idempotent: an already-absolute
//! path comes back unchanged.

use camino::{Utf8Path, Utf8PathBuf};

/// Errors that can occur while normalizing a user-supplied path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The home directory could not be determined for tilde expansion.
    #[error("cannot determine the user home directory")]
    HomeDirUnavailable,

    /// A resolved path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

/// Expands a leading `~` against the user's home directory.
///
/// Strings without a leading `~` are returned unchanged, which makes the
/// expansion idempotent on absolute paths. Both `~` alone and `~/rest` are
/// supported; `~other-user` forms are not and come back untouched.
///
/// # Errors
///
/// Returns [`PathError::HomeDirUnavailable`] if the home directory cannot be
/// resolved, and [`PathError::NonUtf8Path`] if it is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use fsev_core::path::expand_user;
///
/// let absolute = expand_user("/var/log").unwrap();
/// assert_eq!(absolute, "/var/log");
///
/// let expanded = expand_user("~/Downloads").unwrap();
/// assert!(!expanded.as_str().contains('~'));
/// ```
pub fn expand_user(path: &str) -> Result<Utf8PathBuf, PathError> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(Utf8PathBuf::from(path));
    };

    // "~user" expansion is out of scope, only "~" and "~/..." are handled.
    if !rest.is_empty() && !rest.starts_with('/') {
        return Ok(Utf8PathBuf::from(path));
    }

    let home = dirs::home_dir().ok_or(PathError::HomeDirUnavailable)?;
    let home = Utf8PathBuf::from_path_buf(home).map_err(PathError::NonUtf8Path)?;

    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}

/// Returns the current working directory as a UTF-8 path.
///
/// # Errors
///
/// Returns an I/O error if the working directory cannot be read or is not
/// valid UTF-8.
pub fn current_dir_utf8() -> Result<Utf8PathBuf, std::io::Error> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|p| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("current directory is not valid UTF-8: {}", p.display()),
        )
    })
}

/// Returns `true` if the pattern anchors at the filesystem root.
///
/// Used by the routing multiplexer to reject relative patterns after tilde
/// expansion.
#[inline]
#[must_use]
pub fn is_absolute_pattern(pattern: &str) -> bool {
    Utf8Path::new(pattern).is_absolute()
}
