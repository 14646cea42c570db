//! Allowed root directories and path canonicalization.
//!
//! Every path that takes part in an authorization decision goes through
//! [`canonicalize`] first: `~` is expanded, relative paths are anchored at the
//! process working directory and symlinks are resolved, so containment is always
//! tested against the real location on disk.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Symlink hops followed while resolving a path that does not exist yet.
const MAX_SYMLINK_HOPS: usize = 40;

/// Errors raised while building or mutating the set of allowed roots.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Path '{}' does not exist", .0.display())]
    DoesNotExist(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Root '{}' not found in allowed roots", .0.display())]
    NotFound(PathBuf),

    #[error("No valid directories provided")]
    Empty,
}

/// Where a root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootSource {
    /// Server configuration, command line or an administrative tool.
    Static,
    /// Asserted by the connected client for a single request.
    Client,
}

impl RootSource {
    /// Label used when listing roots to a caller.
    pub fn label(&self) -> &'static str {
        match self {
            RootSource::Static => "Server",
            RootSource::Client => "Client",
        }
    }
}

/// A canonical, absolute directory that bounds filesystem access.
///
/// Equality and hashing only consider the canonical path, so the same directory
/// asserted by the client and configured on the server is one root.
#[derive(Debug, Clone)]
pub struct Root {
    path: PathBuf,
    source: RootSource,
}

impl Root {
    /// Canonicalize `path` and check that it is an existing directory.
    pub fn from_directory(path: impl AsRef<Path>, source: RootSource) -> Result<Self, RootError> {
        let raw = path.as_ref();
        if raw.as_os_str().is_empty() {
            return Err(RootError::InvalidPath {
                path: String::new(),
                reason: "path is empty".to_string(),
            });
        }

        let expanded = expand_tilde(raw);
        let path = std::fs::canonicalize(&expanded).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RootError::DoesNotExist(expanded.clone()),
            _ => RootError::InvalidPath {
                path: expanded.display().to_string(),
                reason: e.to_string(),
            },
        })?;

        if !path.is_dir() {
            return Err(RootError::NotADirectory(path));
        }

        Ok(Self { path, source })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> RootSource {
        self.source
    }

    /// True if `candidate` is this root or lies beneath it.
    ///
    /// Comparison is component-wise: `/data` does not contain `/data2/file`.
    /// `candidate` must already be canonical.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }
}

impl PartialEq for Root {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Root {}

impl std::hash::Hash for Root {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Expand a leading `~` component to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == OsStr::new("~") => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Resolve `path` to an absolute path with `~`, `.`, `..` and symlinks resolved.
///
/// Unlike [`std::fs::canonicalize`] the target does not have to exist: the deepest
/// existing ancestor is resolved on disk and the missing tail is appended
/// lexically. A tail below a regular file is missing too. A dangling symlink is
/// followed to where it points.
pub fn canonicalize(path: &Path) -> io::Result<PathBuf> {
    let expanded = expand_tilde(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    match std::fs::canonicalize(&absolute) {
        Ok(resolved) => Ok(resolved),
        Err(e) if is_missing(&e) => resolve_missing(&absolute, 0),
        Err(e) => Err(e),
    }
}

/// `ENOENT`, or `ENOTDIR` when a path continues below a regular file.
fn is_missing(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory)
}

/// Walk `absolute` component by component, resolving whatever exists.
fn resolve_missing(absolute: &Path, hops: usize) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            // `resolved` never contains a symlink, so popping is exact.
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match std::fs::canonicalize(&resolved) {
                    Ok(real) => resolved = real,
                    Err(e) if is_missing(&e) => {
                        if let Some(target) = dangling_link_target(&resolved)? {
                            if hops >= MAX_SYMLINK_HOPS {
                                return Err(io::Error::other("too many levels of symbolic links"));
                            }
                            resolved = resolve_missing(&target, hops + 1)?;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(resolved)
}

/// If `path` is a symlink whose target is missing, return the absolute target.
fn dangling_link_target(path: &Path) -> io::Result<Option<PathBuf>> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = std::fs::read_link(path)?;
            let absolute = match path.parent() {
                Some(parent) if target.is_relative() => parent.join(target),
                _ => target,
            };
            Ok(Some(absolute))
        }
        Ok(_) => Ok(None),
        Err(e) if is_missing(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Convert a client-supplied root URI to a filesystem path.
///
/// `file://` URIs are percent-decoded; anything that is not a `file` URI is
/// treated as a plain path.
pub fn uri_to_path(uri: &str) -> Result<PathBuf, RootError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(RootError::InvalidPath {
            path: uri.to_string(),
            reason: "URI is empty".to_string(),
        });
    }

    match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "file" => {
            url.to_file_path().map_err(|()| RootError::InvalidPath {
                path: uri.to_string(),
                reason: "not a local file URI".to_string(),
            })
        }
        _ => Ok(PathBuf::from(trimmed)),
    }
}
