//! Path authorization against the effective scope.
//!
//! `validate` runs four steps and stops at the first failure:
//! 1. canonicalize (expand `~`, anchor relative paths, resolve `..` and symlinks)
//! 2. existence and kind, only when the request requires the path to exist
//! 3. containment in the effective scope, segment by segment
//! 4. sensitive-extension denylist, which overrides a successful containment check

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::registry::RootRegistry;
use crate::resolver::{ClientRoots, EffectiveScope, RootResolver};
use crate::root::canonicalize;
use crate::sensitive::SensitiveExtensions;

/// What kind of filesystem object a caller expects to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    File,
    Dir,
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedKind::File => write!(f, "file"),
            ExpectedKind::Dir => write!(f, "directory"),
        }
    }
}

impl FromStr for ExpectedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(ExpectedKind::File),
            "dir" | "directory" => Ok(ExpectedKind::Dir),
            other => Err(format!("Unknown path kind '{}', expected 'file' or 'dir'", other)),
        }
    }
}

/// One path check requested by a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Raw path as supplied by the caller.
    pub path: String,
    /// Only checked when `must_exist` is set.
    pub expected_kind: Option<ExpectedKind>,
    pub must_exist: bool,
}

impl AuthorizationRequest {
    pub fn new(
        path: impl Into<String>,
        expected_kind: Option<ExpectedKind>,
        must_exist: bool,
    ) -> Self {
        Self {
            path: path.into(),
            expected_kind,
            must_exist,
        }
    }

    /// A path that must already exist, e.g. the source of a read.
    pub fn existing(path: impl Into<String>, expected_kind: Option<ExpectedKind>) -> Self {
        Self::new(path, expected_kind, true)
    }

    /// A path that may not exist yet, e.g. the target of a write.
    pub fn target(path: impl Into<String>) -> Self {
        Self::new(path, None, false)
    }
}

/// Why a path was refused. Each variant is terminal for its request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("Invalid path syntax '{path}': {reason}")]
    InvalidSyntax { path: String, reason: String },

    #[error("Access denied: Path '{}' is not within allowed roots", .path.display())]
    OutsideAllowedRoots { path: PathBuf },

    #[error("Path '{}' does not exist", .path.display())]
    PathNotFound { path: PathBuf },

    #[error("Expected a {expected}, but '{}' is not one", .path.display())]
    WrongType { path: PathBuf, expected: ExpectedKind },

    #[error("Access denied: Access to sensitive file type '{extension}' is prohibited")]
    SensitiveExtension { path: PathBuf, extension: String },
}

/// Fieldless discriminant of [`Denial`], for callers that branch on kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialKind {
    InvalidSyntax,
    OutsideAllowedRoots,
    PathNotFound,
    WrongType,
    SensitiveExtension,
}

impl DenialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialKind::InvalidSyntax => "invalid_syntax",
            DenialKind::OutsideAllowedRoots => "outside_allowed_roots",
            DenialKind::PathNotFound => "path_not_found",
            DenialKind::WrongType => "wrong_type",
            DenialKind::SensitiveExtension => "sensitive_extension",
        }
    }
}

impl Denial {
    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::InvalidSyntax { .. } => DenialKind::InvalidSyntax,
            Denial::OutsideAllowedRoots { .. } => DenialKind::OutsideAllowedRoots,
            Denial::PathNotFound { .. } => DenialKind::PathNotFound,
            Denial::WrongType { .. } => DenialKind::WrongType,
            Denial::SensitiveExtension { .. } => DenialKind::SensitiveExtension,
        }
    }
}

/// Authorizes paths against the registry plus any client-asserted roots.
pub struct PathAuthorizer {
    registry: Arc<RootRegistry>,
    resolver: RootResolver,
    sensitive: SensitiveExtensions,
}

impl PathAuthorizer {
    pub fn new(
        registry: Arc<RootRegistry>,
        resolver: RootResolver,
        sensitive: SensitiveExtensions,
    ) -> Self {
        Self {
            registry,
            resolver,
            sensitive,
        }
    }

    pub fn registry(&self) -> &Arc<RootRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &RootResolver {
        &self.resolver
    }

    pub fn sensitive_extensions(&self) -> &SensitiveExtensions {
        &self.sensitive
    }

    /// Effective scope for one request.
    pub async fn scope(&self, client: Option<&dyn ClientRoots>) -> EffectiveScope {
        self.resolver.resolve(self.registry.snapshot(), client).await
    }

    /// Resolve the effective scope and authorize `request` against it.
    ///
    /// Returns the canonical path the caller may operate on.
    pub async fn validate(
        &self,
        request: &AuthorizationRequest,
        client: Option<&dyn ClientRoots>,
    ) -> Result<PathBuf, Denial> {
        let scope = self.scope(client).await;
        let result = self.authorize(request, &scope);
        if let Err(denial) = &result {
            tracing::debug!("Denied '{}': {}", request.path, denial);
        }
        result
    }

    /// Authorize `request` against an already resolved scope. Never suspends.
    pub fn authorize(
        &self,
        request: &AuthorizationRequest,
        scope: &EffectiveScope,
    ) -> Result<PathBuf, Denial> {
        let canonical = canonical_target(&request.path)?;

        if request.must_exist {
            check_existence(&canonical, request.expected_kind)?;
        }

        if !scope.contains(&canonical) {
            return Err(Denial::OutsideAllowedRoots { path: canonical });
        }

        if let Some(extension) = self.sensitive.matching(&canonical) {
            return Err(Denial::SensitiveExtension {
                path: canonical,
                extension,
            });
        }

        Ok(canonical)
    }
}

fn canonical_target(raw: &str) -> Result<PathBuf, Denial> {
    if raw.trim().is_empty() {
        return Err(Denial::InvalidSyntax {
            path: raw.to_string(),
            reason: "path is empty".to_string(),
        });
    }
    if raw.contains('\0') {
        return Err(Denial::InvalidSyntax {
            path: raw.escape_default().to_string(),
            reason: "path contains a NUL byte".to_string(),
        });
    }

    canonicalize(Path::new(raw)).map_err(|e| Denial::InvalidSyntax {
        path: raw.to_string(),
        reason: e.to_string(),
    })
}

fn check_existence(path: &Path, expected: Option<ExpectedKind>) -> Result<(), Denial> {
    let metadata = std::fs::metadata(path).map_err(|_| Denial::PathNotFound {
        path: path.to_path_buf(),
    })?;

    let matches = match expected {
        None => true,
        Some(ExpectedKind::File) => metadata.is_file(),
        Some(ExpectedKind::Dir) => metadata.is_dir(),
    };

    if matches {
        Ok(())
    } else {
        Err(Denial::WrongType {
            path: path.to_path_buf(),
            expected: expected.unwrap_or(ExpectedKind::File),
        })
    }
}
