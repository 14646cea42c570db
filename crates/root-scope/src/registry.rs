//! Registry of statically and administratively configured allowed roots.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::root::{Root, RootError, RootSource};

/// The server-owned set of allowed roots.
///
/// Constructed once at startup and shared by handle with the authorizer and the
/// administrative tools. Mutations are serialized behind a write lock; readers
/// take a copy with [`RootRegistry::snapshot`] and never observe a partial update.
/// Client-asserted roots never land here.
#[derive(Debug, Default)]
pub struct RootRegistry {
    roots: RwLock<Vec<Root>>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with `roots`, dropping duplicates.
    pub fn with_roots(roots: impl IntoIterator<Item = Root>) -> Self {
        Self {
            roots: RwLock::new(dedup(roots)),
        }
    }

    /// Copy of the current roots, in registration order.
    pub fn snapshot(&self) -> Vec<Root> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, root: &Root) -> bool {
        self.read().contains(root)
    }

    /// Add a root. Returns `false` if an equal root was already registered.
    pub fn add(&self, root: Root) -> bool {
        let mut roots = self.write();
        if roots.contains(&root) {
            return false;
        }
        tracing::info!("Added allowed root {}", root);
        roots.push(root);
        true
    }

    /// Remove a root, failing with [`RootError::NotFound`] if it is not registered.
    pub fn remove(&self, root: &Root) -> Result<(), RootError> {
        let mut roots = self.write();
        let before = roots.len();
        roots.retain(|r| r != root);
        if roots.len() == before {
            return Err(RootError::NotFound(root.path().to_path_buf()));
        }
        tracing::info!("Removed allowed root {}", root);
        Ok(())
    }

    /// Atomically swap the whole set.
    pub fn replace(&self, roots: impl IntoIterator<Item = Root>) {
        let next = dedup(roots);
        tracing::info!("Replaced allowed roots ({} directories)", next.len());
        *self.write() = next;
    }

    /// Validate `path` as an existing directory and add it.
    pub fn add_path(&self, path: impl AsRef<Path>) -> Result<(Root, bool), RootError> {
        let root = Root::from_directory(path, RootSource::Static)?;
        let added = self.add(root.clone());
        Ok((root, added))
    }

    /// Validate `path` as an existing directory and remove it.
    pub fn remove_path(&self, path: impl AsRef<Path>) -> Result<Root, RootError> {
        let root = Root::from_directory(path, RootSource::Static)?;
        self.remove(&root)?;
        Ok(root)
    }

    /// Validate every path, then replace the set.
    ///
    /// Nothing changes unless every entry is an existing directory and at least
    /// one is given. Returns the number of distinct roots now registered.
    pub fn replace_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<usize, RootError> {
        let roots = paths
            .iter()
            .map(|p| Root::from_directory(p, RootSource::Static))
            .collect::<Result<Vec<_>, _>>()?;

        if roots.is_empty() {
            return Err(RootError::Empty);
        }

        let next = dedup(roots);
        let count = next.len();
        *self.write() = next;
        tracing::info!("Updated allowed roots to {} directories", count);
        Ok(count)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Root>> {
        self.roots.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Root>> {
        self.roots.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn dedup(roots: impl IntoIterator<Item = Root>) -> Vec<Root> {
    let mut unique: Vec<Root> = Vec::new();
    for root in roots {
        if !unique.contains(&root) {
            unique.push(root);
        }
    }
    unique
}
