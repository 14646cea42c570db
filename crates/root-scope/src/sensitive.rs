//! Denylist of file types that are never handed out, even inside an allowed root.

use std::collections::BTreeSet;
use std::path::Path;

/// File types denied by default: keys, certificates, shadow files and env files.
pub const DEFAULT_SENSITIVE_EXTENSIONS: &[&str] = &[".pem", ".key", ".shadow", ".env", ".id_rsa"];

/// A normalized, case-insensitive set of sensitive extensions.
///
/// Entries are stored lowercase with a leading dot. A path matches when its
/// extension is listed, or when it is a dotfile whose whole name is listed
/// (`.env`). Names without a dot (`env`, `shadow`) never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveExtensions {
    extensions: BTreeSet<String>,
}

impl Default for SensitiveExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_EXTENSIONS)
    }
}

impl SensitiveExtensions {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = entries
            .into_iter()
            .filter_map(|entry| normalize(entry.as_ref()))
            .collect();
        Self { extensions }
    }

    /// Parse a comma-separated list such as `".pem, key,.env"`.
    pub fn parse_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// The listed extension that `path` matches, if any.
    pub fn matching(&self, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_string_lossy().to_lowercase();

        if let Some(ext) = path.extension() {
            let dotted = format!(".{}", ext.to_string_lossy().to_lowercase());
            if self.extensions.contains(&dotted) {
                return Some(dotted);
            }
        }

        // `.env` has no extension as far as `Path` is concerned.
        if file_name.starts_with('.') {
            return self.extensions.get(&file_name).cloned();
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

fn normalize(entry: &str) -> Option<String> {
    let trimmed = entry.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_lowercase()))
    }
}
