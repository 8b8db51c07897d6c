// Path guard: every client-supplied path must resolve inside the safe root.
//
// The root is canonicalized once at construction. Requested paths are
// canonicalized when they exist; missing paths are normalized lexically and
// their deepest existing ancestor canonicalized, so a missing file inside the
// root is reported as missing rather than as a traversal attempt.
//
// The containment check is a byte prefix match on the root *plus one
// separator*. Matching on the bare root would let `/data` approve
// `/data-other/x`.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use crate::config::ConfigError;
use crate::error::ServiceError;

/// A path the guard accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedPath {
    /// Canonical location of the file, symlinks followed
    pub resolved: PathBuf,
    /// Last segment of the path as the client spelled it (after `.`/`..`
    /// folding), never the name of a symlink target
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
    /// Encoded bytes of the canonical root with a trailing separator
    boundary: Vec<u8>,
}

impl PathGuard {
    /// Build a guard for `safe_root`, which must exist and be a directory.
    pub fn new(safe_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let configured = safe_root.as_ref();
        let root = std::fs::canonicalize(configured).map_err(|source| {
            ConfigError::UnresolvableSafeRoot {
                path: configured.to_path_buf(),
                source,
            }
        })?;
        if !root.is_dir() {
            return Err(ConfigError::SafeRootNotDirectory(root));
        }

        let boundary = boundary_bytes(&root);
        Ok(Self { root, boundary })
    }

    /// Canonical safe root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Approve a requested path or reject it.
    ///
    /// Returns the resolved absolute path of an existing regular file inside
    /// the root, plus the requested basename. Nothing is opened.
    pub fn approve(&self, requested: &str) -> Result<ApprovedPath, ServiceError> {
        let resolved = resolve(Path::new(requested)).map_err(|e| {
            tracing::warn!("Could not resolve requested path: {}", e);
            ServiceError::InvalidPath
        })?;

        if !self.contains(&resolved) {
            tracing::warn!("Rejected path outside safe root");
            return Err(ServiceError::InvalidPath);
        }

        if !resolved.is_file() {
            tracing::debug!("Requested file does not exist: {}", resolved.display());
            return Err(ServiceError::NotFound);
        }

        Ok(ApprovedPath {
            file_name: requested_name(Path::new(requested)),
            resolved,
        })
    }

    /// True when `resolved` lies strictly below the root.
    pub fn contains(&self, resolved: &Path) -> bool {
        let candidate = resolved.as_os_str().as_encoded_bytes();
        candidate.len() > self.boundary.len() && candidate.starts_with(&self.boundary)
    }
}

/// Root bytes followed by exactly one separator.
///
/// A root that already ends with a separator (`/`) is used as-is, otherwise
/// `/` would become `//` and approve nothing.
fn boundary_bytes(root: &Path) -> Vec<u8> {
    let mut bytes = root.as_os_str().as_encoded_bytes().to_vec();
    let mut separator = [0u8; 4];
    let separator = MAIN_SEPARATOR.encode_utf8(&mut separator).as_bytes();
    if !bytes.ends_with(separator) {
        bytes.extend_from_slice(separator);
    }
    bytes
}

/// Resolve `requested` to an absolute path with `.`, `..` and symlinks removed
/// as far as the filesystem allows.
fn resolve(requested: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(requested)?;

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return Ok(canonical);
    }

    // The path does not exist. Canonicalize the deepest ancestor that does and
    // re-attach the missing tail.
    let normalized = normalize_lexically(&absolute);
    let mut missing: Vec<OsString> = Vec::new();
    let mut existing = normalized.as_path();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            let mut resolved = canonical;
            for part in missing.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalized),
        }
    }
}

/// Basename of the requested path made absolute and folded lexically, so
/// `dir/sub/..` names `dir` and a symlink keeps its own name.
fn requested_name(requested: &Path) -> String {
    let absolute = std::path::absolute(requested).unwrap_or_else(|_| requested.to_path_buf());
    normalize_lexically(&absolute)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Drop `.` segments and fold `..` into its parent without touching the disk.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
