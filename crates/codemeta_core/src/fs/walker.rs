//! Filesystem snapshot walker.
//!
//! # Responsibility
//! - Enumerate a project root into a tree shape and a flat file set.
//! - Collect unreadable entries as warnings instead of aborting.
//!
//! # Invariants
//! - Node 0 of the tree is always the root directory.
//! - Symlinks are never followed; a symlink is a leaf classified as a file.
//! - An unreadable directory is dropped together with its subtree.
//! - Sibling order is by file name, so identical trees walk identically.

use crate::model::path::{CanonicalPath, PathError};
use crate::task::CancelToken;
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

/// One node of the walked tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNode {
    pub name: String,
    pub path: CanonicalPath,
    pub is_dir: bool,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Arena of walked nodes; parent/child links are indices into `nodes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShape {
    pub nodes: Vec<ShapeNode>,
}

impl TreeShape {
    pub const ROOT: usize = 0;

    pub fn root(&self) -> &ShapeNode {
        &self.nodes[Self::ROOT]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Non-fatal walk problem for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkWarning {
    /// Entry could not be listed or inspected and was skipped.
    WalkEntryUnreadable { path: String, message: String },
}

impl Display for WalkWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WalkEntryUnreadable { path, message } => {
                write!(f, "skipped unreadable entry `{path}`: {message}")
            }
        }
    }
}

/// Fatal walk failure.
#[derive(Debug)]
pub enum WalkError {
    /// Root is missing, not a directory, or cannot be listed.
    RootUnreadable { root: String, message: String },
    /// Root path cannot be normalized.
    InvalidRoot(PathError),
    /// Cancel token fired mid-walk.
    Cancelled,
}

impl Display for WalkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootUnreadable { root, message } => {
                write!(f, "project root `{root}` is unreadable: {message}")
            }
            Self::InvalidRoot(err) => write!(f, "invalid project root: {err}"),
            Self::Cancelled => write!(f, "walk cancelled"),
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRoot(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of one walk.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: TreeShape,
    /// File (and symlink) paths only.
    pub files: BTreeSet<CanonicalPath>,
    pub warnings: Vec<WalkWarning>,
}

struct WalkedEntry {
    path: CanonicalPath,
    name: String,
    depth: usize,
    is_dir: bool,
}

/// Walks `root_dir` and returns its snapshot.
///
/// # Errors
/// - `RootUnreadable` when the root cannot be listed.
/// - `Cancelled` when `cancel` fires; no partial snapshot is returned.
pub fn walk_snapshot(root_dir: &Path, cancel: &CancelToken) -> Result<Snapshot, WalkError> {
    let started_at = Instant::now();
    let absolute = std::path::absolute(root_dir).map_err(|err| WalkError::RootUnreadable {
        root: root_dir.to_string_lossy().into_owned(),
        message: err.to_string(),
    })?;
    let root_dir = absolute.as_path();
    let root = CanonicalPath::from_path(root_dir).map_err(WalkError::InvalidRoot)?;
    ensure_root_readable(root_dir, &root)?;

    let mut entries = Vec::new();
    let mut pruned: Vec<CanonicalPath> = Vec::new();
    let mut warnings = Vec::new();

    let walker = WalkDir::new(root_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();
    for item in walker {
        if cancel.is_cancelled() {
            info!("event=walk module=fs status=cancelled entries={}", entries.len());
            return Err(WalkError::Cancelled);
        }

        match item {
            Ok(entry) => {
                let path = match CanonicalPath::from_path(entry.path()) {
                    Ok(path) => path,
                    Err(err) => {
                        warnings.push(WalkWarning::WalkEntryUnreadable {
                            path: entry.path().to_string_lossy().into_owned(),
                            message: err.to_string(),
                        });
                        continue;
                    }
                };
                entries.push(WalkedEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path,
                    depth: entry.depth(),
                    is_dir: entry.file_type().is_dir(),
                });
            }
            Err(err) => {
                let failed_path = err.path().map(Path::to_path_buf);
                let display = failed_path
                    .as_deref()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|| root.to_string());
                warnings.push(WalkWarning::WalkEntryUnreadable {
                    path: display,
                    message: err.to_string(),
                });
                if let Some(failed) = failed_path.and_then(|p| CanonicalPath::from_path(p).ok()) {
                    if failed != root {
                        pruned.push(failed);
                    }
                }
            }
        }
    }

    let tree = assemble_tree(&root, entries, &pruned);
    let files: BTreeSet<CanonicalPath> = tree
        .nodes
        .iter()
        .filter(|node| !node.is_dir)
        .map(|node| node.path.clone())
        .collect();

    if warnings.is_empty() {
        info!(
            "event=walk module=fs status=ok nodes={} files={} duration_ms={}",
            tree.len(),
            files.len(),
            started_at.elapsed().as_millis()
        );
    } else {
        warn!(
            "event=walk module=fs status=partial nodes={} files={} warnings={} duration_ms={}",
            tree.len(),
            files.len(),
            warnings.len(),
            started_at.elapsed().as_millis()
        );
    }

    Ok(Snapshot {
        tree,
        files,
        warnings,
    })
}

fn ensure_root_readable(root_dir: &Path, root: &CanonicalPath) -> Result<(), WalkError> {
    let unreadable = |message: String| WalkError::RootUnreadable {
        root: root.to_string(),
        message,
    };
    let metadata = std::fs::metadata(root_dir).map_err(|err| unreadable(err.to_string()))?;
    if !metadata.is_dir() {
        return Err(unreadable("not a directory".to_string()));
    }
    std::fs::read_dir(root_dir).map_err(|err| unreadable(err.to_string()))?;
    Ok(())
}

/// Builds the index arena from depth-first, parent-before-child entries.
fn assemble_tree(
    root: &CanonicalPath,
    entries: Vec<WalkedEntry>,
    pruned: &[CanonicalPath],
) -> TreeShape {
    let mut nodes = vec![ShapeNode {
        name: root.to_string(),
        path: root.clone(),
        is_dir: true,
        parent: None,
        children: Vec::new(),
    }];
    // stack[d] is the arena index of the open directory at depth d.
    let mut stack: Vec<usize> = vec![TreeShape::ROOT];

    for entry in entries {
        if entry.depth == 0 {
            continue;
        }
        if pruned.iter().any(|bad| entry.path.starts_with(bad)) {
            continue;
        }
        stack.truncate(entry.depth);
        let Some(&parent) = stack.last() else {
            continue;
        };

        let index = nodes.len();
        nodes.push(ShapeNode {
            name: entry.name,
            path: entry.path,
            is_dir: entry.is_dir,
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent].children.push(index);
        if entry.is_dir {
            stack.push(index);
        }
    }

    TreeShape { nodes }
}
