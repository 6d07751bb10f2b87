//! Path collection: expands command-line arguments into the image ring.
//!
//! A regular-file argument with an accepted extension is appended directly;
//! a directory argument is enumerated for qualifying entries, single level
//! by default. Enumeration order is whatever the OS reports, not sorted.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;
use crate::ring::{NodeHooks, NodeId, NodeView, Ring};

/// Default allow-list; matches the set of enabled decoders.
const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Ring of image paths as populated by [`collect_into_ring`].
pub type ImageRing = Ring<PathBuf, PathHooks>;

/// Options controlling how arguments are expanded.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Recurse into subdirectories instead of the single-level default.
    /// Hidden dot-directories below the root are skipped.
    pub recursive: bool,
    /// Optional override for allowed extensions (lowercase, without dot).
    pub exts: Option<Vec<String>>,
}

/// Ring behavior for path payloads: path equality, a node-and-links
/// diagnostic line, release logged at trace level.
pub struct PathHooks;

impl NodeHooks<PathBuf> for PathHooks {
    fn matches(&self, a: &PathBuf, b: &PathBuf) -> bool {
        a == b
    }

    fn describe(&self, node: NodeView<'_, PathBuf>) -> String {
        format!(
            "({}) data:'{}' prev:{} next:{}",
            node.id,
            node.data.display(),
            fmt_link(node.prev),
            fmt_link(node.next),
        )
    }

    fn dispose(&self, data: PathBuf) {
        tracing::trace!(path = %data.display(), "releasing path");
    }
}

fn fmt_link(link: Option<NodeId>) -> String {
    link.map_or_else(|| "(nil)".to_string(), |id| id.to_string())
}

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path, exts: Option<&[String]>) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            match exts {
                Some(list) => list.iter().any(|e| *e == ext),
                None => IMAGE_EXTS.contains(&ext.as_str()),
            }
        })
}

/// Expand `args` into `ring`, appending every qualifying path in
/// enumeration order. Returns the entry node of the populated ring, or
/// `None` when nothing qualified.
///
/// Unsupported files are skipped with a log line; a failed image load
/// later on is the viewer's concern and never mutates the ring.
///
/// # Errors
/// Returns [`Error::BadPath`] if an argument does not exist.
pub fn collect_into_ring(
    ring: &mut ImageRing,
    args: &[PathBuf],
    opts: &ScanOptions,
) -> Result<Option<NodeId>, Error> {
    let mut entry: Option<NodeId> = None;
    for arg in args {
        if !arg.exists() {
            return Err(Error::BadPath(arg.display().to_string()));
        }
        if arg.is_file() {
            if is_supported_image(arg, opts.exts.as_deref()) {
                debug!(path = %arg.display(), "file");
                entry = Some(push(ring, entry, arg.clone())?);
            } else {
                info!(path = %arg.display(), "ignoring unsupported file");
            }
            continue;
        }
        if !arg.is_dir() {
            warn!(path = %arg.display(), "unsupported file type; skipping");
            continue;
        }
        let mut walk = WalkDir::new(arg);
        if !opts.recursive {
            walk = walk.max_depth(1);
        }
        for found in walk.into_iter().filter_entry(|e| !should_skip_dir(e)) {
            let found = match found {
                Ok(found) => found,
                Err(err) => {
                    warn!(error = %err, "walk error; skipping entry");
                    continue;
                }
            };
            if !found.file_type().is_file() {
                continue;
            }
            let path = found.path();
            if !is_supported_image(path, opts.exts.as_deref()) {
                debug!(path = %path.display(), "ignoring file from dir");
                continue;
            }
            debug!(path = %path.display(), "file");
            entry = Some(push(ring, entry, path.to_path_buf())?);
        }
    }
    Ok(entry)
}

fn push(ring: &mut ImageRing, entry: Option<NodeId>, path: PathBuf) -> Result<NodeId, Error> {
    match entry {
        None => Ok(ring.create(path)),
        Some(e) => Ok(ring.append(e, path)?),
    }
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
