use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{is_supported_ext, IMG_EXTS};

/// Locate the image belonging to `base` inside `images_dir`.
///
/// A filename hint carried by the annotation takes precedence: when the
/// hint has an extension and that exact file exists it is returned
/// immediately; a hint without an extension is probed like a base
/// identity. When the hint resolves nothing, the base identity itself is
/// probed. `None` means the artifact should be skipped, never treated as a
/// fatal error.
pub fn resolve_image(images_dir: &Path, base: &str, hint: Option<&str>) -> Option<PathBuf> {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        // hints may carry directory components, only the file name matters
        if let Some(name) = Path::new(hint).file_name().and_then(|n| n.to_str()) {
            if Path::new(name).extension().is_some() {
                let candidate = images_dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            } else if let Some(found) = find_image_file(images_dir, name) {
                return Some(found);
            }
        }
    }
    find_image_file(images_dir, base)
}

/// Probe the fixed extension list against `base`, then fall back to a
/// case-insensitive stem scan restricted to supported extensions.
pub fn find_image_file(images_dir: &Path, base: &str) -> Option<PathBuf> {
    for ext in IMG_EXTS {
        let candidate = images_dir.join(format!("{}.{}", base, ext));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let entries = fs::read_dir(images_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str());
        let ext = path.extension().and_then(|s| s.to_str());
        if let (Some(stem), Some(ext)) = (stem, ext) {
            if stem.eq_ignore_ascii_case(base) && is_supported_ext(ext) {
                return Some(path);
            }
        }
    }
    None
}
