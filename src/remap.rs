use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};
use crate::io::{list_label_files, read_class_lines};

pub const CLASS_INDEX_FILE: &str = "classification.txt";

/// Old-id to new-id translation table for YOLO class ids.
#[derive(Debug, Clone, Default)]
pub struct ClassRemap {
    mapping: BTreeMap<usize, usize>,
}

impl ClassRemap {
    /// Parse `old:new` entries, e.g. `["2:0", "3:1"]`.
    pub fn parse(entries: &[String]) -> Result<Self> {
        let mut mapping = BTreeMap::new();
        for entry in entries {
            let (old, new) = entry.split_once(':').ok_or_else(|| {
                PrepError::Config(format!("invalid mapping entry `{}`, expected old:new", entry))
            })?;
            let old: usize = old.trim().parse().map_err(|_| {
                PrepError::Config(format!("invalid class id `{}` in mapping entry", old))
            })?;
            let new: usize = new.trim().parse().map_err(|_| {
                PrepError::Config(format!("invalid class id `{}` in mapping entry", new))
            })?;
            mapping.insert(old, new);
        }
        if mapping.is_empty() {
            return Err(PrepError::Config("class mapping is empty".to_string()));
        }
        Ok(Self { mapping })
    }

    pub fn from_pairs(pairs: &[(usize, usize)]) -> Result<Self> {
        let entries: Vec<String> = pairs.iter().map(|(o, n)| format!("{}:{}", o, n)).collect();
        Self::parse(&entries)
    }

    pub fn get(&self, old: usize) -> Option<usize> {
        self.mapping.get(&old).copied()
    }

    /// New class list derived from the raw index lines, ordered by new id.
    ///
    /// Old ids index the file's line positions directly: blank and
    /// `__background__` lines occupy their slots but are never kept, so
    /// an index written with a reserved background line at position 0
    /// resolves `1 -> first real class` the way the labels expect. A
    /// mapping that keeps nothing from the index is a configuration
    /// error.
    pub fn remap_class_names(&self, lines: &[String]) -> Result<Vec<String>> {
        let max_new = self.mapping.values().copied().max().unwrap_or(0);
        let mut slots: Vec<Option<String>> = vec![None; max_new + 1];
        for (&old, &new) in &self.mapping {
            if let Some(name) = lines.get(old).map(|line| line.trim()) {
                if !name.is_empty() && !name.starts_with("__background__") {
                    slots[new] = Some(name.to_string());
                }
            }
        }
        let kept: Vec<String> = slots.into_iter().flatten().collect();
        if kept.is_empty() {
            return Err(PrepError::Config(
                "class mapping keeps no classes from the classification index".to_string(),
            ));
        }
        Ok(kept)
    }
}

/// Counters for one remap run.
#[derive(Debug, Default, Clone)]
pub struct RemapStats {
    pub total_files: usize,
    pub processed_files: usize,
    pub skipped_files: usize,
    pub total_annotations: usize,
    pub converted_annotations: usize,
    pub dropped_annotations: usize,
}

impl RemapStats {
    pub fn log(&self) {
        info!("=== Remap Summary ===");
        info!("Total label files: {}", self.total_files);
        info!("Processed: {}", self.processed_files);
        info!("Skipped files: {}", self.skipped_files);
        info!("Total annotations: {}", self.total_annotations);
        info!("Converted annotations: {}", self.converted_annotations);
        if self.dropped_annotations > 0 {
            warn!(
                "Dropped {} annotation(s) whose class id has no mapping",
                self.dropped_annotations
            );
        }
    }
}

/// Rewrite one label file's worth of lines.
///
/// Lines whose leading class id is in the table get the new id, remaining
/// fields preserved verbatim. Lines whose class id has no mapping are
/// dropped from the output; that curation policy is deliberate and
/// reported through the returned counts. Returns the rewritten content and
/// `(seen, converted, dropped)`.
pub fn remap_lines(content: &str, map: &ClassRemap) -> (String, usize, usize, usize) {
    let mut out = String::new();
    let (mut seen, mut converted, mut dropped) = (0usize, 0usize, 0usize);
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else { continue };
        let Ok(old_id) = head.parse::<usize>() else {
            warn!("unparsable label line skipped: {}", line);
            continue;
        };
        seen += 1;
        match map.get(old_id) {
            Some(new_id) => {
                out.push_str(&new_id.to_string());
                for field in parts {
                    out.push(' ');
                    out.push_str(field);
                }
                out.push('\n');
                converted += 1;
            }
            None => dropped += 1,
        }
    }
    (out, seen, converted, dropped)
}

/// Remap every YOLO label under `labels_dir` in place and rewrite the
/// classification index to the post-remap class list.
///
/// The index and mapping are validated before anything is written. With
/// `backup` set the whole labels directory is copied aside first; an
/// existing backup directory aborts the run so a known-good backup is
/// never overwritten.
pub fn remap_dataset(labels_dir: &Path, map: &ClassRemap, backup: bool) -> Result<RemapStats> {
    let index_path = labels_dir.join(CLASS_INDEX_FILE);
    let lines = read_class_lines(&index_path)?;
    let new_names = map.remap_class_names(&lines)?;

    if backup {
        let dir_name = labels_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("labels");
        let backup_dir = labels_dir.with_file_name(format!("{}_backup", dir_name));
        if backup_dir.exists() {
            return Err(PrepError::Config(format!(
                "backup directory already exists: {}",
                backup_dir.display()
            )));
        }
        copy_dir_files(labels_dir, &backup_dir)?;
        info!("Backed up labels to {}", backup_dir.display());
    }

    // index first, so the id->name binding always matches the rewritten labels
    let mut index_content = String::new();
    for name in &new_names {
        index_content.push_str(name);
        index_content.push('\n');
    }
    fs::write(&index_path, index_content)?;
    info!(
        "Rewrote {} with {} class(es)",
        index_path.display(),
        new_names.len()
    );

    let txt_files: Vec<PathBuf> = list_label_files(labels_dir)?
        .into_iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(CLASS_INDEX_FILE))
        .collect();

    let mut stats = RemapStats {
        total_files: txt_files.len(),
        ..RemapStats::default()
    };
    for path in &txt_files {
        match remap_file(path, map) {
            Ok((seen, converted, dropped)) => {
                stats.processed_files += 1;
                stats.total_annotations += seen;
                stats.converted_annotations += converted;
                stats.dropped_annotations += dropped;
                if dropped > 0 {
                    info!(
                        "{}: dropped {} annotation(s) with unmapped class ids",
                        path.display(),
                        dropped
                    );
                }
            }
            Err(e) => {
                stats.skipped_files += 1;
                warn!("failed to remap {}: {}", path.display(), e);
            }
        }
    }
    stats.log();
    Ok(stats)
}

fn remap_file(path: &Path, map: &ClassRemap) -> Result<(usize, usize, usize)> {
    let content = fs::read_to_string(path)?;
    let (rewritten, seen, converted, dropped) = remap_lines(&content, map);
    fs::write(path, rewritten)?;
    Ok((seen, converted, dropped))
}

fn copy_dir_files(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            fs::copy(&path, dst.join(entry.file_name()))?;
        }
    }
    Ok(())
}
