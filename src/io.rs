use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};
use crate::types::Annotation;

/// Create a directory (and parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Safely create an output directory, replacing any previous contents.
pub fn create_clean_directory(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        log::warn!(
            "Directory {:?} already exists. Deleting and recreating it.",
            path
        );
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// All annotation JSON files under `labels_dir`, sorted by path so the
/// processing order never depends on filesystem iteration order.
pub fn list_annotation_files(labels_dir: &Path) -> Result<Vec<PathBuf>> {
    list_by_pattern(labels_dir, "*.json")
}

/// All YOLO txt label files under `labels_dir`, sorted by path.
pub fn list_label_files(labels_dir: &Path) -> Result<Vec<PathBuf>> {
    list_by_pattern(labels_dir, "*.txt")
}

fn list_by_pattern(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/{}", dir.display(), pattern);
    let mut files: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| PrepError::Config(format!("invalid glob pattern {}: {}", pattern, e)))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    Ok(files)
}

/// Read and parse a single annotation JSON from a file stream.
pub fn read_annotation(path: &Path) -> Result<Annotation> {
    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(PrepError::Decode {
            path: path.to_path_buf(),
            reason: "annotation root is not a JSON object".to_string(),
        }),
    }
}

/// Write an annotation JSON, pretty-printed.
pub fn write_annotation(path: &Path, annotation: &Annotation) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), annotation)?;
    Ok(())
}

/// Read the classification index verbatim: one entry per line, trimmed,
/// with blank and `__background__` lines kept at their positions. The
/// line number IS the class id, so placeholder lines must keep occupying
/// their slots when ids are resolved against the file.
pub fn read_class_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|_| PrepError::Config(format!("classification index not found: {}", path.display())))?;
    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

/// Read the classification index as a class list: one class name per
/// line, in file order. Blank lines and `__background__` entries are
/// ignored. A missing or empty index is a configuration error.
pub fn read_class_index(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|_| PrepError::Config(format!("classification index not found: {}", path.display())))?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("__background__"))
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(PrepError::Config(format!(
            "classification index is empty: {}",
            path.display()
        )));
    }
    Ok(names)
}

/// Copy a dataset's `images/` and `labels/` into a fresh `<name>_augment`
/// sibling and return its name and path. The destination name is made
/// unique so repeated runs never overwrite earlier outputs.
pub fn copy_dataset(root: &Path, name: &str) -> Result<(String, PathBuf)> {
    let mut candidate = format!("{}_augment", name);
    let mut i = 1;
    while root.join(&candidate).exists() {
        candidate = format!("{}_augment_{}", name, i);
        i += 1;
    }
    let dst = root.join(&candidate);

    for sub in ["images", "labels"] {
        let src_dir = root.join(name).join(sub);
        let dst_dir = dst.join(sub);
        fs::create_dir_all(&dst_dir)?;
        if src_dir.is_dir() {
            for entry in fs::read_dir(&src_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() {
                    fs::copy(&path, dst_dir.join(entry.file_name()))?;
                }
            }
        }
    }

    Ok((candidate, dst))
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .expect("valid progress template")
            .progress_chars("#>-"),
    );
    pb
}
