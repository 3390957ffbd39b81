use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::augment::DatasetPaths;
use crate::error::{PrepError, Result};
use crate::io::{create_clean_directory, create_progress_bar, read_class_index};
use crate::remap::CLASS_INDEX_FILE;
use crate::types::is_supported_ext;

/// Split proportions and shuffle seed.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub val_size: f32,
    pub test_size: f32,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct SplitSummary {
    pub train: usize,
    pub val: usize,
    pub test: usize,
    pub manifest: PathBuf,
}

/// Split a dataset's image/txt pairs into train/val/test subsets and write
/// the training manifest.
///
/// Aborts before anything is copied when an image lacks its YOLO txt or
/// the classification index is unusable. The shuffle runs over the sorted
/// image list with a seeded generator, so a fixed seed reproduces the
/// exact split.
pub fn split_dataset(
    dataset_root: &Path,
    dataset_name: &str,
    output_dir: &Path,
    opts: &SplitOptions,
) -> Result<SplitSummary> {
    let dataset = DatasetPaths::new(dataset_root, dataset_name)?;
    let class_names = read_class_index(&dataset.labels_dir.join(CLASS_INDEX_FILE))?;

    let mut images = list_images(&dataset.images_dir)?;
    images.sort();

    // every image must have its txt before a single file is copied
    let missing: Vec<String> = images
        .iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let txt = dataset.labels_dir.join(format!("{}.txt", stem));
            if txt.is_file() {
                None
            } else {
                Some(format!("{}.txt", stem))
            }
        })
        .collect();
    if !missing.is_empty() {
        return Err(PrepError::Config(format!(
            "missing YOLO txt label(s): {}",
            missing.join(", ")
        )));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    images.shuffle(&mut rng);
    let test_len = ((images.len() as f32 * opts.test_size).ceil() as usize).min(images.len());
    let (test_set, rest) = images.split_at(test_len);
    let val_len = ((images.len() as f32 * opts.val_size).ceil() as usize).min(rest.len());
    let (val_set, train_set) = rest.split_at(val_len);

    let with_test = opts.test_size > 0.0;
    setup_split_directories(output_dir, with_test)?;
    copy_subset(&dataset, train_set, output_dir, "train");
    copy_subset(&dataset, val_set, output_dir, "val");
    if with_test {
        copy_subset(&dataset, test_set, output_dir, "test");
    }

    let manifest = write_manifest(output_dir, dataset_name, &class_names, with_test)?;
    info!(
        "Dataset split complete: train={} val={} test={} -> {}",
        train_set.len(),
        val_set.len(),
        test_set.len(),
        output_dir.display()
    );
    Ok(SplitSummary {
        train: train_set.len(),
        val: val_set.len(),
        test: test_set.len(),
        manifest,
    })
}

/// All supported raster files directly under `images_dir`.
fn list_images(images_dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs::read_dir(images_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(is_supported_ext)
        })
        .collect())
}

/// Set up the directory structure for the split dataset output
fn setup_split_directories(output_dir: &Path, with_test: bool) -> Result<()> {
    let mut subsets = vec!["train", "val"];
    if with_test {
        subsets.push("test");
    }
    for subset in subsets {
        create_clean_directory(&output_dir.join("images").join(subset))?;
        create_clean_directory(&output_dir.join("labels").join(subset))?;
    }
    Ok(())
}

/// Copy one subset's image/txt pairs in parallel. Individual copy failures
/// are logged and counted; the sweep continues.
fn copy_subset(dataset: &DatasetPaths, subset: &[PathBuf], output_dir: &Path, name: &str) {
    if subset.is_empty() {
        return;
    }
    let pb = create_progress_bar(subset.len() as u64, name);
    let failures: usize = subset
        .par_iter()
        .map(|img_path| {
            let result = copy_pair(dataset, img_path, output_dir, name);
            pb.inc(1);
            match result {
                Ok(()) => 0,
                Err(e) => {
                    error!("failed to copy {}: {}", img_path.display(), e);
                    1
                }
            }
        })
        .sum();
    pb.finish_with_message(format!("{} copy complete", name));
    if failures > 0 {
        warn!("{} file pair(s) failed to copy into {}", failures, name);
    }
}

fn copy_pair(
    dataset: &DatasetPaths,
    img_path: &Path,
    output_dir: &Path,
    subset: &str,
) -> Result<()> {
    let file_name = img_path.file_name().ok_or_else(|| PrepError::Decode {
        path: img_path.to_path_buf(),
        reason: "no file name".to_string(),
    })?;
    let stem = img_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PrepError::Decode {
            path: img_path.to_path_buf(),
            reason: "no usable stem".to_string(),
        })?;

    fs::copy(
        img_path,
        output_dir.join("images").join(subset).join(file_name),
    )?;
    fs::copy(
        dataset.labels_dir.join(format!("{}.txt", stem)),
        output_dir
            .join("labels")
            .join(subset)
            .join(format!("{}.txt", stem)),
    )?;
    Ok(())
}

/// Write the dataset manifest the external training framework consumes:
/// class count, ordered class names and relative split paths.
fn write_manifest(
    output_dir: &Path,
    dataset_name: &str,
    class_names: &[String],
    with_test: bool,
) -> Result<PathBuf> {
    let manifest_path = output_dir.join("dataset.yaml");
    let mut writer = BufWriter::new(File::create(&manifest_path)?);

    let mut content = format!(
        "path: {}\ntrain: images/train\nval: images/val\n",
        dataset_name
    );
    if with_test {
        content.push_str("test: images/test\n");
    } else {
        content.push_str("test:\n");
    }
    content.push_str(&format!("\nnc: {}\nnames:\n", class_names.len()));
    for (id, name) in class_names.iter().enumerate() {
        content.push_str(&format!("  {}: {}\n", id, name));
    }
    writer.write_all(content.as_bytes())?;
    Ok(manifest_path)
}
