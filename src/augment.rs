use image::RgbImage;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::{BlurConfig, JitterConfig, ToolsConfig};
use crate::error::{PrepError, Result};
use crate::io::{copy_dataset, create_progress_bar, list_annotation_files, read_annotation};
use crate::resolve::resolve_image;
use crate::sample::{select_samples, SampleSet};
use crate::sync::{emit, variant_tag, EmitRequest, OutputLayout};
use crate::transform::{apply_jitter, gaussian_blur};
use crate::types::{Annotation, ToolSummary};

/// Resolved on-disk layout of one dataset.
pub struct DatasetPaths {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl DatasetPaths {
    /// Validate that `<root>/<name>` carries the expected `images/` and
    /// `labels/` subdirectories.
    pub fn new(root: &Path, name: &str) -> Result<Self> {
        let dataset = root.join(name);
        if !dataset.is_dir() {
            return Err(PrepError::Config(format!(
                "dataset folder not found: {}",
                dataset.display()
            )));
        }
        let images_dir = dataset.join("images");
        let labels_dir = dataset.join("labels");
        if !images_dir.is_dir() {
            return Err(PrepError::Config(format!(
                "no images folder found under {}",
                dataset.display()
            )));
        }
        if !labels_dir.is_dir() {
            return Err(PrepError::Config(format!(
                "no labels folder found under {}",
                dataset.display()
            )));
        }
        Ok(Self {
            root: dataset,
            images_dir,
            labels_dir,
        })
    }
}

/// Copy the source dataset into a fresh `<name>_augment` sibling and run
/// every enabled tool over the copy, in declared order. The source tree is
/// never written to; outputs land in the copy alongside the originals.
/// Per-artifact failures are skips, never aborts.
pub fn run_augmentation(
    dataset_root: &Path,
    dataset_name: &str,
    tools: &ToolsConfig,
) -> Result<Vec<ToolSummary>> {
    // validate the source layout before anything is copied
    DatasetPaths::new(dataset_root, dataset_name)?;
    let (aug_name, aug_path) = copy_dataset(dataset_root, dataset_name)?;
    info!("Created augmented dataset: {}", aug_path.display());

    let dataset = DatasetPaths::new(dataset_root, &aug_name)?;
    let mut summaries = Vec::new();

    if let Some(config) = tools.blur.as_ref().filter(|c| c.enabled) {
        info!(
            "Running blur on dataset {} (radius={})",
            aug_name, config.radius
        );
        summaries.push(run_blur(&dataset, config)?);
    }
    if let Some(config) = tools.color_jitter.as_ref().filter(|c| c.enabled) {
        info!(
            "Running color_jitter on dataset {} ({} variants)",
            aug_name,
            config.variants.len()
        );
        summaries.push(run_color_jitter(&dataset, config)?);
    }

    for summary in &summaries {
        summary.log();
    }
    info!("All selected augmentations finished.");
    Ok(summaries)
}

/// Blur sweep over the sampled annotations.
pub fn run_blur(dataset: &DatasetPaths, config: &BlurConfig) -> Result<ToolSummary> {
    let selected = selected_annotations(
        dataset,
        config.sample_ratio,
        config.sample_count,
        config.sample_seed,
    )?;
    let out = OutputLayout {
        images_dir: dataset.images_dir.clone(),
        labels_dir: dataset.labels_dir.clone(),
    };
    let tag = config.tag();

    let mut summary = ToolSummary::new("blur", dataset.root.clone());
    let pb = create_progress_bar(selected.len() as u64, "Blur");
    for json_path in &selected {
        summary.total += 1;
        if let Err(e) = blur_one(dataset, config, &tag, json_path, &out) {
            summary.skipped += 1;
            warn!("skipping {}: {}", json_path.display(), e);
        }
        pb.inc(1);
    }
    pb.finish_with_message("Blur complete");
    Ok(summary)
}

fn blur_one(
    dataset: &DatasetPaths,
    config: &BlurConfig,
    tag: &str,
    json_path: &Path,
    out: &OutputLayout,
) -> Result<()> {
    let (base, annotation) = load_artifact(json_path)?;
    let hint = image_hint(&annotation);
    let img_path = resolve_image(&dataset.images_dir, &base, hint.as_deref())
        .ok_or_else(|| PrepError::NotFound(base.clone()))?;
    let img = decode_image(&img_path)?;
    let blurred = gaussian_blur(&img, config.radius);

    let txt_src = dataset.labels_dir.join(format!("{}.txt", base));
    emit(
        EmitRequest {
            base: &base,
            src_image: &img_path,
            image: &blurred,
            annotation,
            tag,
            replace_imagedata: config.replace_imagedata,
            txt_src: Some(&txt_src),
        },
        out,
    )?;
    Ok(())
}

/// Color-jitter sweep: each sampled artifact gets ONE variant, drawn at
/// random from the tool's own generator.
pub fn run_color_jitter(dataset: &DatasetPaths, config: &JitterConfig) -> Result<ToolSummary> {
    let mut summary = ToolSummary::new("color_jitter", dataset.root.clone());
    if config.variants.is_empty() {
        info!("color_jitter has no variants configured; nothing to do");
        return Ok(summary);
    }

    let selected = selected_annotations(
        dataset,
        config.sample_ratio,
        config.sample_count,
        config.sample_seed,
    )?;
    let out = OutputLayout {
        images_dir: dataset.images_dir.clone(),
        labels_dir: dataset.labels_dir.clone(),
    };
    let mut rng = match config.sample_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = create_progress_bar(selected.len() as u64, "ColorJitter");
    for json_path in &selected {
        summary.total += 1;
        let Some(variant) = config.variants.choose(&mut rng) else {
            break;
        };
        if let Err(e) = jitter_one(dataset, config, variant, json_path, &out) {
            summary.skipped += 1;
            warn!("skipping {}: {}", json_path.display(), e);
        }
        pb.inc(1);
    }
    pb.finish_with_message("ColorJitter complete");
    Ok(summary)
}

fn jitter_one(
    dataset: &DatasetPaths,
    config: &JitterConfig,
    variant: &crate::config::JitterVariant,
    json_path: &Path,
    out: &OutputLayout,
) -> Result<()> {
    let (base, annotation) = load_artifact(json_path)?;
    let hint = image_hint(&annotation);
    let img_path = resolve_image(&dataset.images_dir, &base, hint.as_deref())
        .ok_or_else(|| PrepError::NotFound(base.clone()))?;
    let img = decode_image(&img_path)?;
    let enhanced = apply_jitter(&img, variant, config.continue_on_hue_error)?;
    let tag = variant_tag(variant);

    let txt_src = dataset.labels_dir.join(format!("{}.txt", base));
    emit(
        EmitRequest {
            base: &base,
            src_image: &img_path,
            image: &enhanced,
            annotation,
            tag: &tag,
            replace_imagedata: config.replace_imagedata,
            txt_src: Some(&txt_src),
        },
        out,
    )?;
    Ok(())
}

/// List, sample and return the annotation files a tool should process, in
/// sorted order.
fn selected_annotations(
    dataset: &DatasetPaths,
    ratio: Option<f32>,
    count: Option<usize>,
    seed: Option<u64>,
) -> Result<Vec<PathBuf>> {
    let all = list_annotation_files(&dataset.labels_dir)?;
    let stems: Vec<String> = all
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    match select_samples(&stems, ratio, count, seed) {
        SampleSet::All => Ok(all),
        SampleSet::Subset(chosen) => Ok(all
            .into_iter()
            .filter(|p| match p.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => chosen.binary_search_by(|c| c.as_str().cmp(stem)).is_ok(),
                None => false,
            })
            .collect()),
    }
}

fn load_artifact(json_path: &Path) -> Result<(String, Annotation)> {
    let annotation = read_annotation(json_path)?;
    let base = json_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| PrepError::Decode {
            path: json_path.to_path_buf(),
            reason: "annotation file has no usable stem".to_string(),
        })?;
    Ok((base, annotation))
}

/// First non-blank filename hint the annotation itself carries.
fn image_hint(annotation: &Annotation) -> Option<String> {
    for key in ["imagePath", "imageFilename", "image_name"] {
        if let Some(Value::String(s)) = annotation.get(key) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn decode_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| PrepError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(img.to_rgb8())
}
