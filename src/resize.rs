use image::imageops::{self, FilterType};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};
use crate::io::{create_progress_bar, ensure_dir};
use crate::types::is_supported_ext;

#[derive(Debug, Default, Clone)]
pub struct ResizeStats {
    pub saved: usize,
    pub skipped: usize,
}

/// Center-crop every supported image in `input_dir` to its largest square
/// and scale it to `size`x`size`, keeping the original file name in
/// `output_dir`. Unreadable images are skipped with a warning.
pub fn resize_images(input_dir: &Path, output_dir: &Path, size: u32) -> Result<ResizeStats> {
    if size == 0 {
        return Err(PrepError::Config("resize size must be positive".to_string()));
    }
    ensure_dir(output_dir)?;

    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(is_supported_ext)
        })
        .collect();
    files.sort();

    let mut stats = ResizeStats::default();
    let pb = create_progress_bar(files.len() as u64, "Resize");
    for path in &files {
        match resize_one(path, output_dir, size) {
            Ok(()) => stats.saved += 1,
            Err(e) => {
                stats.skipped += 1;
                warn!("failed to resize {}: {}", path.display(), e);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Resize complete");

    info!(
        "Resized {} image(s) into {} ({} skipped)",
        stats.saved,
        output_dir.display(),
        stats.skipped
    );
    Ok(stats)
}

fn resize_one(path: &Path, output_dir: &Path, size: u32) -> Result<()> {
    let img = image::open(path)
        .map_err(|e| PrepError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .to_rgb8();

    let (width, height) = img.dimensions();
    let side = width.min(height);
    let left = (width - side) / 2;
    let top = (height - side) / 2;
    let cropped = imageops::crop_imm(&img, left, top, side, side).to_image();
    let resized = imageops::resize(&cropped, size, size, FilterType::Triangle);

    let file_name = path.file_name().ok_or_else(|| PrepError::Decode {
        path: path.to_path_buf(),
        reason: "no file name".to_string(),
    })?;
    resized.save(output_dir.join(file_name))?;
    Ok(())
}
