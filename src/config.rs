use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PrepError, Result};

/// Command-line surface, one subcommand per preparation stage.
#[derive(Parser, Debug)]
#[command(name = "segprep", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured augmentation tools over a copy of a dataset
    Augment {
        /// Root directory holding raw datasets
        #[arg(short = 'r', long = "dataset_root", default_value = "raw_datasets")]
        dataset_root: PathBuf,

        /// Dataset folder name under the root
        #[arg(short = 'd', long = "dataset_name")]
        dataset_name: String,

        /// Path to the JSON tool configuration
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
    },

    /// Remap class ids in YOLO label files and the classification index
    Remap {
        /// Directory containing the txt labels and classification.txt
        #[arg(short = 'l', long = "labels_dir")]
        labels_dir: PathBuf,

        /// Mapping entries as `old:new`, comma separated (e.g. `2:0,3:1`)
        #[arg(short = 'm', long = "map", value_delimiter = ',', required = true)]
        map: Vec<String>,

        /// Skip the labels directory backup
        #[arg(long = "no_backup")]
        no_backup: bool,
    },

    /// Center-crop and resize every image in a directory
    Resize {
        #[arg(short = 'i', long = "input_dir")]
        input_dir: PathBuf,

        #[arg(short = 'o', long = "output_dir")]
        output_dir: PathBuf,

        /// Square edge length in pixels
        #[arg(short = 's', long = "size", default_value_t = 416)]
        size: u32,
    },

    /// Split a dataset into train/val/test and emit the training manifest
    Split {
        #[arg(short = 'r', long = "dataset_root", default_value = "raw_datasets")]
        dataset_root: PathBuf,

        #[arg(short = 'd', long = "dataset_name")]
        dataset_name: String,

        #[arg(short = 'o', long = "output_dir")]
        output_dir: PathBuf,

        /// Proportion of the dataset to use for validation
        #[arg(long = "val_size", default_value_t = 0.2, value_parser = validate_size)]
        val_size: f32,

        /// Proportion of the dataset to use for testing
        #[arg(long = "test_size", default_value_t = 0.1, value_parser = validate_size)]
        test_size: f32,

        /// Seed for random shuffling
        #[arg(long = "seed", default_value_t = 42)]
        seed: u64,
    },
}

// Validate that the size is between 0.0 and 1.0
fn validate_size(s: &str) -> std::result::Result<f32, String> {
    match f32::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err("SIZE must be between 0.0 and 1.0".to_string()),
    }
}

/// Declarative tool configuration. Tools run in declared order: blur
/// first, then color jitter. Each section is independent; a missing or
/// disabled section is simply not run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub blur: Option<BlurConfig>,
    #[serde(default)]
    pub color_jitter: Option<JitterConfig>,
}

impl ToolsConfig {
    /// Load and validate a tool configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            PrepError::Config(format!("cannot open tool config {}: {}", path.display(), e))
        })?;
        let config: ToolsConfig = serde_json::from_reader(file)
            .map_err(|e| PrepError::Config(format!("invalid tool config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(blur) = &self.blur {
            blur.validate()?;
        }
        if let Some(jitter) = &self.color_jitter {
            jitter.validate()?;
        }
        Ok(())
    }
}

/// Gaussian blur tool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    pub enabled: bool,
    /// Gaussian radius; 0 is an identity pass.
    pub radius: f32,
    /// Output name tag; derived filenames are `{tag}_{stem}`.
    pub suffix: String,
    pub sample_ratio: Option<f32>,
    pub sample_count: Option<usize>,
    pub sample_seed: Option<u64>,
    pub replace_imagedata: bool,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 5.0,
            suffix: "_blur".to_string(),
            sample_ratio: None,
            sample_count: None,
            sample_seed: None,
            replace_imagedata: true,
        }
    }
}

impl BlurConfig {
    pub fn validate(&self) -> Result<()> {
        if self.radius < 0.0 {
            return Err(PrepError::Config(
                "blur radius must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Output tag with any leading underscore stripped.
    pub fn tag(&self) -> String {
        let trimmed = self.suffix.trim_start_matches('_');
        if trimmed.is_empty() {
            "blur".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// One color-jitter parameter set. All fields default to no-op values, so
/// a fully-default variant is an identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JitterVariant {
    /// Explicit output tag; derived from the parameters when absent.
    pub suffix: Option<String>,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    /// Hue rotation in degrees, within [-180, 180].
    pub hue: f32,
}

impl Default for JitterVariant {
    fn default() -> Self {
        Self {
            suffix: None,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            hue: 0.0,
        }
    }
}

impl JitterVariant {
    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0 && self.contrast == 1.0 && self.saturation == 1.0 && self.hue == 0.0
    }
}

/// Color-jitter tool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub enabled: bool,
    pub variants: Vec<JitterVariant>,
    pub sample_ratio: Option<f32>,
    pub sample_count: Option<usize>,
    pub sample_seed: Option<u64>,
    pub replace_imagedata: bool,
    pub continue_on_hue_error: bool,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            variants: Vec::new(),
            sample_ratio: None,
            sample_count: None,
            sample_seed: None,
            replace_imagedata: true,
            continue_on_hue_error: true,
        }
    }
}

impl JitterConfig {
    pub fn validate(&self) -> Result<()> {
        for variant in &self.variants {
            if !(-180.0..=180.0).contains(&variant.hue) {
                return Err(PrepError::Config(format!(
                    "hue {} out of range [-180, 180]",
                    variant.hue
                )));
            }
            for (name, factor) in [
                ("brightness", variant.brightness),
                ("contrast", variant.contrast),
                ("saturation", variant.saturation),
            ] {
                if factor < 0.0 {
                    return Err(PrepError::Config(format!(
                        "{} factor must be non-negative, got {}",
                        name, factor
                    )));
                }
            }
        }
        Ok(())
    }
}
