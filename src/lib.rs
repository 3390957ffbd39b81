//! Segmentation dataset preparation toolkit
//!
//! Prepares image-segmentation datasets for model training:
//! annotation-synchronized augmentation (blur, color jitter), class-id
//! remapping, image resizing, and train/val/test splitting with training
//! manifest generation. The training framework itself is an external
//! collaborator; the manifest is the only contract with it.

pub mod augment;
pub mod config;
pub mod error;
pub mod io;
pub mod remap;
pub mod resize;
pub mod resolve;
pub mod sample;
pub mod split;
pub mod sync;
pub mod transform;
pub mod types;

// Re-export commonly used types and functions
pub use augment::{run_augmentation, DatasetPaths};
pub use config::{BlurConfig, Cli, Command, JitterConfig, JitterVariant, ToolsConfig};
pub use error::{PrepError, Result};
pub use remap::{remap_dataset, remap_lines, ClassRemap, RemapStats};
pub use resize::resize_images;
pub use resolve::{find_image_file, resolve_image};
pub use sample::{select_samples, SampleSet};
pub use split::{split_dataset, SplitOptions, SplitSummary};
pub use sync::{emit, variant_tag, EmitRequest, OutputLayout, WrittenTriple};
pub use transform::{apply_jitter, gaussian_blur};
pub use types::{Annotation, ToolSummary, IMG_EXTS};
