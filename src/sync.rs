use image::{ImageFormat, RgbImage};
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::config::JitterVariant;
use crate::error::Result;
use crate::io::write_annotation;
use crate::types::Annotation;

/// Output directory pair one augmentation run writes into.
pub struct OutputLayout {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

/// Paths written for one synchronized artifact.
#[derive(Debug)]
pub struct WrittenTriple {
    pub image: PathBuf,
    pub json: PathBuf,
    pub txt: Option<PathBuf>,
}

/// Everything needed to emit one transformed artifact triple.
pub struct EmitRequest<'a> {
    /// Base identity (annotation filename stem).
    pub base: &'a str,
    /// Path of the source image the transform was applied to.
    pub src_image: &'a Path,
    /// The transformed image.
    pub image: &'a RgbImage,
    /// Parsed source annotation; rewritten fields are applied on top.
    pub annotation: Annotation,
    /// Variant tag used to derive output names.
    pub tag: &'a str,
    /// Re-encode the transformed image into `imageData` when present.
    pub replace_imagedata: bool,
    /// YOLO txt label for the base identity, copied unchanged if it exists.
    pub txt_src: Option<&'a Path>,
}

/// Canonical tag for a jitter parameter set: the non-default parameters in
/// b/c/s/h order (`b0.9_c0.95_s0.9`), or `identity` when every parameter
/// is default. An explicit suffix wins. Two variants with equal parameters
/// always derive the same tag.
pub fn variant_tag(variant: &JitterVariant) -> String {
    if let Some(suffix) = &variant.suffix {
        let trimmed = suffix.trim_start_matches('_');
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let mut parts = Vec::new();
    if variant.brightness != 1.0 {
        parts.push(format!("b{}", fmt_factor(variant.brightness)));
    }
    if variant.contrast != 1.0 {
        parts.push(format!("c{}", fmt_factor(variant.contrast)));
    }
    if variant.saturation != 1.0 {
        parts.push(format!("s{}", fmt_factor(variant.saturation)));
    }
    if variant.hue != 0.0 {
        parts.push(format!("h{}", variant.hue as i32));
    }
    if parts.is_empty() {
        "identity".to_string()
    } else {
        parts.join("_")
    }
}

/// Two-decimal rendering with trailing zeros trimmed (`0.9`, `1.05`).
fn fmt_factor(x: f32) -> String {
    let rendered = format!("{:.2}", x);
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Write a transformed artifact triple under the derived stem
/// `{tag}_{original_stem}`.
///
/// The image is saved in the source extension's format. Inside the JSON,
/// `imagePath` and `imageFilename` are rewritten only when the source
/// object carries them; `imageData` is re-encoded in the same format when
/// present and enabled. The txt label is copied unchanged: photometric
/// transforms do not move coordinates, so no rewrite is needed there.
pub fn emit(req: EmitRequest<'_>, out: &OutputLayout) -> Result<WrittenTriple> {
    let ext = req
        .src_image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let format = ImageFormat::from_extension(ext).unwrap_or(ImageFormat::Png);
    let src_stem = req
        .src_image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(req.base);

    let out_img_name = format!("{}_{}.{}", req.tag, src_stem, ext);
    let out_img_path = out.images_dir.join(&out_img_name);
    req.image.save_with_format(&out_img_path, format)?;

    let mut annotation = req.annotation;
    for key in ["imagePath", "imageFilename"] {
        if annotation.contains_key(key) {
            annotation.insert(key.to_string(), Value::String(out_img_name.clone()));
        }
    }
    if req.replace_imagedata && annotation.contains_key("imageData") {
        let encoded = encode_image(req.image, format)?;
        annotation.insert("imageData".to_string(), Value::String(encoded));
    }

    let out_json_path = out.labels_dir.join(format!("{}_{}.json", req.tag, req.base));
    write_annotation(&out_json_path, &annotation)?;

    let txt = match req.txt_src {
        Some(src) if src.is_file() => {
            let dst = out.labels_dir.join(format!("{}_{}.txt", req.tag, req.base));
            fs::copy(src, &dst)?;
            Some(dst)
        }
        _ => None,
    };

    Ok(WrittenTriple {
        image: out_img_path,
        json: out_json_path,
        txt,
    })
}

/// Re-encode the transformed image in `format` and base64 it, mirroring
/// the bytes written next to the JSON.
fn encode_image(img: &RgbImage, format: ImageFormat) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)?;
    Ok(base64::encode(buf.into_inner()))
}
