use image::{Rgb, RgbImage};
use log::warn;

use crate::config::JitterVariant;
use crate::error::{PrepError, Result};

/// Gaussian blur with PIL-style radius semantics (the radius is the
/// standard deviation of the kernel). A non-positive radius is an
/// identity and is short-circuited here: the underlying kernel clamps
/// non-positive sigmas to 1.0, which would blur instead of passing
/// through.
pub fn gaussian_blur(img: &RgbImage, radius: f32) -> RgbImage {
    if radius <= 0.0 {
        return img.clone();
    }
    image::imageops::blur(img, radius)
}

/// Apply one jitter variant: brightness, contrast and saturation scales
/// followed by a hue rotation, in that fixed order. Factors of 1.0 (and a
/// hue of 0) are no-ops and skipped outright.
///
/// When `continue_on_hue_error` is set, a failed hue rotation downgrades
/// the variant to hue 0 with a warning instead of failing the artifact.
pub fn apply_jitter(
    img: &RgbImage,
    variant: &JitterVariant,
    continue_on_hue_error: bool,
) -> Result<RgbImage> {
    let mut out = img.clone();
    if variant.brightness != 1.0 {
        adjust_brightness(&mut out, variant.brightness);
    }
    if variant.contrast != 1.0 {
        adjust_contrast(&mut out, variant.contrast);
    }
    if variant.saturation != 1.0 {
        adjust_saturation(&mut out, variant.saturation);
    }
    if variant.hue != 0.0 {
        match shift_hue(&out, variant.hue) {
            Ok(shifted) => out = shifted,
            Err(e) if continue_on_hue_error => {
                warn!("hue rotation failed ({}); keeping variant with hue=0", e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// ITU-R 601 luma, truncated to an integer as PIL's L conversion does.
fn luma(p: &Rgb<u8>) -> u8 {
    ((u32::from(p[0]) * 299 + u32::from(p[1]) * 587 + u32::from(p[2]) * 114) / 1000) as u8
}

fn blend(base: f32, value: f32, factor: f32) -> u8 {
    (base + (value - base) * factor).round().clamp(0.0, 255.0) as u8
}

fn adjust_brightness(img: &mut RgbImage, factor: f32) {
    for p in img.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = (f32::from(*c) * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Contrast blends each channel against the mean luma of the whole image.
fn adjust_contrast(img: &mut RgbImage, factor: f32) {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return;
    }
    let sum: u64 = img.pixels().map(|p| u64::from(luma(p))).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;
    for p in img.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = blend(mean, f32::from(*c), factor);
        }
    }
}

/// Saturation blends each channel against the per-pixel luma.
fn adjust_saturation(img: &mut RgbImage, factor: f32) {
    for p in img.pixels_mut() {
        let l = f32::from(luma(p));
        for c in p.0.iter_mut() {
            *c = blend(l, f32::from(*c), factor);
        }
    }
}

/// Rotate hue on the 8-bit HSV wheel: the shift is `trunc(deg/360 * 255)`
/// added modulo 256 to the hue channel. This is an intentional 8-bit
/// approximation, not a floating-point hue rotation; output parity with
/// the reference pipeline depends on this exact quantization.
pub fn shift_hue(img: &RgbImage, degrees: f32) -> Result<RgbImage> {
    if !(-180.0..=180.0).contains(&degrees) {
        return Err(PrepError::Transform(format!(
            "hue shift {} out of range [-180, 180]",
            degrees
        )));
    }
    let shift = (degrees / 360.0 * 255.0) as i32;
    let mut out = img.clone();
    for p in out.pixels_mut() {
        let (h, s, v) = rgb_to_hsv8(p[0], p[1], p[2]);
        let h = (i32::from(h) + shift).rem_euclid(256) as u8;
        let (r, g, b) = hsv8_to_rgb(h, s, v);
        *p = Rgb([r, g, b]);
    }
    Ok(out)
}

fn rgb_to_hsv8(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let rf = f32::from(r) / 255.0;
    let gf = f32::from(g) / 255.0;
    let bf = f32::from(b) / 255.0;
    let maxc = rf.max(gf).max(bf);
    let minc = rf.min(gf).min(bf);
    let v = (maxc * 255.0).round() as u8;
    if maxc == minc {
        return (0, 0, v);
    }
    let s = (maxc - minc) / maxc;
    let rc = (maxc - rf) / (maxc - minc);
    let gc = (maxc - gf) / (maxc - minc);
    let bc = (maxc - bf) / (maxc - minc);
    let h = if rf == maxc {
        bc - gc
    } else if gf == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    let h = (h / 6.0).rem_euclid(1.0);
    ((h * 255.0).round() as u8, (s * 255.0).round() as u8, v)
}

fn hsv8_to_rgb(h: u8, s: u8, v: u8) -> (u8, u8, u8) {
    if s == 0 {
        return (v, v, v);
    }
    let hf = f32::from(h) / 255.0 * 6.0;
    let sf = f32::from(s) / 255.0;
    let vf = f32::from(v) / 255.0;
    let i = hf.floor();
    let f = hf - i;
    let p = vf * (1.0 - sf);
    let q = vf * (1.0 - sf * f);
    let t = vf * (1.0 - sf * (1.0 - f));
    let (rf, gf, bf) = match (i as i32).rem_euclid(6) {
        0 => (vf, t, p),
        1 => (q, vf, p),
        2 => (p, vf, t),
        3 => (p, q, vf),
        4 => (t, p, vf),
        _ => (vf, p, q),
    };
    (
        (rf * 255.0).round() as u8,
        (gf * 255.0).round() as u8,
        (bf * 255.0).round() as u8,
    )
}
