use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

pub const VISION_MAX_DIM: u32 = 1024;

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Image bytes ready for a vision request: alpha flattened onto white,
/// downscaled to fit `max_dim`, JPEG encoded. Files that cannot be decoded
/// are passed through raw; files that cannot be read are an error.
pub fn prepare_vision_image(path: &Path, max_dim: u32) -> Result<(Vec<u8>, String)> {
    let raw = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let dim = max_dim.max(128);
    if let Ok(decoded) = image::load_from_memory(&raw) {
        let rgba = decoded.to_rgba8();
        let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let alpha = u16::from(pixel[3]);
            let blend = |channel: u8| -> u8 {
                (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
            };
            flattened.put_pixel(
                x,
                y,
                Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
            );
        }
        let mut resized = DynamicImage::ImageRgba8(flattened);
        if resized.width() > dim || resized.height() > dim {
            resized = resized.resize(dim, dim, FilterType::Triangle);
        }
        let rgb = resized.to_rgb8();
        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
        if encoder.encode_image(&rgb).is_ok() {
            return Ok((bytes, "image/jpeg".to_string()));
        }
    }
    Ok((raw, mime_for_path(path).to_string()))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", encode_base64(bytes))
}

/// Words from a file stem, e.g. `giraffe_at-dusk_01.jpg` -> `giraffe at dusk 01`.
pub fn humanized_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image")
        .replace(['_', '-'], " ");
    let joined = stem.split_whitespace().collect::<Vec<&str>>().join(" ");
    if joined.is_empty() {
        "image".to_string()
    } else {
        joined
    }
}
