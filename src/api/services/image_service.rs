//! Upload validation and image normalization.
//!
//! Uploads are checked by extension, size and magic bytes; the extension has
//! to agree with the sniffed content.

use image::{ImageOutputFormat, imageops::FilterType};
use std::io::Cursor;
use tracing::warn;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &["gif", "jpeg", "jpg", "png", "webp"];

pub const SERVICE_IMAGE_SIZE: u32 = 1024;
pub const SERVICE_IMAGE_QUALITY: u8 = 85;

/// Image formats recognised from file headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    fn matches_extension(self, ext: &str) -> bool {
        match self {
            ImageKind::Jpeg => ext == "jpg" || ext == "jpeg",
            other => ext == other.as_str(),
        }
    }
}

/// A validated upload: normalized extension and sniffed kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    pub extension: String,
    pub kind: ImageKind,
}

/// Detect the image type from the first bytes of a file.
pub fn sniff_image_kind(header: &[u8]) -> Option<ImageKind> {
    if header.len() < 12 {
        return None;
    }
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageKind::Jpeg)
    } else if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageKind::Png)
    } else if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        Some(ImageKind::Gif)
    } else if header.starts_with(b"RIFF") && &header[8..12] == b"WEBP" {
        Some(ImageKind::Webp)
    } else {
        None
    }
}

/// Lower-cased extension of a file name, without the dot.
pub fn file_extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Validate an uploaded image, returning a user-facing message on failure.
pub fn validate_image_upload(file_name: &str, bytes: &[u8]) -> Result<ValidatedImage, String> {
    let extension = file_extension(file_name).unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!(
            "Unsupported file extension '.{}'. Allowed: {}.",
            extension,
            ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(format!(
            "File too large ({} MB). Maximum size: {} MB.",
            bytes.len() / (1024 * 1024),
            MAX_IMAGE_BYTES / (1024 * 1024)
        ));
    }

    let header = &bytes[..bytes.len().min(64)];
    let kind = sniff_image_kind(header).ok_or_else(|| {
        "The file is not a supported image (jpeg/png/gif/webp).".to_string()
    })?;
    if !kind.matches_extension(&extension) {
        return Err(format!(
            "File extension .{} does not match its content ({}).",
            extension,
            kind.as_str()
        ));
    }

    Ok(ValidatedImage { extension, kind })
}

/// Re-encode an image as a square JPEG for the services catalog.
///
/// Returns `None` when the image cannot be decoded or encoded, in which case
/// the caller keeps the original bytes.
pub fn normalize_service_image(bytes: &[u8]) -> Option<Vec<u8>> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!("Could not decode service image, keeping original: {}", e);
            return None;
        }
    };
    let resized = image::DynamicImage::ImageRgb8(decoded.to_rgb8()).resize_exact(
        SERVICE_IMAGE_SIZE,
        SERVICE_IMAGE_SIZE,
        FilterType::Lanczos3,
    );

    let mut out = Vec::new();
    match resized.write_to(
        &mut Cursor::new(&mut out),
        ImageOutputFormat::Jpeg(SERVICE_IMAGE_QUALITY),
    ) {
        Ok(()) => Some(out),
        Err(e) => {
            warn!("Could not encode service image, keeping original: {}", e);
            None
        }
    }
}
