//! Image ingestion: decode a picture and lay it out on the display canvas.

use image::{DynamicImage, ImageReader, Rgb, RgbImage, imageops, imageops::FilterType};
use std::path::Path;

use crate::error::ImageLoadError;

/// Side length of the square display canvas.
pub const CANVAS_SIZE: u32 = 300;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Output of [`load_image`].
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Square canvas with the picture centered on it, for display.
    pub canvas: RgbImage,
    /// The decoded image at full resolution; this is what gets classified.
    pub original: DynamicImage,
}

/// Extensions accepted by the file picker and by [`load_image`].
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Decode `path` and center it on a `canvas_size` square.
pub fn load_image(
    path: impl AsRef<Path>,
    canvas_size: u32,
) -> Result<NormalizedImage, ImageLoadError> {
    let path = path.as_ref();
    if !is_supported_image(path) {
        return Err(ImageLoadError::Unsupported(path.to_path_buf()));
    }
    let reader = ImageReader::open(path)
        .map_err(|source| ImageLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| ImageLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let original = reader.decode().map_err(|source| ImageLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        "decoded {} ({}x{})",
        path.display(),
        original.width(),
        original.height()
    );
    let canvas = center_on_canvas(&original, canvas_size);
    Ok(NormalizedImage { canvas, original })
}

/// Shrinks `img` to fit inside the canvas (never enlarges it) and pastes it
/// at `((size - w) / 2, (size - h) / 2)`.
pub fn center_on_canvas(img: &DynamicImage, size: u32) -> RgbImage {
    let fitted = if img.width() > size || img.height() > size {
        img.resize(size, size, FilterType::Lanczos3)
    } else {
        img.clone()
    };
    let (x, y) = centered_offset(fitted.width(), fitted.height(), size);
    let mut canvas = placeholder_canvas(size);
    imageops::overlay(&mut canvas, &fitted.to_rgb8(), i64::from(x), i64::from(y));
    canvas
}

/// Offset that centers a `w`x`h` picture on a square canvas. Integer-truncated.
pub fn centered_offset(w: u32, h: u32, size: u32) -> (u32, u32) {
    (size.saturating_sub(w) / 2, size.saturating_sub(h) / 2)
}

/// Blank canvas shown before an image is loaded.
pub fn placeholder_canvas(size: u32) -> RgbImage {
    RgbImage::from_pixel(size, size, BACKGROUND)
}
