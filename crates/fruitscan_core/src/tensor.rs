use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Batched NHWC input tensor, shape `(1, height, width, 3)`.
pub type PreparedTensor = Array4<f32>;

/// Spatial resolution the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
        }
    }
}

/// Resize `image` to `size` and lay out raw RGB values (0..=255) as f32.
///
/// Pixel scaling is left to the model, which carries its own rescaling layer.
pub fn prepare_tensor(
    image: &DynamicImage,
    size: InputSize,
) -> Result<PreparedTensor, PreprocessError> {
    if size.width == 0 || size.height == 0 {
        return Err(PreprocessError::InvalidInputSize {
            width: size.width,
            height: size.height,
        });
    }
    let resized = image
        .resize_exact(size.width, size.height, FilterType::CatmullRom)
        .to_rgb8();
    let mut array = Array4::<f32>::zeros((1, size.height as usize, size.width as usize, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (row, col) = (y as usize, x as usize);
        array[[0, row, col, 0]] = f32::from(r);
        array[[0, row, col, 1]] = f32::from(g);
        array[[0, row, col, 2]] = f32::from(b);
    }
    Ok(array)
}
