//! Loading images through the `image` crate.
//!
//! Available with the `image-io` feature.

use crate::image::{Channels, ColorImage, OwnedImage};
use crate::util::{SceneMatchError, SceneMatchResult};
use std::path::Path;

/// Converts a decoded image into an interleaved buffer, keeping alpha when
/// the source has it.
pub fn color_from_dynamic_image(img: &image::DynamicImage) -> SceneMatchResult<ColorImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    match img {
        image::DynamicImage::ImageLuma8(gray) => {
            ColorImage::new(gray.as_raw().clone(), width, height, Channels::Gray)
        }
        _ if img.color().has_alpha() => {
            ColorImage::new(img.to_rgba8().into_raw(), width, height, Channels::Rgba)
        }
        _ => ColorImage::new(img.to_rgb8().into_raw(), width, height, Channels::Rgb),
    }
}

/// Converts a decoded image straight to grayscale via `image`'s luma conversion.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> SceneMatchResult<OwnedImage> {
    let gray = img.to_luma8();
    OwnedImage::new(gray.as_raw().clone(), gray.width() as usize, gray.height() as usize)
}

/// Loads an image file as an interleaved color buffer.
pub fn load_color_image<P: AsRef<Path>>(path: P) -> SceneMatchResult<ColorImage> {
    let img = image::open(path).map_err(|err| SceneMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    color_from_dynamic_image(&img)
}

/// Loads an image file and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> SceneMatchResult<OwnedImage> {
    let img = image::open(path).map_err(|err| SceneMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}
