//! Image views, owned buffers and the grayscale normalizer.
//!
//! `ImageView` is a borrowed single-channel view into a 1D buffer with an
//! explicit stride counted in elements. `ColorView` is a borrowed contiguous
//! view over interleaved 1, 3 or 4 channel pixels; it is what callers hand to
//! the locators. Everything is converted to `OwnedImage` (grayscale, owned)
//! before matching.

use crate::util::{SceneMatchError, SceneMatchResult};

pub mod gray;
#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> SceneMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> SceneMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(SceneMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// Returns row `y` without padding.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }
}

impl ImageView<'_, u8> {
    /// Pixel value at `(x, y)` with coordinates clamped to the image.
    pub(crate) fn clamped(&self, x: i64, y: i64) -> u8 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[cy * self.stride + cx]
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> SceneMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(SceneMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(SceneMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(SceneMatchError::InvalidDimensions { width, height })
}

/// Owned contiguous grayscale image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a row-major buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> SceneMatchResult<Self> {
        let needed = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(SceneMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(SceneMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(SceneMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            if let Some(row) = view.row(y) {
                data.extend_from_slice(row);
            }
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    /// Wraps a buffer whose length the caller has already checked.
    pub(crate) fn from_vec_unchecked(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Mutable row `y`.
    pub(crate) fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get_mut(start..start + self.width)
    }
}

/// Interleaved pixel layouts accepted by the locators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Rgb,
    Rgba,
}

impl Channels {
    /// Number of interleaved bytes per pixel.
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }

    /// Maps a channel count back to a layout.
    pub fn from_count(channels: usize) -> SceneMatchResult<Self> {
        match channels {
            1 => Ok(Channels::Gray),
            3 => Ok(Channels::Rgb),
            4 => Ok(Channels::Rgba),
            _ => Err(SceneMatchError::UnsupportedChannels { channels }),
        }
    }
}

/// Borrowed contiguous view over interleaved pixels.
#[derive(Copy, Clone, Debug)]
pub struct ColorView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    channels: Channels,
}

impl<'a> ColorView<'a> {
    /// Creates a view over `width * height` pixels of `channels` bytes each.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        channels: Channels,
    ) -> SceneMatchResult<Self> {
        let row_len = width
            .checked_mul(channels.count())
            .ok_or(SceneMatchError::InvalidDimensions { width, height })?;
        let needed = required_len(row_len, height, row_len)
            .map_err(|_| SceneMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(SceneMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    pub fn gray(data: &'a [u8], width: usize, height: usize) -> SceneMatchResult<Self> {
        Self::new(data, width, height, Channels::Gray)
    }

    pub fn rgb(data: &'a [u8], width: usize, height: usize) -> SceneMatchResult<Self> {
        Self::new(data, width, height, Channels::Rgb)
    }

    pub fn rgba(data: &'a [u8], width: usize, height: usize) -> SceneMatchResult<Self> {
        Self::new(data, width, height, Channels::Rgba)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Interleaved bytes of row `y`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let row_len = self.width * self.channels.count();
        let start = y * row_len;
        self.data.get(start..start + row_len)
    }
}

impl<'a> From<&'a OwnedImage> for ColorView<'a> {
    fn from(img: &'a OwnedImage) -> Self {
        ColorView {
            data: &img.data,
            width: img.width,
            height: img.height,
            channels: Channels::Gray,
        }
    }
}

/// Owned interleaved image, the counterpart of `ColorView`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: Channels,
}

impl ColorImage {
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        channels: Channels,
    ) -> SceneMatchResult<Self> {
        ColorView::new(&data, width, height, channels)?;
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    pub fn view(&self) -> ColorView<'_> {
        ColorView {
            data: &self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }
}
