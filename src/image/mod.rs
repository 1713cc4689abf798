//! Owned images, single-plane buffers and borrowed plane views.
//!
//! `Image` is the caller-facing type: interleaved 8-bit pixels with one
//! (grayscale) or three (RGB) channels. The kernels never look at interleaved
//! data; they work on `OwnedImage` planes through `ImageView`, a borrowed 2D
//! view into a 1D buffer with an explicit stride. The stride counts elements
//! between the starts of consecutive rows, so a stride larger than the width
//! represents padded rows. ROI slices are zero-copy views into the same
//! backing slice and retain the original stride.

use crate::util::math::luma_bt601;
use crate::util::{LocateError, LocateResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> LocateResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> LocateResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(LocateError::BufferTooSmall {
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

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, x: usize, y: usize, width: usize, height: usize) -> LocateResult<Self> {
        if width == 0 || height == 0 {
            return Err(LocateError::InvalidDimensions { width, height });
        }
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .is_some_and(|(end_x, end_y)| end_x <= self.width && end_y <= self.height);
        if !fits {
            return Err(LocateError::InvalidInput("roi exceeds view bounds"));
        }
        let start = y * self.stride + x;
        let data = self.data.get(start..).ok_or(LocateError::BufferTooSmall {
            needed: start.saturating_add(1),
            got: self.data.len(),
        })?;
        ImageView::new(data, width, height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> LocateResult<usize> {
    if width == 0 || height == 0 {
        return Err(LocateError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(LocateError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(LocateError::InvalidDimensions { width, height })
}

/// Owned contiguous single-channel plane.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Creates a plane from a row-major buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> LocateResult<Self> {
        let needed = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(LocateError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(LocateError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns a borrowed view of the plane.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the plane width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the plane height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn from_gray_image(img: image::GrayImage) -> LocateResult<Self> {
        let width = img.width() as usize;
        let height = img.height() as usize;
        Self::new(img.into_raw(), width, height)
    }

    pub(crate) fn to_gray_image(&self) -> LocateResult<image::GrayImage> {
        image::GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .ok_or(LocateError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
    }
}

/// Caller-owned 8-bit image with 1 (gray) or 3 (RGB) interleaved channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl Image {
    /// Creates an image from interleaved row-major pixels.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> LocateResult<Self> {
        if channels != 1 && channels != 3 {
            return Err(LocateError::UnsupportedChannels { channels });
        }
        let needed = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(LocateError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(LocateError::BufferTooSmall {
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

    /// Creates a single-channel image.
    pub fn gray(data: Vec<u8>, width: usize, height: usize) -> LocateResult<Self> {
        Self::new(data, width, height, 1)
    }

    /// Creates a three-channel RGB image.
    pub fn rgb(data: Vec<u8>, width: usize, height: usize) -> LocateResult<Self> {
        Self::new(data, width, height, 3)
    }

    /// Creates an image from a decoded `image` crate buffer.
    ///
    /// Images with colour become RGB; everything else becomes grayscale.
    /// Alpha is dropped.
    pub fn from_dynamic(img: &image::DynamicImage) -> LocateResult<Self> {
        let width = img.width() as usize;
        let height = img.height() as usize;
        if img.color().has_color() {
            Self::rgb(img.to_rgb8().into_raw(), width, height)
        } else {
            Self::gray(img.to_luma8().into_raw(), width, height)
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the interleaved pixel buffer.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Returns the channel values of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        self.data.get(start..start + self.channels)
    }

    /// Returns a copy of the `width` x `height` region at `(x, y)`.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> LocateResult<Self> {
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .is_some_and(|(end_x, end_y)| end_x <= self.width && end_y <= self.height);
        if !fits {
            return Err(LocateError::InvalidInput("crop exceeds image bounds"));
        }
        let row_len = width * self.channels;
        let mut data = Vec::with_capacity(row_len * height);
        for row in y..y + height {
            let start = (row * self.width + x) * self.channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Self::new(data, width, height, self.channels)
    }

    /// Converts to a single grayscale plane.
    pub fn to_gray(&self) -> OwnedImage {
        let data = match self.channels {
            1 => self.data.clone(),
            _ => self
                .data
                .chunks_exact(3)
                .map(|px| luma_bt601(px[0], px[1], px[2]))
                .collect(),
        };
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
        }
    }

    /// Splits into R, G, B planes; grayscale input is replicated.
    pub fn to_rgb_planes(&self) -> [OwnedImage; 3] {
        if self.channels == 1 {
            let gray = self.to_gray();
            return [gray.clone(), gray.clone(), gray];
        }
        let plane = |c: usize| OwnedImage {
            data: self.data.iter().skip(c).step_by(3).copied().collect(),
            width: self.width,
            height: self.height,
        };
        [plane(0), plane(1), plane(2)]
    }
}
