use serde::{Deserialize, Serialize};

use super::errors::ObservationError;

/// Memory layout of an image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    /// Row-major, channels interleaved per pixel (camera native).
    Hwc,
    /// Planar, one full plane per channel (model input).
    Chw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorOrder {
    Bgr,
    Rgb,
}

/// A 3-channel 8-bit image together with its layout and channel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTensor {
    pub height: usize,
    pub width: usize,
    pub layout: PixelLayout,
    pub color: ColorOrder,
    pub data: Vec<u8>,
}

impl ImageTensor {
    pub const CHANNELS: usize = 3;

    pub fn new(
        height: usize,
        width: usize,
        layout: PixelLayout,
        color: ColorOrder,
        data: Vec<u8>,
    ) -> Result<Self, ObservationError> {
        let expected = height * width * Self::CHANNELS;
        if data.len() != expected {
            return Err(ObservationError::ImageSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            layout,
            color,
            data,
        })
    }

    /// Swaps the first and last channel so BGR becomes RGB (and back).
    pub fn to_rgb(&self) -> Self {
        if self.color == ColorOrder::Rgb {
            return self.clone();
        }

        let mut data = self.data.clone();
        match self.layout {
            PixelLayout::Hwc => {
                for pixel in data.chunks_exact_mut(Self::CHANNELS) {
                    pixel.swap(0, 2);
                }
            }
            PixelLayout::Chw => {
                let plane = self.height * self.width;
                let (first, rest) = data.split_at_mut(plane);
                let last = &mut rest[plane..];
                first.swap_with_slice(last);
            }
        }

        Self {
            color: ColorOrder::Rgb,
            data,
            ..*self
        }
    }

    /// Re-lays an interleaved image as channel planes.
    pub fn to_chw(&self) -> Self {
        if self.layout == PixelLayout::Chw {
            return self.clone();
        }

        let plane = self.height * self.width;
        let mut data = vec![0u8; self.data.len()];
        for (idx, pixel) in self.data.chunks_exact(Self::CHANNELS).enumerate() {
            for (c, value) in pixel.iter().enumerate() {
                data[c * plane + idx] = *value;
            }
        }

        Self {
            layout: PixelLayout::Chw,
            data,
            ..*self
        }
    }
}

/// One entry of an observation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sample {
    Image(ImageTensor),
    Vector(Vec<f32>),
}

impl Sample {
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Sample::Vector(values) => Some(values),
            Sample::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageTensor> {
        match self {
            Sample::Image(image) => Some(image),
            Sample::Vector(_) => None,
        }
    }
}

impl From<Vec<f32>> for Sample {
    fn from(values: Vec<f32>) -> Self {
        Sample::Vector(values)
    }
}

impl From<ImageTensor> for Sample {
    fn from(image: ImageTensor) -> Self {
        Sample::Image(image)
    }
}
