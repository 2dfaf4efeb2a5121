use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::io::{Limits, Reader};
use log::debug;

use crate::error::ClassifyError;
use crate::timer::Timer;

/// Resolution the tea-leaf model was trained at.
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

const CHANNELS: usize = 3;

/// Largest width or height a decoder may report before we refuse the image.
const MAX_DIMENSION: u32 = 16_384;

/// Upper bound on decoder allocations, guards against decompression bombs.
const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// A `(1, height, width, 3)` tensor of `f32` pixels in NHWC order.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    height: u32,
    width: u32,
    data: Vec<f32>,
}

impl InputTensor {
    pub fn shape(&self) -> [u64; 4] {
        [1, self.height as u64, self.width as u64, CHANNELS as u64]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Turns encoded image bytes into the model's input tensor.
///
/// Pixel values are left in `[0, 255]` unless `rescale` is set. The exported
/// tea-leaf model starts with a Keras `Rescaling(1/255)` layer, so scaling here
/// as well would feed it values in `[0, 1/255]` and silently wreck the
/// predictions. Only enable `rescale` for artifacts without that layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    size: u32,
    rescale: bool,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Preprocessor::new(DEFAULT_IMAGE_SIZE, false)
    }
}

impl Preprocessor {
    pub fn new(size: u32, rescale: bool) -> Self {
        Preprocessor { size, rescale }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn prepare(&self, data: &[u8]) -> Result<InputTensor, ClassifyError> {
        let mut t = Timer::started("Decoding image");
        let image = decode(data)?;
        t.stop();

        debug!(
            "Decoded {}x{} {:?} image",
            image.width(),
            image.height(),
            image.color()
        );

        let mut t = Timer::started("Resizing image");

        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.size, self.size, FilterType::CatmullRom);

        let scale = if self.rescale { 1.0 / 255.0 } else { 1.0 };
        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|x| x as f32 * scale)
            .collect();

        t.stop();

        Ok(InputTensor {
            height: self.size,
            width: self.size,
            data,
        })
    }
}

fn decode(data: &[u8]) -> Result<image::DynamicImage, ClassifyError> {
    let mut reader = Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ClassifyError::Preprocess(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    Ok(reader.decode()?)
}
