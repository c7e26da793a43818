use image::RgbImage;

use crate::error::{DashScopeError, Result};

/// Decoded images and their source URLs, in prompt order then result order.
#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    images: Vec<RgbImage>,
    urls: Vec<String>,
}

/// Float tensor in `[batch, height, width, 3]` layout with values in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct NhwcTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl ImageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: RgbImage, url: impl Into<String>) {
        self.images.push(image);
        self.urls.push(url.into());
    }

    pub fn extend(&mut self, other: ImageBatch) {
        self.images.extend(other.images);
        self.urls.extend(other.urls);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[RgbImage] {
        &self.images
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn into_parts(self) -> (Vec<RgbImage>, Vec<String>) {
        (self.images, self.urls)
    }

    /// Source URLs as a JSON array string. Non-ASCII characters are kept as-is.
    pub fn urls_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.urls)?)
    }

    /// Stacks the batch into one tensor. Every image must share the first
    /// image's dimensions.
    pub fn to_nhwc_f32(&self) -> Result<NhwcTensor> {
        let first = self
            .images
            .first()
            .ok_or_else(|| DashScopeError::EmptyBatch("no images to stack".into()))?;
        let (width, height) = first.dimensions();

        let mut data = Vec::with_capacity(element_count(self.images.len(), width, height));
        for (index, image) in self.images.iter().enumerate() {
            if image.dimensions() != (width, height) {
                return Err(DashScopeError::InputError(format!(
                    "image #{} is {}x{}, expected {}x{}",
                    index,
                    image.width(),
                    image.height(),
                    width,
                    height
                )));
            }
            data.extend(image.as_raw().iter().map(|&v| v as f32 / 255.0));
        }

        Ok(NhwcTensor {
            shape: [self.images.len(), height as usize, width as usize, 3],
            data,
        })
    }
}

/// What a host integration hands back: the batch, its URL list as JSON and
/// the image count.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub batch: ImageBatch,
    pub urls_json: String,
    pub image_count: usize,
}

impl BatchOutput {
    pub fn from_batch(batch: ImageBatch) -> Result<Self> {
        let urls_json = batch.urls_json()?;
        let image_count = batch.len();
        Ok(Self {
            batch,
            urls_json,
            image_count,
        })
    }
}

/// Number of f32 values in an NHWC stack of `images` RGB frames.
fn element_count(images: usize, width: u32, height: u32) -> usize {
    images * width as usize * height as usize * 3
}
