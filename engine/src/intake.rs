use std::sync::Arc;
use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use tracing::{info, warn};
use crate::error::{EditorError, Result};

/// Decoded pixels plus intrinsic size. Cloning shares the pixel buffer.
#[derive(Clone, Debug)]
pub struct ImageResource {
    pixels: Arc<RgbaImage>,
}

impl ImageResource {
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(EditorError::invalid_input("image has zero width or height"));
        }
        Ok(ImageResource { pixels: Arc::new(pixels) })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(EditorError::invalid_input("empty image file"));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| EditorError::invalid_input(format!("could not decode image: {}", e)))?;
        Self::from_rgba(img.to_rgba8())
    }

    pub fn from_data_url(url: &str) -> Result<Self> {
        Self::decode(&DataUrl::parse(url)?.bytes()?)
    }

    pub fn width(&self) -> u32 { self.pixels.width() }
    pub fn height(&self) -> u32 { self.pixels.height() }
    pub fn natural_size(&self) -> (u32, u32) { (self.width(), self.height()) }
    pub fn pixels(&self) -> &RgbaImage { &self.pixels }
}

/// `data:<mime>;base64,<payload>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: String,
}

impl DataUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let (header, payload) = url.split_once(',').ok_or_else(|| EditorError::invalid_input("Invalid data URL"))?;
        if header.is_empty() || payload.is_empty() {
            return Err(EditorError::invalid_input("Invalid data URL"));
        }
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| EditorError::invalid_input("Invalid data URL"))?;
        Ok(DataUrl { mime_type: mime_type.to_string(), data: payload.to_string() })
    }

    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        DataUrl { mime_type: mime_type.to_string(), data: general_purpose::STANDARD.encode(bytes) }
    }

    pub fn bytes(&self) -> Result<Vec<u8>> {
        general_purpose::STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| EditorError::invalid_input(format!("bad base64 payload: {}", e)))
    }

    pub fn to_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Decodes a whole upload batch before anything is appended, so a batch
/// lands as one contiguous run in submission order or not at all.
pub fn decode_batch<B: AsRef<[u8]>>(files: &[B]) -> Result<Vec<ImageResource>> {
    if files.is_empty() {
        return Err(EditorError::invalid_input("no files selected"));
    }
    let images = files
        .iter()
        .enumerate()
        .map(|(i, bytes)| {
            ImageResource::decode(bytes.as_ref()).map_err(|e| {
                warn!(index = i, error = %e, "rejecting upload batch");
                e
            })
        })
        .collect::<Result<Vec<_>>>()?;
    info!(count = images.len(), "decoded upload batch");
    Ok(images)
}
