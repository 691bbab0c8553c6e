use std::cell::Cell;
use std::io::Cursor;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use tracing::info;
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::intake::DataUrl;

/// Hides the transform handles until dropped, then restores whatever
/// visibility they had before.
pub struct HiddenHandles<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> HiddenHandles<'a> {
    pub fn new(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(false);
        HiddenHandles { flag, previous }
    }
}

impl Drop for HiddenHandles<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// An encoded image ready to hand to a download or an upload.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn data_url(&self) -> DataUrl {
        DataUrl::encode(&self.mime_type, &self.bytes)
    }
}

pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(surface.clone()).write_to(&mut out, ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

impl Editor {
    /// Runs `capture` with the handles hidden. They come back on every exit
    /// path, including errors and panics inside `capture`.
    pub fn flatten_with<T>(&self, capture: impl FnOnce(&Editor) -> Result<T>) -> Result<T> {
        let _hidden = HiddenHandles::new(&self.handles_visible);
        capture(self)
    }

    /// The on-screen composite without interactive chrome, as PNG at the
    /// scene's native pixel size.
    pub fn flatten_png(&self) -> Result<Vec<u8>> {
        let bytes = self.flatten_with(|ed| encode_png(&ed.render()))?;
        info!(bytes = bytes.len(), scene = ?self.scene_size, "flattened scene");
        Ok(bytes)
    }

    pub fn flatten_data_url(&self) -> Result<DataUrl> {
        Ok(DataUrl::encode(&self.config.export_mime_type, &self.flatten_png()?))
    }

    pub fn flatten_download(&self) -> Result<ExportedFile> {
        if self.store.base().image.is_none() && self.store.is_empty() {
            return Err(EditorError::invalid_input("nothing to export"));
        }
        Ok(ExportedFile {
            name: self.config.download_name.clone(),
            mime_type: self.config.export_mime_type.clone(),
            bytes: self.flatten_png()?,
        })
    }
}
