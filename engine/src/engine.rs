use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use web_sys::{CanvasRenderingContext2d, ImageData};
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::error::EditorError;
use crate::generate::GenerationResponse;
use crate::intake::{DataUrl, ImageResource};

pub(crate) fn to_js(err: EditorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Browser-facing handle around one editing session.
#[wasm_bindgen]
pub struct StudioEngine {
    pub(crate) editor: Editor,
}

#[wasm_bindgen]
impl StudioEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<StudioEngine, JsValue> {
        console_error_panic_hook::set_once();
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(to_js)?,
            None => EditorConfig::default(),
        };
        Ok(StudioEngine { editor: Editor::new(config) })
    }

    pub fn upload_base_image(&mut self, data: &[u8]) -> Result<(), JsValue> {
        self.editor.upload_base_image(data).map_err(to_js)
    }

    pub fn upload_base_data_url(&mut self, url: &str) -> Result<(), JsValue> {
        let image = ImageResource::from_data_url(url).map_err(to_js)?;
        self.editor.set_base_image(image);
        Ok(())
    }

    /// Takes a JSON array of data URLs; returns the new ids as JSON.
    pub fn upload_object_data_urls(&mut self, urls_json: &str) -> Result<String, JsValue> {
        let urls: Vec<String> = serde_json::from_str(urls_json)
            .map_err(|e| to_js(EditorError::invalid_input(format!("expected a JSON array of data URLs: {}", e))))?;
        let files = urls
            .iter()
            .map(|u| DataUrl::parse(u).and_then(|d| d.bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_js)?;
        let ids = self.editor.upload_object_images(&files).map_err(to_js)?;
        Ok(serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string()))
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> String {
        let selection = self.editor.pointer_down(x, y);
        serde_json::to_string(&selection).unwrap_or_else(|_| "null".to_string())
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.editor.pointer_move(x, y)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> bool {
        self.editor.pointer_up(x, y)
    }

    pub fn cancel_gesture(&mut self) {
        self.editor.cancel_gesture();
    }

    /// Paints the current frame, handles included, at the canvas origin.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let frame = self.editor.render();
        let (w, h) = frame.dimensions();
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(frame.as_raw().as_slice()), w, h)?;
        ctx.clear_rect(0.0, 0.0, w as f64, h as f64);
        ctx.put_image_data(&data, 0.0, 0.0)
    }

    pub fn flatten_data_url(&self) -> Result<String, JsValue> {
        self.editor.flatten_data_url().map(|u| u.to_url()).map_err(to_js)
    }

    /// Returns the request JSON for the host to send to the service.
    pub fn prepare_generation(&mut self, prompt: &str) -> Result<String, JsValue> {
        let request = self.editor.prepare_generation(prompt).map_err(to_js)?;
        serde_json::to_string(&request).map_err(|e| to_js(e.into()))
    }

    /// Feeds back the service's JSON reply; returns the output data URL.
    pub fn complete_generation(&mut self, response_json: &str) -> Result<String, JsValue> {
        let outcome = GenerationResponse::from_json(response_json);
        self.editor.complete_generation(outcome).map(|u| u.to_url()).map_err(to_js)
    }

    /// Reports a transport failure the host hit before getting a reply.
    pub fn fail_generation(&mut self, message: &str) -> String {
        let err = self.editor.complete_generation(Err(EditorError::external(message.to_string())));
        err.err().map(|e| e.to_string()).unwrap_or_default()
    }

    pub fn output_data_url(&self) -> Option<String> {
        self.editor.generation().output.as_ref().map(|u| u.to_url())
    }

    pub fn download_name(&self) -> String {
        self.editor.config().download_name.clone()
    }

    pub fn get_generation_status(&self) -> String {
        serde_json::to_string(self.editor.generation()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get_scene_size(&self) -> String {
        serde_json::to_string(&self.editor.scene_size()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get_selection(&self) -> String {
        serde_json::to_string(&self.editor.selection()).unwrap_or_else(|_| "null".to_string())
    }

    pub fn get_layers(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.editor.layer_summaries()).map_err(JsValue::from)
    }

    pub fn get_layers_json(&self) -> String {
        serde_json::to_string(&self.editor.layer_summaries()).unwrap_or_else(|_| "[]".to_string())
    }
}
