use serde::{Serialize, Deserialize};
use crate::error::{EditorError, Result};
use crate::types::SceneSize;

pub const DEFAULT_PROMPT: &str = "Subtly enhance the lighting and shadows to make the image more photorealistic.";
pub const DEFAULT_DOWNLOAD_NAME: &str = "final-image.png";

/// Tunable constants for an editing session. Every field has a default, so a
/// partial JSON object (or `{}`) is a valid config.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub max_scene_dimension: f64,
    /// Stage size used until a base image is loaded.
    pub default_scene: SceneSize,
    pub new_layer_origin: (f64, f64),
    pub auto_fit_fraction: f64,
    pub auto_fit_min_width: f64,
    pub auto_fit_max_width: f64,
    pub min_box_size: f64,
    pub handle_radius: f64,
    pub rotate_handle_offset: f64,
    pub default_prompt: String,
    pub download_name: String,
    pub export_mime_type: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            max_scene_dimension: 768.0,
            default_scene: SceneSize { width: 512.0, height: 512.0 },
            new_layer_origin: (50.0, 50.0),
            auto_fit_fraction: 0.25,
            auto_fit_min_width: 128.0,
            auto_fit_max_width: 512.0,
            min_box_size: 5.0,
            handle_radius: 6.0,
            rotate_handle_offset: 30.0,
            default_prompt: DEFAULT_PROMPT.to_string(),
            download_name: DEFAULT_DOWNLOAD_NAME.to_string(),
            export_mime_type: "image/png".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the placement math cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 { Ok(()) } else { Err(invalid(name, v, "must be positive")) }
        };
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 { Ok(()) } else { Err(invalid(name, v, "must not be negative")) }
        };
        positive("max_scene_dimension", self.max_scene_dimension)?;
        positive("default_scene.width", self.default_scene.width)?;
        positive("default_scene.height", self.default_scene.height)?;
        positive("auto_fit_fraction", self.auto_fit_fraction)?;
        positive("auto_fit_min_width", self.auto_fit_min_width)?;
        positive("auto_fit_max_width", self.auto_fit_max_width)?;
        if self.auto_fit_min_width > self.auto_fit_max_width {
            return Err(EditorError::invalid_argument(format!(
                "auto_fit_min_width {} exceeds auto_fit_max_width {}",
                self.auto_fit_min_width, self.auto_fit_max_width
            )));
        }
        non_negative("min_box_size", self.min_box_size)?;
        non_negative("handle_radius", self.handle_radius)?;
        non_negative("rotate_handle_offset", self.rotate_handle_offset)?;
        if !(self.new_layer_origin.0.is_finite() && self.new_layer_origin.1.is_finite()) {
            return Err(EditorError::invalid_argument("new_layer_origin must be finite"));
        }
        Ok(())
    }

    /// Returns the caller's prompt, or the default when it is empty.
    pub fn prompt_or_default<'a>(&'a self, prompt: &'a str) -> &'a str {
        if prompt.is_empty() { &self.default_prompt } else { prompt }
    }
}

fn invalid(name: &str, value: f64, rule: &str) -> EditorError {
    EditorError::invalid_argument(format!("{} {} ({})", name, rule, value))
}
