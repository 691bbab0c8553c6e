use wasm_bindgen::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use crate::editor::Editor;
use crate::engine::StudioEngine;
use crate::error::EditorError;
use crate::objects::LayerId;
use crate::selection::Selection;
use crate::types::PartialTransform;

fn error_json(msg: impl std::fmt::Display) -> String {
    json!({ "error": msg.to_string() }).to_string()
}

fn success() -> String {
    json!({ "success": true }).to_string()
}

fn layer_id(params: &Value) -> Result<LayerId, String> {
    params["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| "missing or malformed layer id".to_string())
}

fn index(params: &Value, key: &str) -> Result<usize, EditorError> {
    match params[key].as_i64() {
        Some(i) if i >= 0 => Ok(i as usize),
        Some(i) => Err(EditorError::invalid_argument(format!("{} must not be negative, got {}", key, i))),
        None => Err(EditorError::invalid_argument(format!("{} is required", key))),
    }
}

/// Dispatches one side-panel or canvas command given as
/// `{"action": ..., "params": {...}}`. Always answers with a JSON object.
pub fn execute(editor: &mut Editor, cmd_json: &str) -> String {
    #[derive(Deserialize)]
    struct Command {
        action: String,
        #[serde(default)]
        params: Value,
    }

    let cmd: Command = match serde_json::from_str(cmd_json) {
        Ok(c) => c,
        Err(e) => return error_json(format!("Invalid JSON: {}", e)),
    };
    let params = &cmd.params;

    match cmd.action.as_str() {
        "toggle_visibility" => match layer_id(params) {
            Ok(id) => match editor.toggle_visibility(id) {
                Some(visible) => json!({ "success": true, "visible": visible }).to_string(),
                None => success(),
            },
            Err(e) => error_json(e),
        },
        "remove" => match layer_id(params) {
            Ok(id) => {
                editor.remove_layer(id);
                success()
            }
            Err(e) => error_json(e),
        },
        "clear_objects" => {
            editor.clear_object_layers();
            success()
        }
        "clear_base" => {
            editor.clear_base_image();
            success()
        }
        "reorder" => {
            let moved = index(params, "from")
                .and_then(|from| index(params, "to").map(|to| (from, to)))
                .and_then(|(from, to)| editor.reorder(from, to));
            match moved {
                Ok(()) => success(),
                Err(e) => error_json(e),
            }
        }
        "update" => {
            let partial: PartialTransform = match serde_json::from_value(params["transform"].clone()) {
                Ok(p) => p,
                Err(e) => return error_json(format!("bad transform: {}", e)),
            };
            if params["target"].as_str() == Some("base") {
                editor.update_base_transform(&partial);
                return success();
            }
            match layer_id(params) {
                Ok(id) => {
                    editor.update_object_transform(id, &partial);
                    success()
                }
                Err(e) => error_json(e),
            }
        }
        "select" => {
            let selection = match params["target"].as_str() {
                Some("base") => Selection::Base,
                Some("object") => match layer_id(params) {
                    Ok(id) => Selection::Object(id),
                    Err(e) => return error_json(e),
                },
                _ => Selection::None,
            };
            editor.select(selection);
            json!({ "success": true, "selection": editor.selection() }).to_string()
        }
        "get_layers" => serde_json::to_string(&editor.layer_summaries()).unwrap_or_else(|_| "[]".to_string()),
        "get_selection" => serde_json::to_string(&editor.selection()).unwrap_or_else(|_| "null".to_string()),
        other => error_json(format!("Unknown action: {}", other)),
    }
}

#[wasm_bindgen]
impl StudioEngine {
    pub fn execute_command(&mut self, cmd_json: &str) -> String {
        execute(&mut self.editor, cmd_json)
    }
}
