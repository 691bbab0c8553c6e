pub mod error;
pub mod config;
pub mod types;
pub mod intake;
pub mod objects;
pub mod store;
pub mod transform;
pub mod editor;
pub mod selection;
pub mod render;
pub mod export;
pub mod generate;
pub mod engine;
pub mod commands;

pub use editor::Editor;
pub use engine::StudioEngine;
pub use error::{EditorError, Result};
pub use config::EditorConfig;
pub use types::*;
pub use objects::*;
