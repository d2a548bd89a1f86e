use serde::{Deserialize, Serialize};
use thiserror::Error;

mod color;

pub use color::Color;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("shader compilation failed for variant [{key}]: {message}")]
    ShaderCompilation { key: String, message: String },
    #[error("unsupported format: expected `{expected}`, found `{found}`")]
    UnsupportedFormat { expected: String, found: String },
    #[error("failed to load {path}: {reason}")]
    ResourceLoad { path: String, reason: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn invalid_geometry(message: impl Into<String>) -> Error {
    Error::InvalidGeometry(message.into())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    pub fn physical_size(&self, pixel_ratio: f32) -> [f32; 2] {
        [
            self.width as f32 * pixel_ratio,
            self.height as f32 * pixel_ratio,
        ]
    }
}
