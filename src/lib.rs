pub mod clipboard;
pub mod config;
pub mod file_manager;
pub mod logging;
pub mod naming;
pub mod paste;
pub mod uploader;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("File operation error: {0}")]
    FileOperation(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PasteError>;

pub const APP_DIR_NAME: &str = "s3-image-paste";
pub const TEMP_DIR_NAME: &str = "s3-image-paste";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEFAULT_REGION: &str = "ap-northeast-2";
pub const DEFAULT_PREFIX: &str = "images/${yyyy}/${MM}";
pub const MARKDOWN_LANGUAGE_ID: &str = "markdown";
