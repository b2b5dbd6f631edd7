use image::ImageFormat;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::Result;

/// Directory that receives clipboard images while they are being uploaded.
#[derive(Debug, Clone)]
pub struct TempImageDir {
    root: PathBuf,
}

impl Default for TempImageDir {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join(crate::TEMP_DIR_NAME),
        }
    }
}

impl TempImageDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory if needed and returns a fresh, unused image path.
    pub async fn allocate(&self) -> Result<TempImage> {
        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(random_image_name());
        debug!("Allocated temp image path: {}", path.display());
        Ok(TempImage { path: Some(path) })
    }

    /// Writes captured clipboard bytes as PNG. Empty input produces nothing.
    pub async fn stage_png(&self, data: &[u8]) -> Result<Option<TempImage>> {
        if data.is_empty() {
            return Ok(None);
        }

        let png = normalize_png(data)?;
        let image = self.allocate().await?;
        fs::write(image.path(), &png).await?;
        info!(
            "Staged clipboard image: {} ({} bytes)",
            image.path().display(),
            png.len()
        );

        Ok(Some(image))
    }
}

fn random_image_name() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("image-{hex}.png")
}

/// Re-encodes non-PNG raster data so every staged file is a PNG.
pub fn normalize_png(data: &[u8]) -> Result<Vec<u8>> {
    if matches!(image::guess_format(data), Ok(ImageFormat::Png)) {
        return Ok(data.to_vec());
    }

    let img = image::load_from_memory(data)?;
    let mut png_bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// A clipboard image on local disk, deleted when dropped.
#[derive(Debug)]
pub struct TempImage {
    path: Option<PathBuf>,
}

impl TempImage {
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Returns the image only if the file exists and is non-empty.
    pub async fn verified(self) -> Option<Self> {
        match fs::metadata(self.path()).await {
            Ok(meta) if meta.len() > 0 => Some(self),
            _ => None,
        }
    }

    /// Deletes the file now. Missing files are not an error.
    pub async fn close(mut self) -> Result<()> {
        if let Some(path) = self.path.take() {
            remove_quietly_async(&path).await?;
        }
        Ok(())
    }
}

async fn remove_quietly_async(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed temp image: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed temp image: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => debug!("Failed to delete temp file {}: {}", path.display(), e),
            }
        }
    }
}
