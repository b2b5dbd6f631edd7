pub mod platform;

use arboard::Clipboard as Arboard;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::file_manager::{TempImage, TempImageDir};

pub trait TextSource: Send + Sync {
    fn read_text(&self) -> Option<String>;
}

// Implementations never fail: a missing helper tool, a non-zero exit status
// or empty output all mean "no image".
#[async_trait]
pub trait ClipboardImageSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self) -> bool;

    async fn extract(&self, dir: &TempImageDir) -> Option<TempImage>;
}

pub struct SystemText {
    clipboard: Option<Arc<Mutex<Arboard>>>,
}

impl SystemText {
    pub fn new() -> Self {
        let clipboard = match Arboard::new() {
            Ok(clipboard) => Some(Arc::new(Mutex::new(clipboard))),
            Err(e) => {
                debug!("Clipboard unavailable for text reads: {}", e);
                None
            }
        };

        Self { clipboard }
    }
}

impl Default for SystemText {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSource for SystemText {
    fn read_text(&self) -> Option<String> {
        let clipboard = self.clipboard.as_ref()?;
        let mut clipboard = clipboard.lock().ok()?;
        clipboard.get_text().ok().filter(|text| !text.is_empty())
    }
}

pub struct ImageClipboard {
    text: Box<dyn TextSource>,
    source: Box<dyn ClipboardImageSource>,
    temp_dir: TempImageDir,
}

impl ImageClipboard {
    pub fn new(
        text: Box<dyn TextSource>,
        source: Box<dyn ClipboardImageSource>,
        temp_dir: TempImageDir,
    ) -> Self {
        Self {
            text,
            source,
            temp_dir,
        }
    }

    pub fn system() -> Self {
        Self::new(
            Box::new(SystemText::new()),
            platform::for_current_os(),
            TempImageDir::default(),
        )
    }

    pub fn read_text(&self) -> Option<String> {
        self.text.read_text()
    }

    // Text on the clipboard wins.
    pub async fn has_image(&self) -> bool {
        if self.text.read_text().is_some() {
            debug!("[checkImage] Text detected in clipboard");
            return false;
        }

        debug!(
            "[checkImage] No text, checking for image via {}",
            self.source.name()
        );
        let result = self.source.detect().await;
        debug!("[checkImage] Result: {}", result);
        result
    }

    pub async fn extract_image(&self) -> Option<TempImage> {
        let image = self.source.extract(&self.temp_dir).await?;
        image.verified().await
    }
}
