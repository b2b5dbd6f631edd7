use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clipboard::ImageClipboard;
use crate::config::{validate_config, LinkMode, Settings};
use crate::naming::generate_names;
use crate::uploader::{ImageUploader, UploadResult};
use crate::{PasteError, Result};

/// The editor the orchestrator inserts into.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Language of the active document, `None` without an active editor.
    fn language_id(&self) -> Option<String>;

    /// Inserts `text` at the current cursor or selection.
    async fn insert_at_cursor(&self, text: &str) -> Result<()>;

    /// The host's ordinary paste action.
    async fn default_paste(&self) -> Result<()>;

    fn show_error(&self, message: &str);

    fn show_info(&self, message: &str);

    fn report_progress(&self, _percent: u8, _message: &str) {}
}

/// Why a paste ended in the host's ordinary paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    NotMarkdown,
    Disabled,
    InvalidConfig(String),
    NoImage,
    ExtractionFailed,
    UploadFailed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    Inserted { snippet: String, url: String },
    DefaultPaste(Fallback),
}

/// `![alt](link)` with the link chosen by `mode`.
pub fn markdown_snippet(alt: &str, result: &UploadResult, mode: LinkMode) -> String {
    let link = match mode {
        LinkMode::Url => &result.url,
        LinkMode::Key => &result.key,
        LinkMode::Name => &result.name,
    };
    format!("![{alt}]({link})")
}

pub struct PasteOrchestrator<'a> {
    clipboard: &'a ImageClipboard,
    uploader: &'a dyn ImageUploader,
    editor: &'a dyn Editor,
}

impl<'a> PasteOrchestrator<'a> {
    pub fn new(
        clipboard: &'a ImageClipboard,
        uploader: &'a dyn ImageUploader,
        editor: &'a dyn Editor,
    ) -> Self {
        Self {
            clipboard,
            uploader,
            editor,
        }
    }

    fn is_markdown(&self) -> bool {
        self.editor.language_id().as_deref() == Some(crate::MARKDOWN_LANGUAGE_ID)
    }

    /// Paste handler bound to the paste keystroke. Always ends in an insertion:
    /// either the uploaded image link or the host's default paste.
    pub async fn smart_paste(
        &self,
        settings: &Settings,
        cancel: CancellationToken,
    ) -> Result<PasteOutcome> {
        debug!("[SmartPaste] Command triggered");

        if !self.is_markdown() {
            debug!(
                "[SmartPaste] Not markdown (lang: {:?}), default paste",
                self.editor.language_id()
            );
            return self.fall_back(Fallback::NotMarkdown).await;
        }

        if !settings.enable_on_paste {
            debug!("[SmartPaste] Auto-paste disabled, default paste");
            return self.fall_back(Fallback::Disabled).await;
        }

        if let Some(message) = validate_config(Some(settings)) {
            self.editor.show_error(&message);
            return self.fall_back(Fallback::InvalidConfig(message)).await;
        }

        debug!("[SmartPaste] Checking clipboard...");
        let has_image = self.clipboard.has_image().await;
        debug!("[SmartPaste] Has image: {}", has_image);

        if !has_image {
            return self.fall_back(Fallback::NoImage).await;
        }

        match self.upload_and_insert(settings, cancel).await? {
            PasteOutcome::DefaultPaste(reason) => {
                debug!("[SmartPaste] Upload failed, default paste");
                self.fall_back(reason).await
            }
            inserted => Ok(inserted),
        }
    }

    /// Explicit upload-and-insert command. Does not fall back to the default
    /// paste; the returned outcome says why nothing was inserted.
    pub async fn paste_image(
        &self,
        settings: &Settings,
        cancel: CancellationToken,
    ) -> Result<PasteOutcome> {
        if let Some(message) = validate_config(Some(settings)) {
            self.editor.show_error(&message);
            return Ok(PasteOutcome::DefaultPaste(Fallback::InvalidConfig(message)));
        }

        if !self.is_markdown() {
            return Ok(PasteOutcome::DefaultPaste(Fallback::NotMarkdown));
        }

        self.upload_and_insert(settings, cancel).await
    }

    async fn upload_and_insert(
        &self,
        settings: &Settings,
        cancel: CancellationToken,
    ) -> Result<PasteOutcome> {
        let Some(image) = self.clipboard.extract_image().await else {
            debug!("Failed to get image from clipboard");
            return Ok(PasteOutcome::DefaultPaste(Fallback::ExtractionFailed));
        };

        info!("Processing image from clipboard");
        let original_filename = image.file_name();
        let names = generate_names(&settings.prefix, &original_filename, settings.alt_from);

        let uploaded = self
            .upload_step(image.path(), &names.key, &original_filename, &cancel)
            .await;

        if let Err(e) = image.close().await {
            debug!("Failed to delete temp file: {}", e);
        }

        match uploaded {
            Ok(result) => {
                let snippet = markdown_snippet(&names.alt, &result, settings.link_mode);
                self.editor.insert_at_cursor(&snippet).await?;
                info!("Upload successful: {}", result.url);
                self.editor
                    .show_info(&format!("Image uploaded: {}", result.name));
                Ok(PasteOutcome::Inserted {
                    snippet,
                    url: result.url,
                })
            }
            Err(PasteError::Cancelled) => {
                info!("Upload cancelled");
                Ok(PasteOutcome::DefaultPaste(Fallback::Cancelled))
            }
            Err(e) => {
                let detail = match e {
                    PasteError::Upload(detail) => detail,
                    other => other.to_string(),
                };
                error!("Upload failed: {}", detail);
                self.editor
                    .show_error(&format!("Failed to upload image: {detail}"));
                Ok(PasteOutcome::DefaultPaste(Fallback::UploadFailed(detail)))
            }
        }
    }

    async fn upload_step(
        &self,
        path: &std::path::Path,
        key: &str,
        original_filename: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadResult> {
        if cancel.is_cancelled() {
            return Err(PasteError::Cancelled);
        }

        self.editor.report_progress(50, "Uploading...");
        let result = self.uploader.upload(path, key, original_filename).await?;
        self.editor.report_progress(100, "Complete!");
        Ok(result)
    }

    async fn fall_back(&self, reason: Fallback) -> Result<PasteOutcome> {
        self.editor.default_paste().await?;
        Ok(PasteOutcome::DefaultPaste(reason))
    }
}
