use async_trait::async_trait;
use clap::{Parser, Subcommand};
use s3_image_paste::{
    clipboard::ImageClipboard,
    config::{validate_config, LogLevel, SettingsStore},
    logging,
    paste::{Editor, PasteOrchestrator, PasteOutcome},
    uploader::S3Uploader,
    Result, MARKDOWN_LANGUAGE_ID,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(
    name = "s3-image-paste",
    about = "Paste clipboard images into Markdown as S3-hosted links",
    version,
    author
)]
struct Cli {
    /// Settings file (default: <config dir>/s3-image-paste/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the clipboard image and print a Markdown image reference
    PasteImage {
        /// Language of the target document
        #[arg(short, long, default_value = MARKDOWN_LANGUAGE_ID)]
        language: String,
    },

    /// Print the image reference when the clipboard holds an image, the clipboard text otherwise
    SmartPaste {
        /// Language of the target document
        #[arg(short, long, default_value = MARKDOWN_LANGUAGE_ID)]
        language: String,
    },

    /// Turn paste interception on or off
    ToggleAutoPaste,

    /// Report whether the clipboard currently holds an image
    Detect,

    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings as JSON
    Show,

    /// Print the settings file location
    Path,

    /// Set one value, e.g. `config set bucket my-bucket`
    Set { key: String, value: String },
}

/// Terminal stand-in for an editor: insertions go to stdout.
struct TerminalEditor {
    language: String,
    clipboard: Arc<ImageClipboard>,
}

impl TerminalEditor {
    fn new(language: String, clipboard: Arc<ImageClipboard>) -> Self {
        Self {
            language,
            clipboard,
        }
    }
}

#[async_trait]
impl Editor for TerminalEditor {
    fn language_id(&self) -> Option<String> {
        Some(self.language.clone())
    }

    async fn insert_at_cursor(&self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{text}")?;
        stdout.flush()?;
        Ok(())
    }

    async fn default_paste(&self) -> Result<()> {
        match self.clipboard.read_text() {
            Some(text) => self.insert_at_cursor(&text).await,
            None => {
                debug!("Nothing to paste");
                Ok(())
            }
        }
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn show_info(&self, message: &str) {
        info!("{}", message);
    }

    fn report_progress(&self, percent: u8, message: &str) {
        debug!("Uploading image to S3... {}% {}", percent, message);
    }
}

/// Cancellation token tripped by Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested");
            child.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match cli.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default(),
    };

    let settings = match store.load().await {
        Ok(settings) => settings,
        Err(e) => match cli.command {
            // A paste keystroke still pastes when the settings file is unreadable.
            Commands::SmartPaste { .. } => {
                logging::init(LogLevel::default());
                error!("Failed to load settings: {}", e);
                let clipboard = Arc::new(ImageClipboard::system());
                let editor = TerminalEditor::new(String::new(), clipboard);
                editor.show_error(&format!("Failed to load settings: {e}"));
                return editor.default_paste().await;
            }
            _ => return Err(e),
        },
    };
    logging::init(settings.logging);

    match cli.command {
        Commands::PasteImage { language } => {
            let clipboard = Arc::new(ImageClipboard::system());
            let editor = TerminalEditor::new(language, clipboard.clone());
            let uploader = S3Uploader::new(settings.clone());
            let orchestrator = PasteOrchestrator::new(&clipboard, &uploader, &editor);

            match orchestrator.paste_image(&settings, ctrl_c_token()).await? {
                PasteOutcome::Inserted { url, .. } => debug!("Inserted {}", url),
                PasteOutcome::DefaultPaste(reason) => {
                    debug!("Nothing inserted: {:?}", reason);
                    std::process::exit(1);
                }
            }
        }

        Commands::SmartPaste { language } => {
            let clipboard = Arc::new(ImageClipboard::system());
            let editor = TerminalEditor::new(language, clipboard.clone());
            let uploader = S3Uploader::new(settings.clone());
            let orchestrator = PasteOrchestrator::new(&clipboard, &uploader, &editor);

            let outcome = orchestrator.smart_paste(&settings, ctrl_c_token()).await?;
            debug!("Smart paste finished: {:?}", outcome);
        }

        Commands::ToggleAutoPaste => {
            let enabled = store.toggle_enable_on_paste().await?;
            println!(
                "Markdown image smart paste is now {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }

        Commands::Detect => {
            let clipboard = ImageClipboard::system();
            if clipboard.has_image().await {
                println!("image");
            } else {
                println!("none");
                std::process::exit(1);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&settings)?);
                if let Some(problem) = validate_config(Some(&settings)) {
                    error!("{}", problem);
                }
            }
            ConfigAction::Path => {
                println!("{}", store.path().display());
            }
            ConfigAction::Set { key, value } => {
                let mut settings = settings;
                settings.set(&key, &value)?;
                store.save(&settings).await?;
                info!("Configuration changed");
            }
        },
    }

    Ok(())
}
