use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

use super::ClipboardImageSource;
use crate::file_manager::{TempImage, TempImageDir};

/// Picks the image source for the running operating system.
pub fn for_current_os() -> Box<dyn ClipboardImageSource> {
    match std::env::consts::OS {
        "macos" => Box::new(MacOsClipboard),
        "windows" => Box::new(WindowsClipboard),
        "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => {
            Box::new(UnixClipboard::from_env())
        }
        other => {
            debug!("No clipboard image support on {}", other);
            Box::new(Unsupported)
        }
    }
}

/// Runs a helper tool, returning its output only when it exits successfully.
async fn run(program: &str, args: &[&str]) -> Option<Output> {
    let output = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            debug!("Could not run {}: {}", program, e);
            return None;
        }
    };

    if !output.status.success() {
        debug!("{} exited with {}", program, output.status);
        return None;
    }

    Some(output)
}

/// Escapes a value for use inside a double-quoted AppleScript string.
fn applescript_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escapes a value for use inside a single-quoted PowerShell string.
fn powershell_quote(value: &str) -> String {
    value.replace('\'', "''")
}

pub struct MacOsClipboard;

const PNG_CLASS_READ: &str = "set img to (the clipboard as «class PNGf»)";

#[async_trait]
impl ClipboardImageSource for MacOsClipboard {
    fn name(&self) -> &'static str {
        "osascript"
    }

    async fn detect(&self) -> bool {
        run("osascript", &["-e", PNG_CLASS_READ]).await.is_some()
    }

    async fn extract(&self, dir: &TempImageDir) -> Option<TempImage> {
        if !self.detect().await {
            return None;
        }

        let image = match dir.allocate().await {
            Ok(image) => image,
            Err(e) => {
                debug!("Failed to prepare temp image: {}", e);
                return None;
            }
        };

        let open = format!(
            "set fileHandle to open for access POSIX file \"{}\" with write permission",
            applescript_quote(&image.path().to_string_lossy())
        );
        let script = [
            "-e",
            PNG_CLASS_READ,
            "-e",
            open.as_str(),
            "-e",
            "write img to fileHandle",
            "-e",
            "close access fileHandle",
        ];

        run("osascript", &script).await?;
        Some(image)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnixBackend {
    Xclip,
    WlPaste,
}

/// X11 via `xclip`, Wayland via `wl-paste`.
pub struct UnixClipboard {
    backend: UnixBackend,
}

impl UnixClipboard {
    pub fn new(backend: UnixBackend) -> Self {
        Self { backend }
    }

    pub fn from_env() -> Self {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty());
        Self::new(if wayland {
            UnixBackend::WlPaste
        } else {
            UnixBackend::Xclip
        })
    }

    async fn list_targets(&self) -> Option<String> {
        let output = match self.backend {
            UnixBackend::Xclip => {
                run(
                    "xclip",
                    &["-selection", "clipboard", "-target", "TARGETS", "-out"],
                )
                .await?
            }
            UnixBackend::WlPaste => run("wl-paste", &["--list-types"]).await?,
        };

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn read_target(&self, target: &str) -> Option<Vec<u8>> {
        let output = match self.backend {
            UnixBackend::Xclip => {
                run(
                    "xclip",
                    &["-selection", "clipboard", "-target", target, "-out"],
                )
                .await?
            }
            UnixBackend::WlPaste => run("wl-paste", &["--no-newline", "--type", target]).await?,
        };

        Some(output.stdout).filter(|bytes| !bytes.is_empty())
    }
}

/// Chooses `image/png` when offered, otherwise the first other image type.
pub fn pick_image_target(listing: &str) -> Option<&str> {
    let mut fallback = None;
    for target in listing.lines().map(str::trim) {
        if target == "image/png" {
            return Some(target);
        }
        if fallback.is_none() && target.starts_with("image/") {
            fallback = Some(target);
        }
    }
    fallback
}

#[async_trait]
impl ClipboardImageSource for UnixClipboard {
    fn name(&self) -> &'static str {
        match self.backend {
            UnixBackend::Xclip => "xclip",
            UnixBackend::WlPaste => "wl-paste",
        }
    }

    async fn detect(&self) -> bool {
        match self.list_targets().await {
            Some(listing) => pick_image_target(&listing).is_some(),
            None => false,
        }
    }

    async fn extract(&self, dir: &TempImageDir) -> Option<TempImage> {
        let listing = self.list_targets().await?;
        let target = pick_image_target(&listing)?;
        let bytes = self.read_target(target).await?;

        match dir.stage_png(&bytes).await {
            Ok(image) => image,
            Err(e) => {
                debug!("Failed to stage {} clipboard data: {}", target, e);
                None
            }
        }
    }
}

pub struct WindowsClipboard;

const WINDOWS_CONTAINS_IMAGE: &str = "Add-Type -AssemblyName System.Windows.Forms; \
if ([System.Windows.Forms.Clipboard]::ContainsImage()) { Write-Output 'true' } else { Write-Output 'false' }";

async fn powershell(script: &str) -> Option<String> {
    let output = run(
        "powershell",
        &["-NoProfile", "-NonInteractive", "-STA", "-Command", script],
    )
    .await?;
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl ClipboardImageSource for WindowsClipboard {
    fn name(&self) -> &'static str {
        "powershell"
    }

    async fn detect(&self) -> bool {
        powershell(WINDOWS_CONTAINS_IMAGE).await.as_deref() == Some("true")
    }

    async fn extract(&self, dir: &TempImageDir) -> Option<TempImage> {
        let image = match dir.allocate().await {
            Ok(image) => image,
            Err(e) => {
                debug!("Failed to prepare temp image: {}", e);
                return None;
            }
        };

        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; Add-Type -AssemblyName System.Drawing; \
             $clipboard = [System.Windows.Forms.Clipboard]; \
             if ($clipboard::ContainsImage()) {{ \
               $image = $clipboard::GetImage(); \
               $image.Save('{}', [System.Drawing.Imaging.ImageFormat]::Png); \
               Write-Output 'success' \
             }}",
            powershell_quote(&image.path().to_string_lossy())
        );

        match powershell(&script).await.as_deref() {
            Some("success") => Some(image),
            _ => None,
        }
    }
}

/// Used where no native helper is known; never finds an image.
pub struct Unsupported;

#[async_trait]
impl ClipboardImageSource for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    async fn detect(&self) -> bool {
        false
    }

    async fn extract(&self, _dir: &TempImageDir) -> Option<TempImage> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_image_target() {
        let listing = "TIMESTAMP\nTARGETS\nimage/jpeg\nimage/png\n";
        assert_eq!(pick_image_target(listing), Some("image/png"));

        let listing = "text/plain\nimage/bmp\nimage/jpeg\n";
        assert_eq!(pick_image_target(listing), Some("image/bmp"));

        assert_eq!(pick_image_target("UTF8_STRING\ntext/plain\n"), None);
        assert_eq!(pick_image_target(""), None);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(applescript_quote(r#"/tmp/a "b"\c"#), r#"/tmp/a \"b\"\\c"#);
        assert_eq!(powershell_quote(r"C:\Users\o'neil\x.png"), r"C:\Users\o''neil\x.png");
    }

    #[tokio::test]
    async fn test_missing_tool_is_none() {
        assert!(run("s3-image-paste-no-such-helper", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_never_detects() {
        let scratch = tempfile::tempdir().unwrap();
        let dir = TempImageDir::new(scratch.path().to_path_buf());
        assert!(!Unsupported.detect().await);
        assert!(Unsupported.extract(&dir).await.is_none());
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(UnixClipboard::new(UnixBackend::Xclip).name(), "xclip");
        assert_eq!(UnixClipboard::new(UnixBackend::WlPaste).name(), "wl-paste");
    }
}
