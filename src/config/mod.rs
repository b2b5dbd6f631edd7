use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

use crate::{PasteError, Result};

/// Where the caption text of an inserted image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltFrom {
    #[default]
    Filename,
    Timestamp,
    None,
}

/// Which part of the upload result is embedded in the inserted reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Url,
    Key,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

/// Snapshot of the user settings, read fresh at the start of every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "or_default")]
    pub bucket: String,
    #[serde(deserialize_with = "or_default")]
    pub region: String,
    #[serde(deserialize_with = "or_default")]
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "or_default")]
    pub public_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "or_default")]
    pub endpoint_url: Option<String>,
    #[serde(deserialize_with = "only_true")]
    pub use_acl_public_read: bool,
    #[serde(deserialize_with = "or_default")]
    pub alt_from: AltFrom,
    #[serde(deserialize_with = "or_default")]
    pub link_mode: LinkMode,
    #[serde(deserialize_with = "unless_false")]
    pub enable_on_paste: bool,
    #[serde(deserialize_with = "or_default")]
    pub logging: LogLevel,
}

// Unknown or blank values in the settings file take the default instead of
// failing the load.
fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn only_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn unless_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(!matches!(Value::deserialize(deserializer)?, Value::Bool(false)))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: crate::DEFAULT_REGION.to_string(),
            prefix: crate::DEFAULT_PREFIX.to_string(),
            public_base_url: None,
            endpoint_url: None,
            use_acl_public_read: false,
            alt_from: AltFrom::default(),
            link_mode: LinkMode::default(),
            enable_on_paste: true,
            logging: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Blank `region`/`prefix` fall back to the defaults; blank URLs are unset.
    pub fn normalized(mut self) -> Self {
        if self.region.trim().is_empty() {
            self.region = crate::DEFAULT_REGION.to_string();
        }
        if self.prefix.trim().is_empty() {
            self.prefix = crate::DEFAULT_PREFIX.to_string();
        }
        self.public_base_url = self.public_base_url.as_deref().and_then(non_empty);
        self.endpoint_url = self.endpoint_url.as_deref().and_then(non_empty);
        self
    }

    /// Applies a single `key = value` assignment using the settings file's key names.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bucket" => self.bucket = value.to_string(),
            "region" => {
                self.region = if value.is_empty() {
                    crate::DEFAULT_REGION.to_string()
                } else {
                    value.to_string()
                }
            }
            "prefix" => {
                self.prefix = if value.is_empty() {
                    crate::DEFAULT_PREFIX.to_string()
                } else {
                    value.to_string()
                }
            }
            "publicBaseUrl" => self.public_base_url = non_empty(value),
            "endpointUrl" => self.endpoint_url = non_empty(value),
            "useAclPublicRead" => self.use_acl_public_read = parse_bool(key, value)?,
            "altFrom" => self.alt_from = parse_enum(key, value)?,
            "linkMode" => self.link_mode = parse_enum(key, value)?,
            "enableOnPaste" => self.enable_on_paste = parse_bool(key, value)?,
            "logging" => self.logging = parse_enum(key, value)?,
            _ => return Err(PasteError::Config(format!("Unknown setting: {key}"))),
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    bool::from_str(value.trim())
        .map_err(|_| PasteError::Config(format!("{key} expects true or false, got {value:?}")))
}

fn parse_enum<T: DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_json::from_value(Value::String(value.trim().to_string()))
        .map_err(|_| PasteError::Config(format!("Invalid value for {key}: {value:?}")))
}

/// Returns a user-facing message when the settings cannot be used for an upload.
pub fn validate_config(config: Option<&Settings>) -> Option<String> {
    let Some(config) = config else {
        return Some(
            "S3 bucket name is required. Please set the bucket in the settings file.".to_string(),
        );
    };

    if config.bucket.trim().is_empty() {
        return Some("S3 bucket name cannot be empty.".to_string());
    }

    None
}

/// JSON-backed settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl Default for SettingsStore {
    fn default() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_DIR_NAME)
            .join(crate::SETTINGS_FILE_NAME);

        Self { path }
    }
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the current settings. A missing file yields the defaults.
    pub async fn load(&self) -> Result<Settings> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let settings: Settings = serde_json::from_str(&raw)?;
                debug!("Loaded settings from {}", self.path.display());
                Ok(settings.normalized())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", self.path.display());
                Ok(Settings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let raw = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, raw).await?;
        info!("Settings written to {}", self.path.display());
        Ok(())
    }

    /// Flips `enableOnPaste`, persists it and returns the new value.
    pub async fn toggle_enable_on_paste(&self) -> Result<bool> {
        let mut settings = self.load().await?;
        settings.enable_on_paste = !settings.enable_on_paste;
        self.save(&settings).await?;
        Ok(settings.enable_on_paste)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.region, "ap-northeast-2");
        assert_eq!(settings.prefix, "images/${yyyy}/${MM}");
        assert!(settings.enable_on_paste);
        assert!(!settings.use_acl_public_read);
        assert_eq!(settings.alt_from, AltFrom::Filename);
        assert_eq!(settings.link_mode, LinkMode::Url);
        assert_eq!(settings.logging, LogLevel::Info);
    }

    #[test]
    fn test_camel_case_keys() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "bucket": "my-bucket",
                "publicBaseUrl": "https://cdn.example.com/",
                "useAclPublicRead": true,
                "altFrom": "timestamp",
                "linkMode": "key",
                "enableOnPaste": false,
                "logging": "debug"
            }"#,
        )
        .unwrap();

        assert_eq!(settings.bucket, "my-bucket");
        assert_eq!(
            settings.public_base_url.as_deref(),
            Some("https://cdn.example.com/")
        );
        assert!(settings.use_acl_public_read);
        assert_eq!(settings.alt_from, AltFrom::Timestamp);
        assert_eq!(settings.link_mode, LinkMode::Key);
        assert!(!settings.enable_on_paste);
        assert_eq!(settings.logging, LogLevel::Debug);
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(None).is_some());

        let blank = Settings {
            bucket: "   ".to_string(),
            ..Default::default()
        };
        assert!(validate_config(Some(&blank)).is_some());
        assert!(validate_config(Some(&Settings::default())).is_some());

        let valid = Settings {
            bucket: "my-bucket".to_string(),
            ..Default::default()
        };
        assert_eq!(validate_config(Some(&valid)), None);
    }

    #[test]
    fn test_set_values() {
        let mut settings = Settings::default();
        settings.set("bucket", "assets").unwrap();
        settings.set("altFrom", "none").unwrap();
        settings.set("useAclPublicRead", "true").unwrap();
        settings.set("publicBaseUrl", "").unwrap();

        assert_eq!(settings.bucket, "assets");
        assert_eq!(settings.alt_from, AltFrom::None);
        assert!(settings.use_acl_public_read);
        assert_eq!(settings.public_base_url, None);

        assert!(settings.set("linkMode", "href").is_err());
        assert!(settings.set("enableOnPaste", "yes").is_err());
        assert!(settings.set("colour", "blue").is_err());
    }

    #[tokio::test]
    async fn test_store_toggle_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));

        assert_eq!(store.load().await.unwrap(), Settings::default());

        assert!(!store.toggle_enable_on_paste().await.unwrap());
        assert!(!store.load().await.unwrap().enable_on_paste);

        assert!(store.toggle_enable_on_paste().await.unwrap());
        assert!(store.load().await.unwrap().enable_on_paste);
    }

    #[tokio::test]
    async fn test_load_treats_blank_strings_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"bucket":"notes","region":"","prefix":" ","publicBaseUrl":"","endpointUrl":""}"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).load().await.unwrap();
        assert_eq!(settings.bucket, "notes");
        assert_eq!(settings.region, "ap-northeast-2");
        assert_eq!(settings.prefix, "images/${yyyy}/${MM}");
        assert_eq!(settings.public_base_url, None);
        assert_eq!(settings.endpoint_url, None);
        assert_eq!(
            crate::uploader::public_url(&settings, "images/a.png"),
            "https://notes.s3.ap-northeast-2.amazonaws.com/images/a.png"
        );
    }

    #[tokio::test]
    async fn test_load_tolerates_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "bucket": "notes",
                "region": 42,
                "altFrom": "",
                "linkMode": "href",
                "logging": 3,
                "enableOnPaste": "yes",
                "useAclPublicRead": "true"
            }"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).load().await.unwrap();
        assert_eq!(settings.region, "ap-northeast-2");
        assert_eq!(settings.alt_from, AltFrom::Filename);
        assert_eq!(settings.link_mode, LinkMode::Url);
        assert_eq!(settings.logging, LogLevel::Info);
        assert!(settings.enable_on_paste);
        assert!(!settings.use_acl_public_read);

        let disabled: Settings = serde_json::from_str(r#"{"enableOnPaste": false}"#).unwrap();
        assert!(!disabled.enable_on_paste);
    }
}
