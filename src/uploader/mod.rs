pub mod s3;

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::config::Settings;
use crate::Result;

pub use s3::S3Uploader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub url: String,
    pub key: String,
    pub name: String,
}

impl UploadResult {
    pub fn new(url: String, key: &str) -> Self {
        Self {
            url,
            key: key.to_string(),
            name: object_name(key).to_string(),
        }
    }
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, path: &Path, key: &str, original_filename: &str)
        -> Result<UploadResult>;
}

pub fn object_name(key: &str) -> &str {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => key,
    }
}

// publicBaseUrl wins, then a path-style URL for an S3-compatible endpoint,
// then the virtual-hosted AWS form.
pub fn public_url(settings: &Settings, key: &str) -> String {
    if let Some(base) = settings.public_base_url.as_deref() {
        let base = base.strip_suffix('/').unwrap_or(base);
        return format!("{base}/{key}");
    }

    if let Some(endpoint) = settings.endpoint_url.as_deref() {
        let endpoint = endpoint.trim_end_matches('/');
        return format!("{}/{}/{}", endpoint, settings.bucket, key);
    }

    format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        settings.bucket, settings.region, key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            bucket: "notes".to_string(),
            region: "eu-west-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_virtual_hosted_url() {
        assert_eq!(
            public_url(&settings(), "images/2024/03/x.png"),
            "https://notes.s3.eu-west-1.amazonaws.com/images/2024/03/x.png"
        );
    }

    #[test]
    fn test_public_base_url_strips_one_slash() {
        let mut settings = settings();
        settings.public_base_url = Some("https://cdn.example.com/".to_string());
        assert_eq!(
            public_url(&settings, "a/b.png"),
            "https://cdn.example.com/a/b.png"
        );

        settings.public_base_url = Some("https://cdn.example.com".to_string());
        assert_eq!(
            public_url(&settings, "a/b.png"),
            "https://cdn.example.com/a/b.png"
        );
    }

    #[test]
    fn test_endpoint_url_is_path_style() {
        let mut settings = settings();
        settings.endpoint_url = Some("http://localhost:9000/".to_string());
        assert_eq!(
            public_url(&settings, "a/b.png"),
            "http://localhost:9000/notes/a/b.png"
        );
    }

    #[test]
    fn test_upload_result_name() {
        let result = UploadResult::new("u".to_string(), "images/2024/x.png");
        assert_eq!(result.name, "x.png");
        assert_eq!(object_name("flat.png"), "flat.png");
        assert_eq!(object_name("dir/"), "dir/");
    }
}
