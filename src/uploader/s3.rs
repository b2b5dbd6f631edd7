use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::fs;
use tokio::sync::OnceCell;

use super::{public_url, ImageUploader, UploadResult};
use crate::config::Settings;
use crate::naming::mime_type;
use crate::{PasteError, Result};

/// Uploads through the AWS SDK using its default credential chain.
pub struct S3Uploader {
    settings: Settings,
    client: OnceCell<Client>,
}

impl S3Uploader {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.settings.region.clone()))
                    .load()
                    .await;

                let mut builder = aws_sdk_s3::config::Builder::from(&shared);
                if let Some(endpoint) = self.settings.endpoint_url.as_deref() {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }

                Client::from_conf(builder.build())
            })
            .await
    }
}

#[async_trait]
impl ImageUploader for S3Uploader {
    async fn upload(
        &self,
        path: &Path,
        key: &str,
        original_filename: &str,
    ) -> Result<UploadResult> {
        let data = fs::read(path).await?;
        let size = data.len();
        let content_type = mime_type(original_filename);
        let start = std::time::Instant::now();

        let mut request = self
            .client()
            .await
            .put_object()
            .bucket(&self.settings.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type);

        if self.settings.use_acl_public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request.send().await.map_err(|e| {
            let detail = DisplayErrorContext(e).to_string();
            tracing::error!(
                error = %detail,
                bucket = %self.settings.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            PasteError::Upload(detail)
        })?;

        tracing::info!(
            bucket = %self.settings.bucket,
            key = %key,
            content_type = content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(UploadResult::new(public_url(&self.settings, key), key))
    }
}
