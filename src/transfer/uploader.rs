//! S3 uploads.

use std::path::Path;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::{Result, StackpilotError, TransferError};
use crate::report;

/// Uploads local files to S3.
///
/// Objects are written with the `bucket-owner-full-control` ACL so uploads
/// into buckets owned by another account remain readable there.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
}

impl Uploader {
    /// Creates an uploader from shared AWS configuration.
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Uploads `file` to `s3://bucket/key`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Upload`] when the local file does not exist
    /// or the upload fails.
    pub async fn upload(&self, file: &Path, bucket: &str, key: &str) -> Result<()> {
        let file_name = file.display().to_string();
        if !file.is_file() {
            return Err(upload_error(&file_name, bucket, key, "local file not found"));
        }

        debug!("Uploading {file_name} to s3://{bucket}/{key}");
        let body = ByteStream::from_path(file)
            .await
            .map_err(|e| upload_error(&file_name, bucket, key, &e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::BucketOwnerFullControl)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                upload_error(&file_name, bucket, key, &DisplayErrorContext(e).to_string())
            })?;

        report::success(&format!("Uploaded {file_name} to s3://{bucket}/{key}"));
        Ok(())
    }
}

fn upload_error(file: &str, bucket: &str, key: &str, message: &str) -> StackpilotError {
    StackpilotError::Transfer(TransferError::Upload {
        file: file.to_string(),
        bucket: bucket.to_string(),
        key: key.to_string(),
        message: message.to_string(),
    })
}
