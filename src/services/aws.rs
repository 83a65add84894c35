// src/services/aws.rs
//! AWS-backed collaborators: S3 document storage and SES mail delivery.
//!
//! Credentials come from the default provider chain (env, profile, instance role).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use bytes::Bytes;
use tracing::{debug, error, info};

use crate::common::config::AwsSettings;
use crate::services::email::{MailError, Mailer, OutgoingEmail};
use crate::services::storage::{new_blob_path, BlobCategory, BlobStore, StorageError};

async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    region: String,
    cloudfront_domain: Option<String>,
}

impl S3BlobStore {
    pub async fn from_settings(settings: &AwsSettings) -> Result<Self, StorageError> {
        let bucket = settings.s3_bucket_name.clone().ok_or_else(|| {
            StorageError::NotConfigured("AWS_S3_BUCKET_NAME is not set".to_string())
        })?;

        let sdk_config = load_sdk_config(&settings.region).await;

        Ok(Self {
            client: S3Client::new(&sdk_config),
            bucket,
            region: settings.region.clone(),
            cloudfront_domain: settings.cloudfront_domain.clone(),
        })
    }

    /// Object URL, through CloudFront when a domain is configured.
    pub fn object_url(bucket: &str, region: &str, cloudfront: Option<&str>, key: &str) -> String {
        match cloudfront {
            Some(domain) => format!("https://{}/{}", domain, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(&self, bytes: Bytes, category: BlobCategory) -> Result<String, StorageError> {
        let key = new_blob_path(category);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, key = %key, "Failed to upload file to S3");
                StorageError::S3Error(format!("Upload failed: {}", e))
            })?;

        info!(key = %key, bucket = %self.bucket, size = size, "File uploaded to S3 successfully");
        Ok(key)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::S3Error(format!("Head failed: {}", e)))
                }
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, key = %path, "Failed to delete S3 object");
                StorageError::S3Error(format!("Delete failed: {}", e))
            })?;

        debug!(key = %path, "File deleted from S3");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        Self::object_url(
            &self.bucket,
            &self.region,
            self.cloudfront_domain.as_deref(),
            path,
        )
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    StorageError::NotFound(path.to_string())
                } else {
                    StorageError::S3Error(format!("Download failed: {}", e))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3Error(format!("Download failed: {}", e)))?;

        Ok(data.into_bytes().to_vec())
    }
}

pub struct SesMailer {
    client: SesClient,
    from_email: String,
}

impl SesMailer {
    pub async fn from_settings(settings: &AwsSettings) -> Result<Self, MailError> {
        let from_email = settings.ses_from_email.clone().ok_or_else(|| {
            MailError::NotConfigured("AWS_SES_FROM_EMAIL is not set".to_string())
        })?;

        let sdk_config = load_sdk_config(&settings.region).await;

        Ok(Self {
            client: SesClient::new(&sdk_config),
            from_email,
        })
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let destination = Destination::builder()
            .to_addresses(email.to.clone())
            .build();

        let subject_content = Content::builder()
            .data(&email.subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailError::SendFailed(format!("Failed to build subject: {}", e)))?;

        let body_content = Content::builder()
            .data(&email.html_body)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailError::SendFailed(format!("Failed to build body: {}", e)))?;

        let message = Message::builder()
            .subject(subject_content)
            .body(SesBody::builder().html(body_content).build())
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from_email)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send email via SES");
                MailError::SendFailed(e.to_string())
            })?;

        info!(message_id = ?result.message_id(), "Email sent successfully via SES");
        Ok(())
    }
}
