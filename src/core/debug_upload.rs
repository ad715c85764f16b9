//! Diagnostic artifact uploads.
//!
//! Uploads input/output artifacts to object storage under per-request,
//! per-error-class keys and hands back reference URLs. Every upload is
//! best-effort: failures are logged and swallowed so diagnostics can never
//! fail or block the primary response.

use std::sync::Arc;

use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::{error, info};

use crate::utils::now_key_timestamp;

pub const CAF_CONTENT_TYPE: &str = "audio/x-caf";
pub const MP3_CONTENT_TYPE: &str = "audio/mpeg";

/// Fixed note attached to failure envelopes that carry debug file URLs.
pub const DEBUG_NOTE: &str = "Files have been uploaded to S3 for debugging purposes";

pub struct DebugUploader {
    store: Option<Arc<dyn ObjectStore>>,
    bucket: Option<String>,
    region: Option<String>,
    public_url_base: Option<String>,
}

impl DebugUploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: Option<String>,
        region: Option<String>,
        public_url_base: Option<String>,
    ) -> Self {
        Self {
            store: Some(store),
            bucket,
            region,
            public_url_base,
        }
    }

    /// Uploader used when no storage is configured; every upload is a no-op.
    pub fn disabled() -> Self {
        Self {
            store: None,
            bucket: None,
            region: None,
            public_url_base: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Upload one artifact under `debug/{user}/{timestamp}/{file_name}` and
    /// return its reference URL. Returns `None` on any failure.
    pub async fn upload(
        &self,
        bytes: Bytes,
        file_name: &str,
        user_id: &str,
        content_type: &'static str,
    ) -> Option<String> {
        let store = self.store.as_ref()?;
        let key = format!("debug/{}/{}/{}", user_id, now_key_timestamp(), file_name);

        let object_path = match ObjectPath::parse(&key) {
            Ok(path) => path,
            Err(e) => {
                error!("invalid debug object key {key}: {e}");
                return None;
            }
        };

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.into());
        attributes.insert(Attribute::Metadata("user-id".into()), user_id.to_string().into());
        attributes.insert(Attribute::Metadata("purpose".into()), "debug".into());

        let options = PutOptions::from(attributes);

        match store
            .put_opts(&object_path, PutPayload::from(bytes), options)
            .await
        {
            Ok(_) => {
                let url = self.url_for(&key);
                info!(%url, "debug file uploaded");
                Some(url)
            }
            Err(e) => {
                error!("failed to upload debug file {key}: {e}");
                None
            }
        }
    }

    fn url_for(&self, key: &str) -> String {
        if let Some(base) = &self.public_url_base {
            return format!("{}/{key}", base.trim_end_matches('/'));
        }
        match (&self.bucket, &self.region) {
            (Some(bucket), Some(region)) => {
                format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
            }
            (Some(bucket), None) => format!("https://{bucket}.s3.amazonaws.com/{key}"),
            _ => key.to_string(),
        }
    }

    pub fn input_debug_file_name(request_id: &str) -> String {
        format!("debug-input-{}-{}.caf", now_key_timestamp(), request_id)
    }

    pub fn output_debug_file_name(request_id: &str) -> String {
        format!("debug-output-{}-{}.mp3", now_key_timestamp(), request_id)
    }

    pub fn input_error_file_name(error_class: &str) -> String {
        format!("error-input-{}-{}.caf", now_key_timestamp(), error_class)
    }

    pub fn output_error_file_name(error_class: &str) -> String {
        format!("error-output-{}-{}.mp3", now_key_timestamp(), error_class)
    }
}

/// Upload whatever artifacts a failed pipeline run left behind and collect
/// the URLs for the failure envelope. Missing artifacts are skipped; an
/// empty output buffer is not worth uploading.
pub async fn upload_failure_artifacts(
    uploader: &DebugUploader,
    user_id: &str,
    error_class: &str,
    input: Option<Bytes>,
    output: Option<Bytes>,
) -> Vec<String> {
    let mut urls = Vec::new();

    if let Some(bytes) = input.filter(|bytes| !bytes.is_empty()) {
        let file_name = DebugUploader::input_error_file_name(error_class);
        if let Some(url) = uploader
            .upload(bytes, &file_name, user_id, CAF_CONTENT_TYPE)
            .await
        {
            urls.push(url);
        }
    }

    if let Some(bytes) = output.filter(|bytes| !bytes.is_empty()) {
        let file_name = DebugUploader::output_error_file_name(error_class);
        if let Some(url) = uploader
            .upload(bytes, &file_name, user_id, MP3_CONTENT_TYPE)
            .await
        {
            urls.push(url);
        }
    }

    urls
}
