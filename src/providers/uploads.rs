// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Uploadcare integration for attachment storage.
//!
//! Files are pushed to the upload endpoint with the public key; the
//! returned UUID becomes a permanent CDN URL. File-type and size rules are
//! enforced at the API boundary, not here.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const DEFAULT_UPLOAD_BASE_URL: &str = "https://upload.uploadcare.com";
const DEFAULT_CDN_BASE_URL: &str = "https://ucarecdn.com";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Uploadcare configuration missing: {0}")]
    MissingConfig(String),

    #[error("Uploadcare request failed: {0}")]
    Request(String),

    #[error("Uploadcare rejected the upload: {0}")]
    Rejected(String),

    #[error("Uploadcare response was invalid: {0}")]
    InvalidResponse(String),
}

/// A stored file: its CDN URL and the provider's UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub cdn_url: String,
    pub uuid: String,
}

#[derive(Debug, Clone)]
pub struct UploadClient {
    upload_base_url: String,
    cdn_base_url: String,
    public_key: String,
    http: Client,
}

impl UploadClient {
    pub fn is_configured() -> bool {
        required_env_present("UPLOADCARE_PUBLIC_KEY")
    }

    pub fn from_env() -> Result<Self, UploadError> {
        let upload_base_url = env_or_default("UPLOADCARE_UPLOAD_BASE_URL", DEFAULT_UPLOAD_BASE_URL);
        let cdn_base_url = env_or_default("UPLOADCARE_CDN_BASE_URL", DEFAULT_CDN_BASE_URL);
        let public_key = env_required("UPLOADCARE_PUBLIC_KEY")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| UploadError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            upload_base_url,
            cdn_base_url,
            public_key,
            http,
        })
    }

    /// Upload one file and return its CDN location.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, UploadError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| UploadError::Request(format!("invalid content type: {e}")))?;
        let form = Form::new()
            .text("UPLOADCARE_PUB_KEY", self.public_key.clone())
            .text("UPLOADCARE_STORE", "auto")
            .part("file", part);

        debug!(file_name = %file_name, "Uploadcare upload: sending file");

        let response = self
            .http
            .post(format!(
                "{}/base/",
                self.upload_base_url.trim_end_matches('/')
            ))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Request(format!("request failed: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(format!("non-JSON response: {e}")))?;

        if let Some(detail) = extract_rejection(&body) {
            return Err(UploadError::Rejected(detail.to_string()));
        }

        let uuid = extract_file_uuid(&body)
            .ok_or_else(|| UploadError::InvalidResponse("no file UUID received".to_string()))?;

        Ok(UploadedFile {
            cdn_url: cdn_url_for(&self.cdn_base_url, uuid),
            uuid: uuid.to_string(),
        })
    }
}

fn cdn_url_for(cdn_base_url: &str, uuid: &str) -> String {
    format!("{}/{}/", cdn_base_url.trim_end_matches('/'), uuid)
}

fn extract_rejection(body: &Value) -> Option<&str> {
    let error = body.get("error")?;
    Some(
        error
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or("upload rejected"),
    )
}

fn extract_file_uuid(body: &Value) -> Option<&str> {
    body.get("file").and_then(Value::as_str)
}

fn required_env_present(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .is_some()
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_required(name: &str) -> Result<String, UploadError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| UploadError::MissingConfig(name.to_string()))
}
