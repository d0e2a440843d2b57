//! Uploads through the backend API.

use pdfchat_core::{UploadAck, UploadSource, Uploader};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::api;
use crate::error::Result;
use crate::rest::successful_body;

/// Submits PDFs to the backend's document endpoints.
///
/// Files go to `POST {base}/api/v1/documents/upload` as the multipart field
/// `file`; links go to `POST {base}/api/v1/documents/upload_link` as
/// `{"pdf_url": ..}`. The backend stores the PDF, inserts the document row and
/// answers with the new document id.
#[derive(Debug, Clone)]
pub struct BackendUploader {
    base: Url,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct LinkPayload<'a> {
    pdf_url: &'a str,
}

impl BackendUploader {
    /// Creates an uploader for the API at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::InvalidUrl`](crate::SupabaseError::InvalidUrl) if `base` cannot be parsed.
    pub fn new(base: &str) -> Result<Self> {
        Self::with_client(base, reqwest::Client::new())
    }

    /// Creates an uploader sharing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::InvalidUrl`](crate::SupabaseError::InvalidUrl) if
    /// `base` cannot be parsed, or
    /// [`SupabaseError::UnsupportedUrl`](crate::SupabaseError::UnsupportedUrl) if it
    /// cannot carry a path.
    pub fn with_client(base: &str, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base: api::parse_base(base)?,
            http,
        })
    }

    /// Endpoint of a document operation.
    #[must_use]
    pub fn endpoint(&self, operation: &str) -> Url {
        api::endpoint(&self.base, ["documents", operation])
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<UploadAck> {
        let body = successful_body(request.send().await?).await?;
        let ack: UploadAck = serde_json::from_str(&body)?;
        info!(
            document = %ack.document_id,
            deduplicated = ack.deduplicated,
            "upload accepted"
        );
        Ok(ack)
    }

    /// Uploads a local PDF.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success responses and undecodable bodies.
    pub async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<UploadAck> {
        let part = Part::bytes(bytes)
            .file_name(name.to_owned())
            .mime_str("application/pdf")?;
        let request = self
            .http
            .post(self.endpoint("upload"))
            .multipart(Form::new().part("file", part));
        self.send(request).await
    }

    /// Asks the backend to fetch a PDF from `link`.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success responses and undecodable bodies.
    pub async fn upload_link(&self, link: &str) -> Result<UploadAck> {
        let request = self
            .http
            .post(self.endpoint("upload_link"))
            .json(&LinkPayload { pdf_url: link });
        self.send(request).await
    }
}

impl Uploader for BackendUploader {
    async fn upload(&self, source: UploadSource) -> pdfchat_core::Result<UploadAck> {
        let ack = match source {
            UploadSource::File { name, bytes } => self.upload_file(&name, bytes).await?,
            UploadSource::Url(link) => self.upload_link(&link).await?,
        };
        Ok(ack)
    }
}
