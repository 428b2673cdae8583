//! Document upload, ingestion status and podcast endpoints.

use std::path::Path;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::{HttpApi, UploadFile, PDF_MIME, UPLOAD_FIELD};
use crate::errors::ApiError;
use crate::models::{DocumentStatusResponse, PodcastStatusResponse, UploadResponse};

impl HttpApi {
    /// POST /upload/pdf - Upload a PDF as multipart form data.
    pub async fn upload_document(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        if file.bytes.is_empty() {
            return Err(ApiError::InvalidUpload(format!(
                "{} is empty",
                file.file_name
            )));
        }

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(PDF_MIME)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.url(&["upload", "pdf"])?;
        let resp = self.send(self.client.post(url).multipart(form)).await?;
        Ok(resp.json().await?)
    }

    /// GET /documents/:id/status - Ingestion status of a document.
    pub async fn document_status(
        &self,
        document_id: &str,
    ) -> Result<DocumentStatusResponse, ApiError> {
        let url = self.url(&["documents", document_id, "status"])?;
        let resp = self.send(self.client.get(url)).await?;
        Ok(resp.json().await?)
    }

    /// POST /documents/:id/podcast - Ask the backend to generate a podcast.
    pub async fn start_podcast(&self, document_id: &str) -> Result<(), ApiError> {
        let url = self.url(&["documents", document_id, "podcast"])?;
        self.send(self.client.post(url).json(&serde_json::json!({}))).await?;
        Ok(())
    }

    /// GET /documents/:id/podcast/status - Podcast status and audio URL.
    pub async fn podcast_status(
        &self,
        document_id: &str,
    ) -> Result<PodcastStatusResponse, ApiError> {
        let url = self.url(&["documents", document_id, "podcast", "status"])?;
        let resp = self.send(self.client.get(url)).await?;
        Ok(resp.json().await?)
    }

    /// Stream a generated podcast to `dest`, returning the number of bytes written.
    ///
    /// The audio URL is a public asset link, so no credential is attached.
    pub async fn download_podcast(&self, url: &str, dest: &Path) -> Result<u64, ApiError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status {
                status: resp.status().as_u16(),
                message: format!("Podcast download failed for {}", url),
            });
        }

        let mut file = File::create(dest).await?;
        let written = match write_body(resp, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    tracing::warn!("Could not remove partial download {}: {}", dest.display(), rm);
                }
                return Err(e);
            }
        };

        tracing::info!("Saved podcast to {} ({} bytes)", dest.display(), written);
        Ok(written)
    }
}

async fn write_body(resp: Response, file: &mut File) -> Result<u64, ApiError> {
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
