//! REST API client.
//!
//! [`ChatApi`] is the contract the store depends on; [`HttpApi`] implements
//! it over `reqwest` against the backend routes.

mod chat_rooms;
mod documents;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};

use crate::auth::TokenProvider;
use crate::errors::ApiError;
use crate::models::{
    ChatRoom, DocumentStatusResponse, Message, PodcastStatusResponse, UploadResponse,
};

/// Multipart field name the backend expects for uploads.
pub const UPLOAD_FIELD: &str = "pdf";

/// Content type sent with uploaded files.
pub const PDF_MIME: &str = "application/pdf";

/// A PDF ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as the name.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ApiError::InvalidUpload(format!("Path has no file name: {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }
}

/// Operations the client store needs from the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// GET /chatrooms
    async fn get_chat_rooms(&self) -> Result<Vec<ChatRoom>, ApiError>;

    /// POST /upload/pdf
    async fn upload_pdf(&self, file: UploadFile) -> Result<UploadResponse, ApiError>;

    /// GET /chatrooms/{id}/messages
    async fn get_messages(&self, chat_room_id: &str) -> Result<Vec<Message>, ApiError>;

    /// POST /chatrooms/{id}/messages, returning the assistant reply.
    async fn post_message(&self, chat_room_id: &str, message: &str) -> Result<Message, ApiError>;

    /// GET /documents/{id}/status
    async fn get_document_status(
        &self,
        document_id: &str,
    ) -> Result<DocumentStatusResponse, ApiError>;

    /// POST /documents/{id}/podcast
    async fn start_podcast_generation(&self, document_id: &str) -> Result<(), ApiError>;

    /// GET /documents/{id}/podcast/status
    async fn get_podcast_status(&self, document_id: &str)
        -> Result<PodcastStatusResponse, ApiError>;
}

/// HTTP implementation of [`ChatApi`].
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpApi {
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url, tokens)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidUrl(format!("Base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach a fresh bearer token, send, and reject non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.tokens.token().await?;
        let resp = request.bearer_auth(token).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!("Backend returned HTTP {}", status);
            return Err(ApiError::Status {
                status,
                message: text,
            });
        }

        Ok(resp)
    }
}

#[async_trait]
impl ChatApi for HttpApi {
    async fn get_chat_rooms(&self) -> Result<Vec<ChatRoom>, ApiError> {
        self.list_chat_rooms().await
    }

    async fn upload_pdf(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        self.upload_document(file).await
    }

    async fn get_messages(&self, chat_room_id: &str) -> Result<Vec<Message>, ApiError> {
        self.list_messages(chat_room_id).await
    }

    async fn post_message(&self, chat_room_id: &str, message: &str) -> Result<Message, ApiError> {
        self.create_message(chat_room_id, message).await
    }

    async fn get_document_status(
        &self,
        document_id: &str,
    ) -> Result<DocumentStatusResponse, ApiError> {
        self.document_status(document_id).await
    }

    async fn start_podcast_generation(&self, document_id: &str) -> Result<(), ApiError> {
        self.start_podcast(document_id).await
    }

    async fn get_podcast_status(
        &self,
        document_id: &str,
    ) -> Result<PodcastStatusResponse, ApiError> {
        self.podcast_status(document_id).await
    }
}
