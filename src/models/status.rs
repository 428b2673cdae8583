//! Lifecycle statuses for uploads, document ingestion and podcasts.

use serde::{Deserialize, Serialize};

/// Upload and ingestion lifecycle as shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Processing,
    Success,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Processing => "processing",
            UploadStatus::Success => "success",
            UploadStatus::Failed => "failed",
        }
    }
}

/// Podcast generation lifecycle for the active document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PodcastStatus {
    #[default]
    None,
    Generating,
    Completed,
    Failed,
}

impl PodcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodcastStatus::None => "NONE",
            PodcastStatus::Generating => "GENERATING",
            PodcastStatus::Completed => "COMPLETED",
            PodcastStatus::Failed => "FAILED",
        }
    }

    /// Map a backend status string. Unknown values mean work is still in progress.
    pub fn from_server(s: &str) -> Self {
        match s {
            "NONE" => PodcastStatus::None,
            "COMPLETED" => PodcastStatus::Completed,
            "FAILED" => PodcastStatus::Failed,
            _ => PodcastStatus::Generating,
        }
    }
}

/// Podcast status together with its playable audio URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodcastState {
    pub status: PodcastStatus,
    pub url: Option<String>,
}

/// Backend document ingestion status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPhase {
    Completed,
    Failed,
    Pending(String),
}

impl DocumentPhase {
    pub fn from_server(s: &str) -> Self {
        match s {
            "COMPLETED" => DocumentPhase::Completed,
            "FAILED" => DocumentPhase::Failed,
            other => DocumentPhase::Pending(other.to_string()),
        }
    }
}

/// Response of `POST /upload/pdf`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub document_id: Option<String>,
}

/// Response of `GET /documents/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStatusResponse {
    pub status: String,
}

impl DocumentStatusResponse {
    pub fn phase(&self) -> DocumentPhase {
        DocumentPhase::from_server(&self.status)
    }
}

/// Response of `GET /documents/{id}/podcast/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastStatusResponse {
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl PodcastStatusResponse {
    pub fn podcast_status(&self) -> PodcastStatus {
        PodcastStatus::from_server(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_phase_mapping() {
        assert_eq!(DocumentPhase::from_server("COMPLETED"), DocumentPhase::Completed);
        assert_eq!(DocumentPhase::from_server("FAILED"), DocumentPhase::Failed);
        assert_eq!(
            DocumentPhase::from_server("PROCESSING"),
            DocumentPhase::Pending("PROCESSING".to_string())
        );
    }

    #[test]
    fn test_podcast_status_mapping() {
        assert_eq!(PodcastStatus::from_server("NONE"), PodcastStatus::None);
        assert_eq!(PodcastStatus::from_server("COMPLETED"), PodcastStatus::Completed);
        assert_eq!(PodcastStatus::from_server("FAILED"), PodcastStatus::Failed);
        assert_eq!(PodcastStatus::from_server("GENERATING"), PodcastStatus::Generating);
        assert_eq!(PodcastStatus::from_server("QUEUED"), PodcastStatus::Generating);
    }

    #[test]
    fn test_podcast_status_response_null_url() {
        let resp: PodcastStatusResponse =
            serde_json::from_str(r#"{"status":"GENERATING","url":null}"#).unwrap();
        assert!(resp.url.is_none());
        assert_eq!(resp.podcast_status(), PodcastStatus::Generating);
    }

    #[test]
    fn test_upload_response_missing_document_id() {
        let resp: UploadResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.document_id.is_none());
    }
}
