//! YouTube Data API v3 calls used by an upload.

use crate::error::UploadError;
use crate::request::Privacy;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use yt_oauth::Credential;

pub const GOOGLE_API_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: Privacy,
    pub self_declared_made_for_kids: bool,
}

/// `snippet` and `status` parts of a video resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: Option<String>,
}

/// Remote operations an upload is made of.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Create the video resource with the file as payload; returns the video id.
    async fn insert_video(
        &self,
        credential: &Credential,
        metadata: &VideoMetadata,
        video: &Path,
    ) -> Result<String, UploadError>;

    async fn set_thumbnail(
        &self,
        credential: &Credential,
        video_id: &str,
        image: &Path,
    ) -> Result<(), UploadError>;

    async fn insert_caption(
        &self,
        credential: &Credential,
        video_id: &str,
        track: &CaptionTrack,
        file: &Path,
    ) -> Result<(), UploadError>;

    async fn insert_playlist_item(
        &self,
        credential: &Credential,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), UploadError>;
}

/// reqwest-backed [`VideoApi`]
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YouTubeClient {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_API_BASE)
    }

    /// Point at another host serving the same paths
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resumable upload: open a session with the metadata, then PUT the file.
    async fn resumable_upload<M: Serialize + Sync>(
        &self,
        credential: &Credential,
        resource: &str,
        part: &str,
        metadata: &M,
        file: &Path,
    ) -> Result<CreatedResource, UploadError> {
        let content_type = content_type_for(file);
        let handle = tokio::fs::File::open(file)
            .await
            .map_err(|source| UploadError::File {
                path: file.to_path_buf(),
                source,
            })?;
        let length = handle
            .metadata()
            .await
            .map_err(|source| UploadError::File {
                path: file.to_path_buf(),
                source,
            })?
            .len();

        let url = format!("{}/upload/youtube/v3/{}", self.base_url, resource);
        let session = self
            .client
            .post(&url)
            .query(&[("uploadType", "resumable"), ("part", part)])
            .bearer_auth(&credential.access_token)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", length)
            .json(metadata)
            .send()
            .await?;
        let session = ensure_success(session).await?;

        let location = session
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(UploadError::MissingField("resumable session location"))?
            .to_string();

        tracing::debug!(resource, bytes = length, "streaming upload body");

        let response = self
            .client
            .put(&location)
            .bearer_auth(&credential.access_token)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, length)
            .body(reqwest::Body::from(handle))
            .send()
            .await?;
        let response = ensure_success(response).await?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VideoApi for YouTubeClient {
    async fn insert_video(
        &self,
        credential: &Credential,
        metadata: &VideoMetadata,
        video: &Path,
    ) -> Result<String, UploadError> {
        let created = self
            .resumable_upload(credential, "videos", "snippet,status", metadata, video)
            .await?;
        created.id.ok_or(UploadError::MissingField("video id"))
    }

    async fn set_thumbnail(
        &self,
        credential: &Credential,
        video_id: &str,
        image: &Path,
    ) -> Result<(), UploadError> {
        let data = tokio::fs::read(image)
            .await
            .map_err(|source| UploadError::File {
                path: image.to_path_buf(),
                source,
            })?;

        let url = format!("{}/upload/youtube/v3/thumbnails/set", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("videoId", video_id), ("uploadType", "media")])
            .bearer_auth(&credential.access_token)
            .header(CONTENT_TYPE, content_type_for(image))
            .body(data)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn insert_caption(
        &self,
        credential: &Credential,
        video_id: &str,
        track: &CaptionTrack,
        file: &Path,
    ) -> Result<(), UploadError> {
        let metadata = json!({
            "snippet": {
                "videoId": video_id,
                "language": track.language,
                "name": track.name,
                "isDraft": false,
            }
        });
        self.resumable_upload(credential, "captions", "snippet", &metadata, file)
            .await?;
        Ok(())
    }

    async fn insert_playlist_item(
        &self,
        credential: &Credential,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), UploadError> {
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id,
                },
            }
        });

        let url = format!("{}/youtube/v3/playlistItems", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("part", "snippet")])
            .bearer_auth(&credential.access_token)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Api { status, body })
}

/// MIME type by file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("srt") => "application/x-subrip",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}
