//! Runs one upload: the video itself, then the optional follow-up steps.

use crate::api::{CaptionTrack, VideoApi, VideoMetadata, VideoSnippet, VideoStatus};
use crate::error::UploadError;
use crate::request::{UploadRequest, UploadResult};
use std::path::PathBuf;
use yt_oauth::Credential;

/// Optional work done against an already created video.
///
/// Each step is its own failure boundary: an error is logged by the
/// [`Uploader`] and never affects the other steps or the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostUploadStep {
    Thumbnail(PathBuf),
    Captions { file: PathBuf, track: CaptionTrack },
    Playlist(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped,
}

impl PostUploadStep {
    /// Steps requested by `request`, in execution order.
    pub fn plan(request: &UploadRequest) -> Vec<Self> {
        let mut steps = Vec::new();
        if let Some(path) = &request.thumbnail_path {
            steps.push(Self::Thumbnail(path.clone()));
        }
        if let Some(path) = &request.subtitle_path {
            steps.push(Self::Captions {
                file: path.clone(),
                track: CaptionTrack {
                    language: request.subtitle_language.clone(),
                    name: request.subtitle_name.clone(),
                },
            });
        }
        if let Some(id) = &request.playlist_id {
            steps.push(Self::Playlist(id.clone()));
        }
        steps
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Thumbnail(_) => "thumbnail",
            Self::Captions { .. } => "subtitles",
            Self::Playlist(_) => "playlist",
        }
    }

    pub async fn run<A: VideoApi + ?Sized>(
        &self,
        api: &A,
        credential: &Credential,
        video_id: &str,
    ) -> Result<StepOutcome, UploadError> {
        match self {
            Self::Thumbnail(path) => {
                if !path.exists() {
                    tracing::warn!(path = %path.display(), "thumbnail file not found, skipping");
                    return Ok(StepOutcome::Skipped);
                }
                tracing::info!("uploading thumbnail");
                api.set_thumbnail(credential, video_id, path).await?;
                tracing::info!("thumbnail uploaded");
            }
            Self::Captions { file, track } => {
                if !file.exists() {
                    tracing::error!(path = %file.display(), "subtitle file not found");
                    return Ok(StepOutcome::Skipped);
                }
                tracing::info!(language = %track.language, name = %track.name, "uploading subtitles");
                api.insert_caption(credential, video_id, track, file).await?;
                tracing::info!("subtitles uploaded");
            }
            Self::Playlist(playlist_id) => {
                tracing::info!(playlist = %playlist_id, "adding to playlist");
                api.insert_playlist_item(credential, playlist_id, video_id)
                    .await?;
                tracing::info!("added to playlist");
            }
        }
        Ok(StepOutcome::Done)
    }
}

pub struct Uploader<A> {
    api: A,
}

impl<A: VideoApi> Uploader<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Upload `request.video_path` and apply the optional steps.
    ///
    /// Only an unreadable video file or a failed video creation is an error;
    /// once the video exists it is never deleted, whatever happens afterwards.
    pub async fn upload(
        &self,
        credential: &Credential,
        request: &UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        let size = std::fs::metadata(&request.video_path)
            .map_err(|source| UploadError::VideoFile {
                path: request.video_path.clone(),
                source,
            })?
            .len();

        let metadata = VideoMetadata {
            snippet: VideoSnippet {
                title: request.effective_title(),
                description: request.description.clone().unwrap_or_default(),
                tags: request.tags.clone(),
                category_id: request.category_id.clone(),
            },
            status: VideoStatus {
                privacy_status: request.privacy,
                self_declared_made_for_kids: false,
            },
        };

        log_summary(request, &metadata, size);

        if request.dry_run {
            tracing::info!("[DRY RUN] would upload video with above settings");
            return Ok(UploadResult::dry_run());
        }

        tracing::info!("uploading... (this may take a while for large files)");
        let video_id = self
            .api
            .insert_video(credential, &metadata, &request.video_path)
            .await?;
        let result = UploadResult::for_video(video_id);
        tracing::info!(video_id = %result.video_id, url = %result.url, "upload complete");

        for step in PostUploadStep::plan(request) {
            if let Err(e) = step.run(&self.api, credential, &result.video_id).await {
                tracing::error!(step = step.name(), error = %e, "post-upload step failed");
            }
        }

        Ok(result)
    }
}

fn log_summary(request: &UploadRequest, metadata: &VideoMetadata, size: u64) {
    let file_name = request
        .video_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| request.video_path.display().to_string());

    tracing::info!("=== Uploading to YouTube ===");
    tracing::info!("Title: {}", metadata.snippet.title);
    tracing::info!("Privacy: {}", request.privacy);
    tracing::info!("Category: {}", request.category_id);
    if !request.tags.is_empty() {
        tracing::info!("Tags: {}", request.tags.join(", "));
    }
    if request.is_short {
        tracing::info!("Type: YouTube Short");
    }
    tracing::info!(
        "File: {} ({:.2} MB)",
        file_name,
        size as f64 / (1024.0 * 1024.0)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockVideoApi;
    use crate::request::Privacy;
    use mockall::Sequence;
    use std::path::Path;
    use tempfile::TempDir;

    fn credential() -> Credential {
        Credential {
            access_token: "token".to_string(),
            refresh_token: None,
            scope: String::new(),
            token_type: "Bearer".to_string(),
            expiry_date: u64::MAX,
        }
    }

    fn video_in(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("a.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        path
    }

    fn upload_error() -> UploadError {
        UploadError::Api {
            status: 500,
            body: "backendError".to_string(),
        }
    }

    #[tokio::test]
    async fn demo_upload_returns_short_link() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = UploadRequest::new(video_in(&dir), "Demo");
        request.privacy = Privacy::Public;
        request.tags = vec!["x".to_string(), "y".to_string()];

        let mut api = MockVideoApi::new();
        api.expect_insert_video()
            .withf(|_, m, _| {
                m.snippet.title == "Demo"
                    && m.snippet.tags == ["x", "y"]
                    && m.snippet.description.is_empty()
                    && m.snippet.category_id == "22"
                    && m.status.privacy_status == Privacy::Public
                    && !m.status.self_declared_made_for_kids
            })
            .times(1)
            .returning(|_, _, _| Ok("ABC123".to_string()));

        let result = Uploader::new(api)
            .upload(&credential(), &request)
            .await
            .unwrap();

        assert_eq!(
            result,
            UploadResult {
                video_id: "ABC123".to_string(),
                url: "https://youtu.be/ABC123".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn dry_run_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = UploadRequest::new(video_in(&dir), "Demo");
        request.dry_run = true;
        request.thumbnail_path = Some(video_in(&dir));
        request.playlist_id = Some("PL1".to_string());

        // No expectations: any API call panics.
        let result = Uploader::new(MockVideoApi::new())
            .upload(&credential(), &request)
            .await
            .unwrap();

        assert_eq!(result.video_id, "DRY_RUN");
        assert_eq!(result.url, "https://youtu.be/DRY_RUN");
    }

    #[tokio::test]
    async fn missing_video_file_is_fatal() {
        let request = UploadRequest::new("/nonexistent/a.mp4", "Demo");

        let err = Uploader::new(MockVideoApi::new())
            .upload(&credential(), &request)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::VideoFile { .. }));
    }

    #[tokio::test]
    async fn shorts_title_is_submitted_with_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = UploadRequest::new(video_in(&dir), "Cat jumps");
        request.is_short = true;

        let mut api = MockVideoApi::new();
        api.expect_insert_video()
            .withf(|_, m, _| m.snippet.title == "Cat jumps #Shorts")
            .times(1)
            .returning(|_, _, _| Ok("S1".to_string()));

        Uploader::new(api)
            .upload(&credential(), &request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_video_creation_skips_follow_up_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = UploadRequest::new(video_in(&dir), "Demo");
        request.playlist_id = Some("PL1".to_string());

        let mut api = MockVideoApi::new();
        api.expect_insert_video()
            .times(1)
            .returning(|_, _, _| Err(upload_error()));

        let err = Uploader::new(api)
            .upload(&credential(), &request)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn missing_thumbnail_and_subtitles_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = UploadRequest::new(video_in(&dir), "Demo");
        request.thumbnail_path = Some(dir.path().join("missing.jpg"));
        request.subtitle_path = Some(dir.path().join("missing.srt"));

        let mut api = MockVideoApi::new();
        api.expect_insert_video()
            .times(1)
            .returning(|_, _, _| Ok("ABC123".to_string()));

        let result = Uploader::new(api)
            .upload(&credential(), &request)
            .await
            .unwrap();

        assert_eq!(result.url, "https://youtu.be/ABC123");
    }

    #[tokio::test]
    async fn failing_steps_do_not_stop_later_steps() {
        let dir = tempfile::tempdir().unwrap();
        let thumbnail = dir.path().join("thumb.jpg");
        let subtitles = dir.path().join("subs.srt");
        std::fs::write(&thumbnail, b"jpeg").unwrap();
        std::fs::write(&subtitles, b"1\n00:00:00,000 --> 00:00:01,000\nhi\n").unwrap();

        let mut request = UploadRequest::new(video_in(&dir), "Demo");
        request.thumbnail_path = Some(thumbnail.clone());
        request.subtitle_path = Some(subtitles.clone());
        request.subtitle_language = "en".to_string();
        request.subtitle_name = "English".to_string();
        request.playlist_id = Some("PL1".to_string());

        let mut seq = Sequence::new();
        let mut api = MockVideoApi::new();
        api.expect_insert_video()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("ABC123".to_string()));
        api.expect_set_thumbnail()
            .withf(move |_, id, path| id == "ABC123" && path == thumbnail.as_path())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(upload_error()));
        api.expect_insert_caption()
            .withf(move |_, id, track, path| {
                id == "ABC123"
                    && track.language == "en"
                    && track.name == "English"
                    && path == subtitles.as_path()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Err(upload_error()));
        api.expect_insert_playlist_item()
            .withf(|_, playlist, id| playlist == "PL1" && id == "ABC123")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let result = Uploader::new(api)
            .upload(&credential(), &request)
            .await
            .unwrap();

        assert_eq!(result.video_id, "ABC123");
    }

    #[test]
    fn plan_orders_steps_and_omits_absent_ones() {
        let mut request = UploadRequest::new("a.mp4", "Demo");
        assert!(PostUploadStep::plan(&request).is_empty());

        request.playlist_id = Some("PL1".to_string());
        request.subtitle_path = Some(PathBuf::from("subs.srt"));
        request.thumbnail_path = Some(PathBuf::from("thumb.png"));

        let names: Vec<_> = PostUploadStep::plan(&request)
            .iter()
            .map(PostUploadStep::name)
            .collect();
        assert_eq!(names, ["thumbnail", "subtitles", "playlist"]);
    }

    #[tokio::test]
    async fn each_step_runs_in_isolation() {
        let mut api = MockVideoApi::new();
        api.expect_insert_playlist_item()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let outcome = PostUploadStep::Playlist("PL1".to_string())
            .run(&api, &credential(), "ABC123")
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::Done);

        let outcome = PostUploadStep::Thumbnail(Path::new("/nonexistent.png").to_path_buf())
            .run(&api, &credential(), "ABC123")
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::Skipped);
    }
}
