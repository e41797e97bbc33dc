use anyhow::{Context, bail};
use clap::Parser;
use clap::error::ErrorKind;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use yt_oauth::TokenManager;
use yt_upload::request::parse_tags;
use yt_upload::{AppConfig, Privacy, UploadRequest, Uploader, YouTubeClient};

/// YouTube Uploader - Upload a video with metadata, thumbnail, subtitles and playlist
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Run OAuth2 authentication
    #[arg(long)]
    auth: bool,

    /// Video file path (required)
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Video title (required)
    #[arg(short, long)]
    title: Option<String>,

    /// Video description
    #[arg(short, long)]
    description: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,

    /// Privacy status
    #[arg(short, long, value_enum, default_value_t = Privacy::Unlisted)]
    privacy: Privacy,

    /// Category ID (22 = People & Blogs)
    #[arg(short, long, default_value = "22")]
    category: String,

    /// Custom thumbnail image
    #[arg(long)]
    thumbnail: Option<PathBuf>,

    /// Subtitle file path (SRT/VTT)
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Subtitle language code
    #[arg(long, default_value = "zh")]
    subtitle_lang: String,

    /// Subtitle display name
    #[arg(long, default_value = "中文")]
    subtitle_name: String,

    /// Add the video to this playlist
    #[arg(long)]
    playlist: Option<String>,

    /// Mark as YouTube Short
    #[arg(long)]
    short: bool,

    /// Preview without uploading
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    /// `--auth` on its own only refreshes or obtains the credential.
    fn auth_only(&self) -> bool {
        self.auth && self.video.is_none()
    }

    fn into_request(self) -> anyhow::Result<UploadRequest> {
        let Some(video_path) = self.video else {
            bail!("--video is required (see --help)");
        };
        let Some(title) = self.title.filter(|t| !t.trim().is_empty()) else {
            bail!("--title is required (see --help)");
        };
        if !video_path.is_file() {
            bail!("video file not found: {}", video_path.display());
        }

        Ok(UploadRequest {
            video_path,
            title,
            description: self.description,
            tags: self.tags.as_deref().map(parse_tags).unwrap_or_default(),
            privacy: self.privacy,
            category_id: self.category,
            thumbnail_path: self.thumbnail,
            subtitle_path: self.subtitles,
            subtitle_language: self.subtitle_lang,
            subtitle_name: self.subtitle_name,
            playlist_id: self.playlist,
            is_short: self.short,
            dry_run: self.dry_run,
        })
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.auth_only() {
        let manager = token_manager()?;
        manager
            .obtain_credential()
            .await
            .context("authentication failed")?;
        tracing::info!("authentication complete, you can now upload videos");
        return Ok(());
    }

    let request = args.into_request()?;

    let manager = token_manager()?;
    let credential = manager
        .obtain_credential()
        .await
        .context("authentication failed")?;

    let uploader = Uploader::new(YouTubeClient::new());
    let result = uploader
        .upload(&credential, &request)
        .await
        .context("upload failed")?;

    println!("{}", result.url);
    Ok(())
}

fn token_manager() -> anyhow::Result<TokenManager> {
    let config = AppConfig::load()?;
    tracing::debug!(token_path = %config.token_path.display(), "configuration loaded");
    Ok(TokenManager::new(config.oauth_config()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("yt-upload").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = parse(&["-v", "a.mp4", "-t", "Demo"]).unwrap();
        assert_eq!(args.privacy, Privacy::Unlisted);
        assert_eq!(args.category, "22");
        assert_eq!(args.subtitle_lang, "zh");
        assert_eq!(args.subtitle_name, "中文");
        assert!(!args.short && !args.dry_run && !args.auth);
    }

    #[test]
    fn full_command_line_builds_request() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("a.mp4");
        std::fs::write(&video, b"video").unwrap();
        let video_arg = video.to_str().unwrap();

        let args = parse(&[
            "--video", video_arg,
            "--title", "Demo",
            "-d", "about",
            "--tags", "x, y",
            "-p", "public",
            "-c", "27",
            "--thumbnail", "t.png",
            "--subtitles", "s.srt",
            "--subtitle-lang", "en",
            "--subtitle-name", "English",
            "--playlist", "PL1",
            "--short",
            "--dry-run",
        ])
        .unwrap();
        let request = args.into_request().unwrap();

        assert_eq!(request.video_path, video);
        assert_eq!(request.tags, vec!["x", "y"]);
        assert_eq!(request.privacy, Privacy::Public);
        assert_eq!(request.category_id, "27");
        assert_eq!(request.description.as_deref(), Some("about"));
        assert_eq!(request.thumbnail_path, Some(PathBuf::from("t.png")));
        assert_eq!(request.subtitle_language, "en");
        assert_eq!(request.playlist_id.as_deref(), Some("PL1"));
        assert!(request.is_short && request.dry_run);
    }

    #[test]
    fn unknown_privacy_is_a_parse_error() {
        let err = parse(&["-v", "a.mp4", "-t", "x", "-p", "secret"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn help_is_a_display_request() {
        assert_eq!(parse(&["-h"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn video_and_title_are_required() {
        let err = parse(&["-t", "Demo"]).unwrap().into_request().unwrap_err();
        assert!(err.to_string().contains("--video"));

        let err = parse(&["-v", "a.mp4"]).unwrap().into_request().unwrap_err();
        assert!(err.to_string().contains("--title"));
    }

    #[test]
    fn missing_video_file_is_rejected() {
        let err = parse(&["-v", "/nonexistent/a.mp4", "-t", "Demo"])
            .unwrap()
            .into_request()
            .unwrap_err();
        assert!(err.to_string().contains("video file not found"));
    }

    #[test]
    fn auth_alone_skips_upload_validation() {
        assert!(parse(&["--auth"]).unwrap().auth_only());
        assert!(!parse(&["--auth", "-v", "a.mp4"]).unwrap().auth_only());
    }
}
