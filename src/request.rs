use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Title suffix that flags a video as a YouTube Short
pub const SHORTS_MARKER: &str = "#Shorts";

/// Video id reported when nothing was uploaded
pub const DRY_RUN_VIDEO_ID: &str = "DRY_RUN";

pub const VIDEO_BASE_URL: &str = "https://youtu.be";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    #[default]
    Unlisted,
    Private,
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        })
    }
}

/// Everything needed for one upload, fixed once parsed from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub video_path: PathBuf,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub privacy: Privacy,
    pub category_id: String,
    pub thumbnail_path: Option<PathBuf>,
    pub subtitle_path: Option<PathBuf>,
    pub subtitle_language: String,
    pub subtitle_name: String,
    pub playlist_id: Option<String>,
    pub is_short: bool,
    pub dry_run: bool,
}

impl UploadRequest {
    /// Request with the CLI defaults for everything but the file and title
    pub fn new(video_path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            privacy: Privacy::default(),
            category_id: "22".to_string(),
            thumbnail_path: None,
            subtitle_path: None,
            subtitle_language: "zh".to_string(),
            subtitle_name: "中文".to_string(),
            playlist_id: None,
            is_short: false,
            dry_run: false,
        }
    }

    /// Title as submitted: shorts get the marker appended once.
    pub fn effective_title(&self) -> String {
        if self.is_short {
            with_shorts_marker(&self.title)
        } else {
            self.title.clone()
        }
    }
}

pub fn with_shorts_marker(title: &str) -> String {
    if title.contains(SHORTS_MARKER) {
        title.to_string()
    } else {
        format!("{} {}", title, SHORTS_MARKER)
    }
}

/// Split a comma-separated tag list, trimming and dropping empty entries.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub video_id: String,
    pub url: String,
}

impl UploadResult {
    pub fn for_video(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let url = format!("{}/{}", VIDEO_BASE_URL, video_id);
        Self { video_id, url }
    }

    pub fn dry_run() -> Self {
        Self::for_video(DRY_RUN_VIDEO_ID)
    }
}
