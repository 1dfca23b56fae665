use eyre::{Result, bail, eyre};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::Settings;
use crate::extract_bvid;

/// Where a resolved media URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    /// Returned by the download-assistance service
    Assist,
    /// Synthesized from the BV id; not a real media file
    Placeholder,
}

impl std::fmt::Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaSource::Assist => write!(f, "download-assist"),
            MediaSource::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// A playable media URL for the transcription path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    pub video_url: String,
    pub source: MediaSource,
}

/// Deterministic stand-in URL used when the download-assistance call fails
pub fn placeholder_url(bvid: &str) -> String {
    format!("https://example-bilibili-video.com/{bvid}.mp4")
}

/// Resolve a media URL for a video page. Only a missing BV id is fatal; a
/// failing download-assistance call falls back to the placeholder.
pub async fn resolve_media_url(client: &reqwest::Client, settings: &Settings, video_url: &str) -> Result<ResolvedMedia> {
    let bvid = extract_bvid(video_url).ok_or_else(|| eyre!("could not extract a BV id from: {video_url}"))?;
    debug!("Resolving media URL for {bvid}");

    match ask_download_service(client, settings, video_url).await {
        Ok(url) => {
            info!("Download service resolved {bvid}");
            Ok(ResolvedMedia {
                video_url: url,
                source: MediaSource::Assist,
            })
        }
        Err(e) => {
            let url = placeholder_url(&bvid);
            warn!("Download service failed ({e}); using placeholder {url}, which is not a real media file");
            Ok(ResolvedMedia {
                video_url: url,
                source: MediaSource::Placeholder,
            })
        }
    }
}

async fn ask_download_service(client: &reqwest::Client, settings: &Settings, video_url: &str) -> Result<String> {
    let body = serde_json::json!({
        "url": video_url,
        "format": "mp4",
        "quality": "720p"
    });

    let resp = client
        .post(&settings.download_assist_url)
        .header("User-Agent", &settings.user_agent)
        .header("Content-Type", "application/json")
        .timeout(settings.download_timeout)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        bail!("download service returned {}", resp.status());
    }

    let json: serde_json::Value = resp.json().await?;
    extract_download_url(&json).ok_or_else(|| eyre!("download service reply had no URL"))
}

fn extract_download_url(json: &serde_json::Value) -> Option<String> {
    ["downloadUrl", "url"]
        .iter()
        .filter_map(|key| json.get(*key).and_then(|v| v.as_str()))
        .find(|url| !url.is_empty())
        .map(|url| url.to_string())
}
