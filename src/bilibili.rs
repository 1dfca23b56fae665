use eyre::{Result, WrapErr, bail, eyre};
use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Settings;
use crate::{CaptionTrack, Preference, Segment, VideoMetadata};

/// Marker carried by the language code of machine-generated tracks
const AI_MARKER: &str = "ai";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ViewData {
    #[serde(default)]
    title: String,
    owner: Option<Owner>,
    cid: Option<u64>,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Page {
    cid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PlayerData {
    #[serde(default)]
    subtitle: Value,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    lan: Option<String>,
    lan_doc: Option<String>,
    subtitle_url: Option<String>,
}

/// Subtitle tracks for one content stream, plus the raw subtitle block
#[derive(Debug, Clone)]
pub struct TrackListing {
    pub tracks: Vec<CaptionTrack>,
    pub subtitle_info: Value,
}

async fn get_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> reqwest::Result<T> {
    request.send().await?.error_for_status()?.json().await
}

/// Look up title, uploader and content stream ids for a BV id
pub async fn fetch_metadata(client: &reqwest::Client, settings: &Settings, bvid: &str) -> Result<VideoMetadata> {
    let url = format!("{}/x/web-interface/view", settings.api_base);
    debug!("Fetching video metadata: {url}?bvid={bvid}");

    let request = client
        .get(&url)
        .query(&[("bvid", bvid)])
        .header("User-Agent", &settings.user_agent);
    let resp: ApiResponse<ViewData> = get_json(request)
        .await
        .wrap_err_with(|| format!("metadata lookup for {bvid} failed ({url})"))?;

    if resp.code != 0 {
        bail!("metadata lookup for {bvid} failed: {} (code {})", resp.message, resp.code);
    }
    let data = resp
        .data
        .ok_or_else(|| eyre!("metadata lookup for {bvid} returned no data"))?;

    Ok(VideoMetadata {
        bvid: bvid.to_string(),
        title: data.title,
        owner: data.owner.map(|o| o.name).unwrap_or_default(),
        cids: data.pages.iter().filter_map(|p| p.cid).collect(),
        cid: data.cid,
    })
}

/// List the subtitle tracks of a content stream. An empty list is a normal result.
pub async fn fetch_tracks(client: &reqwest::Client, settings: &Settings, bvid: &str, cid: u64) -> Result<TrackListing> {
    let url = format!("{}/x/player/v2", settings.api_base);
    let cid = cid.to_string();
    debug!("Fetching subtitle list: {url}?cid={cid}&bvid={bvid}");

    let request = client
        .get(&url)
        .query(&[("cid", cid.as_str()), ("bvid", bvid)])
        .header("User-Agent", &settings.user_agent);
    let resp: ApiResponse<PlayerData> = get_json(request)
        .await
        .wrap_err_with(|| format!("subtitle listing for {bvid} failed ({url})"))?;

    if resp.code != 0 {
        bail!("subtitle listing for {bvid} failed: {} (code {})", resp.message, resp.code);
    }

    let subtitle_info = resp.data.map(|d| d.subtitle).unwrap_or(Value::Null);
    let tracks = collect_tracks(&subtitle_info);
    debug!("Found {} subtitle track(s) for {bvid}", tracks.len());

    Ok(TrackListing { tracks, subtitle_info })
}

/// Entries are decoded one by one so a single malformed entry only loses itself
fn collect_tracks(subtitle_info: &Value) -> Vec<CaptionTrack> {
    let Some(entries) = subtitle_info.get("subtitles").and_then(|s| s.as_array()) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match SubtitleEntry::deserialize(entry) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Skipping malformed subtitle entry ({e}): {entry}");
                None
            }
        })
        .map(|s| {
            let lan = s.lan.unwrap_or_default();
            let lan_doc = s.lan_doc.filter(|d| !d.is_empty()).unwrap_or_else(|| lan.clone());
            CaptionTrack {
                lan,
                lan_doc,
                url: absolute_url(s.subtitle_url.as_deref().unwrap_or_default()),
            }
        })
        .collect()
}

/// Subtitle URLs are usually protocol-relative (`//i0.hdslb.com/...`)
fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

fn is_chinese(track: &CaptionTrack) -> bool {
    track.lan_doc.contains("中文") || track.lan_doc.contains("简体") || track.lan == "zh-CN"
}

/// Pick one track: machine-generated first (when preferred), then Chinese, then
/// whatever comes first. Returns `None` only for an empty slice.
pub fn choose_track(tracks: &[CaptionTrack], prefer: Preference) -> Option<&CaptionTrack> {
    let machine = match prefer {
        Preference::Ai => tracks.iter().find(|t| t.lan.contains(AI_MARKER)),
        Preference::Native => None,
    };

    machine
        .or_else(|| tracks.iter().find(|t| is_chinese(t)))
        .or_else(|| tracks.first())
}

/// Download the timed subtitle payload of the chosen track
pub async fn fetch_caption_body(client: &reqwest::Client, settings: &Settings, url: &str) -> Result<Value> {
    debug!("Fetching subtitle body: {url}");

    let request = client
        .get(url)
        .header("User-Agent", &settings.user_agent)
        .header("Referer", &settings.referer);
    get_json(request)
        .await
        .wrap_err_with(|| format!("subtitle download failed ({url})"))
}

fn seconds(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Turn a subtitle payload into segments. Malformed fields degrade to zero or
/// empty text; this never fails.
pub fn parse_segments(body: &Value) -> Vec<Segment> {
    let Some(items) = body.get("body").and_then(|b| b.as_array()) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| Segment {
            start: seconds(item.get("from")),
            end: seconds(item.get("to")),
            text: item
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .trim()
                .to_string(),
        })
        .collect()
}
