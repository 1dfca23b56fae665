use eyre::{Result, bail, eyre};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::bilibili::{choose_track, fetch_caption_body, fetch_metadata, fetch_tracks, parse_segments};
use crate::config::Settings;
use crate::media::resolve_media_url;
use crate::output::{NoteHeader, caption_source_label, render_markdown};
use crate::rewrite::rewrite;
use crate::transcribe::{TranscriptionProvider, transcribe};
use crate::{Preference, VideoMetadata, extract_bvid};

/// Title used for a successful note when the video has none
const DEFAULT_NOTE_TITLE: &str = "学习笔记";
/// Caption-source label for notes built from a transcription
const TRANSCRIBED_LABEL: &str = "AI转写";

/// One note request
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    pub credential: Option<String>,
    pub page: usize,
    pub prefer: Preference,
    pub rewrite: bool,
}

impl Request {
    fn rewrite_credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .filter(|c| self.rewrite && !c.trim().is_empty())
    }
}

/// Structured details for a video without subtitles
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoSubtitleDetails {
    pub title: String,
    pub has_built_in_subtitles: bool,
    pub subtitle_info: Value,
    pub alternative: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    #[serde(rename_all = "camelCase")]
    Success {
        title: String,
        markdown: String,
        video_url: String,
    },
    NeedsTranscription {
        title: String,
        guidance: String,
        details: NoSubtitleDetails,
    },
}

/// Human readable next steps for a video without subtitles
pub fn guidance_message(title: &str) -> String {
    let title = if title.is_empty() { "未知" } else { title };
    format!(
        "该视频暂无内置字幕。\n\n\
视频标题: {title}\n\n\
替代方案：\n\
1. 使用通义听悟API进行语音转写\n\
2. 先下载视频音频，然后上传到通义听悟\n\
3. 寻找其他带有\"CC\"标识的视频\n\n\
下一步操作：\n\
1. 使用 `bilinote media <URL>` 或SnapAny等工具获取视频文件URL\n\
2. 使用 `bilinote transcribe <视频文件URL>` 创建通义听悟转写任务\n\
3. 等待转写完成\n\
4. 或直接使用 `bilinote note --auto-transcribe <URL>` 完成以上步骤并进行AI排版"
    )
}

/// Validate the request URL and extract its BV id
fn request_bvid(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        bail!("missing video URL");
    }
    extract_bvid(url).ok_or_else(|| eyre!("could not extract a BV id from: {url}"))
}

async fn maybe_rewrite(client: &reqwest::Client, settings: &Settings, request: &Request, markdown: String) -> String {
    match request.rewrite_credential() {
        Some(credential) => rewrite(client, settings, &markdown, credential).await,
        None => {
            debug!("Skipping AI rewrite");
            markdown
        }
    }
}

fn success(meta: &VideoMetadata, request: &Request, markdown: String) -> ProcessingOutcome {
    let title = if meta.title.is_empty() { DEFAULT_NOTE_TITLE } else { &meta.title };
    ProcessingOutcome::Success {
        title: title.to_string(),
        markdown,
        video_url: request.url.clone(),
    }
}

/// Turn a video URL into a study note built from its subtitles
pub async fn process(client: &reqwest::Client, settings: &Settings, request: &Request) -> Result<ProcessingOutcome> {
    let bvid = request_bvid(&request.url)?;
    info!("Processing {bvid}");

    let meta = fetch_metadata(client, settings, &bvid).await?;
    let cid = meta
        .pick_cid(request.page)
        .ok_or_else(|| eyre!("could not determine a cid for {bvid}"))?;
    debug!("Using cid {cid} for page {}", request.page);

    let listing = fetch_tracks(client, settings, &bvid, cid).await?;
    if listing.tracks.is_empty() {
        info!("No subtitles for {bvid}; transcription needed");
        return Ok(ProcessingOutcome::NeedsTranscription {
            title: meta.title.clone(),
            guidance: guidance_message(&meta.title),
            details: NoSubtitleDetails {
                title: meta.title,
                has_built_in_subtitles: false,
                subtitle_info: listing.subtitle_info,
                alternative: "tingwu".to_string(),
                message: "该视频无内置字幕，建议使用通义听悟API进行语音转写".to_string(),
            },
        });
    }

    let track = choose_track(&listing.tracks, request.prefer)
        .ok_or_else(|| eyre!("no subtitle track selected for {bvid}"))?;
    debug!("Chosen subtitle track: lan={} lan_doc={}", track.lan, track.lan_doc);

    let body = fetch_caption_body(client, settings, &track.url).await?;
    let segments = parse_segments(&body);
    debug!("Parsed {} segments", segments.len());

    let markdown = render_markdown(
        &NoteHeader {
            title: &meta.title,
            url: &request.url,
            owner: &meta.owner,
            bvid: &bvid,
            source: caption_source_label(track),
        },
        &segments,
    );
    let markdown = maybe_rewrite(client, settings, request, markdown).await;

    Ok(success(&meta, request, markdown))
}

/// Build a note for a video without subtitles: resolve its media URL, run it
/// through a transcription provider and render the result.
pub async fn recover(
    client: &reqwest::Client,
    settings: &Settings,
    provider: &dyn TranscriptionProvider,
    request: &Request,
    language: &str,
) -> Result<ProcessingOutcome> {
    let bvid = request_bvid(&request.url)?;
    info!("Recovering {bvid} through {}", provider.name());

    let meta = fetch_metadata(client, settings, &bvid).await?;
    let media = resolve_media_url(client, settings, &request.url).await?;
    debug!("Media URL ({}): {}", media.source, media.video_url);

    let transcription = transcribe(provider, &media.video_url, language, settings.transcribe_wait).await?;

    let markdown = render_markdown(
        &NoteHeader {
            title: &meta.title,
            url: &request.url,
            owner: &meta.owner,
            bvid: &bvid,
            source: TRANSCRIBED_LABEL,
        },
        &transcription.segments,
    );
    let markdown = maybe_rewrite(client, settings, request, markdown).await;

    Ok(success(&meta, request, markdown))
}
