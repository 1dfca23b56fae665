use eyre::Result;

use crate::pipeline::ProcessingOutcome;
use crate::{CaptionTrack, Segment};

/// Label used when a track has neither a description nor a language code
pub const BUILT_IN_LABEL: &str = "内置字幕";

/// Everything the note header shows besides the body
#[derive(Debug, Clone)]
pub struct NoteHeader<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub owner: &'a str,
    pub bvid: &'a str,
    pub source: &'a str,
}

/// Format seconds as `HH:MM:SS`, truncating fractions
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Describe where the subtitles came from
pub fn caption_source_label(track: &CaptionTrack) -> &str {
    if !track.lan_doc.is_empty() {
        &track.lan_doc
    } else if !track.lan.is_empty() {
        &track.lan
    } else {
        BUILT_IN_LABEL
    }
}

/// Render a study note: title, metadata bullets, then one bullet per segment
pub fn render_markdown(header: &NoteHeader<'_>, segments: &[Segment]) -> String {
    let mut lines = vec![
        format!("# {}", header.title),
        String::new(),
        format!("- 来源: {}", header.url),
        format!("- 作者: {}", header.owner),
        format!("- BV号: {}", header.bvid),
        format!("- 字幕来源: {}", header.source),
        String::new(),
        "## 正文".to_string(),
    ];

    lines.extend(segments.iter().map(|seg| {
        format!(
            "- `{}`–`{}` {}",
            format_timestamp(seg.start),
            format_timestamp(seg.end),
            seg.text
        )
    }));

    lines.join("\n")
}

/// Render a pipeline outcome as pretty JSON
pub fn render_json(outcome: &ProcessingOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}
