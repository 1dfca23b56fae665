pub mod bilibili;
pub mod config;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod rewrite;
pub mod transcribe;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single timed subtitle segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A subtitle track offered by the player API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    /// Language code, e.g. `ai-zh` or `zh-CN`
    pub lan: String,
    /// Human readable label, e.g. `中文（自动生成）`
    pub lan_doc: String,
    pub url: String,
}

/// Video details needed to pick a stream and render a note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub bvid: String,
    pub title: String,
    pub owner: String,
    /// Per-page content stream ids, in page order
    pub cids: Vec<u64>,
    /// Top-level content stream id
    pub cid: Option<u64>,
}

impl VideoMetadata {
    /// Pick the content stream for a page. Out-of-range pages are clamped and a
    /// video without a page list falls back to its top-level cid.
    pub fn pick_cid(&self, page: usize) -> Option<u64> {
        if self.cids.is_empty() {
            return self.cid;
        }
        let idx = page.min(self.cids.len() - 1);
        self.cids.get(idx).copied()
    }
}

/// Which subtitle track to favour when several exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    /// Machine-generated (`ai-*`) tracks first
    #[default]
    Ai,
    /// Chinese tracks first, ignoring machine-generated ones
    Native,
}

static BVID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"BV[0-9A-Za-z]+").expect("BV id pattern is valid"));

/// Extract the first BV id found anywhere in the input
pub fn extract_bvid(input: &str) -> Option<String> {
    BVID_RE.find(input).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url() {
        assert_eq!(
            extract_bvid("https://www.bilibili.com/video/BV1GJ411x7h7"),
            Some("BV1GJ411x7h7".to_string())
        );
    }

    #[test]
    fn test_video_url_with_query() {
        assert_eq!(
            extract_bvid("https://www.bilibili.com/video/BV1GJ411x7h7/?p=2&spm_id_from=333.788"),
            Some("BV1GJ411x7h7".to_string())
        );
    }

    #[test]
    fn test_bare_bvid() {
        assert_eq!(extract_bvid("BV1xx411c7mD"), Some("BV1xx411c7mD".to_string()));
    }

    #[test]
    fn test_bvid_inside_share_text() {
        assert_eq!(
            extract_bvid("【标题】 https://b23.tv/x?bv=BV1ab411c7XY 快来看"),
            Some("BV1ab411c7XY".to_string())
        );
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(extract_bvid("BV1aaa and BV1bbb"), Some("BV1aaa".to_string()));
    }

    #[test]
    fn test_no_bvid() {
        assert_eq!(extract_bvid("https://www.bilibili.com/video/av170001"), None);
        assert_eq!(extract_bvid(""), None);
        assert_eq!(extract_bvid("bv1lowercase"), None);
    }

    #[test]
    fn test_pick_cid_first_page_by_default() {
        let meta = VideoMetadata {
            cids: vec![11, 22, 33],
            cid: Some(11),
            ..Default::default()
        };
        assert_eq!(meta.pick_cid(0), Some(11));
        assert_eq!(meta.pick_cid(1), Some(22));
    }

    #[test]
    fn test_pick_cid_clamps_page() {
        let meta = VideoMetadata {
            cids: vec![11, 22],
            ..Default::default()
        };
        assert_eq!(meta.pick_cid(7), Some(22));
    }

    #[test]
    fn test_pick_cid_without_pages() {
        let meta = VideoMetadata {
            cid: Some(99),
            ..Default::default()
        };
        assert_eq!(meta.pick_cid(3), Some(99));
        assert_eq!(VideoMetadata::default().pick_cid(0), None);
    }
}
