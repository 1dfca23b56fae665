//! Speech transcription for videos without subtitles.
//!
//! Neither provider produces a real transcript yet: Tingwu submits a genuine
//! task but its result is simulated, and OpenAI-style credentials are handled
//! entirely offline.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use eyre::{Result, bail, eyre};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::Segment;
use crate::config::Settings;

/// Credentials with this prefix select the simulated OpenAI-style provider
const OPENAI_KEY_PREFIX: &str = "sk-";

/// State of a submitted transcription task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Running,
    Completed { text: String, segments: Vec<Segment> },
    Failed(String),
}

/// Finished transcription of one media URL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub task_id: String,
    pub provider: String,
    pub text: String,
    pub segments: Vec<Segment>,
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start a task for a publicly reachable media URL, returning its id
    async fn submit(&self, media_url: &str, language: &str) -> Result<String>;

    async fn poll(&self, task_id: &str) -> Result<TaskStatus>;
}

/// Pick a provider from the shape of the credential
pub fn provider_for(client: &reqwest::Client, settings: &Settings, credential: &str) -> Box<dyn TranscriptionProvider> {
    if credential.starts_with(OPENAI_KEY_PREFIX) {
        Box::new(SimulatedProvider)
    } else {
        Box::new(TingwuProvider::new(client.clone(), settings, credential))
    }
}

/// Submit, wait a fixed interval, then poll once
pub async fn transcribe(
    provider: &dyn TranscriptionProvider,
    media_url: &str,
    language: &str,
    wait: Duration,
) -> Result<Transcription> {
    info!("Submitting {media_url} to {}", provider.name());
    let task_id = provider.submit(media_url, language).await?;
    debug!("Task created: {task_id}");

    tokio::time::sleep(wait).await;

    match provider.poll(&task_id).await? {
        TaskStatus::Completed { text, segments } => Ok(Transcription {
            task_id,
            provider: provider.name().to_string(),
            text,
            segments,
        }),
        TaskStatus::Running => bail!("transcription task {task_id} is still running"),
        TaskStatus::Failed(reason) => bail!("transcription task {task_id} failed: {reason}"),
    }
}

fn seg(start: f64, end: f64, text: &str) -> Segment {
    Segment {
        start,
        end,
        text: text.to_string(),
    }
}

/// Tongyi Tingwu task API
pub struct TingwuProvider {
    client: reqwest::Client,
    url: String,
    app_key: String,
    credential: String,
}

#[derive(Debug, Deserialize)]
struct TingwuTaskResponse {
    #[serde(rename = "TaskId")]
    task_id: Option<String>,
}

impl TingwuProvider {
    pub fn new(client: reqwest::Client, settings: &Settings, credential: &str) -> Self {
        Self {
            client,
            url: settings.tingwu_url.clone(),
            app_key: settings.tingwu_app_key.clone(),
            credential: credential.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for TingwuProvider {
    fn name(&self) -> &'static str {
        "tingwu"
    }

    async fn submit(&self, media_url: &str, language: &str) -> Result<String> {
        let body = serde_json::json!({
            "AppKey": self.app_key,
            "Input": {
                "FileUrl": media_url,
                "SourceLanguage": language
            }
        });

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.credential)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Tingwu task creation returned {status}: {body}");
        }

        let task: TingwuTaskResponse = resp.json().await?;
        task.task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| eyre!("Tingwu task creation returned no TaskId"))
    }

    async fn poll(&self, task_id: &str) -> Result<TaskStatus> {
        // TODO: query GET {url}/{task_id} once the Tingwu result schema is wired up
        warn!("Tingwu result retrieval is not implemented; returning a simulated transcript for {task_id}");
        Ok(TaskStatus::Completed {
            text: "这是使用通义听悟API的模拟转写结果。在实际应用中，这里会显示真实的转写文本。".to_string(),
            segments: vec![
                seg(0.0, 5.0, "大家好，欢迎来到今天的视频。"),
                seg(5.0, 10.0, "今天我们要讨论一个很有趣的话题。"),
            ],
        })
    }
}

/// Offline stand-in for OpenAI-style credentials
pub struct SimulatedProvider;

#[async_trait]
impl TranscriptionProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "openai-simulated"
    }

    async fn submit(&self, media_url: &str, _language: &str) -> Result<String> {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        warn!("Simulating transcription of {media_url}; no audio is processed");
        Ok(format!("openai-{millis}"))
    }

    async fn poll(&self, task_id: &str) -> Result<TaskStatus> {
        if !task_id.starts_with("openai-") {
            return Ok(TaskStatus::Failed(format!("unknown task {task_id}")));
        }
        Ok(TaskStatus::Completed {
            text: "这是使用OpenAI Whisper API的模拟转写结果。在实际应用中，这里会显示真实的转写文本。".to_string(),
            segments: vec![
                seg(0.0, 5.0, "大家好，欢迎来到今天的视频。"),
                seg(5.0, 10.0, "今天我们要讨论中国经济的话题。"),
                seg(10.0, 15.0, "主要内容包括中产阶级的现状。"),
                seg(15.0, 20.0, "以及国家发展的宏观趋势。"),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StuckProvider;

    #[async_trait]
    impl TranscriptionProvider for StuckProvider {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn submit(&self, _media_url: &str, _language: &str) -> Result<String> {
            Ok("task-1".to_string())
        }

        async fn poll(&self, _task_id: &str) -> Result<TaskStatus> {
            Ok(TaskStatus::Running)
        }
    }

    #[test]
    fn test_provider_for_credential_shape() {
        let client = reqwest::Client::new();
        let settings = Settings::default();
        assert_eq!(provider_for(&client, &settings, "sk-abc").name(), "openai-simulated");
        assert_eq!(provider_for(&client, &settings, "LTAI5tExample").name(), "tingwu");
    }

    #[tokio::test]
    async fn test_simulated_transcription() {
        let result = transcribe(&SimulatedProvider, "https://cdn/a.mp4", "auto", Duration::ZERO)
            .await
            .unwrap();
        assert!(result.task_id.starts_with("openai-"));
        assert_eq!(result.provider, "openai-simulated");
        assert_eq!(result.segments.len(), 4);
        assert_eq!(result.segments[3].end, 20.0);
    }

    #[tokio::test]
    async fn test_simulated_unknown_task() {
        let status = SimulatedProvider.poll("tingwu-1").await.unwrap();
        assert!(matches!(status, TaskStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_running_task_is_an_error() {
        let err = transcribe(&StuckProvider, "https://cdn/a.mp4", "auto", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("still running"));
    }
}
