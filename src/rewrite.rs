use eyre::{Result, bail};
use log::{debug, info, warn};

use crate::config::Settings;

/// Rewrite a rendered note through the chat-completions endpoint.
///
/// This is best-effort: on any failure the input is returned unchanged.
pub async fn rewrite(client: &reqwest::Client, settings: &Settings, markdown: &str, credential: &str) -> String {
    match try_rewrite(client, settings, markdown, credential).await {
        Ok(text) => {
            info!("AI rewrite succeeded ({} chars)", text.chars().count());
            text
        }
        Err(e) => {
            warn!("AI rewrite failed, keeping original note: {e}");
            markdown.to_string()
        }
    }
}

async fn try_rewrite(client: &reqwest::Client, settings: &Settings, markdown: &str, credential: &str) -> Result<String> {
    debug!("Rewriting note via {} with model {}", settings.rewrite_url, settings.rewrite_model);

    let body = serde_json::json!({
        "model": settings.rewrite_model,
        "messages": [
            {
                "role": "system",
                "content": settings.system_prompt
            },
            {
                "role": "user",
                "content": markdown
            }
        ]
    });

    let resp = client
        .post(&settings.rewrite_url)
        .bearer_auth(credential)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("rewrite endpoint returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    Ok(extract_chat_text(&json).unwrap_or_else(|| markdown.to_string()))
}

fn extract_chat_text(json: &serde_json::Value) -> Option<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}
