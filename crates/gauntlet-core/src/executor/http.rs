use super::{RawMeasurement, TargetClient, TargetError, TargetFactory};
use crate::suite::TaskSpec;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Client for an OpenAI-compatible chat completion endpoint, with or
/// without SSE streaming.
pub struct HttpTarget {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpTarget {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }

    async fn send_checked(
        &self,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TargetError> {
        let resp = self
            .request(body)
            .send()
            .await
            .map_err(|e| TargetError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_client_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TargetError::Rejected(status.as_u16(), text));
        }
        if !status.is_success() {
            return Err(TargetError::Server(status.as_u16()));
        }
        Ok(resp)
    }

    async fn execute_plain(&self, task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": task.prompt }],
            "max_tokens": task.max_tokens,
        });

        let start = Instant::now();
        let resp = self.send_checked(&body).await?;
        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TargetError::Transport(format!("invalid response body: {}", e)))?;
        let latency = start.elapsed().as_secs_f64();

        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let (prompt_tokens, completion_tokens, total_tokens) =
            usage_or_estimate(&payload, &task.prompt, &text);

        Ok(RawMeasurement {
            success: true,
            response_text: text,
            error: None,
            latency_seconds: latency,
            ttft_seconds: Some(latency),
            chunk_offsets: Vec::new(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
        })
    }

    async fn execute_streaming(&self, task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": task.prompt }],
            "max_tokens": task.max_tokens,
            "stream": true,
        });

        let start = Instant::now();
        let resp = self.send_checked(&body).await?;

        let mut text = String::new();
        let mut chunk_offsets = Vec::new();
        let mut usage_completion: Option<u32> = None;
        let mut buffer = String::new();

        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| TargetError::Transport(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer.drain(..=pos);
                let Some(data) = parse_sse_line(&line) else {
                    continue;
                };
                let Ok(event) = serde_json::from_str::<serde_json::Value>(&data) else {
                    tracing::debug!(line = %line, "skipping unparseable stream chunk");
                    continue;
                };
                if let Some(delta) = event
                    .pointer("/choices/0/delta/content")
                    .and_then(|v| v.as_str())
                {
                    chunk_offsets.push(start.elapsed().as_secs_f64());
                    text.push_str(delta);
                }
                if let Some(n) = event
                    .pointer("/usage/completion_tokens")
                    .and_then(|v| v.as_u64())
                {
                    usage_completion = Some(n as u32);
                }
            }
        }

        let latency = start.elapsed().as_secs_f64();
        let prompt_tokens = estimate_tokens(&task.prompt);
        let completion_tokens =
            usage_completion.unwrap_or_else(|| chunk_offsets.len().max(1) as u32);

        Ok(RawMeasurement {
            success: true,
            response_text: text,
            error: None,
            latency_seconds: latency,
            ttft_seconds: chunk_offsets.first().copied().or(Some(latency)),
            chunk_offsets,
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        })
    }
}

#[async_trait]
impl TargetClient for HttpTarget {
    async fn execute(&self, task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
        if task.streaming {
            self.execute_streaming(task).await
        } else {
            self.execute_plain(task).await
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}

pub struct HttpTargetFactory {
    pub api_key: Option<String>,
}

impl TargetFactory for HttpTargetFactory {
    fn client(&self, target: &str, model: &str) -> Arc<dyn TargetClient> {
        Arc::new(HttpTarget::new(target, model, self.api_key.clone()))
    }
}

fn parse_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        None
    } else {
        Some(data.to_string())
    }
}

/// Usage block when the target reports it, else a 4-chars-per-token
/// estimate.
fn usage_or_estimate(payload: &serde_json::Value, prompt: &str, text: &str) -> (u32, u32, u32) {
    let get = |ptr: &str| {
        payload
            .pointer(ptr)
            .and_then(|v| v.as_u64())
            .map(|n| n as u32)
    };
    match (get("/usage/prompt_tokens"), get("/usage/completion_tokens")) {
        (Some(p), Some(c)) => (p, c, get("/usage/total_tokens").unwrap_or(p + c)),
        _ => {
            let p = estimate_tokens(prompt);
            let c = estimate_tokens(text);
            (p, c, p + c)
        }
    }
}

fn estimate_tokens(text: &str) -> u32 {
    (text.len() / 4).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_line_extracts_data() {
        assert_eq!(parse_sse_line("data: {\"x\":1}"), Some("{\"x\":1}".into()));
        assert_eq!(parse_sse_line("data: [DONE]"), None);
        assert_eq!(parse_sse_line(": keepalive"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn usage_block_wins_over_estimate() {
        let payload = serde_json::json!({
            "usage": { "prompt_tokens": 11, "completion_tokens": 7, "total_tokens": 18 }
        });
        assert_eq!(usage_or_estimate(&payload, "x", "y"), (11, 7, 18));
    }

    #[test]
    fn missing_usage_falls_back_to_estimate() {
        let payload = serde_json::json!({});
        let (p, c, t) = usage_or_estimate(&payload, "aaaabbbb", "ccccdddd");
        assert_eq!((p, c, t), (2, 2, 4));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let target = HttpTarget::new("http://localhost:8000/v1/", "m", None);
        assert_eq!(target.chat_url(), "http://localhost:8000/v1/chat/completions");
    }
}
