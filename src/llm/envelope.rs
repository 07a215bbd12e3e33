//! 特殊信封 REST 客户端
//!
//! 该提供方的 system 角色是请求顶层字段（messages 里只有一条 user 消息），
//! 鉴权走 x-api-key + anthropic-version 头，回复包在 content 块数组中，取第一个文本块。

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{Generation, GenerationError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<EnvelopeMessage>,
}

impl EnvelopeRequest {
    pub fn new(model: &str, max_tokens: u32, system_role: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            system: system_role.to_string(),
            messages: vec![EnvelopeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl EnvelopeResponse {
    /// 第一个 content 块必须是文本
    fn first_text(self) -> Result<String, String> {
        match self.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => Ok(text),
            Some(ContentBlock::Other) => Err("first content block is not text".to_string()),
            None => Err("reply has no content blocks".to_string()),
        }
    }
}

pub struct EnvelopeClient {
    client: Client,
}

impl EnvelopeClient {
    pub fn new(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub async fn send(
        &self,
        backend: &str,
        endpoint: &str,
        api_key: &str,
        version: &str,
        request: &EnvelopeRequest,
    ) -> Generation {
        tracing::debug!(backend, endpoint, "sending envelope request");

        let response = self
            .client
            .post(endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", version)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::generation(backend, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                backend: backend.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let reply: EnvelopeResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::generation(backend, format!("invalid reply: {}", e)))?;

        reply
            .first_text()
            .map_err(|e| GenerationError::generation(backend, e))
    }
}
