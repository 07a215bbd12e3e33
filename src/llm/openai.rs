//! OpenAI 兼容 chat-completions 客户端
//!
//! 通过 async_openai 调用标准云端（Azure 部署，AzureConfig）与本地回环服务（OpenAIConfig + base_url）。
//! 两者都发送 system + user 两条消息；temperature 是否发送由后端特性决定。

use std::time::Duration;

use async_openai::config::{AzureConfig, Config, OpenAIConfig};
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;

use crate::llm::backend::Quirks;

/// 构造标准两条消息请求；omit_temperature 的后端不带 temperature 字段
pub fn build_chat_request(
    model: &str,
    prompt: &str,
    system_role: &str,
    temperature: f32,
    quirks: Quirks,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_role)
            .build()?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?
            .into(),
    ];

    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(model).messages(messages);
    if !quirks.omit_temperature {
        args.temperature(temperature);
    }
    args.build()
}

fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Azure 部署客户端：endpoint + deployment + api-version
///
/// 路径 /openai/deployments/... 由 AzureConfig 拼接，endpoint 末尾的 `/` 需去掉
pub fn azure_client(
    endpoint: &str,
    api_key: &str,
    api_version: &str,
    deployment: &str,
    timeout_secs: u64,
) -> Client<AzureConfig> {
    let config = AzureConfig::new()
        .with_api_base(endpoint.trim_end_matches('/'))
        .with_api_key(api_key)
        .with_api_version(api_version)
        .with_deployment_id(deployment);
    Client::with_config(config).with_http_client(http_client(timeout_secs))
}

/// 本地 OpenAI 兼容服务客户端（如 Ollama 的 /v1）
pub fn local_client(base_url: &str, api_key: &str, timeout_secs: u64) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new()
        .with_api_base(base_url)
        .with_api_key(api_key);
    Client::with_config(config).with_http_client(http_client(timeout_secs))
}

/// 发送请求并取第一个 choice 的 content
pub async fn complete<C: Config>(
    client: &Client<C>,
    request: CreateChatCompletionRequest,
) -> Result<String, OpenAIError> {
    let response = client.chat().create(request).await?;

    if let Some(usage) = &response.usage {
        tracing::debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "chat completion usage"
        );
    }

    let content = response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    Ok(content)
}
