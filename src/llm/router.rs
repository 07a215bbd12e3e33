//! 多后端路由器
//!
//! 按描述符的传输族分派，优先级：
//! 1. 特殊信封 REST（system 置顶、自定义回复信封）
//! 2. 本地回环（连接失败统一视为本地服务未运行）
//! 3. 标准云端（按特性表决定是否发送 temperature）

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::llm::backend::{BackendDescriptor, BackendRegistry, Transport};
use crate::llm::envelope::{EnvelopeClient, EnvelopeRequest};
use crate::llm::openai::{azure_client, build_chat_request, complete, local_client};
use crate::llm::{Generation, GenerationError, ModelInvoker};

pub struct ModelRouter {
    registry: Arc<BackendRegistry>,
    envelope: EnvelopeClient,
    timeout_secs: u64,
}

impl ModelRouter {
    pub fn new(registry: Arc<BackendRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            envelope: EnvelopeClient::new(timeout_secs),
            timeout_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(BackendRegistry::from_config(config)),
            config.llm.timeouts.request,
        )
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    async fn dispatch(
        &self,
        backend: &BackendDescriptor,
        prompt: &str,
        system_role: &str,
        temperature: f32,
    ) -> Generation {
        let id = backend.id.as_str();
        match &backend.transport {
            Transport::SpecialEnvelope {
                endpoint,
                api_key,
                version,
                max_tokens,
            } => {
                let endpoint = require(id, endpoint.as_deref(), "AZURE_ANTHROPIC_ENDPOINT")?;
                let api_key = require(id, api_key.as_deref(), "AZURE_ANTHROPIC_KEY")?;
                let request = EnvelopeRequest::new(id, *max_tokens, system_role, prompt);
                self.envelope
                    .send(id, endpoint, api_key, version, &request)
                    .await
            }
            Transport::LocalLoopback { base_url, api_key } => {
                let unavailable = |reason: String| GenerationError::LocalUnavailable {
                    backend: id.to_string(),
                    endpoint: base_url.clone(),
                    reason,
                };
                let request = build_chat_request(id, prompt, system_role, temperature, backend.quirks)
                    .map_err(|e| unavailable(e.to_string()))?;
                let client = local_client(base_url, api_key, self.timeout_secs);
                complete(&client, request)
                    .await
                    .map_err(|e| unavailable(e.to_string()))
            }
            Transport::CloudStandard {
                endpoint,
                api_key,
                api_version,
                deployment,
            } => {
                let endpoint = require(id, endpoint.as_deref(), "AZURE_AI_ENDPOINT")?;
                let api_key = require(id, api_key.as_deref(), "AZURE_AI_KEY")?;
                let request = build_chat_request(id, prompt, system_role, temperature, backend.quirks)
                    .map_err(|e| GenerationError::generation(id, e))?;
                let client = azure_client(endpoint, api_key, api_version, deployment, self.timeout_secs);
                complete(&client, request)
                    .await
                    .map_err(|e| GenerationError::generation(id, e))
            }
        }
    }
}

fn require<'a>(backend: &str, value: Option<&'a str>, what: &str) -> Result<&'a str, GenerationError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GenerationError::MissingCredential {
            backend: backend.to_string(),
            what: what.to_string(),
        })
}

#[async_trait]
impl ModelInvoker for ModelRouter {
    async fn generate(
        &self,
        backend_id: &str,
        prompt: &str,
        system_role: &str,
        temperature: f32,
    ) -> Generation {
        let Some(backend) = self.registry.get(backend_id) else {
            return Err(GenerationError::UnknownBackend {
                backend: backend_id.to_string(),
            });
        };

        tracing::info!(backend = %backend_id, family = ?backend.family(), "calling model");
        let result = self.dispatch(backend, prompt, system_role, temperature).await;
        if let Err(e) = &result {
            tracing::warn!(backend = %backend_id, error = %e, "model call failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentRole;
    use crate::llm::backend::Quirks;
    use mockito::Matcher;
    use serde_json::json;

    fn descriptor(id: &str, transport: Transport) -> BackendDescriptor {
        BackendDescriptor {
            id: id.to_string(),
            transport,
            quirks: Quirks::default(),
            roles: vec![AgentRole::Drafter, AgentRole::Critic],
        }
    }

    fn router(backends: Vec<BackendDescriptor>) -> ModelRouter {
        ModelRouter::new(Arc::new(BackendRegistry::new(backends, false)), 5)
    }

    #[tokio::test]
    async fn test_unreachable_local_server_reports_local_unavailable() {
        // 端口 1 上不会有服务监听
        let r = router(vec![descriptor(
            "llama3.2:latest",
            Transport::LocalLoopback {
                base_url: "http://127.0.0.1:1/v1".into(),
                api_key: "ollama".into(),
            },
        )]);
        let out = r.generate("llama3.2:latest", "hi", "sys", 0.7).await;
        let err = out.unwrap_err();
        assert!(matches!(err, GenerationError::LocalUnavailable { .. }));
        let text = err.to_string();
        assert!(text.starts_with("Local Model Error (llama3.2:latest)"));
        assert!(text.contains("http://127.0.0.1:1/v1"));
    }

    #[tokio::test]
    async fn test_missing_credential_surfaces_at_call_time() {
        let r = router(vec![descriptor(
            "gpt-5-mini",
            Transport::CloudStandard {
                endpoint: Some("https://example.openai.azure.com/".into()),
                api_key: None,
                api_version: "2024-05-01-preview".into(),
                deployment: "gpt-5-mini".into(),
            },
        )]);
        let err = r.generate("gpt-5-mini", "hi", "sys", 0.7).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::MissingCredential {
                backend: "gpt-5-mini".into(),
                what: "AZURE_AI_KEY".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let r = router(vec![]);
        let err = r.generate("ghost", "hi", "sys", 0.7).await.unwrap_err();
        assert_eq!(err.to_string(), "Model Generation Error (ghost): unknown backend");
    }

    fn chat_completion_body(text: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1735689600,
            "model": "gpt-5-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    fn cloud_descriptor(id: &str, endpoint: String, omit_temperature: bool) -> BackendDescriptor {
        BackendDescriptor {
            quirks: Quirks { omit_temperature },
            ..descriptor(
                id,
                Transport::CloudStandard {
                    endpoint: Some(endpoint),
                    api_key: Some("az-key".into()),
                    api_version: "2024-05-01-preview".into(),
                    deployment: id.to_string(),
                },
            )
        }
    }

    #[tokio::test]
    async fn test_cloud_request_hits_deployment_path_without_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-5-mini/chat/completions")
            .match_query(Matcher::UrlEncoded(
                "api-version".into(),
                "2024-05-01-preview".into(),
            ))
            .match_header("api-key", "az-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-5-mini",
                "messages": [
                    {"role": "system", "content": "You are an analyst."},
                    {"role": "user", "content": "Write the section."}
                ]
            })))
            .match_request(|req| {
                req.utf8_lossy_body()
                    .map(|body| !body.contains("temperature"))
                    .unwrap_or(false)
            })
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_completion_body("cloud draft"))
            .expect(2)
            .create_async()
            .await;

        // 原部署习惯在 endpoint 末尾带 `/`
        for endpoint in [server.url(), format!("{}/", server.url())] {
            let r = router(vec![cloud_descriptor("gpt-5-mini", endpoint, true)]);
            let out = r
                .generate("gpt-5-mini", "Write the section.", "You are an analyst.", 0.7)
                .await;
            assert_eq!(out.unwrap(), "cloud draft");
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cloud_request_carries_temperature_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/grok-4-fast-reasoning/chat/completions")
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex(r#""temperature":0\.5"#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_completion_body("critique"))
            .create_async()
            .await;

        let r = router(vec![cloud_descriptor(
            "grok-4-fast-reasoning",
            format!("{}/", server.url()),
            false,
        )]);
        let out = r.generate("grok-4-fast-reasoning", "draft", "sys", 0.5).await;
        mock.assert_async().await;
        assert_eq!(out.unwrap(), "critique");
    }

    #[tokio::test]
    async fn test_envelope_family_routes_to_rest_with_top_level_system() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/anthropic/v1/messages")
            .match_header("x-api-key", "ak")
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-sonnet-4-5",
                "system": "You are a critical editor.",
                "max_tokens": 1024
            })))
            .with_status(200)
            .with_body(json!({"content": [{"type": "text", "text": "review"}]}).to_string())
            .create_async()
            .await;

        let r = router(vec![descriptor(
            "claude-sonnet-4-5",
            Transport::SpecialEnvelope {
                endpoint: Some(format!("{}/anthropic/v1/messages", server.url())),
                api_key: Some("ak".into()),
                version: "2023-06-01".into(),
                max_tokens: 1024,
            },
        )]);
        let out = r
            .generate("claude-sonnet-4-5", "draft", "You are a critical editor.", 0.7)
            .await;
        mock.assert_async().await;
        assert_eq!(out.unwrap(), "review");
    }
}
