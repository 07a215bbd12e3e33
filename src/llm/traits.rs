//! 模型调用抽象
//!
//! 所有后端（标准云端 / 特殊信封 REST / 本地回环）通过 ModelInvoker 统一调用：
//! generate(backend_id, prompt, system_role, temperature)。调用永不 panic、不向上抛错，
//! 失败以 GenerationError 作为带标签的结果返回，只在展示边界拍平成文本。

use async_trait::async_trait;
use thiserror::Error;

/// 单次生成结果：成功文本或失败详情
pub type Generation = Result<String, GenerationError>;

/// 生成失败分类；Display 即展示给用户的文本，各类前缀互不相同
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Model Generation Error ({backend}): unknown backend")]
    UnknownBackend { backend: String },

    /// 凭据或端点缺失，首次调用该后端时才暴露
    #[error("Model Generation Error ({backend}): missing {what}")]
    MissingCredential { backend: String, what: String },

    /// 特殊信封提供方返回非 2xx，附带原始响应体
    #[error("Provider Error ({backend}): HTTP {status}: {body}")]
    Provider {
        backend: String,
        status: u16,
        body: String,
    },

    #[error(
        "Local Model Error ({backend}): Cannot connect to local model server at {endpoint}. \
         Make sure it is running locally. Note: local models are not available on cloud-only deployments. \
         Error: {reason}"
    )]
    LocalUnavailable {
        backend: String,
        endpoint: String,
        reason: String,
    },

    /// 请求构造、网络 I/O、响应解析等其余失败
    #[error("Model Generation Error ({backend}): {message}")]
    Generation { backend: String, message: String },
}

impl GenerationError {
    pub fn backend(&self) -> &str {
        match self {
            GenerationError::UnknownBackend { backend }
            | GenerationError::MissingCredential { backend, .. }
            | GenerationError::Provider { backend, .. }
            | GenerationError::LocalUnavailable { backend, .. }
            | GenerationError::Generation { backend, .. } => backend,
        }
    }

    pub fn generation(backend: &str, message: impl std::fmt::Display) -> Self {
        GenerationError::Generation {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }
}

/// 把成功文本或失败详情拍平为可展示文本
pub fn display_text<E: std::fmt::Display>(result: &Result<String, E>) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(e) => e.to_string(),
    }
}

/// 模型调用 trait：一次非流式完成（整条消息粒度）
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn generate(
        &self,
        backend_id: &str,
        prompt: &str,
        system_role: &str,
        temperature: f32,
    ) -> Generation;
}
