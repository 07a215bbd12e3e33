//! 会话参数与配置错误
//!
//! 只在展示层边界（创建会话、加载配置）出现；起草/评审循环本身没有失败路径，
//! 模型与搜索失败以内容形式流转（见 `llm::GenerationError`、`research::SearchError`）。

use thiserror::Error;

use crate::config::AgentRole;

#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("Scope must not be empty")]
    EmptyScope,

    #[error("Iterations must be between 1 and {limit}, got {value}")]
    IterationsOutOfRange { value: u32, limit: u32 },

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// 本地后端在纯云端部署下不可用
    #[error("Backend not available in this deployment: {0}")]
    BackendUnavailable(String),

    #[error("Backend {backend} is not offered for the {role} role")]
    RoleNotOffered { backend: String, role: AgentRole },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}
