//! 后端描述表
//!
//! 配置加载时把 [[llm.backends]] 一次性解析为 BackendDescriptor（传输族 × 特性），
//! 之后路由只看描述符，不再按模型名做子串匹配。

use crate::config::{AgentRole, AppConfig, BackendEntry, TransportFamily};

/// 传输族及其端点/凭据；凭据可能缺失，调用时再报错
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    /// 标准 chat-completions（Azure OpenAI 部署）
    CloudStandard {
        endpoint: Option<String>,
        api_key: Option<String>,
        api_version: String,
        deployment: String,
    },
    /// system 为顶层字段、回复包在 content 块数组里的 REST 提供方
    SpecialEnvelope {
        endpoint: Option<String>,
        api_key: Option<String>,
        version: String,
        max_tokens: u32,
    },
    /// 本地 OpenAI 兼容服务
    LocalLoopback { base_url: String, api_key: String },
}

impl Transport {
    pub fn family(&self) -> TransportFamily {
        match self {
            Transport::CloudStandard { .. } => TransportFamily::CloudStandard,
            Transport::SpecialEnvelope { .. } => TransportFamily::SpecialEnvelope,
            Transport::LocalLoopback { .. } => TransportFamily::LocalLoopback,
        }
    }

    /// 凭据与端点是否齐全（诊断用，不影响可选性）
    pub fn has_credentials(&self) -> bool {
        match self {
            Transport::CloudStandard {
                endpoint, api_key, ..
            }
            | Transport::SpecialEnvelope {
                endpoint, api_key, ..
            } => endpoint.is_some() && api_key.is_some(),
            Transport::LocalLoopback { .. } => true,
        }
    }
}

/// 按后端生效的请求特性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// 不发送 temperature（只接受提供方默认值）
    pub omit_temperature: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    pub id: String,
    pub transport: Transport,
    pub quirks: Quirks,
    pub roles: Vec<AgentRole>,
}

impl BackendDescriptor {
    fn resolve(entry: &BackendEntry, config: &AppConfig) -> Self {
        let llm = &config.llm;
        let transport = match entry.family {
            TransportFamily::CloudStandard => Transport::CloudStandard {
                endpoint: llm.azure.endpoint.clone(),
                api_key: llm.azure.api_key.clone(),
                api_version: llm.azure.api_version.clone(),
                deployment: entry.deployment.clone().unwrap_or_else(|| entry.id.clone()),
            },
            TransportFamily::SpecialEnvelope => Transport::SpecialEnvelope {
                endpoint: llm.anthropic.endpoint.clone(),
                api_key: llm.anthropic.api_key.clone(),
                version: llm.anthropic.version.clone(),
                max_tokens: llm.anthropic.max_tokens,
            },
            TransportFamily::LocalLoopback => Transport::LocalLoopback {
                base_url: llm.local.base_url.clone(),
                api_key: llm.local.api_key.clone(),
            },
        };
        Self {
            id: entry.id.clone(),
            transport,
            quirks: Quirks {
                omit_temperature: entry.omit_temperature,
            },
            roles: entry.roles.clone(),
        }
    }

    pub fn family(&self) -> TransportFamily {
        self.transport.family()
    }

    pub fn offers(&self, role: AgentRole) -> bool {
        self.roles.contains(&role)
    }
}

/// 进程内只读的后端表，保持配置中的顺序
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<BackendDescriptor>,
    cloud_only: bool,
}

impl BackendRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut backends: Vec<BackendDescriptor> = Vec::new();
        for entry in &config.llm.backends {
            if backends.iter().any(|b| b.id == entry.id) {
                tracing::warn!(backend = %entry.id, "duplicate backend id ignored");
                continue;
            }
            backends.push(BackendDescriptor::resolve(entry, config));
        }
        Self {
            backends,
            cloud_only: config.app.cloud_only,
        }
    }

    pub fn new(backends: Vec<BackendDescriptor>, cloud_only: bool) -> Self {
        Self {
            backends,
            cloud_only,
        }
    }

    pub fn get(&self, id: &str) -> Option<&BackendDescriptor> {
        self.backends.iter().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.iter()
    }

    pub fn cloud_only(&self) -> bool {
        self.cloud_only
    }

    /// 本地回环后端在纯云端部署下不可用
    pub fn is_available(&self, id: &str) -> bool {
        match self.get(id) {
            Some(b) => !(self.cloud_only && b.family() == TransportFamily::LocalLoopback),
            None => false,
        }
    }

    /// 某角色可选的后端（按表顺序）
    pub fn options_for(&self, role: AgentRole) -> Vec<&BackendDescriptor> {
        self.backends
            .iter()
            .filter(|b| b.offers(role) && self.is_available(&b.id))
            .collect()
    }
}
