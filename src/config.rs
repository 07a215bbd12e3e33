//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `COUNCIL__*` 覆盖（双下划线表示嵌套，如 `COUNCIL__WORKFLOW__TEMPERATURE=0.5`），
//! 最后叠加各提供方的约定变量（`AZURE_AI_KEY`、`AZURE_ANTHROPIC_ENDPOINT` 等）。
//! 凭据缺失不会导致加载失败，只在对应后端被实际调用时以错误文本呈现。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub workflow: WorkflowSection,
    pub research: ResearchSection,
}

/// [app] 段：应用名、产物目录、是否纯云端部署
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 最终稿导出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// 纯云端部署时本地模型不可用
    #[serde(default)]
    pub cloud_only: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            output_dir: default_output_dir(),
            cloud_only: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// [llm] 段：三类传输的端点与凭据、超时、后端表
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub azure: AzureSection,
    #[serde(default)]
    pub anthropic: AnthropicSection,
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendEntry>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            azure: AzureSection::default(),
            anthropic: AnthropicSection::default(),
            local: LocalSection::default(),
            timeouts: LlmTimeoutsSection::default(),
            backends: default_backends(),
        }
    }
}

/// [llm.azure]：标准 chat-completions 云端
#[derive(Debug, Clone, Deserialize)]
pub struct AzureSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
}

impl Default for AzureSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: default_azure_api_version(),
        }
    }
}

fn default_azure_api_version() -> String {
    "2024-05-01-preview".to_string()
}

/// [llm.anthropic]：system 字段置顶、自定义回复信封的 REST 提供方
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_anthropic_version")]
    pub version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AnthropicSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            version: default_anthropic_version(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// [llm.local]：本地 OpenAI 兼容服务（Ollama）
#[derive(Debug, Clone, Deserialize)]
pub struct LocalSection {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
    /// 协议要求但服务端不校验
    #[serde(default = "default_local_api_key")]
    pub api_key: String,
}

impl Default for LocalSection {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            api_key: default_local_api_key(),
        }
    }
}

fn default_local_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_local_api_key() -> String {
    "ollama".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// 传输族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFamily {
    CloudStandard,
    SpecialEnvelope,
    LocalLoopback,
}

/// 后端可承担的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Drafter,
    Critic,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Drafter => f.write_str("drafter"),
            AgentRole::Critic => f.write_str("critic"),
        }
    }
}

/// [[llm.backends]] 表项
#[derive(Debug, Clone, Deserialize)]
pub struct BackendEntry {
    pub id: String,
    pub family: TransportFamily,
    /// 云端部署名，缺省与 id 相同
    pub deployment: Option<String>,
    /// 该模型只接受提供方默认 temperature
    #[serde(default)]
    pub omit_temperature: bool,
    #[serde(default = "default_roles")]
    pub roles: Vec<AgentRole>,
}

fn default_roles() -> Vec<AgentRole> {
    vec![AgentRole::Drafter, AgentRole::Critic]
}

fn entry(id: &str, family: TransportFamily, omit_temperature: bool, roles: &[AgentRole]) -> BackendEntry {
    BackendEntry {
        id: id.to_string(),
        family,
        deployment: None,
        omit_temperature,
        roles: roles.to_vec(),
    }
}

fn default_backends() -> Vec<BackendEntry> {
    use AgentRole::*;
    use TransportFamily::*;
    vec![
        entry("gpt-5-mini", CloudStandard, true, &[Drafter]),
        entry("claude-sonnet-4-5", SpecialEnvelope, false, &[Drafter]),
        entry("grok-4-fast-reasoning", CloudStandard, false, &[Critic]),
        entry("llama3.2:latest", LocalLoopback, false, &[Drafter]),
        entry("deepseek-r1:8b", LocalLoopback, false, &[Critic]),
        entry("mistral:latest", LocalLoopback, false, &[Drafter, Critic]),
    ]
}

/// [workflow] 段：起草/评审循环参数与角色提示词
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 允许的最大迭代轮数（界面滑块上限）
    #[serde(default = "default_max_iterations_limit")]
    pub max_iterations_limit: u32,
    #[serde(default = "default_iterations")]
    pub default_iterations: u32,
    #[serde(default = "default_drafter_system_role")]
    pub drafter_system_role: String,
    #[serde(default = "default_critic_system_role")]
    pub critic_system_role: String,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_iterations_limit: default_max_iterations_limit(),
            default_iterations: default_iterations(),
            drafter_system_role: default_drafter_system_role(),
            critic_system_role: default_critic_system_role(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_iterations_limit() -> u32 {
    5
}

fn default_iterations() -> u32 {
    3
}

fn default_drafter_system_role() -> String {
    "You are an expert EV industry analyst and report writer.".to_string()
}

fn default_critic_system_role() -> String {
    "You are a critical editor focused on quality and accuracy.".to_string()
}

/// [research] 段：搜索端点、查询后缀、抓取超时与截断长度
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchSection {
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,
    /// 追加到主题后的时效/地域限定
    #[serde(default = "default_query_suffix")]
    pub query_suffix: String,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_scrape_max_chars")]
    pub scrape_max_chars: usize,
    #[serde(default = "default_deep_scrape_max_chars")]
    pub deep_scrape_max_chars: usize,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            search_endpoint: default_search_endpoint(),
            query_suffix: default_query_suffix(),
            timeout_secs: default_search_timeout_secs(),
            max_results: default_max_results(),
            scrape_max_chars: default_scrape_max_chars(),
            deep_scrape_max_chars: default_deep_scrape_max_chars(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.duckduckgo.com/".to_string()
}

fn default_query_suffix() -> String {
    "data figures trends December 2025 India Global".to_string()
}

fn default_search_timeout_secs() -> u64 {
    15
}

fn default_max_results() -> usize {
    10
}

fn default_scrape_max_chars() -> usize {
    5000
}

fn default_deep_scrape_max_chars() -> usize {
    4000
}

/// 提供方约定的环境变量 -> 配置键
const PROVIDER_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("AZURE_AI_KEY", "llm.azure.api_key"),
    ("AZURE_AI_ENDPOINT", "llm.azure.endpoint"),
    ("AZURE_ANTHROPIC_KEY", "llm.anthropic.api_key"),
    ("AZURE_ANTHROPIC_ENDPOINT", "llm.anthropic.endpoint"),
    ("OLLAMA_BASE_URL", "llm.local.base_url"),
];

/// 任一变量存在即视为纯云端部署
const CLOUD_MARKERS: &[&str] = &["COUNCIL_CLOUD", "STREAMLIT_SHARING_MODE", "STREAMLIT_CLOUD"];

/// 从 config 目录加载配置，环境变量可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 COUNCIL__*（双下划线表示嵌套键）
/// 4. 叠加提供方约定变量与云端部署标记
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("COUNCIL")
            .separator("__")
            .try_parsing(true),
    );

    for (var, key) in PROVIDER_ENV_OVERRIDES {
        let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(*key, value)?;
    }

    if CLOUD_MARKERS.iter().any(|var| std::env::var_os(var).is_some()) {
        builder = builder.set_override("app.cloud_only", true)?;
    }

    let c = builder.build()?;
    c.try_deserialize()
}
