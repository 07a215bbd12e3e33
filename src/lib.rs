//! Council - drafter / critic 多智能体写作循环
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话参数与配置错误
//! - **llm**: 模型调用层（后端描述表、标准云端 / 特殊信封 / 本地回环、路由、Mock）
//! - **research**: 检索协作者（网页搜索、单页抓取）
//! - **workflow**: 迭代控制器（Research -> Draft -> Critique 循环）
//! - **shell**: 展示层辅助（状态行、产物导出）
//! - **observability**: 日志

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod research;
pub mod shell;
pub mod workflow;

pub use workflow::{DraftingLoop, SessionBuilder, SessionState, StepEvent};
