//! 迭代控制器：会话状态、步骤事件、提示词、转移规则、引擎与构建器

pub mod builder;
pub mod engine;
pub mod graph;
pub mod prompts;
pub mod types;

pub use builder::SessionBuilder;
pub use engine::DraftingLoop;
pub use graph::{next_step, should_continue};
pub use types::*;
