//! 起草/评审循环的类型定义
//!
//! SessionState 按步不可变：每步产出一个 StepEvent（即该步写入的字段），
//! apply 消费旧状态返回新状态；事件流与状态演进因此一一对应，可重放。

use serde::Serialize;

use crate::llm::{display_text, Generation};
use crate::research::Research;

/// 控制器所处步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Research,
    Draft,
    Critique,
    Terminal,
}

/// 单步结果事件：按步骤名打标签，只携带该步写入的字段
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepEvent {
    Research {
        #[serde(serialize_with = "as_display_text")]
        search_data: Research,
    },
    Drafter {
        #[serde(serialize_with = "as_display_text")]
        draft: Generation,
        iteration_count: u32,
    },
    Critic {
        #[serde(serialize_with = "as_display_text")]
        critique: Generation,
    },
}

fn as_display_text<S, E>(value: &Result<String, E>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    E: std::fmt::Display,
{
    serializer.serialize_str(&display_text(value))
}

impl StepEvent {
    /// 步骤名：research / drafter / critic
    pub fn name(&self) -> &'static str {
        match self {
            StepEvent::Research { .. } => "research",
            StepEvent::Drafter { .. } => "drafter",
            StepEvent::Critic { .. } => "critic",
        }
    }

    /// 该步写入内容是否为失败详情
    pub fn is_failure(&self) -> bool {
        match self {
            StepEvent::Research { search_data } => search_data.is_err(),
            StepEvent::Drafter { draft, .. } => draft.is_err(),
            StepEvent::Critic { critique } => critique.is_err(),
        }
    }
}

/// 会话状态：单次运行独占，不持久化
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    id: String,
    started_at: i64,
    scope: String,
    max_iterations: u32,
    drafter_backend: String,
    critic_backend: String,
    search_data: Option<Research>,
    draft: Option<Generation>,
    critique: Option<Generation>,
    iteration_count: u32,
}

impl SessionState {
    /// 仅由 SessionBuilder 在校验后创建
    pub(crate) fn new(
        scope: String,
        max_iterations: u32,
        drafter_backend: String,
        critic_backend: String,
    ) -> Self {
        Self {
            id: format!("sess_{}", uuid::Uuid::new_v4()),
            started_at: chrono::Utc::now().timestamp_millis(),
            scope,
            max_iterations,
            drafter_backend,
            critic_backend,
            search_data: None,
            draft: None,
            critique: None,
            iteration_count: 0,
        }
    }

    /// 消费旧状态，写入事件携带的字段，返回新状态
    pub fn apply(self, event: &StepEvent) -> Self {
        match event {
            StepEvent::Research { search_data } => Self {
                search_data: Some(search_data.clone()),
                ..self
            },
            StepEvent::Drafter {
                draft,
                iteration_count,
            } => Self {
                draft: Some(draft.clone()),
                iteration_count: *iteration_count,
                ..self
            },
            StepEvent::Critic { critique } => Self {
                critique: Some(critique.clone()),
                ..self
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// 自创建起经过的毫秒数
    pub fn elapsed_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.started_at
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn drafter_backend(&self) -> &str {
        &self.drafter_backend
    }

    pub fn critic_backend(&self) -> &str {
        &self.critic_backend
    }

    pub fn search_data(&self) -> Option<&Research> {
        self.search_data.as_ref()
    }

    pub fn draft(&self) -> Option<&Generation> {
        self.draft.as_ref()
    }

    pub fn critique(&self) -> Option<&Generation> {
        self.critique.as_ref()
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    /// 交付物：最后一版草稿的展示文本
    pub fn final_artifact(&self) -> Option<String> {
        self.draft.as_ref().map(display_text)
    }
}

/// 一次完整运行的结果
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub events: Vec<StepEvent>,
    pub state: SessionState,
}

impl SessionOutcome {
    pub fn final_artifact(&self) -> Option<String> {
        self.state.final_artifact()
    }
}
