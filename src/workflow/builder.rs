//! 会话构建器
//!
//! 展示层提交的参数（scope、迭代轮数、两个角色的后端）在此校验，通过后才创建 SessionState。

use crate::config::{AgentRole, WorkflowSection};
use crate::core::CouncilError;
use crate::llm::BackendRegistry;
use crate::workflow::SessionState;

pub struct SessionBuilder {
    scope: String,
    max_iterations: u32,
    drafter_backend: Option<String>,
    critic_backend: Option<String>,
    max_iterations_limit: u32,
}

impl SessionBuilder {
    pub fn new(scope: impl Into<String>) -> Self {
        let defaults = WorkflowSection::default();
        Self {
            scope: scope.into(),
            max_iterations: defaults.default_iterations,
            drafter_backend: None,
            critic_backend: None,
            max_iterations_limit: defaults.max_iterations_limit,
        }
    }

    /// 使用配置中的默认轮数与上限
    pub fn with_workflow(mut self, workflow: &WorkflowSection) -> Self {
        self.max_iterations = workflow.default_iterations;
        self.max_iterations_limit = workflow.max_iterations_limit;
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn drafter(mut self, backend: impl Into<String>) -> Self {
        self.drafter_backend = Some(backend.into());
        self
    }

    pub fn critic(mut self, backend: impl Into<String>) -> Self {
        self.critic_backend = Some(backend.into());
        self
    }

    /// 校验并创建会话；未指定后端时取该角色的第一个可选后端
    pub fn build(self, registry: &BackendRegistry) -> Result<SessionState, CouncilError> {
        let scope = self.scope.trim().to_string();
        if scope.is_empty() {
            return Err(CouncilError::EmptyScope);
        }

        if self.max_iterations < 1 || self.max_iterations > self.max_iterations_limit {
            return Err(CouncilError::IterationsOutOfRange {
                value: self.max_iterations,
                limit: self.max_iterations_limit,
            });
        }

        let drafter = resolve_backend(registry, self.drafter_backend, AgentRole::Drafter)?;
        let critic = resolve_backend(registry, self.critic_backend, AgentRole::Critic)?;

        Ok(SessionState::new(scope, self.max_iterations, drafter, critic))
    }
}

fn resolve_backend(
    registry: &BackendRegistry,
    requested: Option<String>,
    role: AgentRole,
) -> Result<String, CouncilError> {
    let id = match requested {
        Some(id) => id,
        None => registry
            .options_for(role)
            .first()
            .map(|b| b.id.clone())
            .ok_or_else(|| CouncilError::UnknownBackend(format!("<no {} backend configured>", role)))?,
    };

    let backend = registry
        .get(&id)
        .ok_or_else(|| CouncilError::UnknownBackend(id.clone()))?;
    if !registry.is_available(&id) {
        return Err(CouncilError::BackendUnavailable(id));
    }
    if !backend.offers(role) {
        return Err(CouncilError::RoleNotOffered { backend: id, role });
    }
    Ok(id)
}
