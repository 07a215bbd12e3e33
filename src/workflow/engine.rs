//! 起草/评审循环引擎
//!
//! 严格串行：Research -> Draft -> Critique -> Draft ... -> Terminal，每步阻塞在一次网络调用上。
//! 每次转移产出一个 StepEvent；模型/搜索失败作为普通内容流入下一步提示词，不重试、不回滚。

use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::config::WorkflowSection;
use crate::llm::ModelInvoker;
use crate::research::Researcher;
use crate::workflow::graph::next_step;
use crate::workflow::prompts::{critic_prompt, drafter_prompt};
use crate::workflow::{SessionOutcome, SessionState, Step, StepEvent};

pub struct DraftingLoop {
    model: Arc<dyn ModelInvoker>,
    researcher: Arc<dyn Researcher>,
    temperature: f32,
    drafter_system_role: String,
    critic_system_role: String,
}

impl DraftingLoop {
    pub fn new(model: Arc<dyn ModelInvoker>, researcher: Arc<dyn Researcher>) -> Self {
        Self::with_workflow(model, researcher, &WorkflowSection::default())
    }

    pub fn with_workflow(
        model: Arc<dyn ModelInvoker>,
        researcher: Arc<dyn Researcher>,
        workflow: &WorkflowSection,
    ) -> Self {
        Self {
            model,
            researcher,
            temperature: workflow.temperature,
            drafter_system_role: workflow.drafter_system_role.clone(),
            critic_system_role: workflow.critic_system_role.clone(),
        }
    }

    /// 执行一步，返回该步事件；Terminal 无事件
    async fn execute(&self, step: Step, state: &SessionState) -> Option<StepEvent> {
        match step {
            Step::Research => {
                tracing::info!(scope = %state.scope(), "running research step");
                let search_data = self.researcher.search_web(state.scope()).await;
                Some(StepEvent::Research { search_data })
            }
            Step::Draft => {
                let iteration = state.iteration_count() + 1;
                tracing::info!(
                    iteration,
                    max_iterations = state.max_iterations(),
                    backend = %state.drafter_backend(),
                    "running drafter step"
                );
                let draft = self
                    .model
                    .generate(
                        state.drafter_backend(),
                        &drafter_prompt(state),
                        &self.drafter_system_role,
                        self.temperature,
                    )
                    .await;
                Some(StepEvent::Drafter {
                    draft,
                    iteration_count: iteration,
                })
            }
            Step::Critique => {
                tracing::info!(backend = %state.critic_backend(), "running critic step");
                let critique = self
                    .model
                    .generate(
                        state.critic_backend(),
                        &critic_prompt(state),
                        &self.critic_system_role,
                        self.temperature,
                    )
                    .await;
                Some(StepEvent::Critic { critique })
            }
            Step::Terminal => None,
        }
    }

    /// 单次转移：执行 step，应用事件，计算下一步
    async fn advance(&self, step: Step, state: SessionState) -> (Option<StepEvent>, SessionState, Step) {
        let Some(event) = self.execute(step, &state).await else {
            return (None, state, Step::Terminal);
        };
        if event.is_failure() {
            tracing::warn!(step = event.name(), "step produced failure text; continuing");
        }
        let state = state.apply(&event);
        let next = next_step(step, &state);
        match next {
            Step::Terminal => tracing::info!(
                session = %state.id(),
                iterations = state.iteration_count(),
                elapsed_ms = state.elapsed_ms(),
                "max iterations reached, ending session"
            ),
            Step::Critique => tracing::info!(
                iteration = state.iteration_count(),
                max_iterations = state.max_iterations(),
                "continuing to next iteration"
            ),
            _ => {}
        }
        (Some(event), state, next)
    }

    /// 运行到 Terminal，逐个发送事件；接收端关闭时在当前步后停止
    pub async fn run(&self, state: SessionState, events: &mpsc::Sender<StepEvent>) -> SessionState {
        let mut state = state;
        let mut step = Step::Research;
        while step != Step::Terminal {
            let (event, next_state, next) = self.advance(step, state).await;
            state = next_state;
            step = next;
            if let Some(event) = event {
                if events.send(event).await.is_err() {
                    tracing::info!(session = %state.id(), "event receiver dropped, stopping session");
                    break;
                }
            }
        }
        state
    }

    /// 运行到 Terminal 并收集全部事件
    pub async fn run_to_end(&self, state: SessionState) -> SessionOutcome {
        let mut state = state;
        let mut step = Step::Research;
        let mut events = Vec::new();
        while step != Step::Terminal {
            let (event, next_state, next) = self.advance(step, state).await;
            state = next_state;
            step = next;
            events.extend(event);
        }
        SessionOutcome { events, state }
    }

    /// 在后台任务中运行，返回事件流；丢弃流即停止后续步骤
    pub fn stream(self: Arc<Self>, state: SessionState) -> impl Stream<Item = StepEvent> + Send + 'static {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            self.run(state, &tx).await;
        });
        futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}
