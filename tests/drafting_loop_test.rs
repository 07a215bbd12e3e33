//! 起草/评审循环集成测试

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, Semaphore};

use council::config::AppConfig;
use council::llm::{BackendRegistry, Generation, GenerationError, MockModel, ModelInvoker};
use council::research::{Research, Researcher, SearchError};
use council::workflow::prompts::{FIRST_DRAFT_PLACEHOLDER, NO_CRITIQUE_PLACEHOLDER};
use council::workflow::{DraftingLoop, SessionBuilder, SessionState, StepEvent};

const DRAFTER: &str = "claude-sonnet-4-5";
const CRITIC: &str = "grok-4-fast-reasoning";

struct CountingResearcher {
    calls: AtomicUsize,
    result: Research,
}

impl CountingResearcher {
    fn ok(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Ok(text.to_string()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Err(SearchError::new(message)),
        }
    }
}

#[async_trait]
impl Researcher for CountingResearcher {
    async fn search_web(&self, _topic: &str) -> Research {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

fn session(scope: &str, iterations: u32) -> SessionState {
    let registry = BackendRegistry::from_config(&AppConfig::default());
    SessionBuilder::new(scope)
        .max_iterations(iterations)
        .drafter(DRAFTER)
        .critic(CRITIC)
        .build(&registry)
        .unwrap()
}

#[tokio::test]
async fn test_step_counts_for_every_bound() {
    for n in 1..=5 {
        let model = Arc::new(MockModel::new());
        let researcher = Arc::new(CountingResearcher::ok("data"));
        let engine = DraftingLoop::new(model.clone(), researcher.clone());

        let outcome = engine.run_to_end(session("EV", n)).await;

        assert_eq!(researcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.calls_to(DRAFTER).len() as u32, n);
        assert_eq!(model.calls_to(CRITIC).len() as u32, n - 1);
        assert_eq!(outcome.state.iteration_count(), n);
        assert_eq!(outcome.events.len() as u32, 1 + n + (n - 1));

        // 迭代计数逐次加一且不超过上限
        let counts: Vec<u32> = outcome
            .events
            .iter()
            .filter_map(|e| match e {
                StepEvent::Drafter {
                    iteration_count, ..
                } => Some(*iteration_count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, (1..=n).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_placeholders_only_in_first_draft_prompt() {
    let model = Arc::new(MockModel::new());
    let engine = DraftingLoop::new(model.clone(), Arc::new(CountingResearcher::ok("data")));
    engine.run_to_end(session("EV", 3)).await;

    let prompts: Vec<String> = model
        .calls_to(DRAFTER)
        .into_iter()
        .map(|c| c.prompt)
        .collect();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains(FIRST_DRAFT_PLACEHOLDER));
    assert!(prompts[0].contains(NO_CRITIQUE_PLACEHOLDER));
    for later in &prompts[1..] {
        assert!(!later.contains(FIRST_DRAFT_PLACEHOLDER));
        assert!(!later.contains(NO_CRITIQUE_PLACEHOLDER));
    }
}

#[tokio::test]
async fn test_single_iteration_scenario() {
    let model = Arc::new(MockModel::new().script(DRAFTER, Ok("Only draft".into())));
    let engine = DraftingLoop::new(model.clone(), Arc::new(CountingResearcher::ok("data")));

    let outcome = engine
        .run_to_end(session("EV Battery Swapping Trends in India 2025", 1))
        .await;

    let names: Vec<&str> = outcome.events.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["research", "drafter"]);
    assert!(outcome.state.critique().is_none());
    assert_eq!(outcome.final_artifact().as_deref(), Some("Only draft"));
}

#[tokio::test]
async fn test_two_iteration_event_order() {
    let model = Arc::new(
        MockModel::new()
            .script(DRAFTER, Ok("Draft one".into()))
            .script(DRAFTER, Ok("Draft two".into()))
            .script(CRITIC, Ok("Needs more data".into())),
    );
    let engine = DraftingLoop::new(model.clone(), Arc::new(CountingResearcher::ok("data")));

    let outcome = engine.run_to_end(session("EV", 2)).await;

    assert_eq!(
        outcome.events,
        vec![
            StepEvent::Research {
                search_data: Ok("data".into())
            },
            StepEvent::Drafter {
                draft: Ok("Draft one".into()),
                iteration_count: 1
            },
            StepEvent::Critic {
                critique: Ok("Needs more data".into())
            },
            StepEvent::Drafter {
                draft: Ok("Draft two".into()),
                iteration_count: 2
            },
        ]
    );
    assert_eq!(outcome.final_artifact().as_deref(), Some("Draft two"));

    let second_prompt = &model.calls_to(DRAFTER)[1].prompt;
    assert!(second_prompt.contains("Draft one"));
    assert!(second_prompt.contains("Needs more data"));
    assert!(model.calls_to(CRITIC)[0].prompt.contains("Draft one"));
}

#[tokio::test]
async fn test_research_failure_flows_into_draft() {
    let model = Arc::new(MockModel::new());
    let engine = DraftingLoop::new(model.clone(), Arc::new(CountingResearcher::failing("network down")));

    let outcome = engine.run_to_end(session("EV", 1)).await;

    match &outcome.events[0] {
        StepEvent::Research { search_data } => {
            let err = search_data.as_ref().unwrap_err();
            assert!(err.to_string().starts_with("Search Error: "));
        }
        other => panic!("unexpected first event: {:?}", other),
    }
    assert_eq!(outcome.state.iteration_count(), 1);
    assert!(model.calls_to(DRAFTER)[0]
        .prompt
        .contains("Search Error: network down"));
}

#[tokio::test]
async fn test_model_failure_text_becomes_next_context() {
    let model = Arc::new(
        MockModel::new()
            .script(DRAFTER, Err(GenerationError::generation(DRAFTER, "HTTP 500")))
            .script(DRAFTER, Ok("Recovered draft".into())),
    );
    let engine = DraftingLoop::new(model.clone(), Arc::new(CountingResearcher::ok("data")));

    let outcome = engine.run_to_end(session("EV", 2)).await;

    assert_eq!(outcome.state.iteration_count(), 2);
    let failure_text = format!("Model Generation Error ({}): HTTP 500", DRAFTER);
    assert!(model.calls_to(CRITIC)[0].prompt.contains(&failure_text));
    assert!(model.calls_to(DRAFTER)[1].prompt.contains(&failure_text));
    assert_eq!(outcome.final_artifact().as_deref(), Some("Recovered draft"));
}

#[tokio::test]
async fn test_stream_yields_events_in_order() {
    let model = Arc::new(MockModel::new());
    let engine = Arc::new(DraftingLoop::new(model, Arc::new(CountingResearcher::ok("data"))));

    let events: Vec<StepEvent> = engine.stream(session("EV", 3)).collect().await;
    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec!["research", "drafter", "critic", "drafter", "critic", "drafter"]
    );
}

/// 每次调用先上报后端名，再等待放行
struct GatedModel {
    calls: mpsc::UnboundedSender<String>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl ModelInvoker for GatedModel {
    async fn generate(
        &self,
        backend_id: &str,
        _prompt: &str,
        _system_role: &str,
        _temperature: f32,
    ) -> Generation {
        let _ = self.calls.send(backend_id.to_string());
        let _permit = self.gate.acquire().await;
        Ok(format!("{} reply", backend_id))
    }
}

#[tokio::test]
async fn test_stream_dropped_mid_step_runs_no_further_steps() {
    let (calls_tx, mut calls_rx) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let model = Arc::new(GatedModel {
        calls: calls_tx,
        gate: gate.clone(),
    });
    // 引擎只由后台任务持有：任务结束时模型随之释放，calls_rx 才会返回 None
    let engine = Arc::new(DraftingLoop::new(model, Arc::new(CountingResearcher::ok("data"))));

    let mut events = Box::pin(engine.stream(session("EV", 5)));
    let first = events.next().await.unwrap();
    assert_eq!(first.name(), "research");

    // 起草调用进行中时丢弃事件流
    assert_eq!(calls_rx.recv().await.as_deref(), Some(DRAFTER));
    drop(events);
    gate.add_permits(16);

    let mut later_calls = Vec::new();
    while let Some(backend) = calls_rx.recv().await {
        later_calls.push(backend);
    }
    assert!(later_calls.is_empty(), "unexpected calls after drop: {:?}", later_calls);
}

#[tokio::test]
async fn test_run_stops_at_first_send_after_receiver_dropped() {
    let (calls_tx, mut calls_rx) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let engine = DraftingLoop::new(
        Arc::new(GatedModel {
            calls: calls_tx,
            gate: gate.clone(),
        }),
        Arc::new(CountingResearcher::ok("data")),
    );

    let (tx, mut rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move { engine.run(session("EV", 5), &tx).await });

    assert_eq!(rx.recv().await.unwrap().name(), "research");
    assert_eq!(calls_rx.recv().await.as_deref(), Some(DRAFTER));
    drop(rx);
    gate.add_permits(16);

    let state = handle.await.unwrap();
    // 进行中的起草步完成并写入状态，其事件无人接收，之后不再有步骤
    assert_eq!(state.iteration_count(), 1);
    assert!(state.critique().is_none());
    assert!(calls_rx.recv().await.is_none());
}
