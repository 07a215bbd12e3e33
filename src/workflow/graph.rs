//! 状态转移
//!
//! Research -> Draft -> {Critique | Terminal}，Critique -> Draft。
//! 唯一的条件边在 Draft 之后：iteration_count >= max_iterations 即终止。

use crate::workflow::{SessionState, Step};

/// Draft 之后的继续规则
pub fn should_continue(state: &SessionState) -> bool {
    state.iteration_count() < state.max_iterations()
}

/// 给定刚完成的步骤与其后的状态，返回下一步
pub fn next_step(completed: Step, state: &SessionState) -> Step {
    match completed {
        Step::Research => Step::Draft,
        Step::Draft if should_continue(state) => Step::Critique,
        Step::Draft => Step::Terminal,
        Step::Critique => Step::Draft,
        Step::Terminal => Step::Terminal,
    }
}
