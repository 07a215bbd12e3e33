//! 起草与评审提示词
//!
//! 起草提示词嵌入 scope、检索数据、当前草稿与上轮评审；尚无草稿/评审时使用固定占位语。
//! 模型或搜索失败的文本照常嵌入（失败即内容，不做检测与重试）。

use crate::llm::display_text;
use crate::workflow::SessionState;

/// 首轮起草时的草稿占位
pub const FIRST_DRAFT_PLACEHOLDER: &str = "This is the first draft.";
/// 尚无评审时的评审占位
pub const NO_CRITIQUE_PLACEHOLDER: &str = "No critique yet.";

/// 评审固定维度
pub const CRITIQUE_RUBRIC: [&str; 5] = [
    "Data accuracy and credibility",
    "Logical flow and structure",
    "Completeness of analysis",
    "Professional tone",
    "Missing key insights or data points",
];

pub fn drafter_prompt(state: &SessionState) -> String {
    let search_data = state.search_data().map(display_text).unwrap_or_default();
    let draft = state
        .draft()
        .map(display_text)
        .unwrap_or_else(|| FIRST_DRAFT_PLACEHOLDER.to_string());
    let critique = state
        .critique()
        .map(display_text)
        .unwrap_or_else(|| NO_CRITIQUE_PLACEHOLDER.to_string());

    format!(
        r#"You are an expert business analyst writing a comprehensive report section.

**Scope:** {scope}

**Research Data:**
{search_data}

**Current Draft (if any):**
{draft}

**Previous Critique (if any):**
{critique}

**Instructions:**
- Write a detailed, data-driven analysis
- Include specific figures, trends, and insights from the research data
- Use professional business language
- Structure with clear headings and bullet points where appropriate
- Cite data sources when possible
- Address any critique points if provided

Write the improved draft now:
"#,
        scope = state.scope(),
    )
}

pub fn critic_prompt(state: &SessionState) -> String {
    let draft = state.draft().map(display_text).unwrap_or_default();
    let rubric = CRITIQUE_RUBRIC
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a harsh but constructive editor reviewing a business report draft.

**Draft to Review:**
{draft}

**Evaluation Criteria:**
{rubric}

Provide specific, actionable critique focusing on improvements needed:
"#
    )
}
