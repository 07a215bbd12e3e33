//! 展示层辅助：事件状态行、产物文件名、导出

use std::path::{Path, PathBuf};

use crate::llm::display_text;
use crate::workflow::StepEvent;

/// 状态行（对应原界面的进度提示）
pub fn render_event(event: &StepEvent) -> String {
    match event {
        StepEvent::Research { search_data } => match search_data {
            Ok(_) => "Research Complete: Data Gathered".to_string(),
            Err(e) => format!("Research Complete (degraded): {}", e),
        },
        StepEvent::Drafter {
            iteration_count, ..
        } => format!("Draft Version {} Generated", iteration_count),
        StepEvent::Critic { .. } => "Critique Received".to_string(),
    }
}

/// 事件正文（草稿、评审或检索数据）
pub fn event_body(event: &StepEvent) -> String {
    match event {
        StepEvent::Research { search_data } => display_text(search_data),
        StepEvent::Drafter { draft, .. } => display_text(draft),
        StepEvent::Critic { critique } => display_text(critique),
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// 由 scope 生成文件名：空白换成下划线，去掉其他不安全字符
pub fn artifact_file_name(scope: &str) -> String {
    let joined = scope.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined.chars().filter(|c| is_safe_char(*c)).collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "section.md".to_string()
    } else {
        format!("{}.md", cleaned)
    }
}

/// 将最终稿写入 dir/<文件名>，返回路径
pub fn export_artifact(dir: &Path, scope: &str, text: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(artifact_file_name(scope));
    std::fs::write(&path, text)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(
            artifact_file_name("EV Battery Swapping Trends in India 2025"),
            "EV_Battery_Swapping_Trends_in_India_2025.md"
        );
        assert_eq!(artifact_file_name("../../etc/passwd"), "etcpasswd.md");
        assert_eq!(artifact_file_name("Q3: EV/2W sales?"), "Q3_EV2W_sales.md");
        assert_eq!(artifact_file_name("???"), "section.md");
        assert_eq!(artifact_file_name("Tata-EV v2.0 (é)"), "Tata-EV_v2.0_.md");
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_artifact(&dir.path().join("out"), "EV swap", "# Final").unwrap();
        assert_eq!(path.file_name().unwrap(), "EV_swap.md");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Final");
    }

    #[test]
    fn test_render_event_lines() {
        let drafted = StepEvent::Drafter {
            draft: Err(GenerationError::generation("m", "down")),
            iteration_count: 2,
        };
        assert_eq!(render_event(&drafted), "Draft Version 2 Generated");
        assert_eq!(event_body(&drafted), "Model Generation Error (m): down");
        assert_eq!(
            render_event(&StepEvent::Critic {
                critique: Ok("ok".into())
            }),
            "Critique Received"
        );
    }
}
