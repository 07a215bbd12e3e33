//! Mock 模型（用于测试，无需 API）
//!
//! 记录每次调用；按后端返回预置回复，未预置时回显 `[<backend> #<n>]` 加上提示词首行。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Generation, ModelInvoker};

/// 一次被记录的调用
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub backend: String,
    pub prompt: String,
    pub system_role: String,
    pub temperature: f32,
}

#[derive(Debug, Default)]
pub struct MockModel {
    scripted: Mutex<HashMap<String, VecDeque<Generation>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为某后端追加一条预置结果（按顺序消费）
    pub fn script(self, backend: &str, reply: Generation) -> Self {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.entry(backend.to_string()).or_default().push_back(reply);
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, backend: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.backend == backend)
            .collect()
    }
}

#[async_trait]
impl ModelInvoker for MockModel {
    async fn generate(
        &self,
        backend_id: &str,
        prompt: &str,
        system_role: &str,
        temperature: f32,
    ) -> Generation {
        let n = match self.calls.lock() {
            Ok(mut calls) => {
                calls.push(RecordedCall {
                    backend: backend_id.to_string(),
                    prompt: prompt.to_string(),
                    system_role: system_role.to_string(),
                    temperature,
                });
                calls.iter().filter(|c| c.backend == backend_id).count()
            }
            Err(_) => 0,
        };

        let scripted = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut s| s.get_mut(backend_id).and_then(|q| q.pop_front()));

        scripted.unwrap_or_else(|| {
            let first_line = prompt
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("(empty prompt)");
            Ok(format!("[{} #{}] {}", backend_id, n, first_line))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;

    #[tokio::test]
    async fn test_scripted_then_echo() {
        let mock = MockModel::new()
            .script("a", Ok("one".into()))
            .script("a", Err(GenerationError::generation("a", "boom")));

        assert_eq!(mock.generate("a", "p", "s", 0.7).await.unwrap(), "one");
        assert!(mock.generate("a", "p", "s", 0.7).await.is_err());
        assert_eq!(
            mock.generate("a", "\n  hello\nworld", "s", 0.7).await.unwrap(),
            "[a #3] hello"
        );
        assert_eq!(mock.calls_to("a").len(), 3);
        assert!(mock.calls_to("b").is_empty());
    }
}
