//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 支持脚本化回复队列与调用计数；队列耗尽时按请求形态给出缺省回复
//! （JSON 请求 → 一份合法评审 JSON，文本请求 → 一段推理文字），
//! 便于本地跑通完整评审流程。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::PanelError;
use crate::llm::{CompletionOptions, LlmClient, Message, ResponseFormat};

/// Mock 客户端：按脚本出队，或按请求形态返回缺省回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
    /// 任一消息包含该标记时直接返回 Provider 错误（用于按评审人定向注入失败）
    failure_marker: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一组脚本回复（按序出队）
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies = responses.into_iter().map(|s| Ok(s.into())).collect();
        Self {
            replies: Mutex::new(replies),
            ..Self::default()
        }
    }

    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.failure_marker = Some(marker.into());
        self
    }

    /// 追加一条脚本回复
    pub fn push_response(&self, response: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(response.into()));
    }

    /// 追加一条脚本化的 Provider 失败
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(reason.into()));
    }

    /// 累计 complete 调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 缺省评审 JSON（与评审 Schema 字段一致）
    fn default_review_json() -> String {
        r#"{
  "overall_score": 7.0,
  "recommendation": "revise",
  "novelty_score": 7.5,
  "feasibility_score": 6.5,
  "impact_score": 7.0,
  "methodology_score": 6.0,
  "clarity_score": 8.0,
  "strengths": ["Clear problem statement", "Relevant prior work coverage"],
  "weaknesses": ["Evaluation plan lacks baselines", "Timeline is optimistic"],
  "summary": "A solid proposal with a clear goal, though the evaluation plan needs strengthening before acceptance.",
  "detailed_comments": "The methodology section would benefit from explicit baselines and an ablation plan. The significance of the expected results is well argued.",
  "suggestions": "Add at least two baseline comparisons and a risk mitigation plan for the data collection phase."
}"#
        .to_string()
    }

    fn default_thought() -> String {
        "The proposal falls within my area of competence. The core idea appears \
         incremental but sound; feasibility hinges on the data collection plan, and \
         the methodology needs a clearer evaluation protocol before I can score it highly."
            .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, PanelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = &self.failure_marker {
            if messages.iter().any(|m| m.content.contains(marker)) {
                return Err(PanelError::Provider(format!(
                    "mock provider failure (marker: {})",
                    marker
                )));
            }
        }

        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply.map_err(PanelError::Provider);
        }

        if options.response_format == ResponseFormat::Json {
            Ok(Self::default_review_json())
        } else {
            Ok(Self::default_thought())
        }
    }
}
