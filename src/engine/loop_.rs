//! Reasoning-Acting 评审引擎
//!
//! Init -> Thinking -> Acting -> Observing -> Done / Failed 的阶段机，只许前进；
//! Acting 解析失败允许一次自环重试（更严格的 JSON 指令），全程记录 trace。
//! Provider 错误原样上抛，结构性失败以 ReviewGeneration 携带部分 trace 返回。

use std::sync::Arc;

use crate::core::PanelError;
use crate::engine::{assembler, prompt, repair};
use crate::llm::{CompletionOptions, LlmClient, Message};
use crate::model::{Panelist, Proposal, Review, TraceStep};
use crate::persona::derive_directives;

/// Acting 阶段总尝试次数：首次 + 一次更严格重试
const MAX_ACTION_ATTEMPTS: usize = 2;
/// 评审生成默认采样温度
const DEFAULT_REVIEW_TEMPERATURE: f32 = 0.7;
/// 评审生成默认输出 token 上限
const DEFAULT_REVIEW_MAX_OUTPUT_TOKENS: u32 = 2500;

/// 引擎阶段，显式枚举 + 迁移表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Init,
    Thinking,
    Acting,
    Observing,
    Done,
    Failed,
}

impl EngineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineStage::Init => "init",
            EngineStage::Thinking => "thinking",
            EngineStage::Acting => "acting",
            EngineStage::Observing => "observing",
            EngineStage::Done => "done",
            EngineStage::Failed => "failed",
        }
    }

    /// 迁移表：只能前进，Acting 允许自环（重试），任何工作阶段可进入 Failed
    pub fn can_advance_to(self, next: EngineStage) -> bool {
        use EngineStage::*;
        matches!(
            (self, next),
            (Init, Thinking)
                | (Thinking, Acting)
                | (Acting, Acting)
                | (Acting, Observing)
                | (Observing, Done)
                | (Init, Failed)
                | (Thinking, Failed)
                | (Acting, Failed)
                | (Observing, Failed)
        )
    }

    /// 按迁移表推进；非法迁移是编程错误，以 Validation 报出
    pub fn advance(self, next: EngineStage) -> Result<EngineStage, PanelError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(PanelError::Validation(format!(
                "illegal engine stage transition: {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

/// 单个评审人的评审生成引擎
pub struct ReviewEngine {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
    max_output_tokens: u32,
}

impl ReviewEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            temperature: DEFAULT_REVIEW_TEMPERATURE,
            max_output_tokens: DEFAULT_REVIEW_MAX_OUTPUT_TOKENS,
        }
    }

    /// 覆盖采样温度
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// 覆盖输出 token 上限
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// 以 panelist 的人格视角评审 proposal，产出带完整 trace 的 Review
    pub async fn evaluate(
        &self,
        panelist: &Panelist,
        proposal: &Proposal,
    ) -> Result<Review, PanelError> {
        let mut stage = EngineStage::Init;
        let mut trace: Vec<TraceStep> = Vec::new();

        let directives = derive_directives(&panelist.personality)?;

        // Thinking：先让模型以该人格推理，不产出 JSON
        stage = stage.advance(EngineStage::Thinking)?;
        let mut messages = vec![
            Message::system(prompt::role_prompt(panelist, &directives)),
            Message::user(prompt::review_task(proposal)),
            Message::user(prompt::thought_prompt()),
        ];
        let options = CompletionOptions::text()
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens);

        let thought = match self.llm.complete(&messages, &options).await {
            Ok(t) => t,
            Err(err) => {
                stage = stage.advance(EngineStage::Failed)?;
                tracing::warn!(
                    stage = stage.as_str(),
                    panelist = %panelist.name,
                    error = %err,
                    "review generation failed during thinking"
                );
                return Err(err);
            }
        };
        trace.push(TraceStep::thought(thought.clone()));

        // Acting：结构化输出，解析或必备字段缺失可重试一次
        stage = stage.advance(EngineStage::Acting)?;
        messages.push(Message::assistant(thought));
        messages.push(Message::user(prompt::action_prompt(&directives)));

        let schema = prompt::review_schema();
        let action_options = CompletionOptions::json()
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens);

        let mut attempt = 0;
        let repaired = loop {
            attempt += 1;
            let payload = match self
                .llm
                .complete_structured(&messages, &schema, &action_options)
                .await
            {
                Ok(p) => p,
                Err(PanelError::MalformedResponse(reason)) => {
                    if attempt >= MAX_ACTION_ATTEMPTS {
                        stage = stage.advance(EngineStage::Failed)?;
                        tracing::warn!(
                            stage = stage.as_str(),
                            panelist = %panelist.name,
                            attempts = attempt,
                            "structured review unparseable after retry"
                        );
                        return Err(PanelError::ReviewGeneration { reason, trace });
                    }
                    stage = stage.advance(EngineStage::Acting)?;
                    messages.push(Message::user(prompt::strict_retry_prompt()));
                    continue;
                }
                Err(err) => {
                    // Provider 等网络类错误不在引擎内重试，原样上抛
                    stage = stage.advance(EngineStage::Failed)?;
                    tracing::warn!(
                        stage = stage.as_str(),
                        panelist = %panelist.name,
                        error = %err,
                        "review generation failed during acting"
                    );
                    return Err(err);
                }
            };

            trace.push(TraceStep::action(payload.to_string()));

            match repair::repair_payload(&payload) {
                Ok(r) => break r,
                Err(PanelError::MalformedResponse(reason)) => {
                    if attempt >= MAX_ACTION_ATTEMPTS {
                        stage = stage.advance(EngineStage::Failed)?;
                        tracing::warn!(
                            stage = stage.as_str(),
                            panelist = %panelist.name,
                            attempts = attempt,
                            "review payload structurally invalid after retry"
                        );
                        return Err(PanelError::ReviewGeneration { reason, trace });
                    }
                    stage = stage.advance(EngineStage::Acting)?;
                    messages.push(Message::user(prompt::strict_retry_prompt()));
                }
                Err(err) => {
                    stage = stage.advance(EngineStage::Failed)?;
                    return Err(err);
                }
            }
        };

        // Observing：记录校验与修补结果
        stage = stage.advance(EngineStage::Observing)?;
        trace.push(TraceStep::observation(observation_summary(&repaired)));

        stage = stage.advance(EngineStage::Done)?;
        tracing::debug!(
            stage = stage.as_str(),
            panelist = %panelist.name,
            proposal = %proposal.title,
            overall_score = repaired.overall_score,
            repairs = repaired.repair_notes.len(),
            "review generated"
        );

        assembler::assemble(panelist, proposal, repaired, trace)
    }
}

fn observation_summary(repaired: &repair::RepairedReview) -> String {
    if repaired.repair_notes.is_empty() {
        format!(
            "validated review payload: overall_score {}, recommendation {}; no repairs needed",
            repaired.overall_score,
            repaired.recommendation.as_str()
        )
    } else {
        format!(
            "validated review payload: overall_score {}, recommendation {}; {} repair(s): {}",
            repaired.overall_score,
            repaired.recommendation.as_str(),
            repaired.repair_notes.len(),
            repaired.repair_notes.join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::model::{PersonalityScores, Recommendation, TraceKind};

    fn panelist() -> Panelist {
        Panelist::new("Dr. Wu")
            .with_expertise(vec!["Machine Learning".into()])
            .with_personality(PersonalityScores {
                critical: 8.0,
                openness: 6.0,
                seriousness: 5.0,
            })
    }

    fn proposal() -> Proposal {
        Proposal::new("Quantum Routing", "We propose a quantum-assisted routing scheme.")
    }

    fn valid_review_json() -> String {
        serde_json::json!({
            "overall_score": 7.8,
            "recommendation": "accept",
            "novelty_score": 8.0,
            "feasibility_score": 6.5,
            "impact_score": 7.0,
            "methodology_score": 7.5,
            "clarity_score": 8.0,
            "strengths": ["clear problem statement"],
            "weaknesses": ["limited evaluation"],
            "summary": "Solid proposal.",
            "detailed_comments": "The routing scheme is well motivated.",
            "suggestions": ["add a baseline comparison"]
        })
        .to_string()
    }

    #[test]
    fn test_stage_transition_table() {
        use EngineStage::*;
        assert!(Init.can_advance_to(Thinking));
        assert!(Thinking.can_advance_to(Acting));
        assert!(Acting.can_advance_to(Acting));
        assert!(Acting.can_advance_to(Observing));
        assert!(Observing.can_advance_to(Done));
        assert!(Acting.can_advance_to(Failed));
        // 不允许回退或从终态迁出
        assert!(!Observing.can_advance_to(Acting));
        assert!(!Thinking.can_advance_to(Init));
        assert!(!Done.can_advance_to(Thinking));
        assert!(!Failed.can_advance_to(Acting));
        assert!(Init.advance(Acting).is_err());
    }

    #[tokio::test]
    async fn test_evaluate_happy_path() {
        let mock = Arc::new(MockLlmClient::with_responses(vec![
            "The proposal is ambitious but the evaluation is thin.".to_string(),
            valid_review_json(),
        ]));
        let engine = ReviewEngine::new(mock.clone());

        let review = engine.evaluate(&panelist(), &proposal()).await.unwrap();
        assert_eq!(mock.call_count(), 2);
        assert_eq!(review.overall_score, 7.8);
        assert_eq!(review.recommendation, Recommendation::Accept);
        assert_eq!(review.trace.len(), 3);
        assert_eq!(review.trace[0].kind, TraceKind::Thought);
        assert_eq!(review.trace[1].kind, TraceKind::Action);
        assert_eq!(review.trace[2].kind, TraceKind::Observation);
        assert!(review.repair_notes.is_empty());
    }

    #[tokio::test]
    async fn test_acting_retry_recovers_from_garbage() {
        let mock = Arc::new(MockLlmClient::with_responses(vec![
            "Thinking...".to_string(),
            "I refuse to answer in JSON".to_string(),
            valid_review_json(),
        ]));
        let engine = ReviewEngine::new(mock.clone());

        let review = engine.evaluate(&panelist(), &proposal()).await.unwrap();
        assert_eq!(mock.call_count(), 3);
        assert_eq!(review.recommendation, Recommendation::Accept);
    }

    #[tokio::test]
    async fn test_exhausted_retries_carry_partial_trace() {
        let mock = Arc::new(MockLlmClient::with_responses(vec![
            "Thinking...".to_string(),
            "garbage".to_string(),
            "still garbage".to_string(),
        ]));
        let engine = ReviewEngine::new(mock.clone());

        let err = engine.evaluate(&panelist(), &proposal()).await.unwrap_err();
        assert_eq!(mock.call_count(), 3);
        match err {
            PanelError::ReviewGeneration { trace, .. } => {
                assert!(!trace.is_empty());
                assert_eq!(trace[0].kind, TraceKind::Thought);
            }
            other => panic!("expected ReviewGeneration, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_overall_score_consumes_the_retry() {
        let no_overall = serde_json::json!({ "recommendation": "accept" }).to_string();
        let mock = Arc::new(MockLlmClient::with_responses(vec![
            "Thinking...".to_string(),
            no_overall.clone(),
            no_overall,
        ]));
        let engine = ReviewEngine::new(mock.clone());

        let err = engine.evaluate(&panelist(), &proposal()).await.unwrap_err();
        assert_eq!(mock.call_count(), 3);
        match err {
            PanelError::ReviewGeneration { trace, .. } => {
                // thought + 两次 action 载荷都应留在 trace 里
                let actions = trace.iter().filter(|s| s.kind == TraceKind::Action).count();
                assert_eq!(actions, 2);
            }
            other => panic!("expected ReviewGeneration, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_error_propagates_undecorated() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_response("Thinking...");
        mock.push_failure("quota exhausted");
        let engine = ReviewEngine::new(mock.clone());

        let err = engine.evaluate(&panelist(), &proposal()).await.unwrap_err();
        assert_eq!(mock.call_count(), 2);
        assert!(matches!(err, PanelError::Provider(_)));
    }
}
