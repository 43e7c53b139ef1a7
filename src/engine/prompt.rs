//! 评审提示词构造：角色设定、思考/行动指令与结构化输出 schema
//!
//! 提示词一律英文；人格差异只通过 [`Directives`] 注入，本模块不读人格分。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::model::{Panelist, Proposal};
use crate::persona::Directives;

/// 提案摘要注入提示词前的截断长度（字符）
pub const ABSTRACT_BUDGET_CHARS: usize = 500;
/// 提案正文注入提示词前的截断长度（字符）
pub const CONTENT_BUDGET_CHARS: usize = 1000;

/// 模型需返回的扁平评审 JSON。仅用于生成 schema，宽松解析在 repair 中做。
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReviewPayload {
    /// 总分，1-10
    pub overall_score: f64,
    /// accept / revise / reject
    pub recommendation: String,
    pub novelty_score: f64,
    pub feasibility_score: f64,
    pub impact_score: f64,
    pub methodology_score: f64,
    pub clarity_score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub summary: String,
    pub detailed_comments: String,
    pub suggestions: Vec<String>,
}

/// ReviewPayload 的 JSON Schema，随行动指令发给模型
pub fn review_schema() -> serde_json::Value {
    let schema = schema_for!(ReviewPayload);
    serde_json::to_value(schema.schema).unwrap_or_else(|_| serde_json::json!({}))
}

const ROLE_TEMPLATE: &str = "You are an expert reviewer named {name} with expertise in {expertise}. \
{tone}. {novelty}. {depth}.";

/// 评审人系统提示：身份 + 专长 + 人格指令
pub fn role_prompt(panelist: &Panelist, directives: &Directives) -> String {
    let expertise = if panelist.expertise.is_empty() {
        "general research".to_string()
    } else {
        panelist
            .expertise
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    ROLE_TEMPLATE
        .replace("{name}", &panelist.name)
        .replace("{expertise}", &expertise)
        .replace("{tone}", directives.tone.phrase())
        .replace("{novelty}", directives.novelty_stance.phrase())
        .replace("{depth}", directives.depth.phrase())
}

/// 截断到至多 `max` 个字符，保持 UTF-8 边界
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 评审任务描述：标题 + 截断后的摘要与正文
pub fn review_task(proposal: &Proposal) -> String {
    let abstract_text = proposal
        .abstract_text
        .as_deref()
        .map(|a| truncate_chars(a, ABSTRACT_BUDGET_CHARS))
        .unwrap_or("(not provided)");

    format!(
        "Review the following research proposal.\n\n\
         Title: {}\n\n\
         Abstract: {}\n\n\
         Content: {}",
        proposal.title,
        abstract_text,
        truncate_chars(&proposal.content, CONTENT_BUDGET_CHARS),
    )
}

/// Thinking 阶段指令：先推理，不产出 JSON
pub fn thought_prompt() -> String {
    "Think step by step about how you would evaluate this proposal given your \
     expertise and reviewing style. Consider novelty, feasibility, impact, \
     methodology and clarity. Describe your reasoning in plain prose, do not \
     produce the review yet."
        .to_string()
}

/// Acting 阶段指令：按 schema 产出结构化评审
pub fn action_prompt(directives: &Directives) -> String {
    format!(
        "Based on your reasoning, write your review now. Return a single JSON \
         object matching this schema:\n{}\n\
         All scores are numbers between 1 and 10. The recommendation must be one \
         of \"accept\", \"revise\" or \"reject\". The detailed_comments field must \
         contain at least {} words.",
        review_schema(),
        directives.min_comment_words,
    )
}

/// 重试指令：上一轮输出无法解析时追加的更严格要求
pub fn strict_retry_prompt() -> String {
    "Your previous reply could not be parsed. Return ONLY one valid JSON object \
     matching the schema above. No markdown fences, no commentary, no text before \
     or after the JSON."
        .to_string()
}
