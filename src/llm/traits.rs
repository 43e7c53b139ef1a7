//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Gemini / Mock）实现 LlmClient：complete（自由文本）、
//! complete_structured（按 JSON Schema 约束的结构化输出）。核心逻辑只面向 trait，
//! 不感知具体后端。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::PanelError;
use crate::llm::parse::parse_structured;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 期望的输出形态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// 单次补全的调用选项
#[derive(Clone, Debug, Default)]
pub struct CompletionOptions {
    /// 采样温度（None 用后端默认）
    pub temperature: Option<f32>,
    /// 输出 token 上限
    pub max_output_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

impl CompletionOptions {
    pub fn text() -> Self {
        Self::default()
    }

    pub fn json() -> Self {
        Self {
            response_format: ResponseFormat::Json,
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// LLM 客户端 trait：文本补全与结构化补全
///
/// 失败分类约定：网络/鉴权/限额/超时 → Provider；请求 JSON 但一次修复后仍不可解析
/// → MalformedResponse。两类均不在 Gateway 内部重试。
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 文本补全；response_format 为 Json 时后端应尽力启用原生 JSON 模式
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, PanelError>;

    /// 结构化补全：在消息尾部注入 Schema 指令，以 JSON 模式调用，
    /// 再经一次就地修复解析为 JSON 值
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &serde_json::Value,
        options: &CompletionOptions,
    ) -> Result<serde_json::Value, PanelError> {
        let mut full = messages.to_vec();
        full.push(Message::system(format!(
            "You are a data extraction assistant. Return a single valid JSON object matching this schema, with no surrounding prose:\n{}",
            schema
        )));
        let options = CompletionOptions {
            response_format: ResponseFormat::Json,
            ..options.clone()
        };
        let raw = self.complete(&full, &options).await?;
        parse_structured(&raw)
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
