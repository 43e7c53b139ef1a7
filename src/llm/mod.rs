//! Model Gateway：客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）
//!
//! 后端在构造期由配置选定，核心逻辑只面向 LlmClient trait。

use std::sync::Arc;

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod parse;
pub mod traits;

pub use gemini::GeminiClient;
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use parse::{extract_json_object, parse_structured};
pub use traits::{CompletionOptions, LlmClient, Message, ResponseFormat, Role};

use crate::config::AppConfig;

/// 根据配置与环境变量选择 LLM 后端（OpenAI / Gemini / Mock）
///
/// provider 对应的 API Key 环境变量缺失或 provider 未知时回退 Mock 并告警，
/// 保证离线也能跑通完整流程。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout_secs = cfg.llm.timeouts.request;

    match provider.as_str() {
        "openai" if std::env::var("OPENAI_API_KEY").is_ok() => {
            let model = cfg.llm.openai_model();
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
                timeout_secs,
            ))
        }
        "gemini" if std::env::var("GEMINI_API_KEY").is_ok() => {
            let model = cfg.llm.gemini_model();
            tracing::info!("Using Gemini LLM ({})", model);
            let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
            Arc::new(GeminiClient::new(&key, &model, timeout_secs))
        }
        _ => {
            tracing::warn!("No API key set or provider unknown, using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
    }
}
