//! 评审系统错误类型
//!
//! 单一 PanelError 枚举贯穿全部组件：Gateway 分类 Provider / MalformedResponse，
//! 引擎重试耗尽时以 ReviewGeneration 携带部分推理轨迹，抽取与校验各有专属变体。

use thiserror::Error;

use crate::model::TraceStep;

/// 评审流程中可能出现的错误（网络、解析、抽取、校验、持久化等）
#[derive(Error, Debug)]
pub enum PanelError {
    /// 后端网络/鉴权/限额/超时失败；Gateway 之上不重试（抽取管线的有界退避除外）
    #[error("Provider error: {0}")]
    Provider(String),

    /// 请求了 JSON 输出但一次就地修复后仍无法解析
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// 引擎在一次 Acting 重试后仍无法产出结构完整的评审；携带部分轨迹供诊断
    #[error("Review generation failed: {reason}")]
    ReviewGeneration {
        reason: String,
        trace: Vec<TraceStep>,
    },

    /// 档案 URL 抓取/解析的非瞬态失败
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// 调用方数据违反数据模型约束（如人格分越界、非法 URL）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 持久化层失败（含 not found）
    #[error("Store error: {0}")]
    Store(String),

    /// 文档摄入：无法识别的 MIME 类型
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 文档摄入：内容损坏或为空
    #[error("Parse error: {0}")]
    Parse(String),
}

impl PanelError {
    /// 错误类别短名（用于失败清单与结构化日志）
    pub fn kind(&self) -> &'static str {
        match self {
            PanelError::Provider(_) => "provider",
            PanelError::MalformedResponse(_) => "malformed_response",
            PanelError::ReviewGeneration { .. } => "review_generation",
            PanelError::Extraction(_) => "extraction",
            PanelError::Validation(_) => "validation",
            PanelError::Store(_) => "store",
            PanelError::UnsupportedFormat(_) => "unsupported_format",
            PanelError::Parse(_) => "parse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PanelError::Provider("connection refused".to_string());
        assert_eq!(e.to_string(), "Provider error: connection refused");
        assert_eq!(e.kind(), "provider");
    }

    #[test]
    fn test_review_generation_carries_trace() {
        let e = PanelError::ReviewGeneration {
            reason: "overall_score missing".to_string(),
            trace: vec![TraceStep::thought("some reasoning")],
        };
        match e {
            PanelError::ReviewGeneration { trace, .. } => assert_eq!(trace.len(), 1),
            _ => panic!("wrong variant"),
        }
    }
}
