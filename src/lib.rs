//! Synrev - 合成评审团系统
//!
//! 用人格化的评审人智能体对研究提案做结构化评审。
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类
//! - **engine**: Thinking/Acting/Observing 评审状态机、载荷修复与评审装配
//! - **extract**: 档案抽取流水线（元数据 / OG 标签 / 正文启发式 + LLM 增强）
//! - **ingest**: 文档摄取（文本 / Markdown / 可选 PDF）
//! - **llm**: Model Gateway（OpenAI 兼容 / Gemini / Mock）
//! - **model**: 领域类型（评审人、提案、评审）
//! - **panel**: 评审团编排与汇总
//! - **persona**: 人格分 → 评审指令的纯映射
//! - **store**: 持久化（内存 / SQLite）
//! - **training**: 用户反馈统计与改进建议

pub mod config;
pub mod core;
pub mod engine;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod model;
pub mod observability;
pub mod panel;
pub mod persona;
pub mod store;
pub mod training;

pub use core::PanelError;
