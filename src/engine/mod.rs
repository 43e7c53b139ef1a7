//! 评审生成引擎：提示词、阶段机、载荷修补与 Review 装配

pub mod assembler;
pub mod loop_;
pub mod prompt;
pub mod repair;

pub use assembler::assemble;
pub use loop_::{EngineStage, ReviewEngine};
pub use prompt::{ReviewPayload, ABSTRACT_BUDGET_CHARS, CONTENT_BUDGET_CHARS};
pub use repair::{repair_payload, RepairedReview};
