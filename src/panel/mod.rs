//! 评审团：编排 + 汇总

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{PanelFailure, PanelOrchestrator, PanelOutcome, DEFAULT_FAN_OUT};
pub use summary::{summarize, PanelSummary};
