//! 数据模型：评审人 / 提案 / 评审

pub mod panelist;
pub mod proposal;
pub mod review;

pub use panelist::{Panelist, PersonalityScores, SCORE_MAX, SCORE_MIN};
pub use proposal::{Proposal, ProposalStatus};
pub use review::{
    CategoryScores, Feedback, Recommendation, Review, TraceKind, TraceStep, UserFeedback,
};
