//! Review 装配：修补后的载荷 + trace -> 可持久化的 Review
//!
//! 这里是评审被接受或拒绝的唯一关口：重查分数区间与 trace 非空，
//! 盖创建时间戳，缺省字段保证空串/空列表而非 null。

use chrono::Utc;
use uuid::Uuid;

use crate::core::PanelError;
use crate::engine::repair::RepairedReview;
use crate::model::{Panelist, Proposal, Review, TraceStep, SCORE_MAX, SCORE_MIN};

fn in_range(score: f64) -> bool {
    score.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&score)
}

/// 装配最终 Review。修补阶段已保证结构完整，这里做最后的不变量复查。
pub fn assemble(
    panelist: &Panelist,
    proposal: &Proposal,
    repaired: RepairedReview,
    trace: Vec<TraceStep>,
) -> Result<Review, PanelError> {
    if !in_range(repaired.overall_score) {
        return Err(PanelError::ReviewGeneration {
            reason: format!(
                "overall_score {} outside [{}, {}] after repair",
                repaired.overall_score, SCORE_MIN, SCORE_MAX
            ),
            trace,
        });
    }

    for (name, score) in repaired.category_scores.entries() {
        if let Some(score) = score {
            if !in_range(score) {
                return Err(PanelError::ReviewGeneration {
                    reason: format!("{} {} outside [{}, {}] after repair", name, score, SCORE_MIN, SCORE_MAX),
                    trace,
                });
            }
        }
    }

    if trace.is_empty() {
        return Err(PanelError::ReviewGeneration {
            reason: "reasoning trace is empty".to_string(),
            trace,
        });
    }

    Ok(Review {
        id: Uuid::new_v4(),
        proposal_id: proposal.id,
        panelist_id: panelist.id,
        overall_score: repaired.overall_score,
        recommendation: repaired.recommendation,
        category_scores: repaired.category_scores,
        feedback: repaired.feedback,
        trace,
        repair_notes: repaired.repair_notes,
        created_at: Utc::now(),
        user_feedback: None,
    })
}
