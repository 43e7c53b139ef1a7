//! 评审团汇总统计
//!
//! 纯聚合：平均总分、推荐结论分布、各分项类别的均值。
//! 分项均值只统计实际给出该分项的评审；没有任何评审给分的类别不出现在结果里。

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Review;

/// 一份提案全部评审的汇总视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSummary {
    pub review_count: usize,
    pub average_overall: f64,
    /// 推荐结论 → 数量，仅含实际出现的结论
    pub recommendation_counts: BTreeMap<String, usize>,
    /// 分项类别 → 均值，仅含至少一条评审给分的类别
    pub category_averages: BTreeMap<String, f64>,
}

/// 汇总一组评审；空输入返回 None（没有可平均的东西）
pub fn summarize(reviews: &[Review]) -> Option<PanelSummary> {
    if reviews.is_empty() {
        return None;
    }

    let review_count = reviews.len();
    let average_overall =
        reviews.iter().map(|r| r.overall_score).sum::<f64>() / review_count as f64;

    let mut recommendation_counts: BTreeMap<String, usize> = BTreeMap::new();
    for review in reviews {
        *recommendation_counts
            .entry(review.recommendation.as_str().to_string())
            .or_insert(0) += 1;
    }

    let mut sums: BTreeMap<&'static str, (f64, usize)> = BTreeMap::new();
    for review in reviews {
        for (name, value) in review.category_scores.entries() {
            if let Some(v) = value {
                let slot = sums.entry(name).or_insert((0.0, 0));
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }
    let category_averages = sums
        .into_iter()
        .map(|(name, (sum, count))| (name.to_string(), sum / count as f64))
        .collect();

    Some(PanelSummary {
        review_count,
        average_overall,
        recommendation_counts,
        category_averages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryScores, Feedback, Recommendation, Review, TraceStep};
    use chrono::Utc;
    use uuid::Uuid;

    fn review_with(
        overall: f64,
        recommendation: Recommendation,
        novelty: Option<f64>,
    ) -> Review {
        Review {
            id: Uuid::new_v4(),
            proposal_id: Uuid::new_v4(),
            panelist_id: Uuid::new_v4(),
            overall_score: overall,
            recommendation,
            category_scores: CategoryScores {
                novelty,
                ..Default::default()
            },
            feedback: Feedback::default(),
            trace: vec![TraceStep::thought("considered")],
            repair_notes: Vec::new(),
            created_at: Utc::now(),
            user_feedback: None,
        }
    }

    #[test]
    fn test_average_overall_is_exact() {
        let reviews = vec![
            review_with(6.0, Recommendation::Revise, Some(5.0)),
            review_with(8.0, Recommendation::Accept, None),
            review_with(10.0, Recommendation::Accept, Some(9.0)),
        ];
        let summary = summarize(&reviews).unwrap();
        assert_eq!(summary.review_count, 3);
        assert_eq!(summary.average_overall, 8.0);
    }

    #[test]
    fn test_category_average_over_present_values_only() {
        let reviews = vec![
            review_with(6.0, Recommendation::Revise, Some(5.0)),
            review_with(8.0, Recommendation::Accept, None),
            review_with(10.0, Recommendation::Accept, Some(9.0)),
        ];
        let summary = summarize(&reviews).unwrap();
        // novelty 只有两条评审给分，均值按两条算
        assert_eq!(summary.category_averages.get("novelty"), Some(&7.0));
        // 无人给分的类别不出现，而不是报 0
        assert!(!summary.category_averages.contains_key("clarity"));
        assert!(!summary.category_averages.contains_key("impact"));
    }

    #[test]
    fn test_recommendation_breakdown() {
        let reviews = vec![
            review_with(8.0, Recommendation::Accept, None),
            review_with(8.5, Recommendation::Accept, None),
            review_with(3.0, Recommendation::Reject, None),
        ];
        let summary = summarize(&reviews).unwrap();
        assert_eq!(summary.recommendation_counts.get("accept"), Some(&2));
        assert_eq!(summary.recommendation_counts.get("reject"), Some(&1));
        assert!(!summary.recommendation_counts.contains_key("revise"));
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(summarize(&[]).is_none());
    }
}
