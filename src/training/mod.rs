//! 训练数据分析：基于用户反馈评估评审质量
//!
//! 当前阶段只做统计与改进建议（收集打分、归纳模式、按评审人出绩效），
//! 不做真正的模型微调；样本可导出为 JSON 供后续训练流程使用。

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::core::PanelError;
use crate::model::{CategoryScores, Feedback, Review, TraceStep};
use crate::store::ReviewStore;

/// 有意义的训练至少需要这么多条带反馈的评审
pub const MIN_TRAINING_SAMPLES: usize = 10;
/// 高分评审（4-5 星）
const HIGH_RATING_THRESHOLD: u8 = 4;
/// 低分评审（1-2 星）
const LOW_RATING_THRESHOLD: u8 = 2;

/// 一条可用于训练的样本：评审内容 + 用户打分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackSample {
    pub review_id: Uuid,
    pub panelist_id: Uuid,
    pub proposal_id: Uuid,
    pub overall_score: f64,
    pub category_scores: CategoryScores,
    pub feedback: Feedback,
    pub rating: u8,
    pub comments: Option<String>,
    pub trace: Vec<TraceStep>,
}

impl FeedbackSample {
    /// 从评审构造样本；没有用户反馈的评审不产出样本
    pub fn from_review(review: &Review) -> Option<Self> {
        let user_feedback = review.user_feedback.as_ref()?;
        Some(Self {
            review_id: review.id,
            panelist_id: review.panelist_id,
            proposal_id: review.proposal_id,
            overall_score: review.overall_score,
            category_scores: review.category_scores,
            feedback: review.feedback.clone(),
            rating: user_feedback.rating,
            comments: user_feedback.comments.clone(),
            trace: review.trace.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
    pub count: usize,
}

/// 反馈模式分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAnalysis {
    pub total_reviews: usize,
    pub average_rating: f64,
    pub high_rated_count: usize,
    pub low_rated_count: usize,
    pub insights: Vec<Insight>,
    pub training_data_available: bool,
}

/// 对一组样本做模式分析；空输入返回全零结果
pub fn analyze_samples(samples: &[FeedbackSample]) -> FeedbackAnalysis {
    if samples.is_empty() {
        return FeedbackAnalysis {
            total_reviews: 0,
            average_rating: 0.0,
            high_rated_count: 0,
            low_rated_count: 0,
            insights: Vec::new(),
            training_data_available: false,
        };
    }

    let total_reviews = samples.len();
    let average_rating =
        samples.iter().map(|s| s.rating as f64).sum::<f64>() / total_reviews as f64;
    let high_rated_count = samples
        .iter()
        .filter(|s| s.rating >= HIGH_RATING_THRESHOLD)
        .count();
    let low_rated_count = samples
        .iter()
        .filter(|s| s.rating <= LOW_RATING_THRESHOLD)
        .count();

    let mut insights = Vec::new();
    if high_rated_count > 0 {
        insights.push(Insight {
            kind: InsightKind::Positive,
            message: format!(
                "{} reviews received high ratings (4-5 stars)",
                high_rated_count
            ),
            count: high_rated_count,
        });
    }
    if low_rated_count > 0 {
        insights.push(Insight {
            kind: InsightKind::Negative,
            message: format!(
                "{} reviews received low ratings (1-2 stars)",
                low_rated_count
            ),
            count: low_rated_count,
        });
    }

    FeedbackAnalysis {
        total_reviews,
        average_rating,
        high_rated_count,
        low_rated_count,
        insights,
        training_data_available: total_reviews >= MIN_TRAINING_SAMPLES,
    }
}

/// 基于分析结果给出改进建议
pub fn suggest_improvements(analysis: &FeedbackAnalysis) -> Vec<String> {
    let mut suggestions = Vec::new();

    if analysis.total_reviews < MIN_TRAINING_SAMPLES {
        suggestions.push("Collect more user feedback to enable meaningful training".to_string());
    }
    if analysis.total_reviews > 0 && analysis.average_rating < 3.5 {
        suggestions.push(
            "Overall review quality is below target. Consider adjusting AI prompts.".to_string(),
        );
    }
    if analysis.low_rated_count > analysis.high_rated_count {
        suggestions.push(
            "More reviews are rated poorly than highly. Review generation logic needs improvement."
                .to_string(),
        );
    }
    if analysis.training_data_available {
        suggestions.push(
            "Sufficient training data available. Consider implementing fine-tuning.".to_string(),
        );
    }

    suggestions
}

/// 绩效档位（按平均星级分段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceBand {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
    NoData,
}

impl PerformanceBand {
    fn from_average(average: f64) -> Self {
        if average >= 4.0 {
            PerformanceBand::Excellent
        } else if average >= 3.0 {
            PerformanceBand::Good
        } else if average >= 2.0 {
            PerformanceBand::Fair
        } else {
            PerformanceBand::NeedsImprovement
        }
    }
}

/// 单个评审人的反馈绩效
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelistPerformance {
    pub panelist_id: Uuid,
    pub total_reviews: usize,
    pub average_rating: f64,
    pub performance: PerformanceBand,
    /// 各星级数量，下标 0 对应 1 星
    pub rating_distribution: [usize; 5],
}

/// 训练分析器：从存储取带反馈的评审做统计
pub struct TrainingAnalyzer {
    store: Arc<dyn ReviewStore>,
}

impl TrainingAnalyzer {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// 收集全部带用户反馈的评审样本
    pub fn collect_samples(&self) -> Result<Vec<FeedbackSample>, PanelError> {
        let reviews = self.store.list_reviews()?;
        Ok(reviews.iter().filter_map(FeedbackSample::from_review).collect())
    }

    pub fn analyze(&self) -> Result<FeedbackAnalysis, PanelError> {
        Ok(analyze_samples(&self.collect_samples()?))
    }

    pub fn suggestions(&self) -> Result<Vec<String>, PanelError> {
        Ok(suggest_improvements(&self.analyze()?))
    }

    /// 某评审人的反馈绩效；无样本时为 NoData
    pub fn panelist_performance(&self, panelist_id: Uuid) -> Result<PanelistPerformance, PanelError> {
        let reviews = self.store.list_reviews_for_panelist(panelist_id)?;
        let ratings: Vec<u8> = reviews
            .iter()
            .filter_map(|r| r.user_feedback.as_ref().map(|f| f.rating))
            .collect();

        if ratings.is_empty() {
            return Ok(PanelistPerformance {
                panelist_id,
                total_reviews: 0,
                average_rating: 0.0,
                performance: PerformanceBand::NoData,
                rating_distribution: [0; 5],
            });
        }

        let total_reviews = ratings.len();
        let average_rating = ratings.iter().map(|&r| r as f64).sum::<f64>() / total_reviews as f64;
        let mut rating_distribution = [0usize; 5];
        for &rating in &ratings {
            if (1..=5).contains(&rating) {
                rating_distribution[(rating - 1) as usize] += 1;
            }
        }

        Ok(PanelistPerformance {
            panelist_id,
            total_reviews,
            average_rating,
            performance: PerformanceBand::from_average(average_rating),
            rating_distribution,
        })
    }

    /// 导出训练样本为 JSON 文件，返回样本数
    pub fn export_samples(&self, path: &Path) -> Result<usize, PanelError> {
        let samples = self.collect_samples()?;
        let json = serde_json::to_string_pretty(&samples)
            .map_err(|e| PanelError::Store(format!("serialize training export: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| PanelError::Store(format!("write training export: {}", e)))?;
        info!(count = samples.len(), path = %path.display(), "exported training samples");
        Ok(samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Panelist, Proposal, Recommendation, UserFeedback};
    use crate::store::InMemoryStore;
    use chrono::Utc;

    fn sample_with_rating(rating: u8) -> FeedbackSample {
        FeedbackSample {
            review_id: Uuid::new_v4(),
            panelist_id: Uuid::new_v4(),
            proposal_id: Uuid::new_v4(),
            overall_score: 7.0,
            category_scores: CategoryScores::default(),
            feedback: Feedback::default(),
            rating,
            comments: None,
            trace: Vec::new(),
        }
    }

    #[test]
    fn test_analyze_empty_is_all_zero() {
        let analysis = analyze_samples(&[]);
        assert_eq!(analysis.total_reviews, 0);
        assert_eq!(analysis.average_rating, 0.0);
        assert!(analysis.insights.is_empty());
        assert!(!analysis.training_data_available);
    }

    #[test]
    fn test_analyze_counts_high_and_low() {
        let samples: Vec<FeedbackSample> = [5, 4, 1].iter().map(|&r| sample_with_rating(r)).collect();
        let analysis = analyze_samples(&samples);
        assert_eq!(analysis.total_reviews, 3);
        assert_eq!(analysis.high_rated_count, 2);
        assert_eq!(analysis.low_rated_count, 1);
        assert!((analysis.average_rating - 10.0 / 3.0).abs() < 1e-9);
        assert_eq!(analysis.insights.len(), 2);
        assert_eq!(analysis.insights[0].kind, InsightKind::Positive);
        assert!(!analysis.training_data_available);
    }

    #[test]
    fn test_training_available_at_threshold() {
        let samples: Vec<FeedbackSample> =
            (0..MIN_TRAINING_SAMPLES).map(|_| sample_with_rating(4)).collect();
        let analysis = analyze_samples(&samples);
        assert!(analysis.training_data_available);

        let suggestions = suggest_improvements(&analysis);
        assert_eq!(
            suggestions,
            vec!["Sufficient training data available. Consider implementing fine-tuning.".to_string()]
        );
    }

    #[test]
    fn test_suggestions_for_poor_feedback() {
        let samples: Vec<FeedbackSample> = [2, 1, 2].iter().map(|&r| sample_with_rating(r)).collect();
        let suggestions = suggest_improvements(&analyze_samples(&samples));
        assert!(suggestions.iter().any(|s| s.contains("Collect more user feedback")));
        assert!(suggestions.iter().any(|s| s.contains("adjusting AI prompts")));
        assert!(suggestions.iter().any(|s| s.contains("rated poorly than highly")));
    }

    #[test]
    fn test_no_quality_warning_without_data() {
        let suggestions = suggest_improvements(&analyze_samples(&[]));
        assert_eq!(
            suggestions,
            vec!["Collect more user feedback to enable meaningful training".to_string()]
        );
    }

    #[test]
    fn test_performance_bands() {
        assert_eq!(PerformanceBand::from_average(4.5), PerformanceBand::Excellent);
        assert_eq!(PerformanceBand::from_average(4.0), PerformanceBand::Excellent);
        assert_eq!(PerformanceBand::from_average(3.2), PerformanceBand::Good);
        assert_eq!(PerformanceBand::from_average(2.0), PerformanceBand::Fair);
        assert_eq!(PerformanceBand::from_average(1.9), PerformanceBand::NeedsImprovement);
    }

    #[test]
    fn test_analyzer_reads_feedback_from_store() {
        let store = Arc::new(InMemoryStore::new());
        let panelist = Panelist::new("Dr. A");
        let proposal = Proposal::new("T", "C");
        store.save_panelist(&panelist).unwrap();
        store.save_proposal(&proposal).unwrap();

        for rating in [5, 2] {
            let review = Review {
                id: Uuid::new_v4(),
                proposal_id: proposal.id,
                panelist_id: panelist.id,
                overall_score: 7.0,
                recommendation: Recommendation::Revise,
                category_scores: CategoryScores::default(),
                feedback: Feedback::default(),
                trace: vec![TraceStep::thought("t")],
                repair_notes: Vec::new(),
                created_at: Utc::now(),
                user_feedback: None,
            };
            store.save_review(&review).unwrap();
            store
                .attach_feedback(review.id, UserFeedback::new(rating, None).unwrap())
                .unwrap();
        }
        // 没有反馈的评审不计入样本
        let unrated = Review {
            id: Uuid::new_v4(),
            proposal_id: proposal.id,
            panelist_id: panelist.id,
            overall_score: 6.0,
            recommendation: Recommendation::Revise,
            category_scores: CategoryScores::default(),
            feedback: Feedback::default(),
            trace: vec![TraceStep::thought("t")],
            repair_notes: Vec::new(),
            created_at: Utc::now(),
            user_feedback: None,
        };
        store.save_review(&unrated).unwrap();

        let analyzer = TrainingAnalyzer::new(store);
        let analysis = analyzer.analyze().unwrap();
        assert_eq!(analysis.total_reviews, 2);
        assert_eq!(analysis.high_rated_count, 1);
        assert_eq!(analysis.low_rated_count, 1);

        let perf = analyzer.panelist_performance(panelist.id).unwrap();
        assert_eq!(perf.total_reviews, 2);
        assert_eq!(perf.performance, PerformanceBand::Good);
        assert_eq!(perf.rating_distribution, [0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_export_writes_json_file() {
        let store = Arc::new(InMemoryStore::new());
        let analyzer = TrainingAnalyzer::new(store);
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("training.json");

        let count = analyzer.export_samples(&path).unwrap();
        assert_eq!(count, 0);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "[]");
    }
}
