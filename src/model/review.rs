//! 评审（Review）：一位评审人对一份提案的结构化产出
//!
//! 含总评分、五类分项分、推荐结论、反馈包与完整推理轨迹；
//! 创建后不可变，仅允许后附一条用户反馈。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::PanelError;

/// 推荐结论：accept / revise / reject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Accept,
    Revise,
    Reject,
}

impl Recommendation {
    /// 由总评分推导：≥7.5 accept，≤4 reject，否则 revise。
    /// 仅用于补齐缺失或非法的推荐结论，不覆盖模型给出的合法值。
    pub fn from_score(score: f64) -> Self {
        if score >= 7.5 {
            Recommendation::Accept
        } else if score <= 4.0 {
            Recommendation::Reject
        } else {
            Recommendation::Revise
        }
    }

    /// 解析模型输出的推荐词（大小写/首尾空白不敏感）；非法 token 返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Some(Recommendation::Accept),
            "revise" => Some(Recommendation::Revise),
            "reject" => Some(Recommendation::Reject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::Revise => "revise",
            Recommendation::Reject => "reject",
        }
    }
}

/// 推理轨迹步骤类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Thought,
    Action,
    Observation,
}

/// 单步推理轨迹：{type, content}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub content: String,
}

impl TraceStep {
    pub fn thought(content: impl Into<String>) -> Self {
        Self {
            kind: TraceKind::Thought,
            content: content.into(),
        }
    }

    pub fn action(content: impl Into<String>) -> Self {
        Self {
            kind: TraceKind::Action,
            content: content.into(),
        }
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self {
            kind: TraceKind::Observation,
            content: content.into(),
        }
    }
}

/// 五类分项分：任意子集可缺失，存在值均在 [1,10]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub novelty: Option<f64>,
    pub feasibility: Option<f64>,
    pub impact: Option<f64>,
    pub methodology: Option<f64>,
    pub clarity: Option<f64>,
}

impl CategoryScores {
    /// 固定顺序的 (类别名, 值) 视图，供汇总与持久化使用
    pub fn entries(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("novelty", self.novelty),
            ("feasibility", self.feasibility),
            ("impact", self.impact),
            ("methodology", self.methodology),
            ("clarity", self.clarity),
        ]
    }
}

/// 反馈包：所有字段有默认值（空串/空列表），不出现 null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub detailed_comments: String,
    pub suggestions: String,
}

/// 用户对一条评审的反馈（用于训练分析），每条评审至多一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    /// 评审有用程度 1-5
    pub rating: u8,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserFeedback {
    pub fn new(rating: u8, comments: Option<String>) -> Result<Self, PanelError> {
        if !(1..=5).contains(&rating) {
            return Err(PanelError::Validation(format!(
                "feedback rating out of range [1,5]: {}",
                rating
            )));
        }
        Ok(Self {
            rating,
            comments,
            created_at: Utc::now(),
        })
    }
}

/// 一条完整评审记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub panelist_id: Uuid,
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub category_scores: CategoryScores,
    pub feedback: Feedback,
    pub trace: Vec<TraceStep>,
    /// Observation 阶段的修复记录（如分值钳位、推荐补齐）
    pub repair_notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub user_feedback: Option<UserFeedback>,
}
