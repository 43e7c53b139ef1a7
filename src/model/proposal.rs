//! 提案（Proposal）：待评审文档
//!
//! 内容创建后不可变；status 仅是尽力而为的展示标记（uploaded → reviewing → completed），
//! 不承载正确性约束。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 提案状态标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Uploaded,
    Reviewing,
    Completed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Uploaded => "uploaded",
            ProposalStatus::Reviewing => "reviewing",
            ProposalStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(ProposalStatus::Uploaded),
            "reviewing" => Some(ProposalStatus::Reviewing),
            "completed" => Some(ProposalStatus::Completed),
            _ => None,
        }
    }
}

/// 提案：标题、可选摘要、全文内容与状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub title: String,
    pub abstract_text: Option<String>,
    pub content: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            abstract_text: None,
            content: content.into(),
            status: ProposalStatus::Uploaded,
            created_at: Utc::now(),
        }
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }
}
