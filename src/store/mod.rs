//! 持久化：评审人 / 提案 / 评审的保存、查询与删除
//!
//! ReviewStore 是同步边界接口；内存实现供测试与演示，
//! SQLite 实现供长期保存。save 一律按 upsert 语义处理。

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::PanelError;
use crate::model::{Panelist, Proposal, ProposalStatus, Review, UserFeedback};

/// 存储边界。调用方只依赖该 trait，后端可替换。
pub trait ReviewStore: Send + Sync {
    /// 保存评审人（存在即整体覆盖），返回 id
    fn save_panelist(&self, panelist: &Panelist) -> Result<Uuid, PanelError>;
    fn get_panelist(&self, id: Uuid) -> Result<Option<Panelist>, PanelError>;
    fn list_panelists(&self) -> Result<Vec<Panelist>, PanelError>;
    /// 删除评审人并级联删除其全部评审；不存在返回 false
    fn delete_panelist(&self, id: Uuid) -> Result<bool, PanelError>;

    fn save_proposal(&self, proposal: &Proposal) -> Result<Uuid, PanelError>;
    fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, PanelError>;
    fn list_proposals(&self) -> Result<Vec<Proposal>, PanelError>;
    fn delete_proposal(&self, id: Uuid) -> Result<bool, PanelError>;
    /// 更新提案状态；不存在返回 false
    fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> Result<bool, PanelError>;

    fn save_review(&self, review: &Review) -> Result<Uuid, PanelError>;
    fn get_review(&self, id: Uuid) -> Result<Option<Review>, PanelError>;
    /// 全量评审列表（训练分析用），按创建时间排序
    fn list_reviews(&self) -> Result<Vec<Review>, PanelError>;
    fn list_reviews_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Review>, PanelError>;
    fn list_reviews_for_panelist(&self, panelist_id: Uuid) -> Result<Vec<Review>, PanelError>;
    fn delete_review(&self, id: Uuid) -> Result<bool, PanelError>;

    /// 附加用户反馈；评审不存在或已有反馈时报 Validation
    fn attach_feedback(&self, review_id: Uuid, feedback: UserFeedback) -> Result<(), PanelError>;
}

/// 按配置创建存储后端：sqlite 或 memory，未知值回退 memory 并告警
pub fn create_store_from_config(cfg: &AppConfig) -> Result<Arc<dyn ReviewStore>, PanelError> {
    match cfg.store.backend.as_str() {
        "sqlite" => {
            let store = SqliteStore::open(Path::new(&cfg.store.path))?;
            tracing::info!(path = %cfg.store.path, "using sqlite store");
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        other => {
            tracing::warn!(backend = other, "unknown store backend, using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
