//! 评审团编排
//!
//! 将一份提案扇出给多位评审人并发评审（受 fan_out 上限约束）。
//! 单个评审人的失败只记录为失败条目，不中止其余评审人；
//! 成功的评审逐条落库，提案状态作尽力而为的标记更新。

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::PanelError;
use crate::engine::ReviewEngine;
use crate::model::{Panelist, Proposal, ProposalStatus, Review};
use crate::panel::summary::{self, PanelSummary};
use crate::store::ReviewStore;

/// 缺省并发扇出上限
pub const DEFAULT_FAN_OUT: usize = 4;

/// 单个评审人的失败记录；整个评审团不会因此中止
#[derive(Debug)]
pub struct PanelFailure {
    pub panelist_id: Uuid,
    pub error: PanelError,
}

/// 一次评审团生成的结果：成功评审 + 失败清单
#[derive(Debug, Default)]
pub struct PanelOutcome {
    pub reviews: Vec<Review>,
    pub failures: Vec<PanelFailure>,
}

pub struct PanelOrchestrator {
    engine: ReviewEngine,
    store: Arc<dyn ReviewStore>,
    fan_out: usize,
}

impl PanelOrchestrator {
    pub fn new(engine: ReviewEngine, store: Arc<dyn ReviewStore>) -> Self {
        Self {
            engine,
            store,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    /// 为一份已持久化的提案生成评审团评审。
    ///
    /// `panelist_ids` 省略时面向全部已知评审人。返回成功评审与
    /// 按评审人记录的失败清单；只有在无法确定目标评审人集合时才整体报错。
    pub async fn generate_panel(
        &self,
        proposal: &Proposal,
        panelist_ids: Option<&[Uuid]>,
    ) -> Result<PanelOutcome, PanelError> {
        let mut outcome = PanelOutcome::default();
        let targets = self.resolve_targets(panelist_ids, &mut outcome.failures)?;
        if targets.is_empty() {
            warn!(proposal_id = %proposal.id, "no panelists targeted for panel generation");
            return Ok(outcome);
        }

        self.mark_status(proposal.id, ProposalStatus::Reviewing);
        info!(
            proposal_id = %proposal.id,
            panelists = targets.len(),
            fan_out = self.fan_out,
            "generating panel reviews"
        );

        let engine = &self.engine;
        let mut results = stream::iter(targets.into_iter().map(|panelist| async move {
            let result = engine.evaluate(&panelist, proposal).await;
            (panelist.id, result)
        }))
        .buffer_unordered(self.fan_out);

        while let Some((panelist_id, result)) = results.next().await {
            let saved = result.and_then(|review| {
                self.store.save_review(&review)?;
                Ok(review)
            });
            match saved {
                Ok(review) => outcome.reviews.push(review),
                Err(error) => {
                    warn!(
                        proposal_id = %proposal.id,
                        panelist_id = %panelist_id,
                        error = %error,
                        "panelist review failed"
                    );
                    outcome.failures.push(PanelFailure { panelist_id, error });
                }
            }
        }

        self.mark_status(proposal.id, ProposalStatus::Completed);
        info!(
            proposal_id = %proposal.id,
            succeeded = outcome.reviews.len(),
            failed = outcome.failures.len(),
            "panel generation finished"
        );
        Ok(outcome)
    }

    /// 按 id 加载提案后生成评审团；提案不存在返回 Validation
    pub async fn generate_panel_by_id(
        &self,
        proposal_id: Uuid,
        panelist_ids: Option<&[Uuid]>,
    ) -> Result<PanelOutcome, PanelError> {
        let proposal = self
            .store
            .get_proposal(proposal_id)?
            .ok_or_else(|| PanelError::Validation(format!("proposal {} not found", proposal_id)))?;
        self.generate_panel(&proposal, panelist_ids).await
    }

    /// 汇总某提案已持久化的全部评审；尚无评审时返回 None
    pub fn summarize_proposal(&self, proposal_id: Uuid) -> Result<Option<PanelSummary>, PanelError> {
        let reviews = self.store.list_reviews_for_proposal(proposal_id)?;
        Ok(summary::summarize(&reviews))
    }

    fn resolve_targets(
        &self,
        panelist_ids: Option<&[Uuid]>,
        failures: &mut Vec<PanelFailure>,
    ) -> Result<Vec<Panelist>, PanelError> {
        match panelist_ids {
            None => self.store.list_panelists(),
            Some(ids) => {
                let mut targets = Vec::with_capacity(ids.len());
                for &id in ids {
                    match self.store.get_panelist(id) {
                        Ok(Some(panelist)) => targets.push(panelist),
                        Ok(None) => failures.push(PanelFailure {
                            panelist_id: id,
                            error: PanelError::Validation(format!("panelist {} not found", id)),
                        }),
                        Err(error) => failures.push(PanelFailure {
                            panelist_id: id,
                            error,
                        }),
                    }
                }
                Ok(targets)
            }
        }
    }

    fn mark_status(&self, proposal_id: Uuid, status: ProposalStatus) {
        match self.store.set_proposal_status(proposal_id, status) {
            Ok(true) => {}
            Ok(false) => {
                warn!(proposal_id = %proposal_id, "proposal missing while updating status")
            }
            Err(error) => {
                warn!(proposal_id = %proposal_id, error = %error, "failed to update proposal status")
            }
        }
    }
}
