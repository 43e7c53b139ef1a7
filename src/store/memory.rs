//! 内存存储：HashMap 实现，测试与演示用
//!
//! 语义与 SQLite 实现对齐：save 即 upsert，删评审人级联删其评审。

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::core::PanelError;
use crate::model::{Panelist, Proposal, ProposalStatus, Review, UserFeedback};
use crate::store::ReviewStore;

#[derive(Default)]
pub struct InMemoryStore {
    panelists: Mutex<HashMap<Uuid, Panelist>>,
    proposals: Mutex<HashMap<Uuid, Proposal>>,
    reviews: Mutex<HashMap<Uuid, Review>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(
        mutex: &'a Mutex<T>,
        what: &str,
    ) -> Result<std::sync::MutexGuard<'a, T>, PanelError> {
        mutex
            .lock()
            .map_err(|_| PanelError::Store(format!("{} mutex poisoned", what)))
    }
}

impl ReviewStore for InMemoryStore {
    fn save_panelist(&self, panelist: &Panelist) -> Result<Uuid, PanelError> {
        panelist.personality.validate()?;
        Self::lock(&self.panelists, "panelists")?.insert(panelist.id, panelist.clone());
        Ok(panelist.id)
    }

    fn get_panelist(&self, id: Uuid) -> Result<Option<Panelist>, PanelError> {
        Ok(Self::lock(&self.panelists, "panelists")?.get(&id).cloned())
    }

    fn list_panelists(&self) -> Result<Vec<Panelist>, PanelError> {
        let mut all: Vec<Panelist> = Self::lock(&self.panelists, "panelists")?
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn delete_panelist(&self, id: Uuid) -> Result<bool, PanelError> {
        let removed = Self::lock(&self.panelists, "panelists")?.remove(&id).is_some();
        if removed {
            Self::lock(&self.reviews, "reviews")?.retain(|_, r| r.panelist_id != id);
        }
        Ok(removed)
    }

    fn save_proposal(&self, proposal: &Proposal) -> Result<Uuid, PanelError> {
        Self::lock(&self.proposals, "proposals")?.insert(proposal.id, proposal.clone());
        Ok(proposal.id)
    }

    fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, PanelError> {
        Ok(Self::lock(&self.proposals, "proposals")?.get(&id).cloned())
    }

    fn list_proposals(&self) -> Result<Vec<Proposal>, PanelError> {
        let mut all: Vec<Proposal> = Self::lock(&self.proposals, "proposals")?
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|p| p.created_at);
        Ok(all)
    }

    fn delete_proposal(&self, id: Uuid) -> Result<bool, PanelError> {
        let removed = Self::lock(&self.proposals, "proposals")?.remove(&id).is_some();
        if removed {
            Self::lock(&self.reviews, "reviews")?.retain(|_, r| r.proposal_id != id);
        }
        Ok(removed)
    }

    fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> Result<bool, PanelError> {
        let mut proposals = Self::lock(&self.proposals, "proposals")?;
        match proposals.get_mut(&id) {
            Some(proposal) => {
                proposal.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn save_review(&self, review: &Review) -> Result<Uuid, PanelError> {
        // 与 SQLite 外键约束保持一致：评审必须引用已存在的提案与评审人
        if !Self::lock(&self.proposals, "proposals")?.contains_key(&review.proposal_id) {
            return Err(PanelError::Store(format!(
                "review references unknown proposal {}",
                review.proposal_id
            )));
        }
        if !Self::lock(&self.panelists, "panelists")?.contains_key(&review.panelist_id) {
            return Err(PanelError::Store(format!(
                "review references unknown panelist {}",
                review.panelist_id
            )));
        }
        Self::lock(&self.reviews, "reviews")?.insert(review.id, review.clone());
        Ok(review.id)
    }

    fn get_review(&self, id: Uuid) -> Result<Option<Review>, PanelError> {
        Ok(Self::lock(&self.reviews, "reviews")?.get(&id).cloned())
    }

    fn list_reviews(&self) -> Result<Vec<Review>, PanelError> {
        let mut all: Vec<Review> = Self::lock(&self.reviews, "reviews")?
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|r| r.created_at);
        Ok(all)
    }

    fn list_reviews_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Review>, PanelError> {
        let mut found: Vec<Review> = Self::lock(&self.reviews, "reviews")?
            .values()
            .filter(|r| r.proposal_id == proposal_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    fn list_reviews_for_panelist(&self, panelist_id: Uuid) -> Result<Vec<Review>, PanelError> {
        let mut found: Vec<Review> = Self::lock(&self.reviews, "reviews")?
            .values()
            .filter(|r| r.panelist_id == panelist_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    fn delete_review(&self, id: Uuid) -> Result<bool, PanelError> {
        Ok(Self::lock(&self.reviews, "reviews")?.remove(&id).is_some())
    }

    fn attach_feedback(&self, review_id: Uuid, feedback: UserFeedback) -> Result<(), PanelError> {
        let mut reviews = Self::lock(&self.reviews, "reviews")?;
        let review = reviews
            .get_mut(&review_id)
            .ok_or_else(|| PanelError::Validation(format!("review {} not found", review_id)))?;
        if review.user_feedback.is_some() {
            return Err(PanelError::Validation(format!(
                "review {} already has user feedback",
                review_id
            )));
        }
        review.user_feedback = Some(feedback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RepairedReview;
    use crate::model::{CategoryScores, Feedback, Recommendation, TraceStep};

    fn review_for(panelist: &Panelist, proposal: &Proposal) -> Review {
        crate::engine::assemble(
            panelist,
            proposal,
            RepairedReview {
                overall_score: 7.0,
                recommendation: Recommendation::Revise,
                category_scores: CategoryScores::default(),
                feedback: Feedback::default(),
                repair_notes: Vec::new(),
            },
            vec![TraceStep::thought("x")],
        )
        .unwrap()
    }

    #[test]
    fn test_save_is_upsert() {
        let store = InMemoryStore::new();
        let mut panelist = Panelist::new("Dr. A");
        store.save_panelist(&panelist).unwrap();

        panelist.bio = Some("updated".into());
        store.save_panelist(&panelist).unwrap();

        let loaded = store.get_panelist(panelist.id).unwrap().unwrap();
        assert_eq!(loaded.bio.as_deref(), Some("updated"));
        assert_eq!(store.list_panelists().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_panelist_cascades_reviews() {
        let store = InMemoryStore::new();
        let panelist = Panelist::new("Dr. A");
        let proposal = Proposal::new("T", "C");
        store.save_panelist(&panelist).unwrap();
        store.save_proposal(&proposal).unwrap();
        store.save_review(&review_for(&panelist, &proposal)).unwrap();

        assert!(store.delete_panelist(panelist.id).unwrap());
        assert!(store.list_reviews_for_panelist(panelist.id).unwrap().is_empty());
        assert!(!store.delete_panelist(panelist.id).unwrap());
    }

    #[test]
    fn test_attach_feedback_rejects_duplicate() {
        let store = InMemoryStore::new();
        let panelist = Panelist::new("Dr. A");
        let proposal = Proposal::new("T", "C");
        store.save_panelist(&panelist).unwrap();
        store.save_proposal(&proposal).unwrap();
        let review = review_for(&panelist, &proposal);
        store.save_review(&review).unwrap();

        store
            .attach_feedback(review.id, UserFeedback::new(5, Some("helpful".into())).unwrap())
            .unwrap();
        let err = store
            .attach_feedback(review.id, UserFeedback::new(1, None).unwrap())
            .unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
    }

    #[test]
    fn test_save_review_requires_referents() {
        let store = InMemoryStore::new();
        let panelist = Panelist::new("Dr. A");
        let proposal = Proposal::new("T", "C");
        let review = review_for(&panelist, &proposal);
        assert!(matches!(store.save_review(&review), Err(PanelError::Store(_))));
    }

    #[test]
    fn test_set_proposal_status() {
        let store = InMemoryStore::new();
        let proposal = Proposal::new("T", "C");
        store.save_proposal(&proposal).unwrap();

        assert!(store.set_proposal_status(proposal.id, ProposalStatus::Completed).unwrap());
        let loaded = store.get_proposal(proposal.id).unwrap().unwrap();
        assert_eq!(loaded.status, ProposalStatus::Completed);
        assert!(!store.set_proposal_status(Uuid::new_v4(), ProposalStatus::Reviewing).unwrap());
    }
}
