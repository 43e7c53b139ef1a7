//! 评审人（Panelist）：专长档案 + 三项人格分
//!
//! 人格分取值域 [1,10]，未提供时默认 5.0；创建后可变更（save 即 upsert）。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::PanelError;

/// 人格分下界
pub const SCORE_MIN: f64 = 1.0;
/// 人格分上界
pub const SCORE_MAX: f64 = 10.0;

/// 三项人格分：批判性、开放性、严肃性（各 [1,10]，默认 5.0）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityScores {
    pub critical: f64,
    pub openness: f64,
    pub seriousness: f64,
}

impl Default for PersonalityScores {
    fn default() -> Self {
        Self {
            critical: 5.0,
            openness: 5.0,
            seriousness: 5.0,
        }
    }
}

impl PersonalityScores {
    /// 创建并校验；任一分越界返回 Validation
    pub fn new(critical: f64, openness: f64, seriousness: f64) -> Result<Self, PanelError> {
        let scores = Self {
            critical,
            openness,
            seriousness,
        };
        scores.validate()?;
        Ok(scores)
    }

    /// 校验三项分均在 [1,10]（反序列化得到的值也走这里）
    pub fn validate(&self) -> Result<(), PanelError> {
        for (name, value) in [
            ("critical", self.critical),
            ("openness", self.openness),
            ("seriousness", self.seriousness),
        ] {
            if !(SCORE_MIN..=SCORE_MAX).contains(&value) || !value.is_finite() {
                return Err(PanelError::Validation(format!(
                    "personality score '{}' out of range [1,10]: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// 评审人：身份、联系方式、专长与人格档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panelist {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    /// 来源 URL（档案抽取创建时记录）
    pub profile_url: Option<String>,
    pub expertise: Vec<String>,
    pub publications: Vec<String>,
    pub affiliations: Vec<String>,
    pub personality: PersonalityScores,
}

impl Panelist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            bio: None,
            profile_url: None,
            expertise: Vec::new(),
            publications: Vec::new(),
            affiliations: Vec::new(),
            personality: PersonalityScores::default(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_expertise(mut self, expertise: Vec<String>) -> Self {
        self.expertise = expertise;
        self
    }

    pub fn with_personality(mut self, personality: PersonalityScores) -> Self {
        self.personality = personality;
        self
    }

    /// 变更人格分（创建后可调；持久化由调用方 save）
    pub fn set_personality(&mut self, personality: PersonalityScores) -> Result<(), PanelError> {
        personality.validate()?;
        self.personality = personality;
        Ok(())
    }
}
