//! 档案抽取：从公开主页构建评审人档案
//!
//! 阶段按成本排序：JSON-LD -> OpenGraph -> 清洗文本启发式；
//! 先到的字段不被后来者覆盖，全部落空也返回结构完整的空档案。

pub mod cache;
pub mod fetcher;
pub mod heuristics;
pub mod metadata;
pub mod pipeline;

pub use cache::{normalize_url, InMemoryProfileCache, ProfileCache};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
pub use heuristics::{HtmlTextHeuristics, TextHeuristics};
pub use pipeline::{enhance_profile, ProfileExtractor};

use serde::{Deserialize, Serialize};

use crate::model::Panelist;

/// 专长条目上限
pub const MAX_EXPERTISE_AREAS: usize = 15;
/// 出版物条目上限
pub const MAX_PUBLICATIONS: usize = 10;

/// 单个抽取阶段产出的字段片段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFragment {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub expertise: Vec<String>,
    pub publications: Vec<String>,
    pub affiliations: Vec<String>,
}

/// 抽取结果。字段缺失用 None / 空列表表达，绝不编造占位值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub expertise_areas: Vec<String>,
    pub publications: Vec<String>,
    pub affiliations: Vec<String>,
    /// 模型增强补充：主研究领域
    pub primary_domain: Option<String>,
    /// 模型增强补充：职业阶段
    pub career_level: Option<String>,
    /// 站点限制等提示信息
    pub note: Option<String>,
    pub source_url: String,
}

fn fill_slot(slot: &mut Option<String>, candidate: Option<String>) {
    if slot.as_deref().map_or(false, |s| !s.is_empty()) {
        return;
    }
    if let Some(value) = candidate {
        let value = value.trim();
        if !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

impl ProfileData {
    /// 空档案，仅记录来源 URL
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            name: None,
            bio: None,
            expertise_areas: Vec::new(),
            publications: Vec::new(),
            affiliations: Vec::new(),
            primary_domain: None,
            career_level: None,
            note: None,
            source_url: source_url.into(),
        }
    }

    /// 是否已有 name 或 bio（阶段短路条件）
    pub fn has_identity(&self) -> bool {
        self.name.as_deref().map_or(false, |s| !s.is_empty())
            || self.bio.as_deref().map_or(false, |s| !s.is_empty())
    }

    /// 合并一个阶段的片段：只补空，不覆盖已有字段
    pub fn fill_from(&mut self, fragment: ProfileFragment) {
        fill_slot(&mut self.name, fragment.name);
        fill_slot(&mut self.bio, fragment.bio);
        if self.expertise_areas.is_empty() && !fragment.expertise.is_empty() {
            self.expertise_areas = fragment
                .expertise
                .into_iter()
                .take(MAX_EXPERTISE_AREAS)
                .collect();
        }
        if self.publications.is_empty() && !fragment.publications.is_empty() {
            self.publications = fragment
                .publications
                .into_iter()
                .take(MAX_PUBLICATIONS)
                .collect();
        }
        if self.affiliations.is_empty() && !fragment.affiliations.is_empty() {
            self.affiliations = fragment.affiliations;
        }
    }

    /// 转成评审人草稿；缺名时用 Unknown 占位，由调用方引导补填
    pub fn into_panelist(self) -> Panelist {
        let mut panelist = Panelist::new(self.name.unwrap_or_else(|| "Unknown".to_string()));
        panelist.bio = self.bio;
        panelist.expertise = self.expertise_areas;
        panelist.publications = self.publications;
        panelist.affiliations = self.affiliations;
        panelist.profile_url = Some(self.source_url);
        panelist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_from_never_overwrites() {
        let mut profile = ProfileData::new("https://example.com/a");
        profile.fill_from(ProfileFragment {
            name: Some("Dr. Li".into()),
            bio: None,
            expertise: vec!["Robotics".into()],
            ..Default::default()
        });
        profile.fill_from(ProfileFragment {
            name: Some("Someone Else".into()),
            bio: Some("A robotics researcher.".into()),
            expertise: vec!["Finance".into()],
            ..Default::default()
        });

        assert_eq!(profile.name.as_deref(), Some("Dr. Li"));
        assert_eq!(profile.bio.as_deref(), Some("A robotics researcher."));
        assert_eq!(profile.expertise_areas, vec!["Robotics".to_string()]);
    }

    #[test]
    fn test_has_identity_on_name_or_bio() {
        let mut profile = ProfileData::new("https://example.com");
        assert!(!profile.has_identity());
        profile.bio = Some("bio only".into());
        assert!(profile.has_identity());
    }

    #[test]
    fn test_fill_from_caps_lists() {
        let mut profile = ProfileData::new("https://example.com");
        profile.fill_from(ProfileFragment {
            expertise: (0..30).map(|i| format!("area-{}", i)).collect(),
            publications: (0..30).map(|i| format!("paper-{}", i)).collect(),
            ..Default::default()
        });
        assert_eq!(profile.expertise_areas.len(), MAX_EXPERTISE_AREAS);
        assert_eq!(profile.publications.len(), MAX_PUBLICATIONS);
    }

    #[test]
    fn test_into_panelist_carries_source_url() {
        let mut profile = ProfileData::new("https://example.com/team/li");
        profile.name = Some("Dr. Li".into());
        profile.expertise_areas = vec!["Robotics".into()];
        let panelist = profile.into_panelist();
        assert_eq!(panelist.name, "Dr. Li");
        assert_eq!(panelist.profile_url.as_deref(), Some("https://example.com/team/li"));
        assert_eq!(panelist.expertise, vec!["Robotics".to_string()]);
    }
}
