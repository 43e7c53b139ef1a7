//! Personality Policy：人格分 → 行为指令的唯一映射点
//!
//! 纯函数，无副作用；人格语义全部集中在此，调整评审口吻只改这里。
//! 分档：<4 低档，4-7 中档，>7 高档；detailed_comments 最低词数随严肃性线性增长。

use serde::Serialize;

use crate::core::PanelError;
use crate::model::PersonalityScores;

/// 评审口吻（由批判性分决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Supportive,
    Balanced,
    Harsh,
}

impl Tone {
    /// 注入提示词的口吻描述
    pub fn phrase(&self) -> &'static str {
        match self {
            Tone::Supportive => "You are supportive and encouraging in your reviews",
            Tone::Balanced => "You are balanced and fair in your critique",
            Tone::Harsh => "You are highly critical and rigorous in your evaluations",
        }
    }
}

/// 对新颖想法的接纳度（由开放性分决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoveltyStance {
    Conservative,
    Neutral,
    Receptive,
}

impl NoveltyStance {
    pub fn phrase(&self) -> &'static str {
        match self {
            NoveltyStance::Conservative => {
                "You prefer well-established methodologies and approaches"
            }
            NoveltyStance::Neutral => "You are moderately open to innovation",
            NoveltyStance::Receptive => "You are very open to novel and unconventional ideas",
        }
    }
}

/// 分析深度（由严肃性分决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Brief,
    Exhaustive,
}

impl Depth {
    pub fn phrase(&self) -> &'static str {
        match self {
            Depth::Brief => "You provide concise and practical feedback",
            Depth::Exhaustive => "You provide extremely thorough and formal analysis",
        }
    }
}

/// 由人格分推导出的行为指令，供提示词构造使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Directives {
    pub tone: Tone,
    pub novelty_stance: NoveltyStance,
    pub depth: Depth,
    /// detailed_comments 的最低词数要求：floor(50 + seriousness * 30)
    pub min_comment_words: usize,
}

/// 人格分 → 行为指令。确定性纯函数；分值越界返回 Validation。
pub fn derive_directives(scores: &PersonalityScores) -> Result<Directives, PanelError> {
    scores.validate()?;

    let tone = if scores.critical < 4.0 {
        Tone::Supportive
    } else if scores.critical > 7.0 {
        Tone::Harsh
    } else {
        Tone::Balanced
    };

    let novelty_stance = if scores.openness < 4.0 {
        NoveltyStance::Conservative
    } else if scores.openness > 7.0 {
        NoveltyStance::Receptive
    } else {
        NoveltyStance::Neutral
    };

    let depth = if scores.seriousness > 7.0 {
        Depth::Exhaustive
    } else {
        Depth::Brief
    };

    let min_comment_words = (50.0 + scores.seriousness * 30.0).floor() as usize;

    Ok(Directives {
        tone,
        novelty_stance,
        depth,
        min_comment_words,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(critical: f64, openness: f64, seriousness: f64) -> PersonalityScores {
        PersonalityScores {
            critical,
            openness,
            seriousness,
        }
    }

    #[test]
    fn test_deterministic_same_input_same_output() {
        let s = scores(6.3, 2.1, 9.9);
        let a = derive_directives(&s).unwrap();
        let b = derive_directives(&s).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tone_buckets() {
        assert_eq!(derive_directives(&scores(3.9, 5.0, 5.0)).unwrap().tone, Tone::Supportive);
        assert_eq!(derive_directives(&scores(4.0, 5.0, 5.0)).unwrap().tone, Tone::Balanced);
        assert_eq!(derive_directives(&scores(7.0, 5.0, 5.0)).unwrap().tone, Tone::Balanced);
        assert_eq!(derive_directives(&scores(7.1, 5.0, 5.0)).unwrap().tone, Tone::Harsh);
    }

    #[test]
    fn test_novelty_stance_buckets() {
        assert_eq!(
            derive_directives(&scores(5.0, 2.0, 5.0)).unwrap().novelty_stance,
            NoveltyStance::Conservative
        );
        assert_eq!(
            derive_directives(&scores(5.0, 5.0, 5.0)).unwrap().novelty_stance,
            NoveltyStance::Neutral
        );
        assert_eq!(
            derive_directives(&scores(5.0, 9.0, 5.0)).unwrap().novelty_stance,
            NoveltyStance::Receptive
        );
    }

    #[test]
    fn test_min_comment_words_formula() {
        assert_eq!(derive_directives(&scores(5.0, 5.0, 1.0)).unwrap().min_comment_words, 80);
        assert_eq!(derive_directives(&scores(5.0, 5.0, 5.0)).unwrap().min_comment_words, 200);
        assert_eq!(derive_directives(&scores(5.0, 5.0, 10.0)).unwrap().min_comment_words, 350);
    }

    #[test]
    fn test_min_comment_words_monotone_in_seriousness() {
        let mut prev = 0;
        let mut s = 1.0;
        while s <= 10.0 {
            let d = derive_directives(&scores(5.0, 5.0, s)).unwrap();
            assert!(d.min_comment_words >= prev, "not monotone at seriousness {}", s);
            prev = d.min_comment_words;
            s += 0.25;
        }
    }

    #[test]
    fn test_out_of_range_traits_rejected() {
        assert!(derive_directives(&scores(0.0, 5.0, 5.0)).is_err());
        assert!(derive_directives(&scores(5.0, 5.0, 10.1)).is_err());
    }
}
