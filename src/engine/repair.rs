//! 模型评审 JSON 的宽松读取与修补
//!
//! 模型输出常见小毛病：分数写成字符串、越界、漏字段、recommendation 拼错。
//! 这里统一收口：能修的修掉并记 repair note，缺 overall_score 才算硬失败。
//! 合法的 recommendation 永远原样保留，即使与分数档位冲突。

use serde_json::Value;

use crate::core::PanelError;
use crate::model::{CategoryScores, Feedback, Recommendation, SCORE_MAX, SCORE_MIN};

/// 修补后的评审载荷，等待装配成 [`Review`](crate::model::Review)
#[derive(Debug, Clone)]
pub struct RepairedReview {
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub category_scores: CategoryScores,
    pub feedback: Feedback,
    pub repair_notes: Vec<String>,
}

/// 数字或数字字符串 → f64，模仿宽松的 float() 语义
fn coerce_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|v| v.is_finite())
}

fn coerce_string(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn coerce_string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// 文本字段宽松读取：模型有时把 suggestions 写成数组，逐行拼成一段文字
fn coerce_text_block(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(_)) => coerce_string_list(value).join("\n"),
        other => coerce_string(other),
    }
}

/// 越界分数拉回 [1, 10]，并记一条 repair note
fn clamp_score(name: &str, raw: f64, notes: &mut Vec<String>) -> f64 {
    if raw < SCORE_MIN {
        notes.push(format!("clamped {} from {} to {}", name, raw, SCORE_MIN));
        SCORE_MIN
    } else if raw > SCORE_MAX {
        notes.push(format!("clamped {} from {} to {}", name, raw, SCORE_MAX));
        SCORE_MAX
    } else {
        raw
    }
}

fn category(payload: &Value, name: &str, notes: &mut Vec<String>) -> Option<f64> {
    payload
        .get(name)
        .and_then(coerce_f64)
        .map(|raw| clamp_score(name, raw, notes))
}

/// 宽松读取 + 修补。缺失或不可解析的 overall_score 返回 MalformedResponse，
/// 其余字段按规则填默认值或钳位。
pub fn repair_payload(payload: &Value) -> Result<RepairedReview, PanelError> {
    let mut notes = Vec::new();

    let raw_overall = payload
        .get("overall_score")
        .and_then(coerce_f64)
        .ok_or_else(|| {
            PanelError::MalformedResponse("review payload missing overall_score".to_string())
        })?;
    let overall_score = clamp_score("overall_score", raw_overall, &mut notes);

    let recommendation = match payload.get("recommendation").and_then(Value::as_str) {
        Some(raw) => match Recommendation::parse(raw) {
            // 模型给出的合法取值永远保留，不按分数档位覆盖
            Some(parsed) => parsed,
            None => {
                let derived = Recommendation::from_score(overall_score);
                notes.push(format!(
                    "replaced illegal recommendation \"{}\" with {}",
                    raw,
                    derived.as_str()
                ));
                derived
            }
        },
        None => {
            let derived = Recommendation::from_score(overall_score);
            notes.push(format!(
                "filled missing recommendation with {} from overall_score",
                derived.as_str()
            ));
            derived
        }
    };

    let category_scores = CategoryScores {
        novelty: category(payload, "novelty_score", &mut notes),
        feasibility: category(payload, "feasibility_score", &mut notes),
        impact: category(payload, "impact_score", &mut notes),
        methodology: category(payload, "methodology_score", &mut notes),
        clarity: category(payload, "clarity_score", &mut notes),
    };

    let feedback = Feedback {
        summary: coerce_string(payload.get("summary")),
        strengths: coerce_string_list(payload.get("strengths")),
        weaknesses: coerce_string_list(payload.get("weaknesses")),
        detailed_comments: coerce_string(payload.get("detailed_comments")),
        suggestions: coerce_text_block(payload.get("suggestions")),
    };

    Ok(RepairedReview {
        overall_score,
        recommendation,
        category_scores,
        feedback,
        repair_notes: notes,
    })
}
