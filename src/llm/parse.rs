//! 模型输出的 JSON 解析与一次就地修复
//!
//! 修复顺序：直接解析 → 剥 ```json 围栏 → 取第一个配平的 JSON 对象（括号深度扫描，
//! 跳过字符串与转义）。仍失败则归类为 MalformedResponse。

use crate::core::PanelError;

/// 从自由文本中取出第一个配平的 JSON 对象
pub fn extract_json_object(raw: &str) -> Option<String> {
    // ```json 围栏优先
    if let Some(start) = raw.find("```json") {
        let rest = &raw[start + 7..];
        if let Some(end) = rest.find("```") {
            let candidate = rest[..end].trim();
            if candidate.starts_with('{') && candidate.ends_with('}') {
                return Some(candidate.to_string());
            }
        }
    }

    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// 将模型输出解析为 JSON 值；一次修复后仍失败 → MalformedResponse
pub fn parse_structured(raw: &str) -> Result<serde_json::Value, PanelError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return Ok(value);
        }
    }

    let candidate = extract_json_object(trimmed).ok_or_else(|| {
        PanelError::MalformedResponse(format!(
            "no JSON object found in response: {}",
            preview(trimmed)
        ))
    })?;

    serde_json::from_str(&candidate).map_err(|e| {
        PanelError::MalformedResponse(format!("{}: {}", e, preview(&candidate)))
    })
}

/// 错误信息中的原文预览（避免日志爆长）
fn preview(s: &str) -> String {
    const PREVIEW_CHARS: usize = 200;
    if s.chars().count() > PREVIEW_CHARS {
        format!("{}...", s.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}
