//! 文档摄取：把上传的字节流解析为 {title?, abstract?, content}
//!
//! 按声明的 MIME 类型分派：纯文本 / Markdown 内建支持，PDF 走可选
//! `pdf` feature（pdf-extract）。标题取前 10 行中第一条长度合适的行，
//! 摘要按 abstract/summary 关键字定位、在常见章节词处截断。
//! 未识别类型报 UnsupportedFormat，损坏输入报 Parse。

use crate::core::PanelError;
use crate::model::Proposal;

/// 解析不出标题时的占位标题
pub const DEFAULT_TITLE: &str = "Untitled Proposal";

/// 标题候选只看开头这几行
const TITLE_SCAN_LINES: usize = 10;
const TITLE_MIN_CHARS: usize = 10;
const TITLE_MAX_CHARS: usize = 200;

/// 摘要起始关键字（按优先级，不按出现位置）
const ABSTRACT_KEYWORDS: [&str; 2] = ["abstract", "summary"];
/// 摘要结束关键字，从摘要起点后第 50 个字符开始找
const ABSTRACT_END_KEYWORDS: [&str; 4] = ["introduction", "1.", "keywords", "background"];
const ABSTRACT_END_SCAN_OFFSET: usize = 50;
const ABSTRACT_MAX_CHARS: usize = 1000;
/// 找不到摘要段时退回正文开头，截到这个长度
const FALLBACK_ABSTRACT_MAX_CHARS: usize = 500;

/// 摄取结果；core 只把 content 当不透明文本用
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub content: String,
}

impl ParsedDocument {
    /// 转成待评审提案；缺标题用占位标题
    pub fn into_proposal(self) -> Proposal {
        let title = self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let mut proposal = Proposal::new(title, self.content);
        if let Some(abstract_text) = self.abstract_text {
            proposal = proposal.with_abstract(abstract_text);
        }
        proposal
    }
}

/// 解析上传文档。MIME 参数（如 `; charset=utf-8`）忽略。
pub fn parse(bytes: &[u8], declared_mime: &str) -> Result<ParsedDocument, PanelError> {
    let mime = declared_mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/plain" | "text/markdown" | "text/x-markdown" => parse_text(bytes),
        "application/pdf" => parse_pdf(bytes),
        other => Err(PanelError::UnsupportedFormat(format!(
            "unsupported document type '{}' (expected text/plain, text/markdown or application/pdf)",
            other
        ))),
    }
}

fn parse_text(bytes: &[u8]) -> Result<ParsedDocument, PanelError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| PanelError::Parse(format!("document is not valid UTF-8: {}", e)))?;
    Ok(document_from_text(content.to_string()))
}

#[cfg(feature = "pdf")]
fn parse_pdf(bytes: &[u8]) -> Result<ParsedDocument, PanelError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| PanelError::Parse(format!("failed to extract PDF text: {}", e)))?;
    Ok(document_from_text(text))
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(_bytes: &[u8]) -> Result<ParsedDocument, PanelError> {
    Err(PanelError::UnsupportedFormat(
        "PDF ingestion is not enabled in this build (requires the 'pdf' feature)".to_string(),
    ))
}

fn document_from_text(content: String) -> ParsedDocument {
    let title = extract_title(&content);
    let abstract_text = extract_abstract(&content);
    ParsedDocument {
        title,
        abstract_text,
        content,
    }
}

/// 前 TITLE_SCAN_LINES 行里第一条长度在 (10, 200) 的行；
/// Markdown 标题的前导 `#` 去掉后再判长度
fn extract_title(content: &str) -> Option<String> {
    for line in content.lines().take(TITLE_SCAN_LINES) {
        let candidate = line.trim().trim_start_matches('#').trim();
        let chars = candidate.chars().count();
        if chars > TITLE_MIN_CHARS && chars < TITLE_MAX_CHARS {
            return Some(candidate.to_string());
        }
    }
    None
}

fn extract_abstract(content: &str) -> Option<String> {
    let start = ABSTRACT_KEYWORDS
        .iter()
        .find_map(|kw| find_ascii_ci(content, kw, 0));

    let Some(start) = start else {
        // 没有摘要段：退回第一段足够长的文字，或正文开头
        for para in content.split("\n\n") {
            if para.chars().count() > 100 {
                return non_empty(truncate_chars(para, FALLBACK_ABSTRACT_MAX_CHARS));
            }
        }
        return non_empty(truncate_chars(content, FALLBACK_ABSTRACT_MAX_CHARS));
    };

    let region = &content[start..];
    let scan_from = char_offset_to_byte(region, ABSTRACT_END_SCAN_OFFSET);
    let end = ABSTRACT_END_KEYWORDS
        .iter()
        .filter_map(|kw| find_ascii_ci(region, kw, scan_from))
        .min()
        .unwrap_or(region.len());

    let body = strip_leading_label(region[..end].trim());
    non_empty(truncate_chars(body, ABSTRACT_MAX_CHARS))
}

/// 去掉 "Abstract:" / "Summary" 这类前导标签（大小写不敏感）。
/// 标签是纯 ASCII，字节相等即保证切分点落在字符边界。
fn strip_leading_label(text: &str) -> &str {
    for label in ABSTRACT_KEYWORDS {
        let head = text.as_bytes().get(..label.len());
        if head.map_or(false, |h| h.eq_ignore_ascii_case(label.as_bytes())) {
            return text[label.len()..].trim_start_matches([':', '-']).trim_start();
        }
    }
    text
}

/// ASCII 大小写不敏感子串查找，返回字节偏移。
/// 关键字本身是纯 ASCII，命中位置必然落在字符边界上。
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || from >= haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|pos| pos + from)
}

fn char_offset_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    &s[..char_offset_to_byte(s, max_chars)]
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
