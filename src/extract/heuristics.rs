//! 清洗文本启发式（阶段 3）：去噪 HTML 后抽取 name / bio / 专长 / 出版物
//!
//! 对 HTML 使用 html2text 提取可读文本，失败回退到手写去标签；
//! 专长靠研究领域关键词命中，出版物靠链接文本与 href 关键词。

use std::sync::OnceLock;

use html2text::from_read;
use regex::Regex;

use crate::extract::{ProfileFragment, MAX_EXPERTISE_AREAS, MAX_PUBLICATIONS};

/// 需要整块移除的结构性噪声标签
const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript",
];

/// class 命中即移除的噪声片段
const NOISE_CLASSES: &[&str] = &[
    "cookie", "banner", "ad", "advertisement", "popup", "modal", "sidebar", "menu", "navigation",
];

/// 命中即视为研究专长的关键词（小写匹配，Title Case 输出）
const RESEARCH_TERMS: &[&str] = &[
    // CS / AI
    "machine learning",
    "artificial intelligence",
    "deep learning",
    "computer vision",
    "natural language processing",
    "nlp",
    "data science",
    "robotics",
    "computer science",
    // 基础科学
    "neuroscience",
    "biology",
    "chemistry",
    "physics",
    "mathematics",
    "statistics",
    "genomics",
    "bioinformatics",
    // 工程
    "engineering",
    "electrical engineering",
    "mechanical engineering",
    "civil engineering",
    "materials science",
    // 医学与健康
    "medicine",
    "public health",
    "epidemiology",
    "clinical research",
    // 其他
    "climate science",
    "environmental science",
    "energy",
    "quantum computing",
    "cryptography",
    "cybersecurity",
    "economics",
    "finance",
    "social science",
    "psychology",
];

/// 链接被当作出版物的关键词（文本或 href 命中其一）
const PUBLICATION_KEYWORDS: &[&str] = &["paper", "publication", "article", "research", "pdf", "doi"];

/// 只扫描前这么多个链接
const PUBLICATION_LINK_SCAN: usize = 30;

/// 简易去除 HTML 标签（html2text 失败时的回退）
pub(crate) fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut prev_whitespace = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => {
                let is_whitespace = c.is_whitespace();
                if is_whitespace && prev_whitespace {
                    continue;
                }
                prev_whitespace = is_whitespace;
                out.push(if is_whitespace { ' ' } else { c });
            }
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn noise_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = NOISE_TAGS
            .iter()
            .map(|tag| format!(r"<{tag}\b[^>]*>.*?</{tag}\s*>", tag = tag))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?is){}", alternation)).unwrap()
    })
}

fn noise_class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let classes = NOISE_CLASSES.join("|");
        Regex::new(&format!(
            r#"(?is)<(?:div|section|span|ul)\b[^>]*class\s*=\s*["'][^"']*(?:{})[^"']*["'][^>]*>.*?</(?:div|section|span|ul)\s*>"#,
            classes
        ))
        .unwrap()
    })
}

fn h1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap())
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

fn title_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\s*[-|].*$").unwrap())
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap())
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\b[^>]*href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#).unwrap()
    })
}

/// "machine learning" -> "Machine Learning"
fn title_case(term: &str) -> String {
    term.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 启发式抽取接口；流水线通过它调用阶段 3，测试可注入计数假实现
pub trait TextHeuristics: Send + Sync {
    fn extract(&self, html: &str) -> ProfileFragment;
}

/// 正则去噪 + html2text 的默认实现
pub struct HtmlTextHeuristics;

impl HtmlTextHeuristics {
    /// 去掉脚本/导航/广告等噪声后的可读文本，空白折叠为单个空格
    pub fn clean_visible_text(&self, html: &str) -> String {
        let without_tags = noise_tag_re().replace_all(html, " ");
        let without_noise = noise_class_re().replace_all(&without_tags, " ");
        let text = match from_read(without_noise.as_bytes(), 120) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => strip_html_tags(&without_noise),
        };
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 第一个 h1，过长则退到 <title>（去掉 "- 站点名" 类后缀）
    fn name_candidate(&self, html: &str) -> Option<String> {
        if let Some(cap) = h1_re().captures(html) {
            let name = strip_html_tags(&cap[1]);
            if !name.is_empty() && name.chars().count() < 50 {
                return Some(name);
            }
        }
        if let Some(cap) = title_re().captures(html) {
            let title = strip_html_tags(&cap[1]);
            let name = title_suffix_re().replace(&title, "").trim().to_string();
            if !name.is_empty() && name.chars().count() < 50 {
                return Some(name);
            }
        }
        None
    }

    /// 第一段长度合适的 <p>，否则取清洗文本前 500 字符
    fn bio_candidate(&self, html: &str, clean_text: &str) -> Option<String> {
        for cap in paragraph_re().captures_iter(html) {
            let text = strip_html_tags(&cap[1]);
            let len = text.chars().count();
            if len > 100 && len < 1000 {
                return Some(text);
            }
        }
        if clean_text.chars().count() > 100 {
            return Some(clean_text.chars().take(500).collect());
        }
        None
    }

    /// 研究领域关键词命中，Title Case 输出，保持命中顺序
    fn expertise_candidates(&self, clean_text: &str) -> Vec<String> {
        let lower = clean_text.to_lowercase();
        RESEARCH_TERMS
            .iter()
            .filter(|term| lower.contains(*term))
            .map(|term| title_case(term))
            .take(MAX_EXPERTISE_AREAS)
            .collect()
    }

    /// 前 30 个链接里文本或 href 带出版物关键词、长度合理的条目
    fn publication_candidates(&self, html: &str) -> Vec<String> {
        let mut publications = Vec::new();
        for cap in anchor_re().captures_iter(html).take(PUBLICATION_LINK_SCAN) {
            let href = cap[1].to_lowercase();
            let text = strip_html_tags(&cap[2]);
            let text_lower = text.to_lowercase();
            let hit = PUBLICATION_KEYWORDS
                .iter()
                .any(|kw| text_lower.contains(kw) || href.contains(kw));
            let len = text.chars().count();
            if hit && len > 10 && len < 200 {
                publications.push(text);
            }
            if publications.len() >= MAX_PUBLICATIONS {
                break;
            }
        }
        publications
    }
}

impl TextHeuristics for HtmlTextHeuristics {
    fn extract(&self, html: &str) -> ProfileFragment {
        let clean_text = self.clean_visible_text(html);
        ProfileFragment {
            name: self.name_candidate(html),
            bio: self.bio_candidate(html, &clean_text),
            expertise: self.expertise_candidates(&clean_text),
            publications: self.publication_candidates(html),
            affiliations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_visible_text_drops_scripts_and_noise_classes() {
        let html = r#"<html><body>
            <script>tracker();</script>
            <nav>Home About</nav>
            <div class="cookie-banner">We use cookies</div>
            <p>Dr. Li studies robotics.</p>
        </body></html>"#;
        let text = HtmlTextHeuristics.clean_visible_text(html);
        assert!(text.contains("Dr. Li studies robotics."));
        assert!(!text.contains("tracker"));
        assert!(!text.contains("cookies"));
        assert!(!text.contains("Home About"));
    }

    #[test]
    fn test_name_prefers_short_h1_then_title() {
        let with_h1 = "<h1>Dr. Wei Li</h1><title>Ignored</title>";
        assert_eq!(
            HtmlTextHeuristics.name_candidate(with_h1).as_deref(),
            Some("Dr. Wei Li")
        );

        let long_h1 = format!("<h1>{}</h1><title>Dr. Wei Li - Faculty Page</title>", "x".repeat(80));
        assert_eq!(
            HtmlTextHeuristics.name_candidate(&long_h1).as_deref(),
            Some("Dr. Wei Li")
        );
    }

    #[test]
    fn test_bio_prefers_substantial_paragraph() {
        let para = "a".repeat(150);
        let html = format!("<p>short</p><p>{}</p>", para);
        assert_eq!(
            HtmlTextHeuristics.bio_candidate(&html, "").as_deref(),
            Some(para.as_str())
        );
    }

    #[test]
    fn test_bio_falls_back_to_clean_text_prefix() {
        let clean = "b".repeat(700);
        let bio = HtmlTextHeuristics.bio_candidate("<p>tiny</p>", &clean).unwrap();
        assert_eq!(bio.chars().count(), 500);
    }

    #[test]
    fn test_expertise_keywords_title_cased() {
        let text = "Her work spans machine learning, robotics and public health.";
        let areas = HtmlTextHeuristics.expertise_candidates(text);
        assert!(areas.contains(&"Machine Learning".to_string()));
        assert!(areas.contains(&"Robotics".to_string()));
        assert!(areas.contains(&"Public Health".to_string()));
        assert!(!areas.contains(&"Finance".to_string()));
    }

    #[test]
    fn test_publications_filtered_by_keyword_and_length() {
        let html = r#"
            <a href="/papers/attention.pdf">Attention Is All You Need</a>
            <a href="/contact">Contact</a>
            <a href="https://doi.org/10.1000/x">A Survey of Graph Neural Networks</a>
            <a href="/paper/short">tiny</a>
        "#;
        let pubs = HtmlTextHeuristics.publication_candidates(html);
        assert_eq!(
            pubs,
            vec![
                "Attention Is All You Need".to_string(),
                "A Survey of Graph Neural Networks".to_string(),
            ]
        );
    }

    #[test]
    fn test_strip_html_tags_collapses_whitespace() {
        assert_eq!(
            strip_html_tags("<p>Hello   <b>world</b></p>\n<p>again</p>"),
            "Hello world again"
        );
    }
}
