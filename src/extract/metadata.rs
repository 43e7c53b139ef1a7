//! 结构化元数据抽取：JSON-LD（阶段 1）与 OpenGraph（阶段 2）
//!
//! 另含 scholar.google 的专用解析：该站点稳定暴露结构化 profile 标记，
//! 按阶段 1 同级对待。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::extract::heuristics::strip_html_tags;
use crate::extract::{ProfileFragment, MAX_PUBLICATIONS};

fn json_ld_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
            .unwrap()
    })
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// JSON-LD 里的 Person / ProfilePage 节点。解析失败的块跳过，不视为错误。
pub fn extract_json_ld(html: &str) -> Option<ProfileFragment> {
    for cap in json_ld_re().captures_iter(html) {
        let Ok(mut data) = serde_json::from_str::<Value>(cap[1].trim()) else {
            continue;
        };
        // 数组形式取第一个节点
        if let Some(items) = data.as_array() {
            data = items.first().cloned().unwrap_or(Value::Null);
        }
        let ty = data.get("@type").and_then(Value::as_str);
        if !matches!(ty, Some("Person") | Some("ProfilePage")) {
            continue;
        }

        let affiliations = match data.get("affiliation") {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            Some(Value::Object(obj)) => obj
                .get("name")
                .and_then(Value::as_str)
                .map(|s| vec![s.trim().to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let expertise = data
            .get("knowsAbout")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        return Some(ProfileFragment {
            name: non_empty(data.get("name")),
            bio: non_empty(data.get("description")),
            expertise,
            publications: Vec::new(),
            affiliations,
        });
    }
    None
}

/// meta 标签内容，属性顺序两种写法都认
fn meta_content(html: &str, key: &str, value: &str) -> Option<String> {
    let value = regex::escape(value);
    let patterns = [
        format!(
            r#"(?is)<meta\b[^>]*\b{key}\s*=\s*["']{value}["'][^>]*\bcontent\s*=\s*["']([^"']*)["']"#
        ),
        format!(
            r#"(?is)<meta\b[^>]*\bcontent\s*=\s*["']([^"']*)["'][^>]*\b{key}\s*=\s*["']{value}["']"#
        ),
    ];
    for pattern in patterns {
        let captured = Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures(html))
            .map(|cap| cap[1].trim().to_string());
        if let Some(content) = captured {
            if !content.is_empty() {
                return Some(content);
            }
        }
    }
    None
}

/// OpenGraph / meta description：og:title 当 name，og:description 或
/// name="description" 当 bio。两者都缺时返回 None。
pub fn extract_opengraph(html: &str) -> Option<ProfileFragment> {
    let name = meta_content(html, "property", "og:title");
    let bio = meta_content(html, "property", "og:description")
        .or_else(|| meta_content(html, "name", "description"));
    if name.is_none() && bio.is_none() {
        return None;
    }
    Some(ProfileFragment {
        name,
        bio,
        ..Default::default()
    })
}

fn scholar_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<div[^>]*id\s*=\s*["']gsc_prf_in["'][^>]*>(.*?)</div>"#).unwrap()
    })
}

fn scholar_affiliation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<div[^>]*class\s*=\s*["'][^"']*gsc_prf_il[^"']*["'][^>]*>(.*?)</div>"#)
            .unwrap()
    })
}

fn scholar_interests_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<div[^>]*id\s*=\s*["']gsc_prf_int["'][^>]*>(.*?)</div>"#).unwrap()
    })
}

fn scholar_publication_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a[^>]*class\s*=\s*["'][^"']*gsc_a_at[^"']*["'][^>]*>(.*?)</a>"#).unwrap()
    })
}

fn inner_anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a[^>]*>(.*?)</a>").unwrap())
}

/// scholar.google：gsc_* 标记的专用解析。机构同时当 bio 与 affiliation 用。
pub fn extract_scholar(html: &str) -> ProfileFragment {
    let name = scholar_name_re()
        .captures(html)
        .map(|cap| strip_html_tags(&cap[1]))
        .filter(|s| !s.is_empty());

    let affiliation = scholar_affiliation_re()
        .captures(html)
        .map(|cap| strip_html_tags(&cap[1]))
        .filter(|s| !s.is_empty());

    let expertise = scholar_interests_block_re()
        .captures(html)
        .map(|block| {
            inner_anchor_re()
                .captures_iter(&block[1])
                .map(|cap| strip_html_tags(&cap[1]))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let publications = scholar_publication_re()
        .captures_iter(html)
        .take(MAX_PUBLICATIONS)
        .map(|cap| strip_html_tags(&cap[1]))
        .filter(|s| !s.is_empty())
        .collect();

    ProfileFragment {
        name,
        bio: affiliation.clone(),
        expertise,
        publications,
        affiliations: affiliation.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_ld_person_node() {
        let html = r#"<script type="application/ld+json">
        {
            "@type": "Person",
            "name": "Dr. Ada Wong",
            "description": "Researcher in computational biology.",
            "affiliation": { "name": "Umbrella Institute" },
            "knowsAbout": ["Genomics", "Bioinformatics"]
        }
        </script>"#;
        let frag = extract_json_ld(html).unwrap();
        assert_eq!(frag.name.as_deref(), Some("Dr. Ada Wong"));
        assert_eq!(frag.bio.as_deref(), Some("Researcher in computational biology."));
        assert_eq!(frag.affiliations, vec!["Umbrella Institute".to_string()]);
        assert_eq!(frag.expertise, vec!["Genomics".to_string(), "Bioinformatics".to_string()]);
    }

    #[test]
    fn test_json_ld_array_takes_first_node() {
        let html = r#"<script type="application/ld+json">
        [{ "@type": "Person", "name": "First Author" }, { "@type": "Person", "name": "Second" }]
        </script>"#;
        let frag = extract_json_ld(html).unwrap();
        assert_eq!(frag.name.as_deref(), Some("First Author"));
    }

    #[test]
    fn test_json_ld_skips_non_person_nodes() {
        let html = r#"
        <script type="application/ld+json">{ "@type": "WebSite", "name": "Some Site" }</script>
        <script type="application/ld+json">{ "@type": "ProfilePage", "name": "Dr. Kim" }</script>
        "#;
        let frag = extract_json_ld(html).unwrap();
        assert_eq!(frag.name.as_deref(), Some("Dr. Kim"));
    }

    #[test]
    fn test_json_ld_absent() {
        assert!(extract_json_ld("<html><body>no structured data</body></html>").is_none());
    }

    #[test]
    fn test_opengraph_both_attribute_orders() {
        let forward = r#"<meta property="og:title" content="Dr. Park">"#;
        let backward = r#"<meta content="Seoul-based roboticist." property="og:description">"#;
        let html = format!("{}{}", forward, backward);
        let frag = extract_opengraph(&html).unwrap();
        assert_eq!(frag.name.as_deref(), Some("Dr. Park"));
        assert_eq!(frag.bio.as_deref(), Some("Seoul-based roboticist."));
    }

    #[test]
    fn test_opengraph_falls_back_to_meta_description() {
        let html = r#"<meta name="description" content="Plain description.">"#;
        let frag = extract_opengraph(html).unwrap();
        assert!(frag.name.is_none());
        assert_eq!(frag.bio.as_deref(), Some("Plain description."));
    }

    #[test]
    fn test_scholar_markup() {
        let html = r#"
        <div id="gsc_prf_in">Yann Moreau</div>
        <div class="gsc_prf_il">Professor, ETH Zurich</div>
        <div id="gsc_prf_int"><a>Optimization</a><a>Control Theory</a></div>
        <table>
          <tr class="gsc_a_tr"><td><a class="gsc_a_at" href="/citations?x">Distributed Optimization at Scale</a></td></tr>
          <tr class="gsc_a_tr"><td><a class="gsc_a_at" href="/citations?y">Robust Control Primer</a></td></tr>
        </table>
        "#;
        let frag = extract_scholar(html);
        assert_eq!(frag.name.as_deref(), Some("Yann Moreau"));
        assert_eq!(frag.bio.as_deref(), Some("Professor, ETH Zurich"));
        assert_eq!(frag.affiliations, vec!["Professor, ETH Zurich".to_string()]);
        assert_eq!(frag.expertise, vec!["Optimization".to_string(), "Control Theory".to_string()]);
        assert_eq!(
            frag.publications,
            vec![
                "Distributed Optimization at Scale".to_string(),
                "Robust Control Primer".to_string(),
            ]
        );
    }
}
