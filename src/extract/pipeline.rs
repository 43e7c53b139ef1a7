//! 抽取流水线：抓取（带退避重试）-> 分阶段抽取 -> 缓存，外加模型增强
//!
//! 429 与 5xx 视为瞬时错误做指数退避，其余失败立刻报 Extraction；
//! scholar.google 走专用阶段 1 解析，linkedin 附固定提示说明抽取受限。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::ExtractionSection;
use crate::core::PanelError;
use crate::extract::cache::{normalize_url, InMemoryProfileCache, ProfileCache};
use crate::extract::fetcher::{FetchedPage, HttpFetcher, PageFetcher};
use crate::extract::heuristics::{HtmlTextHeuristics, TextHeuristics};
use crate::extract::{metadata, ProfileData, MAX_EXPERTISE_AREAS};
use crate::llm::{CompletionOptions, LlmClient, Message};

/// linkedin 公开页反爬，只能拿到有限字段时附带的固定说明
const LINKEDIN_NOTE: &str =
    "Limited extraction - LinkedIn requires authentication for full access";

/// 模型增强的采样温度（结构化抽取要稳定）
const ENHANCE_TEMPERATURE: f32 = 0.3;

/// 增强提示里 bio 的截断长度（字符）
const ENHANCE_BIO_PREVIEW_CHARS: usize = 500;

/// 默认抓取总尝试次数
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// 默认退避基准
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
/// 默认抓取超时（秒）
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

fn host_of(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split('/').next()?;
    let host = host.split(':').next()?;
    Some(host.to_lowercase())
}

/// 档案抽取流水线。抓取器、启发式与缓存都可注入替换。
pub struct ProfileExtractor {
    fetcher: Arc<dyn PageFetcher>,
    heuristics: Arc<dyn TextHeuristics>,
    cache: Arc<dyn ProfileCache>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl Default for ProfileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileExtractor {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(HttpFetcher::new(DEFAULT_FETCH_TIMEOUT_SECS)),
            heuristics: Arc::new(HtmlTextHeuristics),
            cache: Arc::new(InMemoryProfileCache::new()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// 按配置构建：超时与重试来自 [extraction] 节
    pub fn from_config(cfg: &ExtractionSection) -> Self {
        Self::new()
            .with_fetcher(Arc::new(HttpFetcher::new(cfg.timeout_secs)))
            .with_retry(cfg.max_attempts, Duration::from_millis(cfg.backoff_base_ms))
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_heuristics(mut self, heuristics: Arc<dyn TextHeuristics>) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ProfileCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_base = backoff_base;
        self
    }

    /// 抽取档案。非法 URL 报 Validation，抓取失败报 Extraction，
    /// 页面没内容不算错，返回空档案。成功结果进缓存。
    pub async fn extract(&self, url: &str) -> Result<ProfileData, PanelError> {
        let key = normalize_url(url)?;
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(url, "profile cache hit");
            return Ok(hit);
        }

        let page = self.fetch_with_backoff(url).await?;
        let profile = self.extract_from_html(url, &page.body);
        tracing::info!(
            url,
            name = profile.name.as_deref().unwrap_or(""),
            expertise = profile.expertise_areas.len(),
            publications = profile.publications.len(),
            "profile extracted"
        );
        self.cache.put(&key, profile.clone());
        Ok(profile)
    }

    /// 抽取失败时退回空档案（Validation 仍然上抛），供调用方引导手动录入
    pub async fn extract_or_empty(&self, url: &str) -> Result<ProfileData, PanelError> {
        match self.extract(url).await {
            Ok(profile) => Ok(profile),
            Err(PanelError::Validation(reason)) => Err(PanelError::Validation(reason)),
            Err(err) => {
                tracing::warn!(url, error = %err, "profile extraction failed, returning empty profile");
                Ok(ProfileData::new(url))
            }
        }
    }

    /// 429/5xx 指数退避重试，其余状态立刻失败
    async fn fetch_with_backoff(&self, url: &str) -> Result<FetchedPage, PanelError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let page = self.fetcher.fetch(url).await?;
            if page.is_success() {
                return Ok(page);
            }
            let transient = page.status == 429 || (500..600).contains(&page.status);
            if !transient {
                return Err(PanelError::Extraction(format!(
                    "fetch {} failed with status {}",
                    url, page.status
                )));
            }
            if attempt >= self.max_attempts {
                return Err(PanelError::Extraction(format!(
                    "fetch {} still failing with status {} after {} attempts",
                    url, page.status, attempt
                )));
            }
            let delay = self.backoff_base * 2u32.saturating_pow(attempt - 1);
            tracing::debug!(
                url,
                status = page.status,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transient fetch failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// 分阶段抽取：已有 name 或 bio 即短路，后续阶段不再执行
    fn extract_from_html(&self, url: &str, html: &str) -> ProfileData {
        let host = host_of(url).unwrap_or_default();
        let mut profile = ProfileData::new(url);

        if host.contains("scholar.google") {
            profile.fill_from(metadata::extract_scholar(html));
            return profile;
        }

        if let Some(fragment) = metadata::extract_json_ld(html) {
            profile.fill_from(fragment);
        }
        if !profile.has_identity() {
            if let Some(fragment) = metadata::extract_opengraph(html) {
                profile.fill_from(fragment);
            }
        }
        if !profile.has_identity() {
            profile.fill_from(self.heuristics.extract(html));
        }

        if host.contains("linkedin.com") {
            profile.note = Some(LINKEDIN_NOTE.to_string());
        }
        profile
    }
}

/// 模型增强：补专长、补空缺的 bio、加主领域与职业阶段。
/// 只补空不覆盖；增强失败原样返回档案，不影响已抽取内容。
pub async fn enhance_profile(llm: &dyn LlmClient, mut profile: ProfileData) -> ProfileData {
    let bio_preview: String = profile
        .bio
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(ENHANCE_BIO_PREVIEW_CHARS)
        .collect();
    let expertise_preview = profile
        .expertise_areas
        .iter()
        .take(5)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "Analyze this professional profile and extract structured information:\n\n\
         Name: {}\n\
         Bio: {}\n\
         Current Expertise: {}\n\
         Publications: {} found\n\n\
         Extract:\n\
         1. All expertise areas (5-15 items; be comprehensive - include methods, domains, applications)\n\
         2. Enhanced bio (2-3 sentences, professional tone)\n\
         3. Primary research domain (one phrase)\n\
         4. Career level (PhD Student, Postdoc, Assistant Professor, Associate Professor, \
         Full Professor, Industry Researcher, etc.)",
        profile.name.as_deref().unwrap_or("Unknown"),
        bio_preview,
        expertise_preview,
        profile.publications.len(),
    );

    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            "expertise_areas": { "type": "array", "items": { "type": "string" } },
            "enhanced_bio": { "type": "string" },
            "primary_domain": { "type": "string" },
            "career_level": { "type": "string" }
        },
        "required": ["expertise_areas", "enhanced_bio", "primary_domain", "career_level"]
    });
    let options = CompletionOptions::json().with_temperature(ENHANCE_TEMPERATURE);

    let enhanced = match llm
        .complete_structured(&[Message::user(prompt)], &schema, &options)
        .await
    {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(url = %profile.source_url, error = %err, "profile enhancement failed, keeping extracted profile");
            return profile;
        }
    };

    if let Some(items) = enhanced.get("expertise_areas").and_then(Value::as_array) {
        for item in items.iter().filter_map(Value::as_str) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            if profile.expertise_areas.len() >= MAX_EXPERTISE_AREAS {
                break;
            }
            if !profile
                .expertise_areas
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(item))
            {
                profile.expertise_areas.push(item.to_string());
            }
        }
    }

    if profile.bio.as_deref().map_or(true, str::is_empty) {
        if let Some(bio) = enhanced.get("enhanced_bio").and_then(Value::as_str) {
            if !bio.trim().is_empty() {
                profile.bio = Some(bio.trim().to_string());
            }
        }
    }
    if profile.primary_domain.is_none() {
        profile.primary_domain = enhanced
            .get("primary_domain")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }
    if profile.career_level.is_none() {
        profile.career_level = enhanced
            .get("career_level")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    profile
}
