//! 抽取结果缓存：进程内、按规范化 URL 作键
//!
//! 追加式 best-effort 缓存，进程生命周期内不过期；
//! 并发写同键无害（值等价，后写胜出）。

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::PanelError;
use crate::extract::ProfileData;

/// URL 规范化：scheme/host 小写、去 fragment、去尾部斜杠。
/// 非 http(s) 或缺 host 的 URL 视为非法输入。
pub fn normalize_url(raw: &str) -> Result<String, PanelError> {
    let mut url = reqwest::Url::parse(raw.trim())
        .map_err(|e| PanelError::Validation(format!("invalid profile url {}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PanelError::Validation(format!(
            "invalid profile url {}: unsupported scheme {}",
            raw,
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(PanelError::Validation(format!(
            "invalid profile url {}: missing host",
            raw
        )));
    }
    url.set_fragment(None);
    let mut normalized = url.to_string();
    if url.query().is_none() {
        while normalized.ends_with('/') {
            normalized.pop();
        }
    }
    Ok(normalized)
}

/// 缓存接口，测试可注入预置或计数实现
pub trait ProfileCache: Send + Sync {
    fn get(&self, key: &str) -> Option<ProfileData>;
    fn put(&self, key: &str, profile: ProfileData);
}

/// HashMap 实现，默认缓存
#[derive(Default)]
pub struct InMemoryProfileCache {
    entries: Mutex<HashMap<String, ProfileData>>,
}

impl InMemoryProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProfileCache for InMemoryProfileCache {
    fn get(&self, key: &str) -> Option<ProfileData> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, profile: ProfileData) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), profile);
        }
    }
}
