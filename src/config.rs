//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SYNREV__*` 覆盖
//! （双下划线表示嵌套，如 `SYNREV__LLM__PROVIDER=gemini`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub panel: PanelSection,
    #[serde(default)]
    pub store: StoreSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：后端选择、生成参数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / gemini；对应 API Key 缺失时回退 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 覆盖 OpenAI 兼容端点（代理或自托管网关）
    pub base_url: Option<String>,
    /// 评审生成温度
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 单次补全输出预算（token）
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub gemini: LlmGeminiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            openai: LlmOpenAiSection::default(),
            gemini: LlmGeminiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    2500
}

impl LlmSection {
    pub fn openai_model(&self) -> String {
        self.openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4-turbo-preview".to_string())
    }

    pub fn gemini_model(&self) -> String {
        self.gemini
            .model
            .clone()
            .unwrap_or_else(|| "gemini-pro".to_string())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmGeminiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次补全请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [extraction] 段：档案抓取超时与退避
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSection {
    /// 单次页面抓取超时（秒）
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// 瞬态失败（429/5xx）总尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 指数退避基数（毫秒）
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

/// [panel] 段：评审团并发
#[derive(Debug, Clone, Deserialize)]
pub struct PanelSection {
    /// 并发评审人数上限
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
}

impl Default for PanelSection {
    fn default() -> Self {
        Self {
            fan_out: default_fan_out(),
        }
    }
}

fn default_fan_out() -> usize {
    4
}

/// [store] 段：持久化后端
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    /// sqlite / memory
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// SQLite 数据库文件路径
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_store_path() -> String {
    "synrev.db".to_string()
}

/// 从 config 目录加载配置，环境变量 SYNREV__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SYNREV__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SYNREV")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.openai_model(), "gpt-4-turbo-preview");
        assert_eq!(cfg.llm.gemini_model(), "gemini-pro");
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert_eq!(cfg.extraction.timeout_secs, 30);
        assert_eq!(cfg.extraction.max_attempts, 3);
        assert_eq!(cfg.panel.fan_out, 4);
        assert_eq!(cfg.store.backend, "memory");
    }

    #[test]
    fn test_partial_toml_fills_missing_with_defaults() {
        let raw = r#"
            [llm]
            provider = "gemini"

            [store]
            backend = "sqlite"
        "#;
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.temperature, 0.7);
        assert_eq!(cfg.store.backend, "sqlite");
        assert_eq!(cfg.store.path, "synrev.db");
        assert_eq!(cfg.extraction.backoff_base_ms, 1000);
    }
}
