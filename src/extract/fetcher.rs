//! 页面抓取：带超时与浏览器请求头的 GET
//!
//! 传输层失败（DNS、连接、超时）直接报 Extraction；
//! 非 2xx 状态不在这里判定，状态码交给流水线决定重试还是失败。

use async_trait::async_trait;
use reqwest::Client;

use crate::core::PanelError;

/// 抓取结果：状态码 + 响应体
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 抓取接口，测试里用可计数的假实现替换
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, PanelError>;
}

/// reqwest 实现
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        // 桌面浏览器 UA 与常用请求头，避免被站点当成爬虫直接拒绝
        const USER_AGENT: &str =
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers({
                use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
                let mut headers = HeaderMap::new();
                headers.insert(
                    ACCEPT,
                    HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                );
                headers
            })
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, PanelError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PanelError::Extraction(format!("fetch {} failed: {}", url, e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| PanelError::Extraction(format!("read body of {} failed: {}", url, e)))?;
        tracing::debug!(url, status, bytes = body.len(), "fetched profile page");
        Ok(FetchedPage { status, body })
    }
}
