//! 档案抽取集成测试：重试预算、阶段短路与缓存的跨模块行为

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use synrev::extract::{
        FetchedPage, HtmlTextHeuristics, PageFetcher, ProfileExtractor, ProfileFragment,
        TextHeuristics,
    };
    use synrev::PanelError;

    const PERSON_JSON_LD: &str = r#"<html><head>
        <script type="application/ld+json">
        { "@type": "Person", "name": "Dr. Ada Wong", "description": "Computational biologist." }
        </script>
        </head><body><h1>Fallback Heading</h1></body></html>"#;

    /// 按脚本出队响应并计数的假抓取器；队列耗尽后返回空 200 页
    struct ScriptedFetcher {
        pages: Mutex<VecDeque<FetchedPage>>,
        fetches: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new<I>(pages: I) -> Self
        where
            I: IntoIterator<Item = FetchedPage>,
        {
            Self {
                pages: Mutex::new(pages.into_iter().collect()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedPage, PanelError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.pages.lock().unwrap().pop_front() {
                Some(page) => Ok(page),
                None => Ok(page(200, "")),
            }
        }
    }

    /// 包装默认启发式并统计调用次数，用于验证阶段短路
    struct CountingHeuristics {
        inner: HtmlTextHeuristics,
        calls: AtomicUsize,
    }

    impl CountingHeuristics {
        fn new() -> Self {
            Self {
                inner: HtmlTextHeuristics,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TextHeuristics for CountingHeuristics {
        fn extract(&self, html: &str) -> ProfileFragment {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.extract(html)
        }
    }

    fn page(status: u16, body: &str) -> FetchedPage {
        FetchedPage {
            status,
            body: body.to_string(),
        }
    }

    /// 零退避的流水线，测试里不等真实延迟
    fn extractor_with(fetcher: Arc<ScriptedFetcher>) -> ProfileExtractor {
        ProfileExtractor::new()
            .with_fetcher(fetcher)
            .with_retry(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_transient_statuses_retried_until_success() {
        let fetcher = Arc::new(ScriptedFetcher::new([
            page(503, "busy"),
            page(503, "busy"),
            page(200, PERSON_JSON_LD),
        ]));
        let extractor = extractor_with(fetcher.clone());

        let profile = extractor.extract("https://example.com/ada").await.unwrap();

        assert_eq!(fetcher.fetch_count(), 3);
        assert_eq!(profile.name.as_deref(), Some("Dr. Ada Wong"));
        assert_eq!(profile.bio.as_deref(), Some("Computational biologist."));
    }

    #[tokio::test]
    async fn test_permanent_status_fails_without_retry() {
        let fetcher = Arc::new(ScriptedFetcher::new([page(404, "gone")]));
        let extractor = extractor_with(fetcher.clone());

        let err = extractor
            .extract("https://example.com/missing")
            .await
            .unwrap_err();

        assert_eq!(fetcher.fetch_count(), 1);
        assert!(matches!(err, PanelError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_reports_extraction() {
        let fetcher = Arc::new(ScriptedFetcher::new([
            page(503, ""),
            page(503, ""),
            page(503, ""),
        ]));
        let extractor = extractor_with(fetcher.clone());

        let err = extractor
            .extract("https://example.com/flaky")
            .await
            .unwrap_err();

        assert_eq!(fetcher.fetch_count(), 3);
        match err {
            PanelError::Extraction(reason) => assert!(reason.contains("503")),
            other => panic!("expected Extraction, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_metadata_hit_short_circuits_text_heuristics() {
        let fetcher = Arc::new(ScriptedFetcher::new([page(200, PERSON_JSON_LD)]));
        let heuristics = Arc::new(CountingHeuristics::new());
        let extractor = ProfileExtractor::new()
            .with_fetcher(fetcher)
            .with_heuristics(heuristics.clone())
            .with_retry(3, Duration::ZERO);

        let profile = extractor.extract("https://example.com/ada").await.unwrap();

        assert_eq!(profile.name.as_deref(), Some("Dr. Ada Wong"));
        assert_eq!(heuristics.call_count(), 0);
    }

    #[tokio::test]
    async fn test_heuristics_invoked_when_metadata_absent() {
        let paragraph = "Dr. Chen studies machine learning and reliable deployment. ".repeat(4);
        let body = format!(
            "<html><head><title>Dr. Chen - Home</title></head><body><h1>Dr. Chen</h1><p>{}</p></body></html>",
            paragraph
        );
        let fetcher = Arc::new(ScriptedFetcher::new([page(200, &body)]));
        let heuristics = Arc::new(CountingHeuristics::new());
        let extractor = ProfileExtractor::new()
            .with_fetcher(fetcher)
            .with_heuristics(heuristics.clone())
            .with_retry(3, Duration::ZERO);

        let profile = extractor.extract("https://example.com/chen").await.unwrap();

        assert_eq!(heuristics.call_count(), 1);
        assert_eq!(profile.name.as_deref(), Some("Dr. Chen"));
    }

    #[tokio::test]
    async fn test_cache_serves_equivalent_urls_without_refetch() {
        let fetcher = Arc::new(ScriptedFetcher::new([page(200, PERSON_JSON_LD)]));
        let extractor = extractor_with(fetcher.clone());

        let first = extractor
            .extract("https://example.com/team/ada")
            .await
            .unwrap();
        // 尾斜杠变体规范化到同一个缓存键
        let second = extractor
            .extract("https://example.com/team/ada/")
            .await
            .unwrap();

        assert_eq!(fetcher.fetch_count(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_any_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new([]));
        let extractor = extractor_with(fetcher.clone());

        let err = extractor.extract("not a url").await.unwrap_err();

        assert!(matches!(err, PanelError::Validation(_)));
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_or_empty_degrades_on_fetch_failure() {
        let fetcher = Arc::new(ScriptedFetcher::new([page(404, "gone")]));
        let extractor = extractor_with(fetcher.clone());

        let profile = extractor
            .extract_or_empty("https://example.com/gone")
            .await
            .unwrap();

        assert_eq!(profile.name, None);
        assert!(profile.expertise_areas.is_empty());
        assert_eq!(profile.source_url, "https://example.com/gone");
    }
}
