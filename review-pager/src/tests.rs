#[cfg(test)]
mod tests {
    use crate::{
        CacheKey, PageLoad, PageQuery, PagedCache, ResultReviewSource, ResultsDashboard,
        ReviewPage, ReviewPager, ReviewSource,
    };
    use async_trait::async_trait;
    use insight_core::{
        AnalysisResult, AppInfo, CoreError, FeedbackCategory, FeedbackItem, FeedbackKind,
        KpiData, SortOrder,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(300);

    fn item(n: usize) -> FeedbackItem {
        FeedbackItem {
            summary: format!("review {}", n),
            quote: format!("quote {}", n),
            confidence: Some((n % 10) as f64 / 10.0),
        }
    }

    fn result_with(complaints: usize) -> Arc<AnalysisResult> {
        Arc::new(AnalysisResult {
            app: AppInfo {
                name: "Notes".to_string(),
                icon: String::new(),
                rating: 4.1,
            },
            kpi: KpiData {
                total: 40,
                complaints: complaints as u32 + 2,
                praise: 3,
                features: 0,
            },
            complaints: vec![
                FeedbackCategory {
                    subcategory: "Pricing".to_string(),
                    items: (0..complaints).map(item).collect(),
                    count: complaints,
                },
                FeedbackCategory {
                    subcategory: "Crashes".to_string(),
                    items: vec![item(100), item(101)],
                    count: 2,
                },
                FeedbackCategory {
                    subcategory: " pricing ".to_string(),
                    items: vec![],
                    count: 4,
                },
            ],
            praise: vec![FeedbackCategory {
                subcategory: "Design".to_string(),
                items: vec![item(200), item(201), item(202)],
                count: 3,
            }],
            feature_requests: vec![],
        })
    }

    fn summaries(items: &[FeedbackItem]) -> Vec<String> {
        items.iter().map(|i| i.summary.clone()).collect()
    }

    /// Counts fetches and can be switched into a failing mode.
    struct CountingSource {
        inner: ResultReviewSource,
        fetches: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingSource {
        fn new(result: Arc<AnalysisResult>) -> Arc<Self> {
            Arc::new(Self {
                inner: ResultReviewSource::new(result),
                fetches: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReviewSource for CountingSource {
        async fn fetch_page(&self, query: &PageQuery) -> Result<ReviewPage, CoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(CoreError::Internal {
                    message: "review service unavailable".to_string(),
                });
            }
            self.inner.fetch_page(query).await
        }
    }

    /// Holds every fetch until released.
    struct GatedSource {
        inner: ResultReviewSource,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ReviewSource for GatedSource {
        async fn fetch_page(&self, query: &PageQuery) -> Result<ReviewPage, CoreError> {
            self.gate.notified().await;
            self.inner.fetch_page(query).await
        }
    }

    /// Claims more pages exist but never returns any items.
    struct EmptySource;

    #[async_trait]
    impl ReviewSource for EmptySource {
        async fn fetch_page(&self, _query: &PageQuery) -> Result<ReviewPage, CoreError> {
            Ok(ReviewPage {
                items: vec![],
                has_more: true,
                total: None,
            })
        }
    }

    fn pager_over(source: Arc<dyn ReviewSource>, category: Option<&str>) -> ReviewPager {
        ReviewPager::new(
            FeedbackKind::Complaint,
            category,
            5,
            source,
            PagedCache::shared(TTL),
        )
    }

    #[tokio::test]
    async fn test_pages_are_sequential_and_disjoint() {
        let source = CountingSource::new(result_with(12));
        let pager = pager_over(source.clone(), Some("Pricing"));

        assert_eq!(pager.load_initial().await.unwrap(), PageLoad::Fetched);
        let view = pager.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.items.len(), 5);
        assert!(view.has_more);

        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Fetched);
        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Fetched);

        let view = pager.view();
        assert_eq!(view.page, 3);
        assert_eq!(
            summaries(&view.items),
            summaries(&(0..12).map(item).collect::<Vec<_>>())
        );
        assert!(!view.has_more);
        assert!(!view.is_loading);

        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Exhausted);
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_load_more_before_initial_loads_first_page() {
        let pager = pager_over(Arc::new(ResultReviewSource::new(result_with(7))), None);

        pager.load_more().await.unwrap();
        let view = pager.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.items.len(), 5);

        pager.load_more().await.unwrap();
        let view = pager.view();
        assert_eq!(view.page, 2);
        assert_eq!(view.items.len(), 9);
        assert!(!view.has_more);
    }

    #[tokio::test]
    async fn test_sort_change_resets_to_first_page() {
        let pager = pager_over(Arc::new(ResultReviewSource::new(result_with(12))), Some("pricing"));
        pager.load_initial().await.unwrap();
        pager.load_more().await.unwrap();
        assert_eq!(pager.view().page, 2);

        pager.set_sort_order(SortOrder::DateAsc).await.unwrap();
        let view = pager.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.sort_order, SortOrder::DateAsc);
        assert_eq!(
            summaries(&view.items),
            summaries(&[item(11), item(10), item(9), item(8), item(7)])
        );
        assert!(view.has_more);
    }

    #[tokio::test]
    async fn test_shared_cache_serves_second_pager() {
        let source = CountingSource::new(result_with(12));
        let dashboard_cache = PagedCache::shared(TTL);
        let make = || {
            ReviewPager::new(
                FeedbackKind::Complaint,
                Some("Pricing"),
                5,
                source.clone(),
                Arc::clone(&dashboard_cache),
            )
        };

        let first = make();
        assert_eq!(first.load_initial().await.unwrap(), PageLoad::Fetched);

        let second = make();
        assert_eq!(second.load_initial().await.unwrap(), PageLoad::Cached);
        assert_eq!(second.view().items, first.view().items);
        assert_eq!(source.fetches(), 1);

        let key = CacheKey::new(FeedbackKind::Complaint, Some(" PRICING"), 1, SortOrder::DateDesc);
        assert!(dashboard_cache.lock().unwrap().lookup(&key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_page_is_refetched() {
        let source = CountingSource::new(result_with(12));
        let cache = PagedCache::shared(TTL);
        let make = || {
            ReviewPager::new(
                FeedbackKind::Complaint,
                Some("Pricing"),
                5,
                source.clone(),
                Arc::clone(&cache),
            )
        };

        make().load_initial().await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        assert_eq!(make().load_initial().await.unwrap(), PageLoad::Fetched);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_sort_change_uses_cache() {
        let source = CountingSource::new(result_with(12));
        let pager = pager_over(source.clone(), Some("Pricing"));

        pager.load_initial().await.unwrap();
        pager.set_sort_order(SortOrder::RatingDesc).await.unwrap();
        assert_eq!(
            pager.set_sort_order(SortOrder::DateDesc).await.unwrap(),
            PageLoad::Cached
        );
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_dropped() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(GatedSource {
            inner: ResultReviewSource::new(result_with(12)),
            gate: Arc::clone(&gate),
        });
        let pager = Arc::new(pager_over(source, Some("Pricing")));
        let mut view = pager.subscribe();

        let loading = Arc::clone(&pager);
        let first = tokio::spawn(async move { loading.load_initial().await });
        view.wait_for(|v| v.is_loading).await.unwrap();

        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Dropped);
        assert_eq!(
            pager.set_sort_order(SortOrder::RatingAsc).await.unwrap(),
            PageLoad::Dropped
        );

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), PageLoad::Fetched);

        let view = pager.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.items.len(), 5);
        assert_eq!(view.sort_order, SortOrder::DateDesc);
    }

    #[tokio::test]
    async fn test_failure_keeps_position() {
        let source = CountingSource::new(result_with(12));
        let pager = pager_over(source.clone(), Some("Pricing"));
        pager.load_initial().await.unwrap();

        source.failing.store(true, Ordering::SeqCst);
        assert!(pager.load_more().await.is_err());
        let view = pager.view();
        assert_eq!(view.page, 1);
        assert!(view.has_more);
        assert!(!view.is_loading);
        assert!(view.error.is_some());

        assert!(pager.set_sort_order(SortOrder::DateAsc).await.is_err());
        let view = pager.view();
        assert_eq!(view.sort_order, SortOrder::DateDesc);
        assert_eq!(view.items.len(), 5);

        source.failing.store(false, Ordering::SeqCst);
        pager.load_more().await.unwrap();
        let view = pager.view();
        assert_eq!(view.page, 2);
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    async fn test_empty_page_ends_pagination() {
        let pager = pager_over(Arc::new(EmptySource), None);
        pager.load_initial().await.unwrap();
        assert!(!pager.view().has_more);
        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Exhausted);
    }

    #[tokio::test]
    async fn test_reported_total_stops_pagination() {
        let source = CountingSource::new(result_with(12));
        let pager = pager_over(source.clone(), Some("Pricing")).with_reported_total(7);
        assert_eq!(pager.view().reported_total, Some(7));

        pager.load_initial().await.unwrap();
        assert!(pager.view().has_more);

        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Fetched);
        let view = pager.view();
        assert_eq!(view.items.len(), 10);
        assert!(!view.has_more);

        assert_eq!(pager.load_more().await.unwrap(), PageLoad::Exhausted);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_section_pager_reports_category_count() {
        let dashboard = ResultsDashboard::from_result(result_with(6), 5, TTL);
        let complaints = dashboard.section(FeedbackKind::Complaint);

        let pager = complaints.pager(Some("pricing"));
        assert_eq!(pager.view().reported_total, Some(10));
        pager.load_initial().await.unwrap();
        assert!(pager.view().has_more);

        pager.load_more().await.unwrap();
        let view = pager.view();
        assert_eq!(view.items.len(), 6);
        assert_eq!(view.reported_total, Some(10));
        assert!(!view.has_more);

        let all = complaints.pager(None);
        assert_eq!(all.view().reported_total, Some(12));
    }

    #[tokio::test]
    async fn test_dashboard_sections() {
        let dashboard = ResultsDashboard::from_result(result_with(6), 5, TTL);
        assert_eq!(dashboard.sections().len(), 3);

        let complaints = dashboard.section(FeedbackKind::Complaint);
        let labels: Vec<&str> = complaints
            .categories()
            .iter()
            .map(|c| c.subcategory.as_str())
            .collect();
        assert_eq!(labels, vec!["Pricing", "Crashes"]);
        assert_eq!(complaints.total_count(Some("pricing")), 10);
        assert_eq!(complaints.total_count(None), 12);

        let praise = dashboard.section(FeedbackKind::Praise);
        let pager = praise.pager(None);
        pager.load_initial().await.unwrap();
        assert_eq!(pager.view().items.len(), 3);
        assert!(!pager.view().has_more);
    }

    #[tokio::test]
    async fn test_new_filter_clears_section_cache() {
        let dashboard = ResultsDashboard::from_result(result_with(6), 5, TTL);
        let section = dashboard.section(FeedbackKind::Complaint);

        let pricing = section.pager(Some("Pricing"));
        pricing.load_initial().await.unwrap();
        assert_eq!(section.cache().lock().unwrap().len(), 1);

        let again = section.pager(Some("PRICING"));
        assert_eq!(again.load_initial().await.unwrap(), PageLoad::Cached);

        let crashes = section.pager(Some("Crashes"));
        assert!(section.cache().lock().unwrap().is_empty());
        assert_eq!(crashes.load_initial().await.unwrap(), PageLoad::Fetched);
    }
}
