use crate::cache::{lock, PagedCache, SharedCache};
use crate::pager::ReviewPager;
use crate::source::{ResultReviewSource, ReviewSource};
use insight_core::{category_key, AnalysisResult, FeedbackCategory, FeedbackItem, FeedbackKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One feedback kind of a result: its merged categories and the cache its pagers share.
pub struct FeedbackSection {
    kind: FeedbackKind,
    categories: Vec<FeedbackCategory>,
    cache: SharedCache<FeedbackItem>,
    source: Arc<dyn ReviewSource>,
    page_size: usize,
}

impl FeedbackSection {
    pub fn new(
        kind: FeedbackKind,
        categories: Vec<FeedbackCategory>,
        source: Arc<dyn ReviewSource>,
        page_size: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            kind,
            categories,
            cache: PagedCache::shared(ttl),
            source,
            page_size,
        }
    }

    pub fn kind(&self) -> FeedbackKind {
        self.kind
    }

    pub fn categories(&self) -> &[FeedbackCategory] {
        &self.categories
    }

    /// Reported review count for one category, or for the whole section.
    pub fn total_count(&self, category: Option<&str>) -> usize {
        match category.map(category_key).filter(|key| !key.is_empty()) {
            Some(key) => self
                .categories
                .iter()
                .filter(|c| category_key(&c.subcategory) == key)
                .map(|c| c.count)
                .sum(),
            None => self.categories.iter().map(|c| c.count).sum(),
        }
    }

    pub fn cache(&self) -> &SharedCache<FeedbackItem> {
        &self.cache
    }

    /// Builds a pager for `category`, capped at the count reported for it.
    /// Switching to a different filter empties the shared cache first.
    pub fn pager(&self, category: Option<&str>) -> ReviewPager {
        if lock(&self.cache).retarget(self.kind, category) {
            debug!("Cleared {} page cache for new filter {:?}", self.kind, category);
        }
        ReviewPager::new(
            self.kind,
            category,
            self.page_size,
            Arc::clone(&self.source),
            Arc::clone(&self.cache),
        )
        .with_reported_total(self.total_count(category))
    }
}

/// Sections for every feedback kind of a finished analysis.
pub struct ResultsDashboard {
    result: Arc<AnalysisResult>,
    sections: Vec<FeedbackSection>,
}

impl ResultsDashboard {
    pub fn from_result(result: Arc<AnalysisResult>, page_size: usize, ttl: Duration) -> Self {
        let source: Arc<dyn ReviewSource> = Arc::new(ResultReviewSource::new(Arc::clone(&result)));
        let sections = FeedbackKind::ALL
            .iter()
            .map(|&kind| {
                FeedbackSection::new(
                    kind,
                    result.merged_categories(kind),
                    Arc::clone(&source),
                    page_size,
                    ttl,
                )
            })
            .collect();

        Self { result, sections }
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn section(&self, kind: FeedbackKind) -> &FeedbackSection {
        let index = match kind {
            FeedbackKind::Complaint => 0,
            FeedbackKind::Praise => 1,
            FeedbackKind::Feature => 2,
        };
        &self.sections[index]
    }

    pub fn sections(&self) -> &[FeedbackSection] {
        &self.sections
    }
}
