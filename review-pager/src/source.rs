use async_trait::async_trait;
use insight_core::{
    category_key, AnalysisResult, CoreError, FeedbackItem, FeedbackKind, SortOrder,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// One page request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub kind: FeedbackKind,
    pub category: Option<String>,
    pub page: u32,
    pub page_size: usize,
    pub sort: SortOrder,
}

impl PageQuery {
    fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub items: Vec<FeedbackItem>,
    pub has_more: bool,
    /// Total matching items, when the source knows it.
    pub total: Option<usize>,
}

#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<ReviewPage, CoreError>;
}

/// Serves pages out of a received analysis result.
#[derive(Debug, Clone)]
pub struct ResultReviewSource {
    result: Arc<AnalysisResult>,
}

impl ResultReviewSource {
    pub fn new(result: Arc<AnalysisResult>) -> Self {
        Self { result }
    }

    fn matching_items(&self, kind: FeedbackKind, category: Option<&str>) -> Vec<FeedbackItem> {
        let wanted = category.map(category_key).filter(|key| !key.is_empty());

        self.result
            .merged_categories(kind)
            .into_iter()
            .filter(|c| match &wanted {
                Some(key) => category_key(&c.subcategory) == *key,
                None => true,
            })
            .flat_map(|c| c.items)
            .collect()
    }
}

pub fn sort_items(items: &mut [FeedbackItem], order: SortOrder) {
    match order {
        SortOrder::DateDesc => {}
        SortOrder::DateAsc => items.reverse(),
        SortOrder::RatingDesc => items.sort_by(|a, b| by_confidence(a, b, true)),
        SortOrder::RatingAsc => items.sort_by(|a, b| by_confidence(a, b, false)),
    }
}

// Items without a confidence go last in either direction.
fn by_confidence(a: &FeedbackItem, b: &FeedbackItem, descending: bool) -> Ordering {
    match (a.confidence, b.confidence) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl ReviewSource for ResultReviewSource {
    async fn fetch_page(&self, query: &PageQuery) -> Result<ReviewPage, CoreError> {
        if query.page_size == 0 {
            return Err(CoreError::InvalidInput {
                message: "page size must be greater than zero".to_string(),
            });
        }

        let mut items = self.matching_items(query.kind, query.category.as_deref());
        sort_items(&mut items, query.sort);

        let total = items.len();
        let start = query.offset().min(total);
        let end = start.saturating_add(query.page_size).min(total);
        debug!(
            "Serving {} items {}..{} of {} ({})",
            query.kind, start, end, total, query.sort
        );

        Ok(ReviewPage {
            items: items[start..end].to_vec(),
            has_more: end < total,
            total: Some(total),
        })
    }
}
