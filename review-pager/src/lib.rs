pub mod cache;
pub mod dashboard;
pub mod pager;
pub mod source;

#[cfg(test)]
mod tests;

pub use cache::{CacheEntry, CacheKey, PagedCache, SharedCache, DEFAULT_TTL};
pub use dashboard::{FeedbackSection, ResultsDashboard};
pub use pager::{PageLoad, PagerView, ReviewPager};
pub use source::{sort_items, PageQuery, ResultReviewSource, ReviewPage, ReviewSource};
