use crate::cache::{lock, CacheEntry, CacheKey, SharedCache};
use crate::source::{PageQuery, ReviewSource};
use insight_core::{CoreError, ErrorExt, FeedbackItem, FeedbackKind, SortOrder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// What a pager publishes to its consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct PagerView {
    pub items: Vec<FeedbackItem>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub page: u32,
    pub has_more: bool,
    pub sort_order: SortOrder,
    /// Count the analysis reported for this category, when the pager was given one.
    pub reported_total: Option<usize>,
}

impl Default for PagerView {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error: None,
            page: 1,
            has_more: true,
            sort_order: SortOrder::default(),
            reported_total: None,
        }
    }
}

/// Outcome of a load request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    Fetched,
    Cached,
    /// Another load was in flight; nothing changed.
    Dropped,
    /// No further pages.
    Exhausted,
}

struct LoadedPage {
    items: Vec<FeedbackItem>,
    has_more: bool,
}

/// Paginator for one feedback category.
///
/// Every public operation takes `&self` and may be called concurrently; the
/// loading flag is claimed atomically on the watch channel, so at most one
/// request is in flight per pager.
pub struct ReviewPager {
    kind: FeedbackKind,
    category: Option<String>,
    page_size: usize,
    source: Arc<dyn ReviewSource>,
    cache: SharedCache<FeedbackItem>,
    state: watch::Sender<PagerView>,
    primed: AtomicBool,
    reported_total: Option<usize>,
}

impl ReviewPager {
    pub fn new(
        kind: FeedbackKind,
        category: Option<&str>,
        page_size: usize,
        source: Arc<dyn ReviewSource>,
        cache: SharedCache<FeedbackItem>,
    ) -> Self {
        let (state, _) = watch::channel(PagerView::default());
        Self {
            kind,
            category: category.map(str::to_string),
            page_size,
            source,
            cache,
            state,
            primed: AtomicBool::new(false),
            reported_total: None,
        }
    }

    /// Caps pagination at `total` items, the count reported alongside the
    /// category. Loading stops once that many items are held even if the
    /// source could serve more.
    pub fn with_reported_total(mut self, total: usize) -> Self {
        self.reported_total = Some(total);
        self.state.send_modify(|view| view.reported_total = Some(total));
        self
    }

    pub fn kind(&self) -> FeedbackKind {
        self.kind
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn view(&self) -> PagerView {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PagerView> {
        self.state.subscribe()
    }

    pub async fn load_initial(&self) -> Result<PageLoad, CoreError> {
        if !self.claim() {
            return Ok(PageLoad::Dropped);
        }
        let sort = self.state.borrow().sort_order;
        self.replace_with_first_page(sort).await
    }

    pub async fn load_more(&self) -> Result<PageLoad, CoreError> {
        if !self.primed.load(Ordering::Acquire) {
            return self.load_initial().await;
        }

        let mut exhausted = false;
        let claimed = self.state.send_if_modified(|view| {
            if view.is_loading {
                return false;
            }
            if !view.has_more {
                exhausted = true;
                return false;
            }
            view.is_loading = true;
            view.error = None;
            true
        });
        if exhausted {
            debug!("No more {} pages to load", self.kind);
            return Ok(PageLoad::Exhausted);
        }
        if !claimed {
            return Ok(PageLoad::Dropped);
        }

        let (next, sort, loaded) = {
            let view = self.state.borrow();
            (view.page + 1, view.sort_order, view.items.len())
        };

        match self.load_page(next, sort, loaded).await {
            Ok((page, outcome)) => {
                self.state.send_modify(|view| {
                    view.items.extend(page.items);
                    view.page = next;
                    view.has_more = page.has_more;
                    view.is_loading = false;
                });
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Switches ordering and reloads from page 1. On failure the previous order and
    /// items stay in place.
    pub async fn set_sort_order(&self, order: SortOrder) -> Result<PageLoad, CoreError> {
        if !self.claim() {
            return Ok(PageLoad::Dropped);
        }
        self.replace_with_first_page(order).await
    }

    fn claim(&self) -> bool {
        self.state.send_if_modified(|view| {
            if view.is_loading {
                false
            } else {
                view.is_loading = true;
                view.error = None;
                true
            }
        })
    }

    async fn replace_with_first_page(&self, sort: SortOrder) -> Result<PageLoad, CoreError> {
        match self.load_page(1, sort, 0).await {
            Ok((page, outcome)) => {
                self.primed.store(true, Ordering::Release);
                self.state.send_modify(|view| {
                    view.items = page.items;
                    view.page = 1;
                    view.has_more = page.has_more;
                    view.sort_order = sort;
                    view.is_loading = false;
                });
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Cache first, source on miss or stale entry.
    async fn load_page(
        &self,
        page: u32,
        sort: SortOrder,
        loaded: usize,
    ) -> Result<(LoadedPage, PageLoad), CoreError> {
        let key = CacheKey::new(self.kind, self.category.as_deref(), page, sort);

        let cached = lock(&self.cache).lookup(&key).map(|entry| LoadedPage {
            items: entry.items.clone(),
            has_more: entry.has_more,
        });
        if let Some(hit) = cached {
            return Ok((hit, PageLoad::Cached));
        }

        let query = PageQuery {
            kind: self.kind,
            category: self.category.clone(),
            page,
            page_size: self.page_size,
            sort,
        };
        let fetched = self.source.fetch_page(&query).await?;

        let accumulated = loaded + fetched.items.len();
        let has_more = fetched.has_more
            && !fetched.items.is_empty()
            && [fetched.total, self.reported_total]
                .into_iter()
                .flatten()
                .all(|total| accumulated < total);

        lock(&self.cache).put(key, CacheEntry::new(fetched.items.clone(), has_more));

        Ok((
            LoadedPage {
                items: fetched.items,
                has_more,
            },
            PageLoad::Fetched,
        ))
    }

    fn fail(&self, error: CoreError) -> CoreError {
        warn!("Failed to load {} reviews: {}", self.kind, error);
        let message = error.user_friendly_message();
        self.state.send_modify(|view| {
            view.is_loading = false;
            view.error = Some(message);
        });
        error
    }
}

impl std::fmt::Debug for ReviewPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewPager")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("page_size", &self.page_size)
            .field("reported_total", &self.reported_total)
            .field("view", &*self.state.borrow())
            .finish()
    }
}
