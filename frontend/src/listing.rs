//! Paginated, filterable listing state for products and orders.
//!
//! [`ListingController`] is a plain state machine: operations that need data
//! hand back a [`FetchTicket`] and the result is fed back through
//! [`ListingController::complete`]. [`ListingService`] drives that cycle
//! against a [`PageSource`] without holding the controller lock while the
//! request is in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::{debug, error, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::FetchError;
use crate::models::{Order, Page, Product};
use crate::pagination::PageNav;
use crate::query::{ListingFilter, PAGE_KEY, ProductFilter, QueryParams, SIZE_KEY};

#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch(&self, params: &QueryParams) -> Result<Page<T>, FetchError>;
}

/// How the displayed page number follows a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumberPolicy {
    /// Take `number + 1` from the response.
    FromResponse,
    /// Leave the page number as it was before the request.
    Keep,
}

/// A request issued by the controller. Only the most recently issued ticket
/// may change state when it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    params: QueryParams,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    /// A newer request was issued before this one finished.
    Stale,
}

pub struct ListingController<T, F> {
    label: &'static str,
    policy: PageNumberPolicy,
    filter: F,
    query: QueryParams,
    page: u32,
    size: u32,
    is_loading: bool,
    is_empty: bool,
    snapshot: Option<Page<T>>,
    last_issued: u64,
}

pub type ProductListing = ListingController<Product, ProductFilter>;
pub type OrderListing = ListingController<Order, ()>;

impl ProductListing {
    pub fn products(size: u32) -> Self {
        Self::new("products", PageNumberPolicy::FromResponse, size)
    }
}

impl OrderListing {
    pub fn orders(size: u32) -> Self {
        Self::new("orders", PageNumberPolicy::Keep, size)
    }
}

impl<T, F: ListingFilter> ListingController<T, F> {
    pub fn new(label: &'static str, policy: PageNumberPolicy, size: u32) -> Self {
        Self {
            label,
            policy,
            filter: F::default(),
            query: QueryParams::new(),
            page: 0,
            size,
            is_loading: false,
            is_empty: true,
            snapshot: None,
            last_issued: 0,
        }
    }

    /// First load. The request carries no parameters and the stored query
    /// stays empty.
    pub fn initialize(&mut self) -> FetchTicket {
        self.issue(QueryParams::new())
    }

    /// Rebuilds the query from the current filter and restarts at page 0.
    pub fn search(&mut self) -> FetchTicket {
        let mut query = QueryParams::new();
        self.filter.apply(&mut query);
        query.set(PAGE_KEY, 0);
        query.set(SIZE_KEY, self.size);
        self.query = query;
        self.page = 0;
        self.issue(self.query.clone())
    }

    /// Moves to a 1-based page from the view, keeping every other key.
    pub fn page_changed(&mut self, one_based: u32) -> FetchTicket {
        if one_based == 0 {
            warn!("{}: page 0 requested, using the first page", self.label);
        }
        self.page = one_based.saturating_sub(1);
        self.query.set(PAGE_KEY, self.page);
        self.issue(self.query.clone())
    }

    /// Records a new page size and rewinds to page 0. Nothing is fetched
    /// until the next `search` or `page_changed`. The backend rejects a
    /// size of 0, so it is raised to 1.
    pub fn size_changed(&mut self, size: u32) {
        if size == 0 {
            warn!("{}: page size 0 requested, using 1", self.label);
        }
        let size = size.max(1);
        self.size = size;
        self.query.set(SIZE_KEY, size);
        self.page = 0;
    }

    pub fn set_filter(&mut self, filter: F) {
        self.filter = filter;
    }

    pub fn complete(&mut self, ticket: FetchTicket, result: Result<Page<T>, FetchError>) -> FetchOutcome {
        if ticket.seq != self.last_issued {
            debug!(
                "{}: dropping response to request #{}, #{} is newer",
                self.label, ticket.seq, self.last_issued
            );
            return FetchOutcome::Stale;
        }

        self.is_loading = false;
        match result {
            Ok(page) => {
                self.is_empty = page.content.is_empty();
                if self.policy == PageNumberPolicy::FromResponse {
                    self.page = page.number + 1;
                }
                self.snapshot = Some(page);
                FetchOutcome::Applied
            }
            Err(err) => {
                error!("Error fetching {}: {err}", self.label);
                FetchOutcome::Failed
            }
        }
    }

    fn issue(&mut self, params: QueryParams) -> FetchTicket {
        self.last_issued += 1;
        self.is_loading = true;
        debug!(
            "{} fetch #{} with ?{}",
            self.label,
            self.last_issued,
            params.to_query_string()
        );
        FetchTicket {
            seq: self.last_issued,
            params,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn snapshot(&self) -> Option<&Page<T>> {
        self.snapshot.as_ref()
    }
}

/// Template-facing copy of a listing. `page` is the displayed page number
/// as kept by the listing's [`PageNumberPolicy`] and the pager highlights
/// the same value.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView<T, F> {
    pub page: u32,
    pub size: u32,
    pub is_loading: bool,
    pub is_empty: bool,
    pub filter: F,
    pub items: Vec<T>,
    pub total_elements: u64,
    pub nav: PageNav,
}

impl<T: Clone, F: ListingFilter> ListingController<T, F> {
    pub fn view(&self) -> ListingView<T, F> {
        let (items, total_elements, nav) = match &self.snapshot {
            Some(page) => (
                page.content.clone(),
                page.total_elements,
                PageNav::new(page.total_pages, self.page),
            ),
            None => (Vec::new(), 0, PageNav::new(0, self.page)),
        };
        ListingView {
            page: self.page,
            size: self.size,
            is_loading: self.is_loading,
            is_empty: self.is_empty,
            filter: self.filter.clone(),
            items,
            total_elements,
            nav,
        }
    }
}

/// Async driver pairing a controller with the source it reads from.
pub struct ListingService<T, F> {
    controller: Mutex<ListingController<T, F>>,
    source: Arc<dyn PageSource<T>>,
    started: AtomicBool,
}

impl<T, F> ListingService<T, F>
where
    T: Clone + Send + 'static,
    F: ListingFilter,
{
    pub fn new(controller: ListingController<T, F>, source: Arc<dyn PageSource<T>>) -> Self {
        Self {
            controller: Mutex::new(controller),
            source,
            started: AtomicBool::new(false),
        }
    }

    pub async fn initialize(&self) -> FetchOutcome {
        self.started.store(true, Ordering::SeqCst);
        let ticket = self.controller.lock().await.initialize();
        self.dispatch(ticket).await
    }

    /// Runs `initialize` unless this listing has already fetched.
    pub async fn initialize_once(&self) -> Option<FetchOutcome> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let ticket = self.controller.lock().await.initialize();
        Some(self.dispatch(ticket).await)
    }

    pub async fn search(&self) -> FetchOutcome {
        self.started.store(true, Ordering::SeqCst);
        let ticket = self.controller.lock().await.search();
        self.dispatch(ticket).await
    }

    pub async fn page_changed(&self, one_based: u32) -> FetchOutcome {
        self.started.store(true, Ordering::SeqCst);
        let ticket = self.controller.lock().await.page_changed(one_based);
        self.dispatch(ticket).await
    }

    pub async fn size_changed(&self, size: u32) {
        self.controller.lock().await.size_changed(size);
    }

    pub async fn set_filter(&self, filter: F) {
        self.controller.lock().await.set_filter(filter);
    }

    pub async fn view(&self) -> ListingView<T, F> {
        self.controller.lock().await.view()
    }

    async fn dispatch(&self, ticket: FetchTicket) -> FetchOutcome {
        let result = self.source.fetch(ticket.params()).await;
        self.controller.lock().await.complete(ticket, result)
    }
}
