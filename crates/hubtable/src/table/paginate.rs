//! The pagination driver shared by every list operation.
//!
//! A list call is a two-state machine. While `Fetching`, one page is
//! requested with the current token; its items are emitted one by one and
//! the row budget is checked after each and again once the page is done.
//! The machine moves to `Done` when the server reports no further pages or
//! repeats the token it was just given, when the budget reaches zero, or
//! when a request fails. Requests are strictly sequential because each
//! page's token comes from the previous response.

use std::future::Future;

use super::error::TableError;
use super::sink::ItemSink;

/// Continuation token for the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// GraphQL edge cursor; `None` requests the first page.
    Cursor(Option<String>),
    /// REST page number, starting at 1.
    Number(u32),
}

impl PageToken {
    pub const fn first_cursor() -> Self {
        PageToken::Cursor(None)
    }

    pub const fn first_page() -> Self {
        PageToken::Number(1)
    }

    /// The cursor to bind as GraphQL `after`, if any.
    pub fn cursor(&self) -> Option<&str> {
        match self {
            PageToken::Cursor(cursor) => cursor.as_deref(),
            PageToken::Number(_) => None,
        }
    }

    /// The REST page number (1 for cursor tokens).
    pub fn page_number(&self) -> u32 {
        match self {
            PageToken::Number(page) => *page,
            PageToken::Cursor(_) => 1,
        }
    }
}

/// One fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the following page; `None` once the server has no more.
    pub next: Option<PageToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<PageToken>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationSummary {
    /// Requests issued.
    pub pages: u32,
    /// Items emitted.
    pub items: u64,
}

enum State {
    Fetching(PageToken),
    Done,
}

/// Page size for a list call: the default, clamped to the row budget when
/// one is known. Computed once so REST page numbers stay aligned.
pub fn page_size(default_page_size: u32, remaining: Option<u64>) -> u32 {
    match remaining {
        Some(remaining) if remaining < u64::from(default_page_size) => remaining as u32,
        _ => default_page_size,
    }
}

/// Drive `fetch` until the server or the row budget says stop.
///
/// `fetch` receives the page size and the token of the page to load. Items
/// already emitted when a later page fails stay emitted; the error is the
/// call's result.
pub async fn paginate<T, F, Fut>(
    sink: &mut (dyn ItemSink<T> + '_),
    default_page_size: u32,
    start: PageToken,
    mut fetch: F,
) -> Result<PaginationSummary, TableError>
where
    T: Send,
    F: FnMut(u32, PageToken) -> Fut,
    Fut: Future<Output = Result<Page<T>, TableError>>,
{
    let mut summary = PaginationSummary::default();

    let per_page = page_size(default_page_size, sink.rows_remaining());
    let mut state = if per_page == 0 {
        State::Done
    } else {
        State::Fetching(start)
    };

    while let State::Fetching(token) = state {
        let page = fetch(per_page, token.clone()).await?;
        summary.pages += 1;
        tracing::debug!(
            page = summary.pages,
            items = page.items.len(),
            has_more = page.next.is_some(),
            "fetched page"
        );

        state = match page.next {
            Some(next) if next == token => {
                tracing::warn!(?token, "server returned the same page token, ending pagination");
                State::Done
            }
            Some(next) => State::Fetching(next),
            None => State::Done,
        };

        for item in page.items {
            sink.emit(item).await?;
            summary.items += 1;

            if sink.rows_remaining() == Some(0) {
                break;
            }
        }

        // Also covers empty pages, where no item was emitted to notice a
        // cancel or a closed consumer.
        if sink.rows_remaining() == Some(0) {
            state = State::Done;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::github::GitHubError;
    use crate::table::sink::CollectSink;

    /// A fake REST listing of `total` numbered items.
    fn numbered_pages(
        total: u32,
        calls: Arc<Mutex<Vec<(u32, PageToken)>>>,
        fail_on_page: Option<u32>,
    ) -> impl FnMut(u32, PageToken) -> std::future::Ready<Result<Page<u32>, TableError>> {
        move |per_page, token| {
            calls.lock().unwrap().push((per_page, token.clone()));
            let page = token.page_number();
            if fail_on_page == Some(page) {
                return std::future::ready(Err(GitHubError::Decode("boom".into()).into()));
            }
            let start = (page - 1) * per_page;
            let end = (start + per_page).min(total);
            let items: Vec<u32> = (start..end).collect();
            let next = (end < total).then(|| PageToken::Number(page + 1));
            std::future::ready(Ok(Page::new(items, next)))
        }
    }

    #[tokio::test]
    async fn test_limit_stops_mid_second_page() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut sink = CollectSink::new(Some(120));

        let summary = paginate(
            &mut sink,
            100,
            PageToken::first_page(),
            numbered_pages(250, Arc::clone(&calls), None),
        )
        .await
        .unwrap();

        assert_eq!(sink.items.len(), 120);
        assert_eq!(sink.items, (0..120).collect::<Vec<_>>());
        assert_eq!(summary, PaginationSummary { pages: 2, items: 120 });
        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![(100, PageToken::Number(1)), (100, PageToken::Number(2))]
        );
    }

    #[tokio::test]
    async fn test_unbounded_scan_reads_every_page() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut sink = CollectSink::new(None);

        let summary = paginate(
            &mut sink,
            100,
            PageToken::first_page(),
            numbered_pages(250, Arc::clone(&calls), None),
        )
        .await
        .unwrap();

        assert_eq!(sink.items.len(), 250);
        assert_eq!(summary.pages, 3);
    }

    #[tokio::test]
    async fn test_emits_min_of_limit_and_total() {
        for (total, limit) in [(0, 5), (3, 5), (5, 5), (250, 1), (250, 250), (250, 1000)] {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let mut sink = CollectSink::new(Some(limit));
            paginate(
                &mut sink,
                100,
                PageToken::first_page(),
                numbered_pages(total, Arc::clone(&calls), None),
            )
            .await
            .unwrap();
            assert_eq!(sink.items.len() as u64, u64::from(total).min(limit));
        }
    }

    #[tokio::test]
    async fn test_small_limit_clamps_page_size() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut sink = CollectSink::new(Some(5));

        paginate(
            &mut sink,
            100,
            PageToken::first_page(),
            numbered_pages(250, Arc::clone(&calls), None),
        )
        .await
        .unwrap();

        assert_eq!(sink.items.len(), 5);
        assert_eq!(*calls.lock().unwrap(), vec![(5, PageToken::Number(1))]);
    }

    #[tokio::test]
    async fn test_zero_limit_issues_no_request() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut sink = CollectSink::new(Some(0));

        let summary = paginate(
            &mut sink,
            100,
            PageToken::first_page(),
            numbered_pages(250, Arc::clone(&calls), None),
        )
        .await
        .unwrap();

        assert_eq!(summary.pages, 0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_on_second_page_keeps_first_page_items() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut sink = CollectSink::new(None);

        let err = paginate(
            &mut sink,
            100,
            PageToken::first_page(),
            numbered_pages(250, Arc::clone(&calls), Some(2)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TableError::GitHub(GitHubError::Decode(_))));
        assert_eq!(sink.items.len(), 100);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cursor_tokens_advance() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_capture = Arc::clone(&seen);
        let mut sink = CollectSink::new(None);

        paginate(&mut sink, 2, PageToken::first_cursor(), move |_, token| {
            seen_capture
                .lock()
                .unwrap()
                .push(token.cursor().map(String::from));
            let page = match token.cursor() {
                None => Page::new(vec!["a", "b"], Some(PageToken::Cursor(Some("c1".into())))),
                Some("c1") => Page::last(vec!["c"]),
                Some(other) => panic!("unexpected cursor {other}"),
            };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(sink.items, vec!["a", "b", "c"]);
        assert_eq!(*seen.lock().unwrap(), vec![None, Some("c1".to_string())]);
    }

    #[tokio::test]
    async fn test_empty_page_stops_once_cancelled() {
        /// Unbounded until the first page has been fetched, then cancelled.
        struct CancelAfterFirstPage {
            pages_seen: Arc<Mutex<u32>>,
        }

        #[async_trait::async_trait]
        impl ItemSink<u32> for CancelAfterFirstPage {
            async fn emit(&mut self, _item: u32) -> Result<(), TableError> {
                Ok(())
            }

            fn rows_remaining(&self) -> Option<u64> {
                (*self.pages_seen.lock().unwrap() > 0).then_some(0)
            }
        }

        let pages_seen = Arc::new(Mutex::new(0));
        let mut sink = CancelAfterFirstPage {
            pages_seen: Arc::clone(&pages_seen),
        };
        let counter = Arc::clone(&pages_seen);
        let summary = paginate(&mut sink, 100, PageToken::first_page(), move |_, token| {
            *counter.lock().unwrap() += 1;
            let next = PageToken::Number(token.page_number() + 1);
            async move { Ok(Page::new(Vec::<u32>::new(), Some(next))) }
        })
        .await
        .unwrap();

        assert_eq!(summary, PaginationSummary { pages: 1, items: 0 });
        assert_eq!(*pages_seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeated_token_ends_pagination() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut sink = CollectSink::new(None);

        let summary = paginate(&mut sink, 2, PageToken::first_cursor(), move |_, token| {
            *counter.lock().unwrap() += 1;
            let page = if token == PageToken::first_cursor() {
                Page::new(vec!["a"], Some(PageToken::Cursor(Some("c1".into()))))
            } else {
                Page::new(Vec::new(), Some(token))
            };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(sink.items, vec!["a"]);
        assert_eq!(summary.pages, 2);
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_page_size() {
        assert_eq!(page_size(100, None), 100);
        assert_eq!(page_size(100, Some(120)), 100);
        assert_eq!(page_size(100, Some(100)), 100);
        assert_eq!(page_size(100, Some(7)), 7);
        assert_eq!(page_size(100, Some(0)), 0);
    }
}
