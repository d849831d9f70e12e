//! Lazy iteration over resumption-token pagination.
//!
//! A list request may be answered in several pages. Each page but the last
//! carries a resumption token, and the next page is requested with that
//! token as the only argument. [`Paginator`] hides this behind one
//! iterator: a page is fetched only when the items of the previous one
//! have been consumed.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::error::{ErrorCode, OaiError, Result};
use crate::types::Page;
use crate::validation::{Arguments, Verb};

enum State {
    /// Nothing fetched yet.
    Start(Arguments),
    /// The previous page returned this token.
    HasMore(String),
    /// The list is complete, or iteration failed.
    Exhausted,
}

/// Forward-only iterator over every item of a paginated list.
///
/// `fetch` performs one request for the given arguments and returns the
/// parsed page. Nothing is fetched until the first call to `next`.
/// A failed fetch is yielded once as `Err` and ends the iteration; there
/// are no retries at this level.
///
/// `noRecordsMatch` on the first page is an empty list, not an error.
pub struct Paginator<T, F> {
    verb: Verb,
    fetch: F,
    state: State,
    buffer: VecDeque<T>,
    pages_fetched: usize,
}

impl<T, F> Paginator<T, F>
where
    F: FnMut(&Arguments) -> Result<Page<T>>,
{
    /// Create a paginator that starts with `initial` arguments.
    pub fn new(verb: Verb, initial: Arguments, fetch: F) -> Self {
        debug_assert!(verb.is_paginated(), "{verb} has no resumption tokens");
        Self {
            verb,
            fetch,
            state: State::Start(initial),
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Number of requests issued so far.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page into the buffer.
    ///
    /// Returns `Ok(false)` once the list is exhausted.
    fn fill(&mut self) -> Result<bool> {
        let (args, sent_token) = match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Exhausted => return Ok(false),
            State::Start(args) => (args, None),
            State::HasMore(token) => (Arguments::new().resumption_token(token.clone()), Some(token)),
        };

        let page = match (self.fetch)(&args) {
            Ok(page) => page,
            Err(err)
                if sent_token.is_none()
                    && err.protocol_code() == Some(&ErrorCode::NoRecordsMatch) =>
            {
                tracing::debug!(verb = %self.verb, "No records match, list is empty");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        self.pages_fetched += 1;

        if let Some(resumption) = page.resumption {
            if sent_token.as_deref() == Some(resumption.token.as_str()) && page.items.is_empty() {
                return Err(OaiError::MalformedResponse {
                    verb: self.verb,
                    detail: format!(
                        "empty page returned the resumption token '{}' again",
                        resumption.token
                    ),
                });
            }
            tracing::debug!(
                verb = %self.verb,
                page = self.pages_fetched,
                cursor = ?resumption.cursor,
                complete_list_size = ?resumption.complete_list_size,
                "More pages available"
            );
            self.state = State::HasMore(resumption.token);
        } else {
            tracing::debug!(verb = %self.verb, pages = self.pages_fetched, "List complete");
        }

        self.buffer.extend(page.items);
        Ok(true)
    }
}

impl<T, F> Iterator for Paginator<T, F>
where
    F: FnMut(&Arguments) -> Result<Page<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            match self.fill() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl<T, F> FusedIterator for Paginator<T, F> where F: FnMut(&Arguments) -> Result<Page<T>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::types::ResumptionToken;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn token(value: &str) -> Option<ResumptionToken> {
        Some(ResumptionToken {
            token: value.to_string(),
            complete_list_size: None,
            cursor: None,
            expiration_date: None,
        })
    }

    /// Serves pages keyed by the resumption token and records every request.
    fn server(
        pages: Vec<(Option<&'static str>, Page<u32>)>,
    ) -> (
        impl FnMut(&Arguments) -> Result<Page<u32>>,
        Rc<RefCell<Vec<Arguments>>>,
    ) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&requests);
        let fetch = move |args: &Arguments| {
            log.borrow_mut().push(args.clone());
            let key = args.get_text("resumptionToken");
            pages
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, page)| page.clone())
                .ok_or_else(|| {
                    OaiError::from(ProtocolError {
                        code: ErrorCode::BadResumptionToken,
                        message: format!("unknown token {key:?}"),
                    })
                })
        };
        (fetch, requests)
    }

    fn three_pages() -> Vec<(Option<&'static str>, Page<u32>)> {
        vec![
            (None, Page { items: vec![1, 2, 3], resumption: token("a") }),
            (Some("a"), Page { items: vec![4, 5, 6], resumption: token("b") }),
            (Some("b"), Page::last(vec![7])),
        ]
    }

    #[test]
    fn test_yields_all_items_in_order() {
        let (fetch, requests) = server(three_pages());
        let initial = Arguments::new().metadata_prefix("oai_dc");
        let items: Vec<u32> = Paginator::new(Verb::ListIdentifiers, initial, fetch)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6, 7]);
        let requests = requests.borrow();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].get_text("metadataPrefix"), Some("oai_dc"));
        assert_eq!(requests[1], Arguments::new().resumption_token("a"));
        assert_eq!(requests[2], Arguments::new().resumption_token("b"));
    }

    #[test]
    fn test_is_lazy() {
        let (fetch, requests) = server(three_pages());
        let mut paginator = Paginator::new(Verb::ListRecords, Arguments::new(), fetch);
        assert_eq!(requests.borrow().len(), 0);

        assert_eq!(paginator.next().unwrap().unwrap(), 1);
        assert_eq!(paginator.pages_fetched(), 1);

        paginator.next();
        paginator.next();
        assert_eq!(requests.borrow().len(), 1);

        assert_eq!(paginator.next().unwrap().unwrap(), 4);
        assert_eq!(requests.borrow().len(), 2);
    }

    #[test]
    fn test_dropping_early_issues_no_more_requests() {
        let (fetch, requests) = server(three_pages());
        let first: Vec<u32> = Paginator::new(Verb::ListRecords, Arguments::new(), fetch)
            .take(2)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn test_skips_empty_pages_with_token() {
        let (fetch, _) = server(vec![
            (None, Page { items: vec![], resumption: token("a") }),
            (Some("a"), Page::last(vec![9])),
        ]);
        let items: Vec<u32> = Paginator::new(Verb::ListSets, Arguments::new(), fetch)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, vec![9]);
    }

    #[test]
    fn test_error_mid_sequence_ends_iteration() {
        let (fetch, requests) = server(vec![
            (None, Page { items: vec![1], resumption: token("expired") }),
        ]);
        let mut paginator = Paginator::new(Verb::ListRecords, Arguments::new(), fetch);

        assert_eq!(paginator.next().unwrap().unwrap(), 1);
        let err = paginator.next().unwrap().unwrap_err();
        assert_eq!(err.protocol_code(), Some(&ErrorCode::BadResumptionToken));
        assert!(paginator.next().is_none());
        assert_eq!(requests.borrow().len(), 2);
    }

    #[test]
    fn test_no_records_match_on_first_page_is_empty() {
        let fetch = |_: &Arguments| -> Result<Page<u32>> {
            Err(ProtocolError {
                code: ErrorCode::NoRecordsMatch,
                message: "nothing".to_string(),
            }
            .into())
        };
        let mut paginator = Paginator::new(Verb::ListRecords, Arguments::new(), fetch);
        assert!(paginator.next().is_none());
    }

    #[test]
    fn test_repeated_token_on_empty_page_is_malformed() {
        let (fetch, _) = server(vec![
            (None, Page { items: vec![1], resumption: token("loop") }),
            (Some("loop"), Page { items: vec![], resumption: token("loop") }),
        ]);
        let results: Vec<Result<u32>> =
            Paginator::new(Verb::ListIdentifiers, Arguments::new(), fetch).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[1],
            Err(OaiError::MalformedResponse { .. })
        ));
    }
}
