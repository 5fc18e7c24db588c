// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the requester module.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::requester::{
    fetch_pages, rejection_from_response, BoxFuture, HttpRequester, Page, Params, Requester,
};
use crate::error::{Error, RejectionKind, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use yare::parameterized;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A request the mock has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub params: Params,
}

impl Request {
    /// Value of the first parameter named `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

enum Reply {
    Page(Page),
    Record(Value),
    Fail(Error),
}

#[derive(Default)]
struct MockState {
    replies: HashMap<(Method, String), VecDeque<Reply>>,
    requests: Vec<Request>,
    token: String,
}

/// Mock requester with scripted replies per (method, path).
///
/// Clones share state. A request with nothing scripted fails with a
/// connectivity error.
#[derive(Clone, Default)]
pub struct MockRequester {
    state: Arc<Mutex<MockState>>,
}

impl MockRequester {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: Method, path: &str, reply: Reply) {
        self.state
            .lock()
            .replies
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Queue a listing page for `path`.
    pub fn page(&self, path: &str, items: Vec<Value>, next_token: Option<&str>) {
        self.script(Method::Get, path, Reply::Page(Page::new(items, next_token)));
    }

    /// Queue a single record for a GET of `path`.
    pub fn record(&self, path: &str, record: Value) {
        self.script(Method::Get, path, Reply::Record(record));
    }

    /// Queue the response to a POST to `path`.
    pub fn post_reply(&self, path: &str, record: Value) {
        self.script(Method::Post, path, Reply::Record(record));
    }

    /// Queue a failure for the next request of `method` to `path`.
    pub fn fail(&self, method: Method, path: &str, error: Error) {
        self.script(method, path, Reply::Fail(error));
    }

    /// All requests made so far.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Requests of `method` made so far.
    pub fn requests_of(&self, method: Method) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// The token last set through the trait.
    pub fn token(&self) -> String {
        self.state.lock().token.clone()
    }

    fn take(&self, method: Method, path: &str, params: Params) -> Result<Reply> {
        let mut state = self.state.lock();
        state.requests.push(Request {
            method,
            path: path.to_string(),
            params,
        });
        state
            .replies
            .get_mut(&(method, path.to_string()))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                Error::Connectivity(format!("no scripted reply for {:?} {}", method, path))
            })
    }
}

impl Requester for MockRequester {
    fn get(&self, path: &str, query: Params) -> BoxFuture<'_, Result<Page>> {
        let reply = self.take(Method::Get, path, query);
        Box::pin(async move {
            match reply? {
                Reply::Page(page) => Ok(page),
                Reply::Record(_) => Err(Error::Protocol("expected a page".into())),
                Reply::Fail(e) => Err(e),
            }
        })
    }

    fn get_one(&self, path: &str) -> BoxFuture<'_, Result<Value>> {
        let reply = self.take(Method::Get, path, Vec::new());
        Box::pin(async move {
            match reply? {
                Reply::Record(record) => Ok(record),
                Reply::Page(_) => Err(Error::Protocol("expected a record".into())),
                Reply::Fail(e) => Err(e),
            }
        })
    }

    fn post(&self, path: &str, form: Params) -> BoxFuture<'_, Result<Value>> {
        let reply = self.take(Method::Post, path, form);
        Box::pin(async move {
            match reply? {
                Reply::Record(record) => Ok(record),
                Reply::Page(_) => Err(Error::Protocol("expected a record".into())),
                Reply::Fail(e) => Err(e),
            }
        })
    }

    fn set_token(&self, token: &str) {
        self.state.lock().token = token.to_string();
    }
}

#[tokio::test]
async fn fetch_pages_follows_next_token() {
    let requester = MockRequester::new();
    requester.page("Things", vec![json!(1), json!(2)], Some("p2"));
    requester.page("Things", vec![json!(3)], None);

    let query = vec![("Status".to_string(), "active".to_string())];
    let items = fetch_pages(&requester, "Things", &query, 2).await.unwrap();
    assert_eq!(items, vec![json!(1), json!(2), json!(3)]);

    let requests = requester.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].param("Status"), Some("active"));
    assert_eq!(requests[0].param("PageSize"), Some("2"));
    assert_eq!(requests[0].param("PageToken"), None);
    assert_eq!(requests[1].param("PageToken"), Some("p2"));
}

#[tokio::test]
async fn fetch_pages_with_no_results_is_empty() {
    let requester = MockRequester::new();
    requester.page("Things", Vec::new(), None);

    let items = fetch_pages(&requester, "Things", &Vec::new(), 50).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn fetch_pages_propagates_failure() {
    let requester = MockRequester::new();
    requester.page("Things", vec![json!(1)], Some("p2"));
    requester.fail(Method::Get, "Things", Error::Connectivity("reset".into()));

    let err = fetch_pages(&requester, "Things", &Vec::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connectivity(_)));
}

#[test]
fn page_reads_items_field() {
    let page = Page::from_value(json!({
        "items": [{ "sid": "WA1" }],
        "meta": { "next_token": "abc" },
    }))
    .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.meta.next_token.as_deref(), Some("abc"));
}

#[test]
fn page_reads_field_named_by_meta_key() {
    let page = Page::from_value(json!({
        "reservations": [{ "sid": "WR1" }, { "sid": "WR2" }],
        "meta": { "key": "reservations", "next_page_token": null },
    }))
    .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.meta.next_token.is_none());
}

#[test]
fn page_without_meta_is_single_page() {
    let page = Page::from_value(json!({ "items": [] })).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.meta.next_token, None);
}

#[test]
fn page_with_non_array_items_is_protocol_error() {
    let err = Page::from_value(json!({ "items": "nope" })).unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[parameterized(
    conflict = { 409, r#"{"code": 20001, "message": "Reservation already accepted"}"#, RejectionKind::AlreadyAccepted },
    unauthorized = { 401, r#"{"message": "Unauthorized"}"#, RejectionKind::StaleToken },
    expired_code = { 400, r#"{"code": 20104, "message": "Token expired"}"#, RejectionKind::StaleToken },
    bad_request = { 400, r#"{"code": 20001, "message": "Invalid"}"#, RejectionKind::Other },
    plain_text = { 503, "Service Unavailable", RejectionKind::Other },
)]
fn rejection_kinds(status: u16, body: &str, expected: RejectionKind) {
    match rejection_from_response(status, body) {
        Error::RemoteRejection {
            status: s, kind, ..
        } => {
            assert_eq!(s, status);
            assert_eq!(kind, expected);
        }
        other => panic!("expected remote rejection, got {:?}", other),
    }
}

#[test]
fn rejection_message_falls_back_to_body_then_status() {
    match rejection_from_response(502, "  bad gateway  ") {
        Error::RemoteRejection { message, code, .. } => {
            assert_eq!(message, "bad gateway");
            assert_eq!(code, None);
        }
        other => panic!("expected remote rejection, got {:?}", other),
    }
    match rejection_from_response(500, "") {
        Error::RemoteRejection { message, .. } => assert_eq!(message, "http status 500"),
        other => panic!("expected remote rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn http_requester_unreachable_host_is_connectivity_error() {
    let requester =
        HttpRequester::new("http://127.0.0.1:9/v1/", "tok", Duration::from_secs(2)).unwrap();
    let err = requester.get_one("Workspaces/WS1").await.unwrap_err();
    assert!(matches!(err, Error::Connectivity(_)));
}
