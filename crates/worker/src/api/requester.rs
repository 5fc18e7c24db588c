// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST request plumbing.
//!
//! The runtime only needs three shapes of request: a paged listing, a
//! single record, and a form post that returns the updated record. They are
//! behind the [`Requester`] trait so that stores and actions can be tested
//! without a network.

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, RejectionKind, Result};

/// Boxed future returned by [`Requester`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Query or form parameters, in order.
pub type Params = Vec<(String, String)>;

/// Service error code for an expired or revoked token.
pub const CODE_TOKEN_EXPIRED: u32 = 20104;

/// Paging metadata of a listing response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageMeta {
    /// Token for the next page; `None` on the last page.
    #[serde(default, alias = "next_page_token")]
    pub next_token: Option<String>,
    /// Name of the field holding the records, when not `items`.
    #[serde(default)]
    pub key: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub meta: PageMeta,
}

impl Page {
    /// Creates a page.
    pub fn new(items: Vec<Value>, next_token: Option<&str>) -> Self {
        Page {
            items,
            meta: PageMeta {
                next_token: next_token.map(str::to_string),
                key: None,
            },
        }
    }

    /// Decodes a listing body.
    ///
    /// Records are read from `items`, or from the field named by `meta.key`.
    pub fn from_value(mut body: Value) -> Result<Self> {
        let meta: PageMeta = match body.get_mut("meta") {
            Some(meta) => serde_json::from_value(meta.take())?,
            None => PageMeta::default(),
        };
        let key = meta.key.as_deref().unwrap_or("items");
        let items = match body.get_mut(key).map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(Error::Protocol(format!(
                    "listing field '{}' is not an array: {}",
                    key, other
                )))
            }
        };
        Ok(Page { items, meta })
    }
}

/// Makes authenticated requests against the REST API.
pub trait Requester: Send + Sync {
    /// Fetches one page of a listing.
    fn get(&self, path: &str, query: Params) -> BoxFuture<'_, Result<Page>>;

    /// Fetches a single record.
    fn get_one(&self, path: &str) -> BoxFuture<'_, Result<Value>>;

    /// Posts a form and returns the resulting record.
    fn post(&self, path: &str, form: Params) -> BoxFuture<'_, Result<Value>>;

    /// Replaces the token used for subsequent requests.
    fn set_token(&self, _token: &str) {}
}

/// Reads every page of a listing, in order.
pub async fn fetch_pages<R: Requester + ?Sized>(
    requester: &R,
    path: &str,
    query: &Params,
    page_size: u32,
) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let mut params = query.clone();
        params.push(("PageSize".to_string(), page_size.to_string()));
        if let Some(token) = page_token.take() {
            params.push(("PageToken".to_string(), token));
        }

        let page = requester.get(path, params).await?;
        debug!(path, count = page.items.len(), "fetched page");
        items.extend(page.items);

        match page.meta.next_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => return Ok(items),
        }
    }
}

/// Production requester over HTTPS with a bearer token.
pub struct HttpRequester {
    client: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<String>>,
}

impl HttpRequester {
    /// Create a requester for `base_url`.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {}", e)))?;
        Ok(HttpRequester {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(token.to_string())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let token = self.token.read().clone();
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Connectivity(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Connectivity(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection_from_response(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl Requester for HttpRequester {
    fn get(&self, path: &str, query: Params) -> BoxFuture<'_, Result<Page>> {
        let url = self.url(path);
        Box::pin(async move {
            let body = self.execute(self.client.get(&url).query(&query)).await?;
            Page::from_value(body)
        })
    }

    fn get_one(&self, path: &str) -> BoxFuture<'_, Result<Value>> {
        let url = self.url(path);
        Box::pin(async move { self.execute(self.client.get(&url)).await })
    }

    fn post(&self, path: &str, form: Params) -> BoxFuture<'_, Result<Value>> {
        let url = self.url(path);
        Box::pin(async move { self.execute(self.client.post(&url).form(&form)).await })
    }

    fn set_token(&self, token: &str) {
        *self.token.write() = token.to_string();
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a non-success response to a [`Error::RemoteRejection`].
pub fn rejection_from_response(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code);
    let message = parsed
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("http status {}", status)
            } else {
                trimmed.to_string()
            }
        });

    let kind = match (status, code) {
        (409, _) => RejectionKind::AlreadyAccepted,
        (401, _) | (_, Some(CODE_TOKEN_EXPIRED)) => RejectionKind::StaleToken,
        _ => RejectionKind::Other,
    };

    Error::RemoteRejection {
        status,
        code,
        message,
        kind,
    }
}
