// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST access to the task-distribution service.

mod requester;
mod routes;

pub use requester::{
    fetch_pages, rejection_from_response, BoxFuture, HttpRequester, Page, PageMeta, Params,
    Requester, CODE_TOKEN_EXPIRED,
};
pub use routes::Routes;

/// Builds a parameter list from string pairs.
pub fn params<const N: usize>(pairs: [(&str, String); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
pub(crate) mod requester_tests;
