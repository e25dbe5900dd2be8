//! Limit/offset pagination.

use axum::http::Uri;
use serde::Serialize;

/// A resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Clamp the requested window: a missing or zero limit uses `default`,
    /// anything above `max` is capped.
    pub fn resolve(limit: Option<usize>, offset: Option<usize>, default: usize, max: usize) -> Self {
        let limit = match limit {
            Some(0) | None => default,
            Some(limit) => limit.min(max),
        };
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of results with links to its neighbours.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: usize, request: PageRequest, uri: &Uri) -> Self {
        let next_offset = request.offset.saturating_add(request.limit);
        let next = (next_offset < count).then(|| page_link(uri, request.limit, next_offset));
        let previous = (request.offset > 0)
            .then(|| page_link(uri, request.limit, request.offset.saturating_sub(request.limit)));
        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Same path and query, with `limit`/`offset` replaced.
fn page_link(uri: &Uri, limit: usize, offset: usize) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            key != "limit" && key != "offset"
        })
        .map(str::to_string)
        .collect();
    params.push(format!("limit={}", limit));
    if offset > 0 {
        params.push(format!("offset={}", offset));
    }
    format!("{}?{}", uri.path(), params.join("&"))
}
