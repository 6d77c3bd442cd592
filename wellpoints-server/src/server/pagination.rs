//! Pagination query parameters and response headers.
//!
//! List endpoints return the page body plus `X-Total-Count` and an
//! RFC 5988 `Link` header carrying first/prev/next/last relations.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

const DEFAULT_PER_PAGE: usize = 20;
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<usize>,
    per_page: Option<usize>,
}

impl PageParams {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> usize {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }
}

/// Total number of pages for `total` rows, at least 1 so that `last`
/// always points somewhere sensible.
fn page_count(total: i64, per_page: usize) -> usize {
    let per_page = per_page.max(1) as i64;
    (((total + per_page - 1) / per_page).max(1)) as usize
}

pub fn pagination_headers(path: &str, page: usize, per_page: usize, total: i64) -> HeaderMap {
    let last = page_count(total, per_page);
    let href = |p: usize, rel: &str| format!("<{path}?page={p}&per_page={per_page}>; rel=\"{rel}\"");

    let mut links = vec![href(1, "first"), href(last, "last")];
    if page > 1 {
        links.push(href(page - 1, "prev"));
    }
    if page < last {
        links.push(href(page + 1, "next"));
    }

    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&links.join(", ")) {
        headers.insert(HeaderName::from_static("link"), v);
    }
    if let Ok(v) = HeaderValue::from_str(&total.to_string()) {
        headers.insert(HeaderName::from_static("x-total-count"), v);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamps() {
        let p = PageParams {
            page: None,
            per_page: None,
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 20);
        let p = PageParams {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 100);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(41, 20), 3);
    }

    #[test]
    fn middle_page_links_all_relations() {
        let headers = pagination_headers("/api/points", 2, 20, 41);
        assert_eq!(headers.get("x-total-count").unwrap(), "41");
        let link = headers.get("link").unwrap().to_str().unwrap();
        assert!(link.contains("</api/points?page=1&per_page=20>; rel=\"first\""));
        assert!(link.contains("rel=\"prev\""));
        assert!(link.contains("page=3&per_page=20>; rel=\"next\""));
        assert!(link.contains("page=3&per_page=20>; rel=\"last\""));
    }

    #[test]
    fn first_page_has_no_prev() {
        let headers = pagination_headers("/api/points", 1, 20, 10);
        let link = headers.get("link").unwrap().to_str().unwrap();
        assert!(!link.contains("rel=\"prev\""));
        assert!(!link.contains("rel=\"next\""));
        assert!(link.contains("rel=\"first\""));
        assert!(link.contains("rel=\"last\""));
    }
}
