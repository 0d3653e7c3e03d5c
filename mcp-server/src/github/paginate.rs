//! Link-header pagination over the consumed-licenses endpoint.

use ghe_mcp_common::{RawLicenseAggregate, RawLicensePage};
use reqwest::header::LINK;
use reqwest::{Method, Response, Url};

use super::retry::RetryExecutor;
use crate::error::{Error, Result};

/// Extract the `rel="next"` target from a `Link` header.
///
/// The header is a comma-separated list of `<url>; rel="value"` segments.
/// A segment may carry several space-separated relations.
pub fn next_link(header: Option<&str>) -> Option<String> {
    header?.split(',').find_map(|segment| {
        let mut parts = segment.split(';');
        let url = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;

        let is_next = parts.any(|param| match param.split_once('=') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("rel") => value
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case("next")),
            _ => false,
        });

        is_next.then(|| url.to_string())
    })
}

/// Walk every page starting at page 1, following `next` links until the API
/// stops sending one.
///
/// With `max_pages` unset the walk is unbounded: an upstream that always
/// answers with a next link keeps this loop running. Callers needing a
/// latency bound should wrap the call in a timeout.
pub async fn fetch_all(
    executor: &RetryExecutor,
    url: &str,
    page_size: u32,
    max_pages: Option<u32>,
) -> Result<RawLicenseAggregate> {
    let first_page = first_page_query(page_size);
    let mut aggregate = RawLicenseAggregate::default();
    let start = url;
    let mut url = url.to_string();
    let mut query: &[(&str, String)] = &first_page;

    loop {
        let response = executor.execute(Method::GET, &url, query).await?;
        let link = link_header(&response);
        absorb(&mut aggregate, response).await?;

        let Some(next) = next_link(link.as_deref()) else {
            break;
        };
        if let Some(limit) = max_pages {
            if aggregate.pages >= limit {
                tracing::error!(pages = aggregate.pages, "Consumed-licenses walk hit the page limit");
                return Err(Error::PaginationLimitExceeded(limit));
            }
        }

        // The client sends the bearer token on every request.
        if !same_origin(start, &next) {
            tracing::error!(next = %next, "Refusing next link to a different origin");
            return Err(Error::InvalidResponse(format!(
                "next link leaves {}: {}",
                start, next
            )));
        }

        // The next link already carries per_page and page.
        url = next;
        query = &[];
    }

    tracing::info!(
        pages = aggregate.pages,
        seats = aggregate.seats.len(),
        "Fetched consumed licenses"
    );
    Ok(aggregate)
}

/// Fetch page 1 only, ignoring any next link.
pub async fn fetch_first_page(
    executor: &RetryExecutor,
    url: &str,
    page_size: u32,
) -> Result<RawLicenseAggregate> {
    let response = executor
        .execute(Method::GET, url, &first_page_query(page_size))
        .await?;
    let mut aggregate = RawLicenseAggregate::default();
    absorb(&mut aggregate, response).await?;
    Ok(aggregate)
}

/// Scheme, host and port match. Unparseable URLs never match.
fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

fn first_page_query(page_size: u32) -> [(&'static str, String); 2] {
    [("per_page", page_size.to_string()), ("page", "1".to_string())]
}

fn link_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn absorb(aggregate: &mut RawLicenseAggregate, response: Response) -> Result<()> {
    let page: RawLicensePage = response
        .json()
        .await
        .map_err(|e| Error::InvalidResponse(format!("consumed-licenses page: {}", e)))?;

    tracing::debug!(
        page = aggregate.pages + 1,
        seats = page.seat_count(),
        "Fetched consumed-licenses page"
    );
    aggregate.push_page(page);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_link_github_style() {
        let header = r#"<https://api.github.com/enterprises/acme/consumed-licenses?per_page=100&page=2>; rel="next", <https://api.github.com/enterprises/acme/consumed-licenses?per_page=100&page=5>; rel="last""#;
        assert_eq!(
            next_link(Some(header)).as_deref(),
            Some("https://api.github.com/enterprises/acme/consumed-licenses?per_page=100&page=2")
        );
    }

    #[test]
    fn test_next_link_not_first_segment() {
        let header = r#"<https://x/?page=1>; rel="prev", <https://x/?page=3>; rel="next""#;
        assert_eq!(next_link(Some(header)).as_deref(), Some("https://x/?page=3"));
    }

    #[test]
    fn test_next_link_absent() {
        let header = r#"<https://x/?page=1>; rel="first", <https://x/?page=1>; rel="prev""#;
        assert_eq!(next_link(Some(header)), None);
        assert_eq!(next_link(None), None);
        assert_eq!(next_link(Some("")), None);
    }

    #[test]
    fn test_next_link_multiple_relations_and_unquoted() {
        assert_eq!(
            next_link(Some(r#"<https://x/?page=2>; rel="next last""#)).as_deref(),
            Some("https://x/?page=2")
        );
        assert_eq!(
            next_link(Some("<https://x/?page=2>; rel=next")).as_deref(),
            Some("https://x/?page=2")
        );
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(
            "https://ghe.example.com/api/v3/consumed-licenses",
            "https://ghe.example.com/api/v3/consumed-licenses?page=2"
        ));
        assert!(!same_origin(
            "https://ghe.example.com/consumed-licenses",
            "https://other.example.com/consumed-licenses?page=2"
        ));
        assert!(!same_origin(
            "https://ghe.example.com/consumed-licenses",
            "http://ghe.example.com/consumed-licenses?page=2"
        ));
        assert!(!same_origin("https://ghe.example.com/x", "/relative?page=2"));
    }

    #[test]
    fn test_next_link_malformed_segment_skipped() {
        let header = r#"https://x/?page=2; rel="next", <https://x/?page=3>; rel="next""#;
        assert_eq!(next_link(Some(header)).as_deref(), Some("https://x/?page=3"));
    }
}
