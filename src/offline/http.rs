//! HTTP fetcher for the native offline worker.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::FetchError;

use super::{Fetcher, Request, Response};

/// Fetches request paths relative to a fixed origin.
pub struct HttpFetcher {
    client: Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: impl Into<String>) -> Self {
        HttpFetcher {
            client: Client::new(),
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for a request; absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.origin)
        } else {
            format!("{}/{url}", self.origin)
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = self.resolve(&request.url);
        let network = |e: reqwest::Error| FetchError::Network {
            url: url.clone(),
            reason: e.to_string(),
        };

        let mut builder = self.client.get(&url);
        if let Some(accept) = &request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        let resp = builder.send().map_err(network)?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().map_err(network)?.to_vec();
        log::debug!(target: "offline", "GET {url} -> {status} ({} bytes)", body.len());

        Ok(Response {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_origin() {
        let f = HttpFetcher::new("https://example.org/");
        assert_eq!(f.resolve("/gong/"), "https://example.org/gong/");
        assert_eq!(f.resolve("gong/js/gong.js"), "https://example.org/gong/js/gong.js");
        assert_eq!(f.resolve("http://other/x"), "http://other/x");
    }

    #[test]
    fn unreachable_origin_is_network_error() {
        let f = HttpFetcher::new("http://127.0.0.1:9");
        let err = f.fetch(&Request::get("/gong/")).unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
