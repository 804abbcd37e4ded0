//! Offline cache worker.
//!
//! Install precaches a fixed manifest into a versioned named cache, activate
//! drops every other cache, and fetch interception serves documents
//! network-first and other assets stale-while-revalidate.

pub mod memory;

#[cfg(feature = "native")]
pub mod disk;
#[cfg(feature = "native")]
pub mod http;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, FetchError, GongError};

pub use memory::MemoryCacheStorage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Version tag; bumping it invalidates every previously stored entry.
    pub cache_name: String,
    /// Fallback document for navigations that were never cached.
    pub root_document: String,
    /// Assets stored at install time.
    pub core_assets: Vec<String>,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        OfflineConfig {
            cache_name: "gong-v1".to_string(),
            root_document: "/gong/".to_string(),
            core_assets: vec![
                "/gong/".to_string(),
                "/gong/manifest.webmanifest".to_string(),
                "/gong/css/style.css".to_string(),
                "/gong/js/gong.js".to_string(),
            ],
        }
    }
}

/// An intercepted GET request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub url: String,
    /// Request destination ("document", "script", "style", ...); empty if unknown.
    #[serde(default)]
    pub destination: String,
    /// Value of the Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            destination: String::new(),
            accept: None,
        }
    }

    /// A top-level navigation.
    pub fn document(url: impl Into<String>) -> Self {
        Request {
            destination: "document".to_string(),
            ..Request::get(url)
        }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Documents and anything that accepts HTML are served network-first.
    pub fn is_html(&self) -> bool {
        self.destination == "document"
            || self
                .accept
                .as_deref()
                .is_some_and(|a| a.contains("text/html"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Named caches of request URL → response.
pub trait CacheStorage {
    /// Names of every existing cache, in creation order.
    fn keys(&self) -> Result<Vec<String>, CacheError>;
    /// Create the cache if it does not exist.
    fn open(&mut self, cache: &str) -> Result<(), CacheError>;
    fn put(&mut self, cache: &str, url: &str, response: &Response) -> Result<(), CacheError>;
    fn match_in(&self, cache: &str, url: &str) -> Result<Option<Response>, CacheError>;
    /// Delete a cache. Returns false if it did not exist.
    fn delete(&mut self, cache: &str) -> Result<bool, CacheError>;

    /// Look `url` up across every cache, oldest cache first.
    fn match_any(&self, url: &str) -> Result<Option<Response>, CacheError> {
        for cache in self.keys()? {
            if let Some(response) = self.match_in(&cache, url)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

pub trait Fetcher {
    fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Parsed,
    Installed,
    Activated,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Network,
    Cache,
    /// The cached root document stood in for an uncached navigation.
    RootFallback,
}

/// A background refresh of one cached asset, to run after its cached copy
/// has been returned.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a revalidation does nothing until run"]
pub struct Revalidation {
    request: Request,
}

impl Revalidation {
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Refetch and store. Failures keep the existing entry.
    pub fn run<C: CacheStorage, F: Fetcher>(self, worker: &mut OfflineWorker<C, F>) -> bool {
        match worker.fetcher.fetch(&self.request) {
            Ok(response) => {
                worker.store_copy(&self.request, &response);
                true
            }
            Err(e) => {
                log::debug!(target: "offline", "revalidation of {} failed: {e}", self.request.url);
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub from: ServedFrom,
    pub revalidation: Option<Revalidation>,
}

pub struct OfflineWorker<C, F> {
    config: OfflineConfig,
    caches: C,
    fetcher: F,
    phase: WorkerPhase,
    skip_waiting: bool,
    clients_claimed: bool,
}

impl<C: CacheStorage, F: Fetcher> OfflineWorker<C, F> {
    pub fn new(config: OfflineConfig, caches: C, fetcher: F) -> Self {
        OfflineWorker {
            config,
            caches,
            fetcher,
            phase: WorkerPhase::Parsed,
            skip_waiting: false,
            clients_claimed: false,
        }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn caches(&self) -> &C {
        &self.caches
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Whether install asked to activate without waiting for old pages.
    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    /// Fetch every core asset and store them all in the current cache.
    /// All-or-nothing: one failed or non-OK fetch stores nothing.
    pub fn install(&mut self) -> Result<(), GongError> {
        let mut fetched = Vec::with_capacity(self.config.core_assets.len());
        for url in &self.config.core_assets {
            let response = self.fetcher.fetch(&Request::get(url.clone()))?;
            if !response.is_ok() {
                return Err(FetchError::Status {
                    url: url.clone(),
                    status: response.status,
                }
                .into());
            }
            fetched.push((url.clone(), response));
        }

        self.caches.open(&self.config.cache_name)?;
        for (url, response) in &fetched {
            self.caches.put(&self.config.cache_name, url, response)?;
        }
        log::info!(
            target: "offline",
            "precached {} assets into {}",
            fetched.len(),
            self.config.cache_name
        );

        self.skip_waiting = true;
        self.phase = WorkerPhase::Installed;
        Ok(())
    }

    /// Delete every cache but the current one, then take control of open
    /// pages. Returns the names of the deleted caches.
    pub fn activate(&mut self) -> Result<Vec<String>, CacheError> {
        let stale: Vec<String> = self
            .caches
            .keys()?
            .into_iter()
            .filter(|k| *k != self.config.cache_name)
            .collect();
        for name in &stale {
            self.caches.delete(name)?;
            log::info!(target: "offline", "deleted stale cache {name}");
        }
        self.clients_claimed = true;
        self.phase = WorkerPhase::Activated;
        Ok(stale)
    }

    /// Answer an intercepted request.
    pub fn handle_fetch(&mut self, request: &Request) -> Result<Served, FetchError> {
        if request.is_html() {
            self.network_first(request)
        } else {
            self.stale_while_revalidate(request)
        }
    }

    fn network_first(&mut self, request: &Request) -> Result<Served, FetchError> {
        let err = match self.fetcher.fetch(request) {
            Ok(response) => {
                self.store_copy(request, &response);
                return Ok(Served {
                    response,
                    from: ServedFrom::Network,
                    revalidation: None,
                });
            }
            Err(e) => e,
        };

        log::debug!(target: "offline", "network failed for {}: {err}", request.url);
        if let Some(response) = self.lookup(&request.url) {
            return Ok(Served {
                response,
                from: ServedFrom::Cache,
                revalidation: None,
            });
        }
        let root = self.config.root_document.clone();
        if let Some(response) = self.lookup(&root) {
            return Ok(Served {
                response,
                from: ServedFrom::RootFallback,
                revalidation: None,
            });
        }
        Err(err)
    }

    fn stale_while_revalidate(&mut self, request: &Request) -> Result<Served, FetchError> {
        if let Some(response) = self.lookup(&request.url) {
            return Ok(Served {
                response,
                from: ServedFrom::Cache,
                revalidation: Some(Revalidation {
                    request: request.clone(),
                }),
            });
        }

        let response = self.fetcher.fetch(request)?;
        self.store_copy(request, &response);
        Ok(Served {
            response,
            from: ServedFrom::Network,
            revalidation: None,
        })
    }

    /// Cache lookup where a broken cache reads as a miss.
    fn lookup(&self, url: &str) -> Option<Response> {
        match self.caches.match_any(url) {
            Ok(found) => found,
            Err(e) => {
                log::warn!(target: "offline", "cache lookup for {url} failed: {e}");
                None
            }
        }
    }

    /// Best-effort copy into the current cache.
    fn store_copy(&mut self, request: &Request, response: &Response) {
        let cache = &self.config.cache_name;
        let result = self
            .caches
            .open(cache)
            .and_then(|_| self.caches.put(cache, &request.url, response));
        if let Err(e) = result {
            log::debug!(target: "offline", "not caching {}: {e}", request.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves a fixed site; can be switched offline. Records every fetch.
    #[derive(Default)]
    struct FakeNetwork {
        site: HashMap<String, Response>,
        offline: bool,
        log: RefCell<Vec<String>>,
    }

    impl FakeNetwork {
        fn site() -> Self {
            let mut site = HashMap::new();
            site.insert("/gong/".to_string(), Response::ok("text/html", "<html>v1</html>"));
            site.insert(
                "/gong/manifest.webmanifest".to_string(),
                Response::ok("application/manifest+json", "{}"),
            );
            site.insert("/gong/css/style.css".to_string(), Response::ok("text/css", "body{}"));
            site.insert("/gong/js/gong.js".to_string(), Response::ok("text/javascript", "gong()"));
            FakeNetwork {
                site,
                ..Default::default()
            }
        }

        fn update(&mut self, url: &str, body: &str) {
            let ct = self.site[url].content_type.clone().unwrap_or_default();
            self.site.insert(url.to_string(), Response::ok(&ct, body));
        }
    }

    impl Fetcher for FakeNetwork {
        fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            self.log.borrow_mut().push(request.url.clone());
            if self.offline {
                return Err(FetchError::Network {
                    url: request.url.clone(),
                    reason: "offline".to_string(),
                });
            }
            Ok(self.site.get(&request.url).cloned().unwrap_or(Response {
                status: 404,
                content_type: None,
                body: Vec::new(),
            }))
        }
    }

    fn installed() -> OfflineWorker<MemoryCacheStorage, FakeNetwork> {
        let mut w = OfflineWorker::new(
            OfflineConfig::default(),
            MemoryCacheStorage::new(),
            FakeNetwork::site(),
        );
        w.install().unwrap();
        w.activate().unwrap();
        w
    }

    #[test]
    fn install_precaches_every_core_asset() {
        let mut w = OfflineWorker::new(
            OfflineConfig::default(),
            MemoryCacheStorage::new(),
            FakeNetwork::site(),
        );
        w.install().unwrap();
        assert_eq!(w.phase(), WorkerPhase::Installed);
        assert!(w.skips_waiting());
        for url in &OfflineConfig::default().core_assets {
            assert!(
                w.caches().match_in("gong-v1", url).unwrap().is_some(),
                "{url} not precached"
            );
        }
    }

    #[test]
    fn install_is_all_or_nothing() {
        let mut net = FakeNetwork::site();
        net.site.remove("/gong/css/style.css");
        let mut w = OfflineWorker::new(OfflineConfig::default(), MemoryCacheStorage::new(), net);
        assert!(w.install().is_err());
        assert!(w.caches().keys().unwrap().is_empty());
        assert_eq!(w.phase(), WorkerPhase::Parsed);
    }

    #[test]
    fn activate_removes_other_versions() {
        let mut caches = MemoryCacheStorage::new();
        caches.open("gong-v0").unwrap();
        caches
            .put("gong-v0", "/gong/", &Response::ok("text/html", "old"))
            .unwrap();
        caches.open("unrelated").unwrap();

        let mut w = OfflineWorker::new(OfflineConfig::default(), caches, FakeNetwork::site());
        w.install().unwrap();
        let deleted = w.activate().unwrap();
        assert_eq!(deleted, vec!["gong-v0".to_string(), "unrelated".to_string()]);
        assert_eq!(w.caches().keys().unwrap(), vec!["gong-v1".to_string()]);
        assert!(w.clients_claimed());
    }

    #[test]
    fn html_prefers_network_and_refreshes_cache() {
        let mut w = installed();
        w.fetcher_mut().update("/gong/", "<html>v2</html>");
        let served = w.handle_fetch(&Request::document("/gong/")).unwrap();
        assert_eq!(served.from, ServedFrom::Network);
        assert_eq!(served.response.body, b"<html>v2</html>");
        assert!(served.revalidation.is_none());
        let cached = w.caches().match_in("gong-v1", "/gong/").unwrap().unwrap();
        assert_eq!(cached.body, b"<html>v2</html>");
    }

    #[test]
    fn html_offline_falls_back_to_cached_copy() {
        let mut w = installed();
        w.fetcher_mut().offline = true;
        let served = w.handle_fetch(&Request::document("/gong/")).unwrap();
        assert_eq!(served.from, ServedFrom::Cache);
        assert_eq!(served.response.body, b"<html>v1</html>");
    }

    #[test]
    fn html_offline_uncached_falls_back_to_root() {
        let mut w = installed();
        w.fetcher_mut().offline = true;
        let req = Request::get("/gong/about").with_accept("text/html,application/xhtml+xml");
        let served = w.handle_fetch(&req).unwrap();
        assert_eq!(served.from, ServedFrom::RootFallback);
        assert_eq!(served.response.body, b"<html>v1</html>");
    }

    #[test]
    fn html_offline_with_empty_cache_errors() {
        let mut net = FakeNetwork::site();
        net.offline = true;
        let mut w = OfflineWorker::new(OfflineConfig::default(), MemoryCacheStorage::new(), net);
        assert!(w.handle_fetch(&Request::document("/gong/")).is_err());
    }

    #[test]
    fn assets_served_stale_then_revalidated() {
        let mut w = installed();
        w.fetcher_mut().update("/gong/css/style.css", "body{color:red}");
        w.fetcher().log.borrow_mut().clear();

        let served = w.handle_fetch(&Request::get("/gong/css/style.css")).unwrap();
        assert_eq!(served.from, ServedFrom::Cache);
        assert_eq!(served.response.body, b"body{}");
        assert!(w.fetcher().log.borrow().is_empty());

        let revalidation = served.revalidation.unwrap();
        assert_eq!(revalidation.request().url, "/gong/css/style.css");
        assert!(revalidation.run(&mut w));
        let next = w.handle_fetch(&Request::get("/gong/css/style.css")).unwrap();
        assert_eq!(next.response.body, b"body{color:red}");
    }

    #[test]
    fn failed_revalidation_keeps_cached_copy() {
        let mut w = installed();
        w.fetcher_mut().offline = true;
        let served = w.handle_fetch(&Request::get("/gong/js/gong.js")).unwrap();
        assert!(!served.revalidation.unwrap().run(&mut w));
        let again = w.handle_fetch(&Request::get("/gong/js/gong.js")).unwrap();
        assert_eq!(again.response.body, b"gong()");
    }

    #[test]
    fn uncached_asset_waits_for_network() {
        let mut w = installed();
        w.fetcher_mut()
            .site
            .insert("/gong/icon.png".to_string(), Response::ok("image/png", vec![1u8, 2, 3]));
        let served = w.handle_fetch(&Request::get("/gong/icon.png")).unwrap();
        assert_eq!(served.from, ServedFrom::Network);
        assert!(w.caches().match_in("gong-v1", "/gong/icon.png").unwrap().is_some());
    }

    #[test]
    fn uncached_asset_offline_rejects() {
        let mut w = installed();
        w.fetcher_mut().offline = true;
        let err = w.handle_fetch(&Request::get("/gong/icon.png")).unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[test]
    fn html_detection() {
        assert!(Request::document("/x").is_html());
        assert!(Request::get("/x").with_accept("text/html").is_html());
        assert!(!Request::get("/x.css").with_accept("text/css,*/*;q=0.1").is_html());
        assert!(!Request::get("/x.js").is_html());
    }
}
