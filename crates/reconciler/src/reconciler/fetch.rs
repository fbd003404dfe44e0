use http::Method;
use shared::ResourcePath;
use tracing::{debug, trace, warn};

use super::CacheReconciler;
use crate::{
    error::{Result, ResultContext},
    key::request_key,
    platform::{
        Cache, CacheStorage, FetchMode, Host, HostRequest, HostResponse, Lifecycle, Network,
    },
};

/// How an intercepted request is answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Not ours, the host handles it as if there was no worker
    Passthrough,
    /// The entry document: network first, cache when offline
    OnlineFirst(ResourcePath),
    /// Any other manifest resource: cache first, lazily populated
    CacheFirst(ResourcePath),
}

impl<H: Host> CacheReconciler<H> {
    /// Decides, without suspending, whether and how to answer `request`
    pub fn route(&self, request: &H::Request) -> Route {
        if request.method() != Method::GET {
            return Route::Passthrough;
        }

        let url = request.url();
        let Some(key) = request_key(&url, &self.host.origin(), &self.config.version_query) else {
            trace!(%url, "Other origin, passing through");
            return Route::Passthrough;
        };

        if !self.package.resources.contains(key.as_str()) {
            trace!(%url, "Not in manifest, passing through");
            return Route::Passthrough;
        }

        if key.is_root() {
            Route::OnlineFirst(key)
        } else {
            Route::CacheFirst(key)
        }
    }

    /// Produces the response for a route chosen by [`Self::route`].
    ///
    /// `None` for [`Route::Passthrough`].
    pub async fn respond(
        &self,
        route: Route,
        request: &H::Request,
    ) -> Result<Option<H::Response>> {
        match route {
            Route::Passthrough => Ok(None),
            Route::OnlineFirst(key) => self.online_first(&key, request).await.map(Some),
            Route::CacheFirst(key) => self.cache_first(&key, request).await.map(Some),
        }
    }

    /// [`Self::route`] and [`Self::respond`] in one go
    pub async fn on_fetch(&self, request: &H::Request) -> Result<Option<H::Response>> {
        let route = self.route(request);
        self.respond(route, request).await
    }

    /// Entries are stored under the bare resource URL so version suffixes
    /// and in-page navigations share one entry
    fn cache_request(&self, key: &ResourcePath) -> Result<H::Request> {
        self.resource_request(key, FetchMode::Default)
    }

    async fn cache_first(&self, key: &ResourcePath, request: &H::Request) -> Result<H::Response> {
        let content = self
            .host
            .open_cache(&self.config.content_cache)
            .await
            .with_context(|| format!("Opening {}", self.config.content_cache))?;
        let cache_request = self.cache_request(key)?;

        if let Some(cached) = content.get(&cache_request).await? {
            debug!(%key, "HIT");
            return Ok(cached);
        }
        debug!(%key, "MISS");

        let response = self.host.fetch(request).await?;
        if response.ok() {
            self.store(&content, &cache_request, &response).await;
        } else {
            debug!(%key, status = response.status(), "Not caching unsuccessful response");
        }

        Ok(response)
    }

    async fn online_first(&self, key: &ResourcePath, request: &H::Request) -> Result<H::Response> {
        let cache_request = self.cache_request(key)?;

        match self.host.fetch(request).await {
            Ok(response) => {
                match self.host.open_cache(&self.config.content_cache).await {
                    Ok(content) => self.store(&content, &cache_request, &response).await,
                    Err(e) => warn!(%key, "Failed to open content cache: {e}"),
                }
                Ok(response)
            }
            Err(error) => {
                warn!(%key, "Network failed, falling back to cache: {error}");
                let content = self
                    .host
                    .open_cache(&self.config.content_cache)
                    .await
                    .map_err(|_| error.clone())?;

                match content.get(&cache_request).await {
                    Ok(Some(cached)) => Ok(cached),
                    Ok(None) => Err(error),
                    Err(e) => {
                        warn!(%key, "Cache lookup failed: {e}");
                        Err(error)
                    }
                }
            }
        }
    }

    /// Caches a copy of `response`. Failing to cache never fails the request.
    async fn store(&self, content: &H::Cache, request: &H::Request, response: &H::Response) {
        let stored = match response.try_clone() {
            Ok(copy) => content.put(request, copy).await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(()) => debug!(url = %request.url(), "Cached"),
            Err(e) => warn!(url = %request.url(), "Failed to cache response: {e}"),
        }
    }
}

#[cfg(test)]
mod test {
    use tokio_test::block_on;

    use super::{super::test_support::*, *};
    use crate::{
        memory::{MemoryPlatform, MemoryRequest, MemoryResponse},
        ReconcilerConfig,
    };

    fn content() -> String {
        ReconcilerConfig::default().content_cache
    }

    fn setup() -> (MemoryPlatform, CacheReconciler<MemoryPlatform>) {
        let platform = MemoryPlatform::new(ORIGIN);
        let package = package(
            "1",
            &[("/", "h1"), ("main.js", "h2"), ("a.png", "h3")],
            &["/", "main.js"],
        );
        serve_all(&platform, &package);
        let reconciler = reconciler(&platform, package);
        (platform, reconciler)
    }

    fn get(path: &str) -> MemoryRequest {
        MemoryRequest::get(format!("{ORIGIN}{path}"))
    }

    #[test]
    fn test_routes() {
        let (_, reconciler) = setup();
        let root = Route::OnlineFirst(ResourcePath::root());

        assert_eq!(reconciler.route(&get("/")), root);
        assert_eq!(reconciler.route(&get("")), root);
        assert_eq!(reconciler.route(&get("/#/profile")), root);
        assert_eq!(
            reconciler.route(&get("/main.js?v=7")),
            Route::CacheFirst("main.js".into())
        );
        assert_eq!(
            reconciler.route(&get("/a.png")),
            Route::CacheFirst("a.png".into())
        );
        assert_eq!(reconciler.route(&get("/api/user")), Route::Passthrough);

        let foreign = MemoryRequest::get("https://cdn.example/main.js");
        assert_eq!(reconciler.route(&foreign), Route::Passthrough);
        let post = MemoryRequest::with_method(format!("{ORIGIN}/main.js"), Method::POST);
        assert_eq!(reconciler.route(&post), Route::Passthrough);
    }

    #[test]
    fn test_unmanifested_requests_are_not_touched() {
        let (platform, reconciler) = setup();

        let response = block_on(reconciler.on_fetch(&get("/api/user"))).unwrap();

        assert_eq!(response, None);
        assert!(platform.fetches().is_empty());
    }

    #[test]
    fn test_cache_hit_skips_network() {
        let (platform, reconciler) = setup();
        platform.seed(&content(), "a.png", MemoryResponse::ok_with("cached png"));

        let response = block_on(reconciler.on_fetch(&get("/a.png")))
            .unwrap()
            .unwrap();

        assert_eq!(response.body, "cached png");
        assert!(platform.fetches().is_empty());
    }

    #[test]
    fn test_cache_miss_fetches_once_and_populates() {
        let (platform, reconciler) = setup();

        let response = block_on(reconciler.on_fetch(&get("/a.png")))
            .unwrap()
            .unwrap();
        assert_eq!(response.body, body("a.png", "1"));
        assert_eq!(platform.fetched_urls(), [format!("{ORIGIN}/a.png")]);
        assert_eq!(platform.cached(&content(), "a.png"), Some(response));

        platform.clear_fetches();
        block_on(reconciler.on_fetch(&get("/a.png"))).unwrap();
        assert!(platform.fetches().is_empty());
    }

    #[test]
    fn test_unsuccessful_responses_are_not_cached() {
        let (platform, reconciler) = setup();
        platform.serve("a.png", MemoryResponse::new(503, "busy"));

        let response = block_on(reconciler.on_fetch(&get("/a.png")))
            .unwrap()
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(platform.cached(&content(), "a.png"), None);
    }

    #[test]
    fn test_failed_store_still_returns_response() {
        let (platform, reconciler) = setup();
        platform.set_read_only(&content(), true);

        let response = block_on(reconciler.on_fetch(&get("/a.png")))
            .unwrap()
            .unwrap();

        assert_eq!(response.body, body("a.png", "1"));
        assert_eq!(platform.cached(&content(), "a.png"), None);
    }

    #[test]
    fn test_versioned_request_shares_the_bare_entry() {
        let (platform, reconciler) = setup();
        platform.serve("main.js?v=1", MemoryResponse::ok_with("main v1"));
        platform.serve("main.js?v=2", MemoryResponse::ok_with("main v2"));

        let first = block_on(reconciler.on_fetch(&get("/main.js?v=1")))
            .unwrap()
            .unwrap();
        assert_eq!(first.body, "main v1");
        // Fetched as sent, stored under the bare URL
        assert_eq!(platform.fetched_urls(), [format!("{ORIGIN}/main.js?v=1")]);
        assert_eq!(
            platform.cached_urls(&content()),
            [format!("{ORIGIN}/main.js")]
        );

        platform.clear_fetches();
        let second = block_on(reconciler.on_fetch(&get("/main.js?v=2")))
            .unwrap()
            .unwrap();

        assert_eq!(second.body, "main v1");
        assert!(platform.fetches().is_empty());
    }

    #[test]
    fn test_cache_miss_network_error_propagates() {
        let (platform, reconciler) = setup();
        platform.set_offline(true);

        let err = block_on(reconciler.on_fetch(&get("/a.png"))).unwrap_err();

        assert!(err.is_network());
    }

    #[test]
    fn test_root_is_always_fetched_and_refreshed() {
        let (platform, reconciler) = setup();
        platform.seed(&content(), "/", MemoryResponse::ok_with("old index"));

        let response = block_on(reconciler.on_fetch(&get("/"))).unwrap().unwrap();

        assert_eq!(response.body, body("/", "1"));
        assert_eq!(platform.fetched_urls(), [format!("{ORIGIN}/")]);
        assert_eq!(
            platform.cached(&content(), "/").unwrap().body,
            body("/", "1")
        );
    }

    #[test]
    fn test_root_stores_unsuccessful_responses() {
        let (platform, reconciler) = setup();
        platform.seed(&content(), "/", MemoryResponse::ok_with("old index"));
        platform.serve("/", MemoryResponse::new(500, "oops"));

        let response = block_on(reconciler.on_fetch(&get("/"))).unwrap().unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(
            platform.cached(&content(), "/"),
            Some(MemoryResponse::new(500, "oops"))
        );
    }

    #[test]
    fn test_root_failed_store_still_returns_response() {
        let (platform, reconciler) = setup();
        platform.set_read_only(&content(), true);

        let response = block_on(reconciler.on_fetch(&get("/"))).unwrap().unwrap();

        assert_eq!(response.body, body("/", "1"));
        assert_eq!(platform.cached(&content(), "/"), None);
    }

    #[test]
    fn test_root_falls_back_to_cache_offline() {
        let (platform, reconciler) = setup();
        platform.seed(&content(), "/", MemoryResponse::ok_with("offline index"));
        platform.set_offline(true);

        let response = block_on(reconciler.on_fetch(&get("/#/today")))
            .unwrap()
            .unwrap();

        assert_eq!(response.body, "offline index");
        assert_eq!(platform.fetches().len(), 1);
    }

    #[test]
    fn test_root_offline_without_cache_raises_network_error() {
        let (platform, reconciler) = setup();
        platform.set_offline(true);

        let err = block_on(reconciler.on_fetch(&get("/"))).unwrap_err();

        assert!(err.is_network());
        assert!(err.to_string().contains(ORIGIN));
    }
}
