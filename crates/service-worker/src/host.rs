use http::Method;
use js_sys::Array;
use reconciler::{
    Cache, CacheStorage, FetchMode, HostRequest, HostResponse, Lifecycle, Network, Platform,
    ReconcilerError, Result,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Cache as JsCache, Request, RequestCache, RequestInit, Response, ServiceWorkerGlobalScope,
};

use crate::error::JsResultExt;

/// A request with its method already parsed
#[derive(Debug, Clone)]
pub struct WebRequest {
    inner: Request,
    method: Method,
}

impl WebRequest {
    pub fn inner(&self) -> &Request {
        &self.inner
    }
}

impl TryFrom<Request> for WebRequest {
    type Error = ReconcilerError;

    fn try_from(inner: Request) -> Result<Self> {
        let method = Method::from_bytes(inner.method().as_bytes()).map_err(|e| {
            ReconcilerError::Network(format!("{} {}: {e}", inner.method(), inner.url()))
        })?;
        Ok(Self { inner, method })
    }
}

impl HostRequest for WebRequest {
    fn url(&self) -> String {
        self.inner.url()
    }

    fn method(&self) -> Method {
        self.method.clone()
    }
}

#[derive(Debug, Clone)]
pub struct WebResponse(Response);

impl WebResponse {
    pub fn into_inner(self) -> Response {
        self.0
    }
}

impl HostResponse for WebResponse {
    fn ok(&self) -> bool {
        self.0.ok()
    }

    fn status(&self) -> u16 {
        self.0.status()
    }

    fn try_clone(&self) -> Result<Self> {
        // Response::clone tees the body, unlike the JsValue handle clone
        Response::clone(&self.0).map(Self).store_err()
    }

    fn from_text(body: String) -> Result<Self> {
        Response::new_with_opt_str(Some(&body))
            .map(Self)
            .store_err()
    }

    async fn text(self) -> Result<String> {
        let text = JsFuture::from(self.0.text().store_err()?)
            .await
            .store_err()?;
        text.as_string().ok_or_else(|| {
            ReconcilerError::Store(format!("Response body was not text: {text:?}"))
        })
    }
}

#[derive(Debug, Clone)]
pub struct WebCache(JsCache);

impl Cache for WebCache {
    type Request = WebRequest;
    type Response = WebResponse;

    async fn get(&self, request: &WebRequest) -> Result<Option<WebResponse>> {
        let cached = JsFuture::from(self.0.match_with_request(&request.inner))
            .await
            .store_err()?;
        if cached.is_instance_of::<Response>() {
            Ok(Some(WebResponse(cached.into())))
        } else if cached.is_undefined() {
            Ok(None)
        } else {
            Err(ReconcilerError::Store(format!(
                "match_with_request returned something other than Response or undefined!: {:?}",
                cached
            )))
        }
    }

    async fn put(&self, request: &WebRequest, response: WebResponse) -> Result<()> {
        JsFuture::from(self.0.put_with_request(&request.inner, &response.0))
            .await
            .store_err()?;
        Ok(())
    }

    async fn delete(&self, request: &WebRequest) -> Result<bool> {
        let deleted = JsFuture::from(self.0.delete_with_request(&request.inner))
            .await
            .store_err()?;
        Ok(deleted.as_bool().unwrap_or(false))
    }

    async fn keys(&self) -> Result<Vec<WebRequest>> {
        let keys: Array = JsFuture::from(self.0.keys()).await.store_err()?.into();
        keys.into_iter()
            .map(|k| WebRequest::try_from(Request::from(k)))
            .collect()
    }
}

/// The service worker global scope as a reconciler host
#[derive(Debug, Clone)]
pub struct WebHost {
    sw: ServiceWorkerGlobalScope,
}

impl WebHost {
    pub fn new(sw: ServiceWorkerGlobalScope) -> Self {
        Self { sw }
    }
}

impl Platform for WebHost {
    type Request = WebRequest;
    type Response = WebResponse;

    fn request(&self, url: &str, mode: FetchMode) -> Result<WebRequest> {
        let mut r_init = RequestInit::new();
        r_init.method("GET");
        if mode == FetchMode::Reload {
            r_init.cache(RequestCache::Reload);
        }

        let request = Request::new_with_str_and_init(url, &r_init).network_err()?;
        WebRequest::try_from(request)
    }
}

impl CacheStorage for WebHost {
    type Cache = WebCache;

    async fn open_cache(&self, name: &str) -> Result<WebCache> {
        let caches = self.sw.caches().store_err()?;
        let cache: JsCache = JsFuture::from(caches.open(name)).await.store_err()?.into();
        Ok(WebCache(cache))
    }

    async fn delete_cache(&self, name: &str) -> Result<bool> {
        let caches = self.sw.caches().store_err()?;
        let deleted = JsFuture::from(caches.delete(name)).await.store_err()?;
        Ok(deleted.as_bool().unwrap_or(false))
    }
}

impl Network for WebHost {
    async fn fetch(&self, request: &WebRequest) -> Result<WebResponse> {
        let response = JsFuture::from(self.sw.fetch_with_request(&request.inner))
            .await
            .network_err()?;

        if response.is_instance_of::<Response>() {
            Ok(WebResponse(response.into()))
        } else {
            Err(ReconcilerError::Network(format!(
                "Fetch returned something other than a Response: {:?}",
                response
            )))
        }
    }
}

impl Lifecycle for WebHost {
    fn origin(&self) -> String {
        self.sw.origin()
    }

    fn skip_waiting(&self) -> Result<()> {
        // MDN states the promise returned can be safely ignored
        let _ = self.sw.skip_waiting().lifecycle_err()?;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        JsFuture::from(self.sw.clients().claim())
            .await
            .lifecycle_err()?;
        Ok(())
    }
}

impl From<WebResponse> for JsValue {
    fn from(response: WebResponse) -> Self {
        response.0.into()
    }
}
