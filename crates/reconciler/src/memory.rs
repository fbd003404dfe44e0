//! An in-memory host for running the reconciler outside a browser.
//!
//! Caches live in maps keyed by URL, the network answers from a table of
//! scripted responses, and every fetch and lifecycle call is recorded so
//! callers can assert on them.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use http::Method;

use crate::{
    error::{ReconcilerError, Result},
    platform::{
        Cache, CacheStorage, FetchMode, HostRequest, HostResponse, Lifecycle, Network, Platform,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRequest {
    pub url: String,
    pub method: Method,
    pub mode: FetchMode,
}

impl MemoryRequest {
    pub fn get<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            mode: FetchMode::Default,
        }
    }

    pub fn with_method<S: Into<String>>(url: S, method: Method) -> Self {
        Self {
            method,
            ..Self::get(url)
        }
    }
}

impl HostRequest for MemoryRequest {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn method(&self) -> Method {
        self.method.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryResponse {
    pub status: u16,
    pub body: String,
}

impl MemoryResponse {
    pub fn new<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_with<S: Into<String>>(body: S) -> Self {
        Self::new(200, body)
    }
}

impl HostResponse for MemoryResponse {
    fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }

    fn from_text(body: String) -> Result<Self> {
        Ok(Self::ok_with(body))
    }

    async fn text(self) -> Result<String> {
        Ok(self.body)
    }
}

type Entries = Rc<RefCell<BTreeMap<String, (MemoryRequest, MemoryResponse)>>>;

/// Handle on one store. Stays usable after the store is deleted, but no
/// longer reachable through [`MemoryPlatform`].
#[derive(Debug, Clone)]
pub struct MemoryCache {
    name: String,
    entries: Entries,
    state: Rc<State>,
}

impl Cache for MemoryCache {
    type Request = MemoryRequest;
    type Response = MemoryResponse;

    async fn get(&self, request: &MemoryRequest) -> Result<Option<MemoryResponse>> {
        let entries = self.entries.borrow();
        let cached = entries.get(&request.url);
        Ok(cached.map(|(_, response)| response.clone()))
    }

    async fn put(&self, request: &MemoryRequest, response: MemoryResponse) -> Result<()> {
        let read_only = self.state.read_only_caches.borrow();
        if read_only.contains(&self.name) {
            return Err(ReconcilerError::Store(format!(
                "{} is read only, can't store {}",
                self.name, request.url
            )));
        }

        self.entries
            .borrow_mut()
            .insert(request.url.clone(), (request.clone(), response));
        Ok(())
    }

    async fn delete(&self, request: &MemoryRequest) -> Result<bool> {
        Ok(self.entries.borrow_mut().remove(&request.url).is_some())
    }

    async fn keys(&self) -> Result<Vec<MemoryRequest>> {
        let entries = self.entries.borrow();
        let keys = entries.values().map(|(request, _)| request.clone());
        Ok(keys.collect())
    }
}

#[derive(Debug, Default)]
struct State {
    origin: String,
    caches: RefCell<BTreeMap<String, Entries>>,
    broken_caches: RefCell<BTreeSet<String>>,
    read_only_caches: RefCell<BTreeSet<String>>,
    responses: RefCell<BTreeMap<String, MemoryResponse>>,
    unreachable: RefCell<BTreeSet<String>>,
    offline: Cell<bool>,
    claim_fails: Cell<bool>,
    fetches: RefCell<Vec<MemoryRequest>>,
    skip_waiting_calls: Cell<usize>,
    claim_calls: Cell<usize>,
}

/// Cloning gives another handle on the same state
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    state: Rc<State>,
}

impl MemoryPlatform {
    pub fn new<S: Into<String>>(origin: S) -> Self {
        let state = State {
            origin: origin.into(),
            ..Default::default()
        };
        Self {
            state: Rc::new(state),
        }
    }

    fn absolute(&self, path_or_url: &str) -> String {
        if path_or_url.contains("://") {
            path_or_url.to_string()
        } else {
            format!(
                "{}/{}",
                self.state.origin,
                path_or_url.trim_start_matches('/')
            )
        }
    }

    /// Answer fetches of `path_or_url` with `response`
    pub fn serve(&self, path_or_url: &str, response: MemoryResponse) {
        let url = self.absolute(path_or_url);
        self.state.responses.borrow_mut().insert(url, response);
    }

    /// Fetches of `path_or_url` fail as if the connection dropped
    pub fn make_unreachable(&self, path_or_url: &str) {
        let url = self.absolute(path_or_url);
        self.state.unreachable.borrow_mut().insert(url);
    }

    /// Every fetch fails while offline
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.set(offline);
    }

    /// Opening `name` fails until the store is deleted
    pub fn break_cache(&self, name: &str) {
        let mut broken_caches = self.state.broken_caches.borrow_mut();
        broken_caches.insert(name.to_string());
    }

    /// Storing into `name` fails while set. Reads and deletes still work.
    pub fn set_read_only(&self, name: &str, read_only: bool) {
        let mut read_only_caches = self.state.read_only_caches.borrow_mut();
        if read_only {
            read_only_caches.insert(name.to_string());
        } else {
            read_only_caches.remove(name);
        }
    }

    /// Claiming clients fails while set
    pub fn set_claim_fails(&self, fails: bool) {
        self.state.claim_fails.set(fails);
    }

    /// Store `response` directly, bypassing the reconciler
    pub fn seed(&self, cache: &str, path_or_url: &str, response: MemoryResponse) {
        let url = self.absolute(path_or_url);
        let entries = self.entries(cache);
        entries
            .borrow_mut()
            .insert(url.clone(), (MemoryRequest::get(url), response));
    }

    fn entries(&self, name: &str) -> Entries {
        let mut caches = self.state.caches.borrow_mut();
        caches.entry(name.to_string()).or_default().clone()
    }

    pub fn has_cache(&self, name: &str) -> bool {
        self.state.caches.borrow().contains_key(name)
    }

    /// URLs stored in `name`, sorted
    pub fn cached_urls(&self, name: &str) -> Vec<String> {
        let caches = self.state.caches.borrow();
        match caches.get(name) {
            Some(entries) => entries.borrow().keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn cached(&self, name: &str, path_or_url: &str) -> Option<MemoryResponse> {
        let url = self.absolute(path_or_url);
        let caches = self.state.caches.borrow();
        let entries = caches.get(name)?.borrow();
        entries.get(&url).map(|(_, response)| response.clone())
    }

    /// Every request passed to [`Network::fetch`], in order
    pub fn fetches(&self) -> Vec<MemoryRequest> {
        self.state.fetches.borrow().clone()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        let fetches = self.state.fetches.borrow();
        fetches.iter().map(|r| r.url.clone()).collect()
    }

    pub fn clear_fetches(&self) {
        self.state.fetches.borrow_mut().clear();
    }

    pub fn skip_waiting_calls(&self) -> usize {
        self.state.skip_waiting_calls.get()
    }

    pub fn claim_calls(&self) -> usize {
        self.state.claim_calls.get()
    }
}

impl Platform for MemoryPlatform {
    type Request = MemoryRequest;
    type Response = MemoryResponse;

    /// Relative URLs resolve against the origin, like a browser `Request`
    fn request(&self, url: &str, mode: FetchMode) -> Result<MemoryRequest> {
        Ok(MemoryRequest {
            mode,
            ..MemoryRequest::get(self.absolute(url))
        })
    }
}

impl CacheStorage for MemoryPlatform {
    type Cache = MemoryCache;

    async fn open_cache(&self, name: &str) -> Result<MemoryCache> {
        if self.state.broken_caches.borrow().contains(name) {
            return Err(ReconcilerError::Store(format!("{name} is unavailable")));
        }
        Ok(MemoryCache {
            name: name.to_string(),
            entries: self.entries(name),
            state: self.state.clone(),
        })
    }

    async fn delete_cache(&self, name: &str) -> Result<bool> {
        self.state.broken_caches.borrow_mut().remove(name);
        Ok(self.state.caches.borrow_mut().remove(name).is_some())
    }
}

impl Network for MemoryPlatform {
    async fn fetch(&self, request: &MemoryRequest) -> Result<MemoryResponse> {
        self.state.fetches.borrow_mut().push(request.clone());

        let unreachable = self.state.unreachable.borrow().contains(&request.url);
        if self.state.offline.get() || unreachable {
            return Err(ReconcilerError::Network(format!(
                "Failed to fetch {}",
                request.url
            )));
        }

        let response = self.state.responses.borrow().get(&request.url).cloned();
        let not_found = || MemoryResponse::new(404, "Not Found");
        Ok(response.unwrap_or_else(not_found))
    }
}

impl Lifecycle for MemoryPlatform {
    fn origin(&self) -> String {
        self.state.origin.clone()
    }

    fn skip_waiting(&self) -> Result<()> {
        let calls = self.state.skip_waiting_calls.get();
        self.state.skip_waiting_calls.set(calls + 1);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        self.state.claim_calls.set(self.state.claim_calls.get() + 1);
        if self.state.claim_fails.get() {
            return Err(ReconcilerError::Lifecycle("Claim rejected".to_string()));
        }
        Ok(())
    }
}
