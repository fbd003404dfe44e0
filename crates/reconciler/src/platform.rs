//! Collaborators the reconciler needs from its host: durable named caches, the
//! network and the worker lifecycle.
//!
//! The host is single threaded, so none of the futures here are `Send`.

use http::Method;

use crate::error::Result;

pub trait HostRequest {
    fn url(&self) -> String;
    fn method(&self) -> Method;
}

#[allow(async_fn_in_trait)]
pub trait HostResponse: Sized {
    /// Status is in the 2xx range
    fn ok(&self) -> bool;
    fn status(&self) -> u16;
    /// A second handle on the response so one copy can be cached while the
    /// other is returned
    fn try_clone(&self) -> Result<Self>;
    /// A `200` response with `body` as text
    fn from_text(body: String) -> Result<Self>;
    /// Consumes the body as text
    async fn text(self) -> Result<String>;
}

/// Request and response types shared by the collaborators of one host
pub trait Platform {
    type Request: HostRequest;
    type Response: HostResponse;

    /// Builds a GET request for `url`
    fn request(&self, url: &str, mode: FetchMode) -> Result<Self::Request>;
}

/// One named store of request → response entries
#[allow(async_fn_in_trait)]
pub trait Cache {
    type Request: HostRequest;
    type Response: HostResponse;

    async fn get(&self, request: &Self::Request) -> Result<Option<Self::Response>>;
    async fn put(&self, request: &Self::Request, response: Self::Response) -> Result<()>;
    /// Returns true if an entry was removed
    async fn delete(&self, request: &Self::Request) -> Result<bool>;
    async fn keys(&self) -> Result<Vec<Self::Request>>;
}

#[allow(async_fn_in_trait)]
pub trait CacheStorage: Platform {
    type Cache: Cache<Request = Self::Request, Response = Self::Response>;

    /// Opens the store called `name`, creating it if needed
    async fn open_cache(&self, name: &str) -> Result<Self::Cache>;
    /// Returns true if the store existed
    async fn delete_cache(&self, name: &str) -> Result<bool>;
}

/// How a request treats the HTTP cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    #[default]
    Default,
    /// Always go to the server and refresh the HTTP cache
    Reload,
}

#[allow(async_fn_in_trait)]
pub trait Network: Platform {
    /// Resolves with any response the server sends, errors only when no
    /// response arrives
    async fn fetch(&self, request: &Self::Request) -> Result<Self::Response>;
}

#[allow(async_fn_in_trait)]
pub trait Lifecycle {
    /// Origin the worker is registered for, without a trailing slash
    fn origin(&self) -> String;
    /// Activate this worker without waiting for old clients to close
    fn skip_waiting(&self) -> Result<()>;
    /// Take control of every open client
    async fn claim_clients(&self) -> Result<()>;
}

pub trait Host: CacheStorage + Network + Lifecycle {}

impl<T: CacheStorage + Network + Lifecycle> Host for T {}
