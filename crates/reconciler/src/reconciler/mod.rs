use futures::future::try_join_all;
use shared::{OfflinePackage, ResourcePath, ValidateModel};
use tracing::{debug, warn};

use crate::{
    config::ReconcilerConfig,
    error::{ReconcilerError, Result, ResultContext},
    key::resource_url,
    platform::{Cache, FetchMode, Host, HostRequest, HostResponse},
};

mod activate;
mod fetch;
mod install;
mod message;

pub use activate::ActivationOutcome;
pub use fetch::Route;
pub use message::{ControlMessage, MessageOutcome, UnknownMessage};

/// Keeps the caches of one deployment in step with its manifest.
///
/// The package and config are fixed for the lifetime of the worker, a new
/// deployment means a new worker and a new reconciler.
pub struct CacheReconciler<H> {
    host: H,
    package: OfflinePackage,
    config: ReconcilerConfig,
}

impl<H: Host> CacheReconciler<H> {
    pub fn new(host: H, package: OfflinePackage, config: ReconcilerConfig) -> Result<Self> {
        package
            .validate()
            .map_err(ReconcilerError::from)
            .context("Validating offline package")?;
        config
            .validate()
            .map_err(ReconcilerError::from)
            .context("Validating reconciler config")?;

        if !package.resources.has_root() {
            warn!(
                version = %package.version,
                "Manifest has no root entry, the entry document will not be cached"
            );
        }

        Ok(Self {
            host,
            package,
            config,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn package(&self) -> &OfflinePackage {
        &self.package
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Request a manifest path is fetched with and cached under
    fn resource_request(&self, path: &ResourcePath, mode: FetchMode) -> Result<H::Request> {
        let url = resource_url(&self.host.origin(), path);
        self.host.request(&url, mode)
    }

    /// Fetches every request and stores the responses in `cache`.
    ///
    /// Nothing is stored unless every fetch succeeds with an ok status.
    async fn add_all(&self, cache: &H::Cache, requests: Vec<H::Request>) -> Result<usize> {
        let responses = try_join_all(requests.iter().map(|request| async move {
            self.host
                .fetch(request)
                .await
                .with_context(|| format!("Fetching {}", request.url()))
        }))
        .await?;

        for (request, response) in requests.iter().zip(&responses) {
            if !response.ok() {
                return Err(ReconcilerError::BadResponse {
                    url: request.url(),
                    status: response.status(),
                });
            }
        }

        let count = responses.len();
        for (request, response) in requests.iter().zip(responses) {
            cache
                .put(request, response)
                .await
                .with_context(|| format!("Storing {}", request.url()))?;
            debug!(url = %request.url(), "Cached");
        }

        Ok(count)
    }
}

/// Copies every entry of `from` into `to`, replacing what `to` holds for the
/// same request
async fn copy_entries<C: Cache>(from: &C, to: &C) -> Result<usize> {
    let mut count = 0;
    for request in from.keys().await? {
        if let Some(response) = from.get(&request).await? {
            to.put(&request, response).await?;
            count += 1;
        }
    }
    Ok(count)
}
