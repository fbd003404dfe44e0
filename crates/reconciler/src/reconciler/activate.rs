use shared::ResourceManifest;
use tracing::{debug, error, info, warn};

use super::{copy_entries, CacheReconciler};
use crate::{
    error::{Result, ResultContext},
    key::content_key,
    platform::{
        Cache, CacheStorage, FetchMode, Host, HostRequest, HostResponse, Lifecycle, Platform,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No earlier snapshot, the content cache was rebuilt from the shell files
    Bootstrapped { installed: usize },
    /// Entries whose fingerprint changed were evicted, the rest kept
    Upgraded {
        evicted: usize,
        retained: usize,
        installed: usize,
    },
    /// Reconciliation failed and every store was deleted
    Reset { reason: String },
}

impl<H: Host> CacheReconciler<H> {
    /// Moves the staged shell files into the content cache, evicting whatever
    /// the new manifest no longer vouches for, then records the manifest for
    /// the next upgrade and claims the open clients.
    ///
    /// Never fails: any error wipes all three stores so the next activation
    /// starts from scratch.
    pub async fn on_activate(&self) -> ActivationOutcome {
        info!(version = %self.package.version, "Activating");

        let outcome = match self.reconcile().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(version = %self.package.version, "Failed to upgrade service worker: {e}");
                self.reset().await;
                return ActivationOutcome::Reset {
                    reason: e.to_string(),
                };
            }
        };

        // The caches are consistent at this point, a failed claim only means
        // open clients stay uncontrolled until they reload
        if let Err(e) = self.host.claim_clients().await {
            warn!("Failed to claim clients: {e}");
        }

        info!(version = %self.package.version, ?outcome, "Activation successful");
        outcome
    }

    async fn reconcile(&self) -> Result<ActivationOutcome> {
        let content = self.open(&self.config.content_cache).await?;
        let staging = self.open(&self.config.staging_cache).await?;
        let manifests = self.open(&self.config.manifest_cache).await?;

        let snapshot_request = self
            .host
            .request(&self.config.snapshot_key, FetchMode::Default)?;
        let snapshot = manifests
            .get(&snapshot_request)
            .await
            .context("Reading snapshot")?;
        let previous = match snapshot {
            Some(response) => Some(read_snapshot(response).await?),
            None => None,
        };

        let outcome = match previous {
            None => {
                info!("No manifest snapshot, rebuilding the content cache");
                drop(content);
                self.host
                    .delete_cache(&self.config.content_cache)
                    .await
                    .context("Clearing content cache")?;
                let content = self.open(&self.config.content_cache).await?;

                let installed = copy_entries(&staging, &content)
                    .await
                    .context("Copying shell files")?;
                ActivationOutcome::Bootstrapped { installed }
            }
            Some(previous) => {
                let (evicted, retained) = self.evict_changed(&content, &previous).await?;
                let installed = copy_entries(&staging, &content)
                    .await
                    .context("Copying shell files")?;
                ActivationOutcome::Upgraded {
                    evicted,
                    retained,
                    installed,
                }
            }
        };

        self.host
            .delete_cache(&self.config.staging_cache)
            .await
            .context("Deleting staging cache")?;

        let snapshot = serde_json::to_string(&self.package.resources)?;
        manifests
            .put(&snapshot_request, H::Response::from_text(snapshot)?)
            .await
            .context("Saving snapshot")?;

        Ok(outcome)
    }

    /// Deletes every entry of `content` that is gone from the manifest or
    /// whose fingerprint differs from the one in `previous`
    async fn evict_changed(
        &self,
        content: &H::Cache,
        previous: &ResourceManifest,
    ) -> Result<(usize, usize)> {
        let origin = self.host.origin();
        let (mut evicted, mut retained) = (0, 0);

        for request in content.keys().await.context("Listing content cache")? {
            let url = request.url();
            let unchanged = content_key(&url, &origin).is_some_and(|key| {
                self.package
                    .resources
                    .is_unchanged_since(key.as_str(), previous)
            });

            if unchanged {
                retained += 1;
            } else {
                content
                    .delete(&request)
                    .await
                    .with_context(|| format!("Evicting {url}"))?;
                debug!(%url, "Evicted");
                evicted += 1;
            }
        }

        Ok((evicted, retained))
    }

    async fn open(&self, name: &str) -> Result<H::Cache> {
        self.host
            .open_cache(name)
            .await
            .with_context(|| format!("Opening {name}"))
    }

    /// Deletes every store, logging rather than stopping at failures
    async fn reset(&self) {
        for name in self.config.cache_names() {
            if let Err(e) = self.host.delete_cache(name).await {
                error!(cache = name, "Failed to delete cache: {e}");
            }
        }
    }
}

async fn read_snapshot<R: HostResponse>(response: R) -> Result<ResourceManifest> {
    let text = response
        .text()
        .await
        .context("Reading snapshot body")?;
    Ok(serde_json::from_str(&text)?)
}
