use tracing::info;

use super::CacheReconciler;
use crate::{
    error::{Result, ResultContext},
    platform::{CacheStorage, FetchMode, Host, Lifecycle},
};

impl<H: Host> CacheReconciler<H> {
    /// Downloads the shell files into a fresh staging cache, bypassing the
    /// HTTP cache, and asks the host to activate this worker straight away.
    ///
    /// Whatever an earlier install left in staging without being activated is
    /// thrown away first. Fails without storing anything if any shell file
    /// can't be fetched.
    pub async fn on_install(&self) -> Result<usize> {
        info!(version = %self.package.version, "Installing");

        self.host.skip_waiting().context("Skipping waiting")?;

        let staging_name = &self.config.staging_cache;
        self.host
            .delete_cache(staging_name)
            .await
            .with_context(|| format!("Clearing {staging_name}"))?;
        let staging = self
            .host
            .open_cache(staging_name)
            .await
            .with_context(|| format!("Opening {staging_name}"))?;

        let requests = self
            .package
            .core
            .iter()
            .map(|path| self.resource_request(path, FetchMode::Reload))
            .collect::<Result<Vec<_>>>()?;

        let count = self
            .add_all(&staging, requests)
            .await
            .context("Downloading shell files")?;

        info!(version = %self.package.version, count, "Install successful");
        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use tokio_test::block_on;

    use super::super::test_support::*;
    use crate::{
        error::ReconcilerError,
        memory::{MemoryPlatform, MemoryResponse},
        platform::FetchMode,
        ActivationOutcome, ReconcilerConfig,
    };

    #[test]
    fn test_install_stages_shell_files_with_reload() {
        let platform = MemoryPlatform::new(ORIGIN);
        let package = package(
            "1",
            &[("/", "h1"), ("main.js", "h2"), ("assets/logo.png", "h3")],
            &["main.js", "/"],
        );
        serve_all(&platform, &package);
        let reconciler = reconciler(&platform, package);

        let count = block_on(reconciler.on_install()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(platform.skip_waiting_calls(), 1);
        let staging = &ReconcilerConfig::default().staging_cache;
        assert_eq!(
            platform.cached_urls(staging),
            ["https://app.test/", "https://app.test/main.js"]
        );
        assert_eq!(
            platform.cached(staging, "main.js").unwrap().body,
            body("main.js", "1")
        );
        let fetches = platform.fetches();
        assert!(fetches.iter().all(|r| r.mode == FetchMode::Reload));
        // Non-shell resources are left for lazy population
        assert!(!platform
            .fetched_urls()
            .iter()
            .any(|u| u.ends_with("logo.png")));
    }

    #[test]
    fn test_install_failure_commits_nothing() {
        let platform = MemoryPlatform::new(ORIGIN);
        let package = package("1", &[("/", "h1"), ("main.js", "h2")], &["/", "main.js"]);
        platform.serve("/", MemoryResponse::ok_with("index"));
        platform.make_unreachable("main.js");
        let reconciler = reconciler(&platform, package);

        let err = block_on(reconciler.on_install()).unwrap_err();

        assert!(matches!(err.root(), ReconcilerError::Network(_)));
        let staging = &ReconcilerConfig::default().staging_cache;
        assert!(platform.cached_urls(staging).is_empty());
    }

    #[test]
    fn test_install_rejects_missing_shell_file() {
        let platform = MemoryPlatform::new(ORIGIN);
        let package = package("1", &[("/", "h1"), ("main.js", "h2")], &["main.js"]);
        let reconciler = reconciler(&platform, package);

        let err = block_on(reconciler.on_install()).unwrap_err();

        assert!(matches!(
            err.root(),
            ReconcilerError::BadResponse { status: 404, .. }
        ));
    }

    #[test]
    fn test_install_discards_unactivated_staging() {
        let platform = MemoryPlatform::new(ORIGIN);
        let staging = &ReconcilerConfig::default().staging_cache;
        let content = &ReconcilerConfig::default().content_cache;

        let v1 = package("1", &[("/", "h1"), ("lib.js", "l1")], &["/"]);
        serve_all(&platform, &v1);
        let first = reconciler(&platform, v1);
        block_on(first.on_install()).unwrap();
        block_on(first.on_activate());

        // v2 makes lib.js a shell file but is replaced before it activates
        let v2 = package("2", &[("/", "h2"), ("lib.js", "l2")], &["/", "lib.js"]);
        serve_all(&platform, &v2);
        block_on(reconciler(&platform, v2).on_install()).unwrap();
        assert_eq!(
            platform.cached(staging, "lib.js").unwrap().body,
            body("lib.js", "2")
        );

        let v3 = package("3", &[("/", "h3"), ("lib.js", "l3")], &["/"]);
        serve_all(&platform, &v3);
        let third = reconciler(&platform, v3);
        block_on(third.on_install()).unwrap();
        assert_eq!(platform.cached_urls(staging), ["https://app.test/"]);

        let outcome = block_on(third.on_activate());
        assert_eq!(
            outcome,
            ActivationOutcome::Upgraded {
                evicted: 1,
                retained: 0,
                installed: 1
            }
        );
        assert_eq!(platform.cached(content, "lib.js"), None);
        assert_eq!(platform.cached(content, "/").unwrap().body, body("/", "3"));
    }
}
