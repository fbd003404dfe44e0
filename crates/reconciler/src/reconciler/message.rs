use std::{collections::BTreeSet, str::FromStr};

use thiserror::Error;
use tracing::{debug, info};

use super::CacheReconciler;
use crate::{
    error::{Result, ResultContext},
    key::content_key,
    platform::{Cache, CacheStorage, FetchMode, Host, HostRequest, Lifecycle},
};

const SKIP_WAITING: &str = "skipWaiting";
const DOWNLOAD_OFFLINE: &str = "downloadOffline";

/// Commands the page can post to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate a waiting worker now. The page still has to reload to pick
    /// up the new version.
    SkipWaiting,
    /// Download every manifest resource that isn't cached yet
    DownloadOffline,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown control message: {0:?}")]
pub struct UnknownMessage(pub String);

impl FromStr for ControlMessage {
    type Err = UnknownMessage;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            SKIP_WAITING => Ok(Self::SkipWaiting),
            DOWNLOAD_OFFLINE => Ok(Self::DownloadOffline),
            other => Err(UnknownMessage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    SkippedWaiting,
    Downloaded { fetched: usize },
    Ignored,
}

impl<H: Host> CacheReconciler<H> {
    pub async fn on_message(&self, message: &str) -> Result<MessageOutcome> {
        match message.parse::<ControlMessage>() {
            Ok(ControlMessage::SkipWaiting) => {
                info!("Skipping waiting on request");
                self.host.skip_waiting()?;
                Ok(MessageOutcome::SkippedWaiting)
            }
            Ok(ControlMessage::DownloadOffline) => {
                let fetched = self.download_offline().await?;
                Ok(MessageOutcome::Downloaded { fetched })
            }
            Err(e) => {
                debug!("{e}");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Fetches and caches every manifest resource missing from the content
    /// cache. All or nothing, like install.
    pub async fn download_offline(&self) -> Result<usize> {
        let content = self
            .host
            .open_cache(&self.config.content_cache)
            .await
            .with_context(|| format!("Opening {}", self.config.content_cache))?;

        let origin = self.host.origin();
        let present: BTreeSet<_> = content
            .keys()
            .await?
            .iter()
            .filter_map(|request| content_key(&request.url(), &origin))
            .collect();

        let missing = self
            .package
            .resources
            .paths()
            .filter(|path| !present.contains(*path))
            .map(|path| self.resource_request(path, FetchMode::Default))
            .collect::<Result<Vec<_>>>()?;

        if missing.is_empty() {
            info!("Every resource is already available offline");
            return Ok(0);
        }

        info!(count = missing.len(), "Downloading resources for offline use");
        self.add_all(&content, missing)
            .await
            .context("Downloading offline resources")
    }
}
