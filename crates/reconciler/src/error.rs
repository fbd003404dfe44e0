use shared::error::ValidationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcilerError>;

#[derive(Debug, Clone, Error)]
pub enum ReconcilerError {
    #[error("Cache store error: {0}")]
    Store(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
    #[error("Manifest snapshot error: {0}")]
    Snapshot(String),
    #[error("{url} responded with status {status}")]
    BadResponse { url: String, status: u16 },
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
    #[error("{context}: {inner}")]
    WithContext { context: String, inner: Box<Self> },
}

impl ReconcilerError {
    /// The error with any context layers removed
    pub fn root(&self) -> &Self {
        match self {
            Self::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// The network produced no response at all
    pub fn is_network(&self) -> bool {
        matches!(self.root(), Self::Network(_))
    }
}

impl From<serde_json::Error> for ReconcilerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

pub trait ErrorContext<E>: Sized {
    /// Add helpful context to errors
    ///
    /// `context` is provided as a closure to avoid potential formatting cost if
    /// the result isn't an error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F) -> E;
    /// Add helpful context to errors
    fn context<S: Into<String>>(self, context: S) -> E;
}

impl<E: Into<ReconcilerError>> ErrorContext<ReconcilerError> for E {
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, context: F) -> ReconcilerError {
        self.context(context())
    }
    fn context<S: Into<String>>(self, context: S) -> ReconcilerError {
        ReconcilerError::WithContext {
            context: context.into(),
            inner: Box::new(self.into()),
        }
    }
}

pub trait ResultContext<T, E: ErrorContext<E>> {
    fn with_context<S: Into<String>, F: FnOnce() -> S>(
        self,
        context: F,
    ) -> std::result::Result<T, E>;
    fn context<S: Into<String>>(self, context: S) -> std::result::Result<T, E>;
}

impl<T, E: ErrorContext<E>> ResultContext<T, E> for std::result::Result<T, E> {
    fn with_context<S: Into<String>, F: FnOnce() -> S>(
        self,
        context: F,
    ) -> std::result::Result<T, E> {
        self.context(context())
    }
    fn context<S: Into<String>>(self, context: S) -> std::result::Result<T, E> {
        self.map_err(|e| e.context(context))
    }
}

#[cfg(test)]
mod test {
    use super::{ReconcilerError, Result, ResultContext};

    #[test]
    fn test_context_wraps_and_root_unwraps() {
        let r: Result<()> = Err(ReconcilerError::Network("offline".to_string()));
        let err = r
            .context("Fetching main.js")
            .context("Installing")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Installing: Fetching main.js: Network error: offline"
        );
        assert!(matches!(
            err.root(),
            ReconcilerError::Network(m) if m == "offline"
        ));
    }

    #[test]
    fn test_bad_snapshot_json_is_a_snapshot_error() {
        let err: ReconcilerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ReconcilerError::Snapshot(_)));
    }
}
