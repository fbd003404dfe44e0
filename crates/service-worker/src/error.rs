use js_sys::{
    Error as GenericJsError, RangeError as JsRangeError, ReferenceError as JsReferenceError,
    SyntaxError as JsSyntaxError, TypeError as JsTypeError, UriError as JsUriError,
};
use reconciler::ReconcilerError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, Clone, Error)]
pub enum JsError {
    #[error("GenericJs Error: {}", String::from(.0.message()))]
    GenericJs(GenericJsError),
    #[error("JsRange Error: {}", String::from(.0.message()))]
    JsRange(JsRangeError),
    #[error("JsReference Error: {}", String::from(.0.message()))]
    JsReference(JsReferenceError),
    #[error("JsSyntax Error: {}", String::from(.0.message()))]
    JsSyntax(JsSyntaxError),
    #[error("JsType Error: {}", String::from(.0.message()))]
    JsType(JsTypeError),
    #[error("JsUri Error: {}", String::from(.0.message()))]
    JsUri(JsUriError),
    #[error("UnknownJsValue Error: {0}")]
    UnknownJsValue(String),
}

impl From<JsValue> for JsError {
    fn from(err: JsValue) -> JsError {
        if err.is_instance_of::<JsRangeError>() {
            return JsError::JsRange(err.into());
        }
        if err.is_instance_of::<JsReferenceError>() {
            return JsError::JsReference(err.into());
        }
        if err.is_instance_of::<JsSyntaxError>() {
            return JsError::JsSyntax(err.into());
        }
        if err.is_instance_of::<JsTypeError>() {
            return JsError::JsType(err.into());
        }
        if err.is_instance_of::<JsUriError>() {
            return JsError::JsUri(err.into());
        }
        if err.is_instance_of::<GenericJsError>() {
            return JsError::GenericJs(err.into());
        }
        JsError::UnknownJsValue(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
    }
}

/// Maps thrown JS values onto the reconciler error for the collaborator that
/// threw them
pub(crate) trait JsResultExt<T> {
    fn store_err(self) -> Result<T, ReconcilerError>;
    fn network_err(self) -> Result<T, ReconcilerError>;
    fn lifecycle_err(self) -> Result<T, ReconcilerError>;
}

impl<T> JsResultExt<T> for Result<T, JsValue> {
    fn store_err(self) -> Result<T, ReconcilerError> {
        self.map_err(|e| ReconcilerError::Store(JsError::from(e).to_string()))
    }

    fn network_err(self) -> Result<T, ReconcilerError> {
        self.map_err(|e| ReconcilerError::Network(JsError::from(e).to_string()))
    }

    fn lifecycle_err(self) -> Result<T, ReconcilerError> {
        self.map_err(|e| ReconcilerError::Lifecycle(JsError::from(e).to_string()))
    }
}

/// Rejection value handed back across the wasm-bindgen boundary
pub(crate) fn to_js(err: impl std::fmt::Display) -> JsValue {
    GenericJsError::new(&err.to_string()).into()
}
