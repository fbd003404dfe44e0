//! wasm entry points binding [`CacheReconciler`] to the service worker events.
//!
//! `register_listeners.js` calls [`worker_init`] once with the deployment's offline
//! package, then forwards every install, activate, fetch and message event.

use std::{cell::RefCell, rc::Rc};

use console_error_panic_hook::set_once as set_panic_hook;
use gloo::utils::format::JsValueSerdeExt;
use js_sys::Promise;
use reconciler::{CacheReconciler, ReconcilerConfig, Route};
use shared::{utils::tracing::configure_tracing_once as configure_tracing, OfflinePackage};
use tracing::{debug, warn};
use wasm_bindgen::{prelude::wasm_bindgen, JsValue};
use wasm_bindgen_futures::future_to_promise;
use web_sys::{ExtendableMessageEvent, FetchEvent, ServiceWorkerGlobalScope};

mod error;
mod host;

use error::to_js;
pub use error::JsError;
pub use host::{WebCache, WebHost, WebRequest, WebResponse};

type Reconciler = CacheReconciler<WebHost>;

thread_local! {
    static RECONCILER: RefCell<Option<Rc<Reconciler>>> = const { RefCell::new(None) };
}

fn reconciler() -> Result<Rc<Reconciler>, JsValue> {
    RECONCILER
        .with(|r| r.borrow().clone())
        .ok_or_else(|| to_js("worker_init must be called before handling events"))
}

/// Sets up the reconciler for this worker.
///
/// `package` is the deployment's offline package, `config` an optional
/// partial [`ReconcilerConfig`].
#[wasm_bindgen]
pub fn worker_init(
    sw: ServiceWorkerGlobalScope,
    package: JsValue,
    config: JsValue,
) -> Result<(), JsValue> {
    set_panic_hook();
    configure_tracing();

    let package: OfflinePackage = JsValueSerdeExt::into_serde(&package).map_err(to_js)?;
    let config: ReconcilerConfig = if config.is_undefined() || config.is_null() {
        ReconcilerConfig::default()
    } else {
        JsValueSerdeExt::into_serde(&config).map_err(to_js)?
    };

    debug!(version = %package.version, resources = package.resources.len(), "worker_init");
    let reconciler = CacheReconciler::new(WebHost::new(sw), package, config)
        .map_err(to_js)?;
    RECONCILER.with(|r| r.replace(Some(Rc::new(reconciler))));

    Ok(())
}

#[wasm_bindgen]
pub fn worker_install() -> Result<Promise, JsValue> {
    let reconciler = reconciler()?;

    Ok(future_to_promise(async move {
        let count = reconciler.on_install().await.map_err(to_js)?;
        Ok(JsValue::from(count as u32))
    }))
}

#[wasm_bindgen]
pub fn worker_activate() -> Result<Promise, JsValue> {
    let reconciler = reconciler()?;

    Ok(future_to_promise(async move {
        let outcome = reconciler.on_activate().await;
        Ok(JsValue::from(format!("{outcome:?}")))
    }))
}

/// Calls `respondWith` for manifest resources. Returns without responding for
/// everything else so the browser handles it normally.
#[wasm_bindgen]
pub fn worker_fetch(event: FetchEvent) -> Result<(), JsValue> {
    let reconciler = reconciler()?;

    let request = match WebRequest::try_from(event.request()) {
        Ok(request) => request,
        Err(e) => {
            warn!("Not intercepting request: {e}");
            return Ok(());
        }
    };

    let route = reconciler.route(&request);
    if route == Route::Passthrough {
        return Ok(());
    }

    let response = future_to_promise(async move {
        match reconciler.respond(route, &request).await.map_err(to_js)? {
            Some(response) => Ok(response.into()),
            None => Err(to_js("No response for an intercepted request")),
        }
    });
    event.respond_with(&response)?;

    Ok(())
}

#[wasm_bindgen]
pub fn worker_message(event: ExtendableMessageEvent) -> Result<Promise, JsValue> {
    let reconciler = reconciler()?;

    let Some(message) = event.data().as_string() else {
        debug!("worker_message got unexpected message: {:?}", event.data());
        return Ok(Promise::resolve(&JsValue::undefined()));
    };

    Ok(future_to_promise(async move {
        let outcome = reconciler.on_message(&message).await.map_err(to_js)?;
        Ok(JsValue::from(format!("{outcome:?}")))
    }))
}
