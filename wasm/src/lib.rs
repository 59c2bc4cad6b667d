//! WebAssembly bindings for `pwakit_core`.
//!
//! Exposes the service worker agent as the `ServiceWorker` class and the passkey
//! ceremonies as `registerWebAuthnCredential` / `loginWithWebAuthn` through `wasm-bindgen`.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::rc::Rc;
use std::sync::Arc;

use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{ExtendableEvent, FetchEvent, NotificationEvent, PushEvent, ServiceWorkerGlobalScope};

use pwakit_core::agent::{OfflineAgent, Url};
use pwakit_core::logger::{self, LogLevel, Logger};
use pwakit_core::AgentConfig;

mod ceremony;
mod host;

pub use ceremony::{login_with_webauthn, register_webauthn_credential};
use host::{describe, BrowserHost, FetchRequest, ShownNotification};

/// Installs the panic hook when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Writes log records to the devtools console.
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: String) {
        let message = JsValue::from_str(&message);
        match level {
            LogLevel::Trace | LogLevel::Debug => web_sys::console::debug_1(&message),
            LogLevel::Info => web_sys::console::info_1(&message),
            LogLevel::Warn => web_sys::console::warn_1(&message),
            LogLevel::Error => web_sys::console::error_1(&message),
        }
    }
}

/// Routes the crate's log output to the console. Later calls are ignored.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    logger::set_logger(Arc::new(ConsoleLogger));
}

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

fn done() -> Result<JsValue, JsValue> {
    Ok(JsValue::UNDEFINED)
}

/// Keeps the worker alive until `task` settles.
fn extend(event: &ExtendableEvent, kind: &str, task: &Promise) {
    if let Err(err) = event.wait_until(task) {
        log::warn!("{kind}: waitUntil rejected: {}", describe(&err));
    }
}

/// The offline cache and notification agent bound to the worker global scope.
#[wasm_bindgen]
pub struct ServiceWorker {
    global: ServiceWorkerGlobalScope,
    agent: Rc<OfflineAgent<BrowserHost>>,
}

#[wasm_bindgen]
impl ServiceWorker {
    /// Creates the agent for the current registration.
    ///
    /// `config_json` is an optional JSON `AgentConfig`; missing fields take their defaults.
    ///
    /// # Errors
    /// Throws when not running in a service worker or when the configuration is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Self, JsValue> {
        let global = js_sys::global()
            .dyn_into::<ServiceWorkerGlobalScope>()
            .map_err(|_| js_error("ServiceWorker must be created inside a service worker"))?;

        let config = match config_json {
            Some(json) => AgentConfig::from_json(&json).map_err(|e| js_error(&e.to_string()))?,
            None => AgentConfig::default(),
        };
        let scope = Url::parse(&global.registration().scope())
            .map_err(|e| js_error(&format!("invalid registration scope: {e}")))?;

        let host = Rc::new(BrowserHost::new(global.clone()));
        let agent = OfflineAgent::new(host, config, scope).map_err(|e| js_error(&e.to_string()))?;
        log::info!("service worker agent created for {}", agent.config().cache_name);

        Ok(Self {
            global,
            agent: Rc::new(agent),
        })
    }

    /// Name of the current cache generation.
    #[wasm_bindgen(getter, js_name = cacheName)]
    #[must_use]
    pub fn cache_name(&self) -> String {
        self.agent.config().cache_name.clone()
    }

    /// Current lifecycle state, e.g. `"activated"`.
    #[must_use]
    pub fn lifecycle(&self) -> String {
        self.agent.lifecycle().to_string()
    }

    /// Registers the `install`, `activate`, `fetch`, `push` and `notificationclick` listeners.
    ///
    /// # Errors
    /// Throws if a listener cannot be attached.
    pub fn listen(&self) -> Result<(), JsValue> {
        let agent = Rc::clone(&self.agent);
        self.on("install", move |event: ExtendableEvent| {
            let agent = Rc::clone(&agent);
            let task = future_to_promise(async move {
                agent.on_install().await;
                done()
            });
            extend(&event, "install", &task);
        })?;

        let agent = Rc::clone(&self.agent);
        self.on("activate", move |event: ExtendableEvent| {
            let agent = Rc::clone(&agent);
            let task = future_to_promise(async move {
                agent.on_activate().await;
                done()
            });
            extend(&event, "activate", &task);
        })?;

        let agent = Rc::clone(&self.agent);
        self.on("fetch", move |event: FetchEvent| {
            let agent = Rc::clone(&agent);
            let request = event.request();
            let url = request.url();
            let waiter: ExtendableEvent = Clone::clone(&event).unchecked_into();
            let response = future_to_promise(async move {
                let mut interception = agent.on_fetch(FetchRequest(request)).await;
                if let Some(write) = interception.cache_write.take() {
                    let task = future_to_promise(async move {
                        write.await;
                        done()
                    });
                    extend(&waiter, "fetch", &task);
                }
                interception
                    .into_response(&url)
                    .map(|response| response.0.into())
                    .map_err(|e| js_error(&e.to_string()))
            });
            if let Err(err) = event.respond_with(&response) {
                log::warn!("fetch: respondWith rejected: {}", describe(&err));
            }
        })?;

        let agent = Rc::clone(&self.agent);
        self.on("push", move |event: PushEvent| {
            let agent = Rc::clone(&agent);
            let payload = event.data().map(|data| data.text());
            let task = future_to_promise(async move {
                agent.on_push(payload.as_deref()).await;
                done()
            });
            extend(&event, "push", &task);
        })?;

        let agent = Rc::clone(&self.agent);
        self.on("notificationclick", move |event: NotificationEvent| {
            let agent = Rc::clone(&agent);
            let notification = ShownNotification(event.notification());
            let task = future_to_promise(async move {
                let outcome = agent.on_notification_click(&notification).await;
                log::debug!("notification click: {outcome:?}");
                done()
            });
            extend(&event, "notificationclick", &task);
        })?;

        log::info!("service worker listeners registered");
        Ok(())
    }
}

impl ServiceWorker {
    fn on<E, F>(&self, kind: &str, handler: F) -> Result<(), JsValue>
    where
        E: JsCast + wasm_bindgen::convert::FromWasmAbi + 'static,
        F: FnMut(E) + 'static,
    {
        let listener = Closure::<dyn FnMut(E)>::new(handler);
        self.global
            .add_event_listener_with_callback(kind, listener.as_ref().unchecked_ref())?;
        // Listeners live as long as the worker.
        listener.forget();
        Ok(())
    }
}

#[wasm_bindgen(typescript_custom_section)]
const TYPESCRIPT_DEFS: &str = r#"
/** `Notification.data` of every notification shown by the service worker. */
export interface BisNotificationData {
    url: string;
    benachrichtigung_id?: number;
}
"#;
