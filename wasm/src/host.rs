//! [`AgentHost`](pwakit_core::agent::AgentHost) on top of the service worker globals.

use async_trait::async_trait;
use js_sys::{Array, Promise, Reflect};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Cache, ClientQueryOptions, ClientType, NotificationOptions, ServiceWorkerGlobalScope,
};

use pwakit_core::agent::{
    AgentError, AgentResult, CacheStorage, DisplayedNotification, Exchange, Network,
    NotificationDescriptor, NotificationSurface, RequestInfo, ResponseInfo, Url, WindowClient,
    WindowClients,
};

/// Readable text for a rejected promise or thrown value.
pub fn describe(value: &JsValue) -> String {
    value.dyn_ref::<js_sys::Error>().map_or_else(
        || value.as_string().unwrap_or_else(|| format!("{value:?}")),
        |error| String::from(error.message()),
    )
}

async fn settle(promise: Promise) -> Result<JsValue, String> {
    JsFuture::from(promise).await.map_err(|e| describe(&e))
}

fn is_missing(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

/// An intercepted `Request`.
#[derive(Debug, Clone)]
pub struct FetchRequest(pub web_sys::Request);

impl RequestInfo for FetchRequest {
    fn method(&self) -> String {
        self.0.method()
    }

    fn url(&self) -> String {
        self.0.url()
    }
}

/// A `Response` from the network or the cache.
#[derive(Debug)]
pub struct FetchResponse(pub web_sys::Response);

impl ResponseInfo for FetchResponse {
    fn status(&self) -> u16 {
        self.0.status()
    }

    fn duplicate(&self) -> AgentResult<Self> {
        self.0
            .clone()
            .map(Self)
            .map_err(|e| AgentError::Cache(format!("cannot clone response: {}", describe(&e))))
    }
}

/// A notification handed to a `notificationclick` listener.
#[derive(Debug)]
pub struct ShownNotification(pub web_sys::Notification);

impl DisplayedNotification for ShownNotification {
    fn tag(&self) -> String {
        self.0.tag().unwrap_or_default()
    }

    fn target_url(&self) -> Option<String> {
        Reflect::get(&self.0.data(), &JsValue::from_str("url"))
            .ok()
            .and_then(|url| url.as_string())
    }

    fn close(&self) {
        self.0.close();
    }
}

/// `data` stored with every notification; read back on click.
#[derive(Serialize)]
struct NotificationData<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    benachrichtigung_id: Option<i64>,
}

/// The service worker global scope as an agent host.
#[derive(Debug, Clone)]
pub struct BrowserHost {
    global: ServiceWorkerGlobalScope,
}

impl BrowserHost {
    pub const fn new(global: ServiceWorkerGlobalScope) -> Self {
        Self { global }
    }

    fn caches(&self) -> AgentResult<web_sys::CacheStorage> {
        self.global
            .caches()
            .map_err(|e| AgentError::Cache(describe(&e)))
    }

    async fn open_cache(&self, name: &str) -> AgentResult<Cache> {
        let cache = settle(self.caches()?.open(name))
            .await
            .map_err(AgentError::Cache)?;
        cache
            .dyn_into::<Cache>()
            .map_err(|_| AgentError::Cache(format!("{name} is not a cache")))
    }

    async fn lookup(&self, promise: Promise) -> AgentResult<Option<FetchResponse>> {
        let found = settle(promise).await.map_err(AgentError::Cache)?;
        if is_missing(&found) {
            return Ok(None);
        }
        Ok(found.dyn_into::<web_sys::Response>().ok().map(FetchResponse))
    }
}

impl Exchange for BrowserHost {
    type Request = FetchRequest;
    type Response = FetchResponse;
}

#[async_trait(?Send)]
impl CacheStorage for BrowserHost {
    async fn open(&self, name: &str) -> AgentResult<()> {
        self.open_cache(name).await.map(|_| ())
    }

    async fn add_all(&self, name: &str, urls: &[Url]) -> AgentResult<()> {
        let cache = self.open_cache(name).await?;
        let requests: Array = urls
            .iter()
            .map(|url| JsValue::from_str(url.as_str()))
            .collect();
        settle(cache.add_all_with_str_sequence(&requests))
            .await
            .map(|_| ())
            .map_err(AgentError::Cache)
    }

    async fn put(
        &self,
        name: &str,
        request: &FetchRequest,
        response: FetchResponse,
    ) -> AgentResult<()> {
        let cache = self.open_cache(name).await?;
        settle(cache.put_with_request(&request.0, &response.0))
            .await
            .map(|_| ())
            .map_err(AgentError::Cache)
    }

    async fn match_request(&self, request: &FetchRequest) -> AgentResult<Option<FetchResponse>> {
        self.lookup(self.caches()?.match_with_request(&request.0))
            .await
    }

    async fn match_url(&self, url: &Url) -> AgentResult<Option<FetchResponse>> {
        self.lookup(self.caches()?.match_with_str(url.as_str()))
            .await
    }

    async fn keys(&self) -> AgentResult<Vec<String>> {
        let names = settle(self.caches()?.keys())
            .await
            .map_err(AgentError::Cache)?;
        Ok(Array::from(&names)
            .iter()
            .filter_map(|name| name.as_string())
            .collect())
    }

    async fn delete(&self, name: &str) -> AgentResult<bool> {
        let deleted = settle(self.caches()?.delete(name))
            .await
            .map_err(AgentError::Cache)?;
        Ok(deleted.as_bool().unwrap_or(false))
    }
}

#[async_trait(?Send)]
impl Network for BrowserHost {
    async fn fetch(&self, request: &FetchRequest) -> AgentResult<FetchResponse> {
        let response = settle(self.global.fetch_with_request(&request.0))
            .await
            .map_err(AgentError::Network)?;
        response
            .dyn_into::<web_sys::Response>()
            .map(FetchResponse)
            .map_err(|_| AgentError::Network("fetch resolved with a non-response".to_string()))
    }
}

#[async_trait(?Send)]
impl NotificationSurface for BrowserHost {
    type Notification = ShownNotification;

    async fn show(&self, notification: &NotificationDescriptor) -> AgentResult<()> {
        let data = NotificationData {
            url: &notification.url,
            benachrichtigung_id: notification.notification_id,
        }
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| AgentError::Notification(e.to_string()))?;

        let options = NotificationOptions::new();
        options.set_body(&notification.body);
        options.set_icon(&notification.icon);
        options.set_badge(&notification.badge);
        options.set_tag(&notification.tag);
        options.set_require_interaction(notification.require_interaction);
        options.set_data(&data);

        let shown = self
            .global
            .registration()
            .show_notification_with_options(&notification.title, &options)
            .map_err(|e| AgentError::Notification(describe(&e)))?;
        settle(shown)
            .await
            .map(|_| ())
            .map_err(AgentError::Notification)
    }
}

#[async_trait(?Send)]
impl WindowClients for BrowserHost {
    async fn match_all(&self, include_uncontrolled: bool) -> AgentResult<Vec<WindowClient>> {
        let options = ClientQueryOptions::new();
        options.set_include_uncontrolled(include_uncontrolled);
        options.set_type(ClientType::Window);

        let clients = settle(self.global.clients().match_all_with_options(&options))
            .await
            .map_err(AgentError::Clients)?;
        Ok(Array::from(&clients)
            .iter()
            .filter_map(|client| client.dyn_into::<web_sys::WindowClient>().ok())
            .map(|client| WindowClient {
                id: client.id(),
                url: client.url(),
                focused: client.focused(),
            })
            .collect())
    }

    async fn focus(&self, id: &str) -> AgentResult<()> {
        let client = settle(self.global.clients().get(id))
            .await
            .map_err(AgentError::Clients)?
            .dyn_into::<web_sys::WindowClient>()
            .map_err(|_| AgentError::Clients(format!("no window with id {id}")))?;
        let focused = client
            .focus()
            .map_err(|e| AgentError::Clients(describe(&e)))?;
        settle(focused)
            .await
            .map(|_| ())
            .map_err(AgentError::Clients)
    }

    async fn open_window(&self, url: &Url) -> AgentResult<()> {
        settle(self.global.clients().open_window(url.as_str()))
            .await
            .map(|_| ())
            .map_err(AgentError::Clients)
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn test_untagged_notification_has_empty_tag() {
        let shown = ShownNotification(web_sys::Notification::new("BIS").unwrap());
        assert_eq!(shown.tag(), "");
        assert_eq!(shown.target_url(), None);
        shown.close();
    }
}
