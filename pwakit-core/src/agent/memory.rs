//! In-memory implementation of the agent platform traits for testing.
//!
//! The host models one origin: a map of resources the "network" serves, a switch that
//! takes the network offline, named cache generations keyed by [`RequestKey`], and
//! recorders for notifications and windows.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use async_trait::async_trait;
use reqwest::Url;

use super::error::{AgentError, AgentResult};
use super::notification::NotificationDescriptor;
use super::platform::{
    CacheStorage, DisplayedNotification, Exchange, Network, NotificationSurface,
    RequestInfo, ResponseInfo, WindowClient, WindowClients,
};

// =============================================================================
// Requests and responses
// =============================================================================

/// A request as seen by the memory host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRequest {
    /// HTTP method.
    pub method: String,
    /// Absolute URL.
    pub url: Url,
}

impl MemoryRequest {
    /// A `GET` of `url`.
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// A request with an arbitrary method.
    #[must_use]
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: Url::parse(url).expect("valid test url"),
        }
    }
}

impl RequestInfo for MemoryRequest {
    fn method(&self) -> String {
        self.method.clone()
    }

    fn url(&self) -> String {
        self.url.to_string()
    }
}

/// Cache key: upper-cased method plus the URL without its fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    /// Normalizes a request identity.
    #[must_use]
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }
}

/// Captured response: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    /// A response with `status` and `body` and no headers.
    #[must_use]
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

impl ResponseInfo for ResponseSnapshot {
    fn status(&self) -> u16 {
        self.status
    }

    fn duplicate(&self) -> AgentResult<Self> {
        Ok(self.clone())
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// A notification delivered to a click handler.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotification {
    tag: String,
    target_url: Option<String>,
    closed: Rc<Cell<bool>>,
}

impl MemoryNotification {
    /// A notification carrying `target_url` in its data.
    #[must_use]
    pub fn new(tag: &str, target_url: Option<&str>) -> Self {
        Self {
            tag: tag.to_string(),
            target_url: target_url.map(ToString::to_string),
            closed: Rc::new(Cell::new(false)),
        }
    }

    /// Whether `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl DisplayedNotification for MemoryNotification {
    fn tag(&self) -> String {
        self.tag.clone()
    }

    fn target_url(&self) -> Option<String> {
        self.target_url.clone()
    }

    fn close(&self) {
        self.closed.set(true);
    }
}

// =============================================================================
// Host
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    origin: HashMap<RequestKey, ResponseSnapshot>,
    generations: BTreeMap<String, HashMap<RequestKey, ResponseSnapshot>>,
    offline: bool,
    cache_broken: bool,
    notifications_blocked: bool,
    windows: Option<Vec<WindowClient>>,
    window_listing_broken: bool,
    fetched: Vec<String>,
    shown: Vec<NotificationDescriptor>,
    focused: Vec<String>,
    opened: Vec<String>,
}

/// In-memory service worker host.
///
/// **FOR TESTING ONLY.**
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: RefCell<MemoryState>,
}

impl MemoryHost {
    /// Creates an online host with no resources, no caches and no open windows.
    #[must_use]
    pub fn new() -> Self {
        let host = Self::default();
        host.state.borrow_mut().windows = Some(Vec::new());
        host
    }

    /// Makes the network answer `GET url` with `response`.
    pub fn serve(&self, url: &str, response: ResponseSnapshot) {
        let key = RequestKey::new("GET", &Url::parse(url).expect("valid test url"));
        self.state.borrow_mut().origin.insert(key, response);
    }

    /// Makes the network answer `method url` with `response`.
    pub fn serve_method(&self, method: &str, url: &str, response: ResponseSnapshot) {
        let key = RequestKey::new(method, &Url::parse(url).expect("valid test url"));
        self.state.borrow_mut().origin.insert(key, response);
    }

    /// Takes the network offline (every fetch rejects) or back online.
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Makes every cache operation fail.
    pub fn set_cache_broken(&self, broken: bool) {
        self.state.borrow_mut().cache_broken = broken;
    }

    /// Makes displaying notifications fail.
    pub fn set_notifications_blocked(&self, blocked: bool) {
        self.state.borrow_mut().notifications_blocked = blocked;
    }

    /// Sets the open windows; `None` makes window enumeration unavailable.
    pub fn set_windows(&self, windows: Option<Vec<WindowClient>>) {
        self.state.borrow_mut().windows = windows;
    }

    /// Makes window enumeration fail while focusing and opening keep working.
    pub fn set_window_listing_broken(&self, broken: bool) {
        self.state.borrow_mut().window_listing_broken = broken;
    }

    /// Creates an empty cache generation directly, bypassing the agent.
    pub fn seed_generation(&self, name: &str) {
        self.state
            .borrow_mut()
            .generations
            .entry(name.to_string())
            .or_default();
    }

    /// Names of the existing cache generations, sorted.
    #[must_use]
    pub fn generation_names(&self) -> Vec<String> {
        self.state.borrow().generations.keys().cloned().collect()
    }

    /// Cached response for `GET url` in generation `name`.
    #[must_use]
    pub fn cached(&self, name: &str, url: &str) -> Option<ResponseSnapshot> {
        let key = RequestKey::new("GET", &Url::parse(url).expect("valid test url"));
        self.state
            .borrow()
            .generations
            .get(name)
            .and_then(|generation| generation.get(&key).cloned())
    }

    /// Number of entries in generation `name`.
    #[must_use]
    pub fn entry_count(&self, name: &str) -> usize {
        self.state
            .borrow()
            .generations
            .get(name)
            .map_or(0, HashMap::len)
    }

    /// URLs sent to the network, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.state.borrow().fetched.clone()
    }

    /// Notifications shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<NotificationDescriptor> {
        self.state.borrow().shown.clone()
    }

    /// Ids of focused windows, in order.
    #[must_use]
    pub fn focused(&self) -> Vec<String> {
        self.state.borrow().focused.clone()
    }

    /// URLs of opened windows, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.state.borrow().opened.clone()
    }

    fn serve_from_origin(&self, key: &RequestKey, url: &str) -> AgentResult<ResponseSnapshot> {
        let mut state = self.state.borrow_mut();
        state.fetched.push(url.to_string());
        if state.offline {
            return Err(AgentError::Network(format!("failed to fetch {url}")));
        }
        Ok(state
            .origin
            .get(key)
            .cloned()
            .unwrap_or_else(|| ResponseSnapshot::new(404, "not found")))
    }

    fn ensure_cache(&self) -> AgentResult<()> {
        if self.state.borrow().cache_broken {
            return Err(AgentError::Cache("cache storage unavailable".to_string()));
        }
        Ok(())
    }

    fn lookup(&self, key: &RequestKey) -> AgentResult<Option<ResponseSnapshot>> {
        self.ensure_cache()?;
        Ok(self
            .state
            .borrow()
            .generations
            .values()
            .find_map(|generation| generation.get(key).cloned()))
    }
}

impl Exchange for MemoryHost {
    type Request = MemoryRequest;
    type Response = ResponseSnapshot;
}

#[async_trait(?Send)]
impl CacheStorage for MemoryHost {
    async fn open(&self, name: &str) -> AgentResult<()> {
        self.ensure_cache()?;
        self.seed_generation(name);
        Ok(())
    }

    async fn add_all(&self, name: &str, urls: &[Url]) -> AgentResult<()> {
        self.ensure_cache()?;
        let mut fetched = Vec::with_capacity(urls.len());
        for url in urls {
            let key = RequestKey::new("GET", url);
            let response = self.serve_from_origin(&key, url.as_str())?;
            if !(200..300).contains(&response.status) {
                return Err(AgentError::Cache(format!(
                    "{url} answered with status {}",
                    response.status
                )));
            }
            fetched.push((key, response));
        }

        self.state
            .borrow_mut()
            .generations
            .entry(name.to_string())
            .or_default()
            .extend(fetched);
        Ok(())
    }

    async fn put(
        &self,
        name: &str,
        request: &MemoryRequest,
        response: ResponseSnapshot,
    ) -> AgentResult<()> {
        self.ensure_cache()?;
        let key = RequestKey::new(&request.method, &request.url);
        self.state
            .borrow_mut()
            .generations
            .entry(name.to_string())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn match_request(
        &self,
        request: &MemoryRequest,
    ) -> AgentResult<Option<ResponseSnapshot>> {
        // The platform cache only answers GET lookups.
        if !request.is_get() {
            self.ensure_cache()?;
            return Ok(None);
        }
        self.lookup(&RequestKey::new(&request.method, &request.url))
    }

    async fn match_url(&self, url: &Url) -> AgentResult<Option<ResponseSnapshot>> {
        self.lookup(&RequestKey::new("GET", url))
    }

    async fn keys(&self) -> AgentResult<Vec<String>> {
        self.ensure_cache()?;
        Ok(self.generation_names())
    }

    async fn delete(&self, name: &str) -> AgentResult<bool> {
        self.ensure_cache()?;
        Ok(self.state.borrow_mut().generations.remove(name).is_some())
    }
}

#[async_trait(?Send)]
impl Network for MemoryHost {
    async fn fetch(&self, request: &MemoryRequest) -> AgentResult<ResponseSnapshot> {
        let key = RequestKey::new(&request.method, &request.url);
        self.serve_from_origin(&key, request.url.as_str())
    }
}

#[async_trait(?Send)]
impl NotificationSurface for MemoryHost {
    type Notification = MemoryNotification;

    async fn show(&self, notification: &NotificationDescriptor) -> AgentResult<()> {
        let mut state = self.state.borrow_mut();
        if state.notifications_blocked {
            return Err(AgentError::Notification("permission denied".to_string()));
        }
        state.shown.push(notification.clone());
        Ok(())
    }
}

#[async_trait(?Send)]
impl WindowClients for MemoryHost {
    async fn match_all(&self, _include_uncontrolled: bool) -> AgentResult<Vec<WindowClient>> {
        let state = self.state.borrow();
        if state.window_listing_broken {
            return Err(AgentError::Clients("matchAll rejected".to_string()));
        }
        state
            .windows
            .clone()
            .ok_or_else(|| AgentError::Clients("clients api unavailable".to_string()))
    }

    async fn focus(&self, id: &str) -> AgentResult<()> {
        let mut state = self.state.borrow_mut();
        let windows = state
            .windows
            .as_mut()
            .ok_or_else(|| AgentError::Clients("clients api unavailable".to_string()))?;
        let mut found = false;
        for window in windows.iter_mut() {
            window.focused = window.id == id;
            found |= window.focused;
        }
        if !found {
            return Err(AgentError::Clients(format!("no window with id {id}")));
        }
        state.focused.push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> AgentResult<()> {
        let mut state = self.state.borrow_mut();
        let windows = state
            .windows
            .as_mut()
            .ok_or_else(|| AgentError::Clients("clients api unavailable".to_string()))?;
        let id = format!("window-{}", windows.len() + 1);
        windows.push(WindowClient {
            id,
            url: url.to_string(),
            focused: true,
        });
        state.opened.push(url.to_string());
        Ok(())
    }
}
