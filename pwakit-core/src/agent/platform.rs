//! Platform interfaces the offline agent drives.
//!
//! The browser bindings implement these on top of the service worker globals
//! (`caches`, `fetch`, `registration`, `clients`); [`super::memory`] implements them in
//! memory for tests. Everything runs on a single cooperative thread, so futures are not
//! required to be `Send`.

use async_trait::async_trait;
use reqwest::Url;

use super::error::AgentResult;
use super::notification::NotificationDescriptor;

/// Read access to an intercepted request.
pub trait RequestInfo {
    /// HTTP method, e.g. `GET`.
    fn method(&self) -> String;

    /// Absolute request URL.
    fn url(&self) -> String;

    /// Whether the request uses the `GET` method.
    fn is_get(&self) -> bool {
        self.method().eq_ignore_ascii_case("GET")
    }
}

/// Read access to a response, plus the ability to tee it.
pub trait ResponseInfo: Sized {
    /// HTTP status code.
    fn status(&self) -> u16;

    /// Produces an independent copy so one can be cached while the other is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the body was already consumed.
    fn duplicate(&self) -> AgentResult<Self>;
}

/// Binds the request and response types a host works with.
pub trait Exchange {
    /// Request handle, e.g. `web_sys::Request`.
    type Request: RequestInfo + Clone + 'static;
    /// Response handle, e.g. `web_sys::Response`.
    type Response: ResponseInfo + 'static;
}

/// Named, versioned cache generations.
#[async_trait(?Send)]
pub trait CacheStorage: Exchange {
    /// Opens the generation `name`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    async fn open(&self, name: &str) -> AgentResult<()>;

    /// Fetches every URL and stores all responses in `name`, or stores none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if any fetch fails or answers with a non-success status.
    async fn add_all(&self, name: &str, urls: &[Url]) -> AgentResult<()>;

    /// Stores `response` for `request` in generation `name`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn put(
        &self,
        name: &str,
        request: &Self::Request,
        response: Self::Response,
    ) -> AgentResult<()>;

    /// Looks `request` up across all generations.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    async fn match_request(
        &self,
        request: &Self::Request,
    ) -> AgentResult<Option<Self::Response>>;

    /// Looks up a `GET` of `url` across all generations.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    async fn match_url(&self, url: &Url) -> AgentResult<Option<Self::Response>>;

    /// Lists the names of all generations.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    async fn keys(&self) -> AgentResult<Vec<String>>;

    /// Deletes the generation `name`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    async fn delete(&self, name: &str) -> AgentResult<bool>;
}

/// Live network access.
#[async_trait(?Send)]
pub trait Network: Exchange {
    /// Sends `request` to the network.
    ///
    /// Resolves with any response the server produced, including error statuses.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received at all.
    async fn fetch(&self, request: &Self::Request) -> AgentResult<Self::Response>;
}

/// A notification currently shown to the user.
pub trait DisplayedNotification {
    /// Tag the notification was shown with.
    fn tag(&self) -> String;

    /// Navigation target stored with the notification, if any.
    fn target_url(&self) -> Option<String>;

    /// Removes the notification from the notification surface.
    fn close(&self);
}

/// The platform notification surface.
#[async_trait(?Send)]
pub trait NotificationSurface {
    /// Notification handle delivered with click events.
    type Notification: DisplayedNotification;

    /// Displays `notification`.
    ///
    /// # Errors
    ///
    /// Returns an error if permission is missing or the platform refuses.
    async fn show(&self, notification: &NotificationDescriptor) -> AgentResult<()>;
}

/// An open browser window or tab belonging to the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    /// Platform client id.
    pub id: String,
    /// URL currently shown.
    pub url: String,
    /// Whether the window has focus.
    pub focused: bool,
}

/// Window enumeration and navigation.
#[async_trait(?Send)]
pub trait WindowClients {
    /// Lists open windows, including uncontrolled ones when `include_uncontrolled` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot enumerate windows.
    async fn match_all(&self, include_uncontrolled: bool) -> AgentResult<Vec<WindowClient>>;

    /// Focuses the window with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is gone or focusing is not allowed.
    async fn focus(&self, id: &str) -> AgentResult<()>;

    /// Opens a new window or tab at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot open windows.
    async fn open_window(&self, url: &Url) -> AgentResult<()>;
}

/// Everything the agent needs from its host.
pub trait AgentHost:
    CacheStorage + Network + NotificationSurface + WindowClients + 'static
{
}

impl<T> AgentHost for T where
    T: CacheStorage + Network + NotificationSurface + WindowClients + 'static
{
}
