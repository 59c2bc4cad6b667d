//! Offline cache and push notification agent for the service worker.
//!
//! The agent owns no platform state of its own: every cache, network, notification and
//! window operation goes through an [`AgentHost`]. Each lifecycle handler is an `async fn`;
//! the future it returns is the unit of work the host must keep alive (`waitUntil`,
//! `respondWith`) until it settles.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

pub use reqwest::Url;
use strum::Display;

use crate::config::AgentConfig;

mod error;
pub use error::*;

pub mod memory;

mod notification;
pub use notification::*;

mod platform;
pub use platform::*;

mod policy;
pub use policy::*;

/// Work that outlives the response it belongs to, such as a cache write.
pub type BackgroundTask = Pin<Box<dyn Future<Output = ()>>>;

/// Lifecycle of the hosting execution context, as seen by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Lifecycle {
    /// Constructed, no lifecycle event handled yet.
    Parsed,
    /// Install is running.
    Installing,
    /// Install finished.
    Installed,
    /// Activation is running.
    Activating,
    /// Activation finished; stale generations are gone.
    Activated,
}

/// What install did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Generation that was opened.
    pub cache_name: String,
    /// Same-origin assets stored.
    pub precached: Vec<String>,
    /// Manifest entries left out because they are cross-origin or unparseable.
    pub skipped: Vec<String>,
    /// Why pre-population failed, if it did. Install completes either way.
    pub error: Option<String>,
}

/// What activation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale generations deleted.
    pub purged: Vec<String>,
    /// Failures while enumerating or deleting generations.
    pub errors: Vec<String>,
}

/// A resolved fetch plus the cache write it scheduled.
pub struct Interception<R> {
    /// Which step produced the response.
    pub outcome: FetchOutcome<R>,
    /// Cache write to keep alive after the response has been returned.
    pub cache_write: Option<BackgroundTask>,
}

impl<R> Interception<R> {
    /// The response for the page, or the unrecoverable failure.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Unrecoverable`] when network and cache both missed.
    pub fn into_response(self, url: &str) -> AgentResult<R> {
        self.outcome
            .into_response()
            .ok_or_else(|| AgentError::Unrecoverable {
                url: url.to_string(),
            })
    }
}

impl<R: fmt::Debug> fmt::Debug for Interception<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("outcome", &self.outcome)
            .field("cache_write", &self.cache_write.is_some())
            .finish()
    }
}

/// The service worker agent.
pub struct OfflineAgent<H: AgentHost> {
    host: Rc<H>,
    config: Rc<AgentConfig>,
    scope: Url,
    offline_page: Url,
    lifecycle: Cell<Lifecycle>,
}

impl<H: AgentHost> fmt::Debug for OfflineAgent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineAgent")
            .field("cache_name", &self.config.cache_name)
            .field("scope", &self.scope.as_str())
            .field("lifecycle", &self.lifecycle.get())
            .finish_non_exhaustive()
    }
}

impl<H: AgentHost> OfflineAgent<H> {
    /// Creates an agent serving `scope` (the registration scope URL).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidUrl`] if the offline fallback cannot be resolved.
    pub fn new(host: Rc<H>, config: AgentConfig, scope: Url) -> AgentResult<Self> {
        let offline_page = scope.join(&config.offline_fallback).map_err(|e| {
            AgentError::InvalidUrl(format!("{}: {e}", config.offline_fallback))
        })?;
        Ok(Self {
            host,
            config: Rc::new(config),
            scope,
            offline_page,
            lifecycle: Cell::new(Lifecycle::Parsed),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    /// The injected configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The host the agent drives.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Splits the manifest into same-origin URLs to pre-cache and skipped entries.
    fn precache_urls(&self) -> (Vec<Url>, Vec<String>) {
        let mut urls = Vec::new();
        let mut skipped = Vec::new();
        for entry in &self.config.precache {
            match self.scope.join(entry) {
                Ok(url) if url.origin() == self.scope.origin() => urls.push(url),
                Ok(_) => skipped.push(entry.clone()),
                Err(e) => {
                    log::warn!("skipping unparseable manifest entry {entry}: {e}");
                    skipped.push(entry.clone());
                }
            }
        }
        (urls, skipped)
    }

    /// Handles `install`: opens the current generation and pre-populates it.
    ///
    /// Pre-population failures are logged and reported; install completes regardless.
    pub async fn on_install(&self) -> InstallReport {
        self.lifecycle.set(Lifecycle::Installing);
        let cache_name = self.config.cache_name.clone();
        let (urls, skipped) = self.precache_urls();
        log::info!(
            "installing {cache_name}: pre-caching {} assets, skipping {}",
            urls.len(),
            skipped.len()
        );

        let result = match self.host.open(&cache_name).await {
            Ok(()) => self.host.add_all(&cache_name, &urls).await,
            Err(err) => Err(err),
        };

        let (precached, error) = match result {
            Ok(()) => (urls.iter().map(ToString::to_string).collect(), None),
            Err(err) => {
                log::warn!("pre-caching {cache_name} failed: {err}");
                (Vec::new(), Some(err.to_string()))
            }
        };

        log::info!("installed {cache_name}");
        self.lifecycle.set(Lifecycle::Installed);
        InstallReport {
            cache_name,
            precached,
            skipped,
            error,
        }
    }

    /// Handles `activate`: deletes every generation except the current one.
    pub async fn on_activate(&self) -> ActivationReport {
        self.lifecycle.set(Lifecycle::Activating);
        let mut report = ActivationReport {
            purged: Vec::new(),
            errors: Vec::new(),
        };

        match self.host.keys().await {
            Ok(names) => {
                for name in names
                    .into_iter()
                    .filter(|name| *name != self.config.cache_name)
                {
                    match self.host.delete(&name).await {
                        Ok(_) => {
                            log::info!("deleted stale cache {name}");
                            report.purged.push(name);
                        }
                        Err(err) => {
                            log::warn!("deleting stale cache {name} failed: {err}");
                            report.errors.push(err.to_string());
                        }
                    }
                }
            }
            Err(err) => {
                log::warn!("listing caches failed: {err}");
                report.errors.push(err.to_string());
            }
        }

        self.lifecycle.set(Lifecycle::Activated);
        report
    }

    /// Handles `fetch` network first.
    ///
    /// A successful `GET` with status 200 is teed into the current generation through the
    /// returned [`Interception::cache_write`], which the host runs without holding back the
    /// response. Cache-write failures are logged and otherwise ignored.
    pub async fn on_fetch(&self, request: H::Request) -> Interception<H::Response> {
        let outcome = network_first(self.host.as_ref(), &request, &self.offline_page).await;

        let cache_write = match &outcome {
            FetchOutcome::Network(response)
                if should_capture(&request.method(), response.status()) =>
            {
                match response.duplicate() {
                    Ok(copy) => Some(self.cache_write(request, copy)),
                    Err(err) => {
                        log::warn!("cannot copy response for {}: {err}", request.url());
                        None
                    }
                }
            }
            FetchOutcome::Unrecoverable { reason } => {
                log::warn!("offline with no cached copy of {}: {reason}", request.url());
                None
            }
            _ => None,
        };

        Interception {
            outcome,
            cache_write,
        }
    }

    fn cache_write(&self, request: H::Request, response: H::Response) -> BackgroundTask {
        let host = Rc::clone(&self.host);
        let config = Rc::clone(&self.config);
        Box::pin(async move {
            if let Err(err) = host.put(&config.cache_name, &request, response).await {
                log::warn!("caching {} failed: {err}", request.url());
            }
        })
    }

    /// Handles `push`: builds the notification for `payload` and displays it.
    ///
    /// Display failures are logged; the descriptor is returned either way.
    pub async fn on_push(&self, payload: Option<&str>) -> NotificationDescriptor {
        let descriptor =
            NotificationDescriptor::from_push(payload, &self.config.notifications);
        if let Err(err) = self.host.show(&descriptor).await {
            log::warn!("showing notification {} failed: {err}", descriptor.tag);
        }
        descriptor
    }

    /// Handles `notificationclick`: closes the notification, then focuses a window already
    /// showing the target or opens a new one.
    pub async fn on_notification_click(&self, notification: &H::Notification) -> ClickOutcome {
        notification.close();

        let Some(target) = resolve_click_target(
            &self.scope,
            notification.target_url().as_deref(),
            &self.config.notifications.url,
        ) else {
            log::warn!("no navigation target for notification {}", notification.tag());
            return ClickOutcome::Unavailable;
        };

        match self.host.match_all(true).await {
            Ok(windows) => {
                if let Some(window) = windows.iter().find(|w| w.url == target.as_str()) {
                    match self.host.focus(&window.id).await {
                        Ok(()) => {
                            return ClickOutcome::Focused {
                                client_id: window.id.clone(),
                            }
                        }
                        Err(err) => log::warn!("focusing {} failed: {err}", window.id),
                    }
                }
            }
            Err(err) => {
                log::warn!("listing windows failed: {err}");
                return ClickOutcome::Unavailable;
            }
        }

        match self.host.open_window(&target).await {
            Ok(()) => ClickOutcome::Opened {
                url: target.to_string(),
            },
            Err(err) => {
                log::warn!("opening {target} failed: {err}");
                ClickOutcome::Unavailable
            }
        }
    }
}
