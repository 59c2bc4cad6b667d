//! Deploy-time configuration for the agent and the ceremony client.
//!
//! Values are fixed when the worker script or page is built and injected at construction.
//! Nothing here is mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::PwaKitError;

/// Version tag of the current cache generation.
pub const DEFAULT_CACHE_NAME: &str = "bis-cache-v1";

/// Static assets pre-cached on install. Cross-origin entries are listed so the manifest
/// mirrors what the pages reference, but install never pre-caches them.
pub const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/static/style.css",
    "/static/script.js",
    "/static/manifest.json",
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css",
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js",
    "https://cdn.jsdelivr.net/npm/bootstrap-icons@1.10.5/font/bootstrap-icons.css",
];

/// Configuration of the offline cache and notification agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Name of the current cache generation. Every other generation is purged on activation.
    pub cache_name: String,
    /// Asset manifest, relative to the agent scope or absolute.
    pub precache: Vec<String>,
    /// Document served when both the network and the exact cache lookup miss.
    pub offline_fallback: String,
    /// Defaults applied to push payloads.
    pub notifications: NotificationDefaults,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            precache: DEFAULT_PRECACHE.iter().map(ToString::to_string).collect(),
            offline_fallback: "/".to_string(),
            notifications: NotificationDefaults::default(),
        }
    }
}

impl AgentConfig {
    /// Deserializes an `AgentConfig` from a JSON string. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self, PwaKitError> {
        serde_json::from_str(json).map_err(|e| PwaKitError::SerializationError {
            error: format!("invalid agent config json: {e}"),
        })
    }
}

/// Fallback values for notifications built from push payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationDefaults {
    /// Title used when the payload has none or is not JSON.
    pub title: String,
    /// Body used when the payload carries neither `body` nor `nachricht`.
    pub body: String,
    /// Icon path.
    pub icon: String,
    /// Badge path.
    pub badge: String,
    /// Tag; notifications sharing a tag replace each other.
    pub tag: String,
    /// Navigation target when the payload has no `data.url`.
    pub url: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "BIS".to_string(),
            body: "You have a new notification.".to_string(),
            icon: "/static/icons/icon-192.png".to_string(),
            badge: "/static/icons/icon-32.png".to_string(),
            tag: "bis-notification".to_string(),
            url: "/dashboard".to_string(),
        }
    }
}

/// Configuration of the passkey ceremony client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CeremonyConfig {
    /// Origin of the relying party; endpoint paths are resolved against it.
    pub base_url: String,
    /// Endpoint issuing credential creation options.
    pub register_options_path: String,
    /// Endpoint verifying a new credential.
    pub register_verify_path: String,
    /// Endpoint issuing assertion options for a subject.
    pub login_options_path: String,
    /// Endpoint verifying an assertion.
    pub login_verify_path: String,
    /// JSON key carrying the login subject.
    pub subject_field: String,
    /// Human readable label stored with a new credential.
    pub credential_label: String,
}

impl Default for CeremonyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            register_options_path: "/webauthn/register/options".to_string(),
            register_verify_path: "/webauthn/register/verify".to_string(),
            login_options_path: "/webauthn/login/options".to_string(),
            login_verify_path: "/webauthn/login/verify".to_string(),
            subject_field: "personalnummer".to_string(),
            credential_label: "Biometrisches Gerät".to_string(),
        }
    }
}

impl CeremonyConfig {
    /// Returns the default configuration for a relying party served from `base_url`.
    #[must_use]
    pub fn for_origin(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Deserializes a `CeremonyConfig` from a JSON string. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self, PwaKitError> {
        serde_json::from_str(json).map_err(|e| PwaKitError::SerializationError {
            error: format!("invalid ceremony config json: {e}"),
        })
    }
}
