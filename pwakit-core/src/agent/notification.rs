//! Push payload parsing and notification click routing.

use reqwest::Url;
use serde_json::{Map, Value};

use crate::config::NotificationDefaults;

/// What the platform notification surface is asked to display for one push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDescriptor {
    /// Notification title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Icon path.
    pub icon: String,
    /// Badge path.
    pub badge: String,
    /// Replacement tag.
    pub tag: String,
    /// Navigation target opened on click.
    pub url: String,
    /// Server side notification id (`data.benachrichtigung_id`), when supplied.
    pub notification_id: Option<i64>,
    /// Whether the notification stays until the user dismisses it. Always `false`.
    pub require_interaction: bool,
}

impl NotificationDescriptor {
    /// Builds the descriptor for a push message.
    ///
    /// `payload` is the message text. JSON objects are read field by field with fallbacks
    /// (`body` → `nachricht` → default; empty strings count as missing). Text that is not
    /// JSON becomes the body under the default title. A missing payload yields the default
    /// title and body.
    #[must_use]
    pub fn from_push(payload: Option<&str>, defaults: &NotificationDefaults) -> Self {
        let empty = Map::new();
        let (fields, plain_body) = match payload {
            None => (None, None),
            Some(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => (Some(map), None),
                Ok(_) => (None, None),
                Err(_) => {
                    log::debug!("push payload is not json, showing it as plain text");
                    (None, Some(text.to_string()))
                }
            },
        };
        let fields = fields.as_ref().unwrap_or(&empty);
        let data = fields.get("data").and_then(Value::as_object);

        let body = plain_body
            .filter(|text| !text.is_empty())
            .or_else(|| string_field(fields, "body"))
            .or_else(|| string_field(fields, "nachricht"))
            .unwrap_or_else(|| defaults.body.clone());

        Self {
            title: string_field(fields, "title").unwrap_or_else(|| defaults.title.clone()),
            body,
            icon: string_field(fields, "icon").unwrap_or_else(|| defaults.icon.clone()),
            badge: string_field(fields, "badge").unwrap_or_else(|| defaults.badge.clone()),
            tag: string_field(fields, "tag").unwrap_or_else(|| defaults.tag.clone()),
            url: data
                .and_then(|data| string_field(data, "url"))
                .unwrap_or_else(|| defaults.url.clone()),
            notification_id: data
                .and_then(|data| data.get("benachrichtigung_id"))
                .and_then(Value::as_i64),
            require_interaction: false,
        }
    }
}

/// Returns a non-empty string field.
fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Resolves the absolute navigation target of a clicked notification.
///
/// Falls back to `default_url` when the notification carries no target or an unparseable one.
#[must_use]
pub fn resolve_click_target(
    scope: &Url,
    target: Option<&str>,
    default_url: &str,
) -> Option<Url> {
    target
        .filter(|target| !target.is_empty())
        .and_then(|target| scope.join(target).ok())
        .or_else(|| scope.join(default_url).ok())
}

/// What handling a notification click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An open window already showed the target and was focused.
    Focused {
        /// Id of the focused window.
        client_id: String,
    },
    /// A new window was opened at the target.
    Opened {
        /// URL the window was opened at.
        url: String,
    },
    /// Windows could not be enumerated or opened; only the notification was closed.
    Unavailable,
}
