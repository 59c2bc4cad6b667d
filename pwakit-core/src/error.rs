use thiserror::Error;

/// Message shown when the browser has no public-key credential support.
const UNSUPPORTED_MESSAGE: &str = "WebAuthn wird von diesem Browser nicht unterstützt.";

/// Error outputs from the credential ceremony client and shared primitives.
#[derive(Debug, Error)]
pub enum PwaKitError {
    /// The platform does not expose a capability required by the operation
    #[error("unsupported: {capability}")]
    Unsupported {
        /// Name of the missing capability, e.g. `PublicKeyCredential`.
        capability: String,
    },
    /// Network connection error with details
    #[error("network_error: {error}")]
    NetworkError {
        /// URL the request was sent to.
        url: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Transport level description.
        error: String,
    },
    /// The remote collaborator answered with an error status or `success: false`
    #[error("remote_error ({status}): {message}")]
    Remote {
        /// URL the request was sent to.
        url: String,
        /// HTTP status of the response.
        status: u16,
        /// Server supplied message, or a status derived one.
        message: String,
    },
    /// Unexpected error serializing or deserializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Details of the failure.
        error: String,
    },
    /// Server-issued ceremony options could not be decoded
    #[error("invalid_options: {0}")]
    InvalidOptions(String),
    /// Text is not valid base64url
    #[error("invalid_encoding: {0}")]
    InvalidEncoding(String),
    /// The authenticator finished without producing a credential or assertion
    #[error("no_credential: {0}")]
    NoCredential(String),
    /// The platform credential API rejected the call
    #[error("platform_error: {0}")]
    Platform(String),
    /// A configured URL or path cannot be parsed
    #[error("invalid_url: {0}")]
    InvalidUrl(String),
    /// HTTP request failure
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

impl PwaKitError {
    /// Returns the readable message to show the end user for a failed ceremony.
    ///
    /// Server supplied messages are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unsupported { .. } => UNSUPPORTED_MESSAGE.to_string(),
            Self::Remote { message, .. } => message.clone(),
            Self::NoCredential(message) | Self::Platform(message) => message.clone(),
            Self::NetworkError { status: Some(status), .. } => {
                format!("HTTP-Fehler {status}")
            }
            Self::NetworkError { .. } | Self::Reqwest(_) => {
                "Der Server ist nicht erreichbar.".to_string()
            }
            Self::SerializationError { .. }
            | Self::InvalidOptions(_)
            | Self::InvalidEncoding(_)
            | Self::InvalidUrl(_) => "Unerwartete Antwort vom Server.".to_string(),
        }
    }

    /// Whether the error was raised before any request left the client.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<serde_json::Error> for PwaKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            error: error.to_string(),
        }
    }
}
