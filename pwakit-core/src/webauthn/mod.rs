//! Browser side of the WebAuthn registration and login ceremonies.
//!
//! Both ceremonies follow the same shape:
//!
//! 1. check that the platform supports public-key credentials,
//! 2. fetch options from the relying party,
//! 3. decode the binary option fields from base64url,
//! 4. call the platform authenticator,
//! 5. re-encode its result as base64url,
//! 6. post the result to the verify endpoint.
//!
//! Nothing is retried. A failure at any step ends the ceremony and a new attempt starts
//! again from step 2 with a fresh challenge.

use serde::de::DeserializeOwned;
use strum::Display;

use crate::config::CeremonyConfig;
use crate::error::PwaKitError;
use crate::http_request::Request;

mod authentication;
mod platform;
mod registration;
pub mod types;

pub use platform::CredentialPlatform;
use types::OptionsEnvelope;

/// Capability name reported when public-key credentials are missing.
const PUBLIC_KEY_CREDENTIAL: &str = "PublicKeyCredential";

/// Steps of a ceremony, used to tag log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum CeremonyStage {
    CapabilityCheck,
    OptionsFetch,
    OptionsDecode,
    PlatformCreate,
    PlatformGet,
    ResultEncode,
    Verify,
    Done,
}

/// Drives WebAuthn ceremonies against one relying party.
#[derive(Debug)]
pub struct CeremonyClient<P> {
    platform: P,
    http: Request,
    config: CeremonyConfig,
}

impl<P: CredentialPlatform> CeremonyClient<P> {
    /// Creates a client using `platform` for the authenticator calls.
    ///
    /// # Errors
    ///
    /// Returns [`PwaKitError::InvalidUrl`] if `config.base_url` is not a valid URL.
    pub fn new(platform: P, config: CeremonyConfig) -> Result<Self, PwaKitError> {
        let http = Request::new(&config.base_url)?;
        Ok(Self {
            platform,
            http,
            config,
        })
    }

    /// The configuration the client was built with.
    pub const fn config(&self) -> &CeremonyConfig {
        &self.config
    }

    fn stage(ceremony: &str, stage: CeremonyStage) {
        log::debug!("{ceremony}: {stage}");
    }

    fn ensure_supported(&self, ceremony: &str) -> Result<(), PwaKitError> {
        Self::stage(ceremony, CeremonyStage::CapabilityCheck);
        if self.platform.supports_public_key_credentials() {
            Ok(())
        } else {
            log::warn!("{ceremony}: public-key credentials are not available");
            Err(PwaKitError::Unsupported {
                capability: PUBLIC_KEY_CREDENTIAL.to_string(),
            })
        }
    }

    /// Fetches options from `path` and decodes the `publicKey` member.
    async fn fetch_options<B, T>(
        &self,
        ceremony: &str,
        path: &str,
        body: &B,
    ) -> Result<T, PwaKitError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::stage(ceremony, CeremonyStage::OptionsFetch);
        let envelope: OptionsEnvelope = self.http.post_json(path, body).await?;

        Self::stage(ceremony, CeremonyStage::OptionsDecode);
        serde_json::from_value(envelope.public_key)
            .map_err(|e| PwaKitError::InvalidOptions(e.to_string()))
    }

    async fn verify<B>(&self, ceremony: &str, path: &str, payload: &B) -> Result<(), PwaKitError>
    where
        B: serde::Serialize + ?Sized,
    {
        Self::stage(ceremony, CeremonyStage::Verify);
        let _: serde_json::Value = self.http.post_json(path, payload).await?;
        Self::stage(ceremony, CeremonyStage::Done);
        Ok(())
    }
}
