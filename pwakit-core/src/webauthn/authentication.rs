use serde_json::{Map, Value};

use super::types::{AuthenticationVerifyPayload, PublicKeyCredentialRequestOptions};
use super::{CeremonyClient, CeremonyStage, CredentialPlatform};
use crate::error::PwaKitError;

const CEREMONY: &str = "login";

impl<P: CredentialPlatform> CeremonyClient<P> {
    /// Signs `subject` (the employee number) in with an existing credential.
    ///
    /// # Errors
    ///
    /// Same as [`CeremonyClient::register`], with [`PwaKitError::NoCredential`] meaning the
    /// authenticator returned no assertion.
    pub async fn login(&self, subject: &str) -> Result<(), PwaKitError> {
        self.ensure_supported(CEREMONY)?;

        let mut body = Map::new();
        body.insert(
            self.config.subject_field.clone(),
            Value::String(subject.to_string()),
        );
        let options: PublicKeyCredentialRequestOptions = self
            .fetch_options(CEREMONY, &self.config.login_options_path, &body)
            .await?;

        Self::stage(CEREMONY, CeremonyStage::PlatformGet);
        let assertion = self.platform.get(&options).await?.ok_or_else(|| {
            PwaKitError::NoCredential("Keine Antwort vom Authentifikator erhalten.".to_string())
        })?;

        Self::stage(CEREMONY, CeremonyStage::ResultEncode);
        let payload = AuthenticationVerifyPayload::from(&assertion);
        if payload.user_handle.is_none() {
            log::debug!("{CEREMONY}: assertion carries no user handle");
        }

        self.verify(CEREMONY, &self.config.login_verify_path, &payload)
            .await?;
        log::info!("signed in with credential {}", assertion.id);
        Ok(())
    }
}
