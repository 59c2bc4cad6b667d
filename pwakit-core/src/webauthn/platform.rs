use async_trait::async_trait;

use super::types::{
    AuthenticationCredential, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialRequestOptions, RegistrationCredential,
};
use crate::error::PwaKitError;

/// The platform credential API (`navigator.credentials` in a browser).
///
/// `Ok(None)` means the platform finished without producing a credential.
#[async_trait(?Send)]
pub trait CredentialPlatform {
    /// Whether public-key credentials are available at all.
    fn supports_public_key_credentials(&self) -> bool;

    /// Creates a new credential.
    ///
    /// # Errors
    ///
    /// Returns [`PwaKitError::Platform`] if the platform rejects the request, e.g. the user
    /// cancelled or the authenticator already holds an excluded credential.
    async fn create(
        &self,
        options: &PublicKeyCredentialCreationOptions,
    ) -> Result<Option<RegistrationCredential>, PwaKitError>;

    /// Produces an assertion with an existing credential.
    ///
    /// # Errors
    ///
    /// Returns [`PwaKitError::Platform`] if the platform rejects the request.
    async fn get(
        &self,
        options: &PublicKeyCredentialRequestOptions,
    ) -> Result<Option<AuthenticationCredential>, PwaKitError>;
}
