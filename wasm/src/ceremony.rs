//! Passkey ceremonies against `navigator.credentials`.

use async_trait::async_trait;
use js_sys::{Array, ArrayBuffer, Object, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, CredentialCreationOptions,
    CredentialRequestOptions, PublicKeyCredential,
};

use pwakit_core::webauthn::types::{
    AuthenticationCredential, PublicKeyCredentialCreationOptions, PublicKeyCredentialDescriptor,
    PublicKeyCredentialRequestOptions, RegistrationCredential,
};
use pwakit_core::webauthn::{CeremonyClient, CredentialPlatform};
use pwakit_core::{CeremonyConfig, PwaKitError};

use crate::host::describe;

fn platform_error(value: &JsValue) -> PwaKitError {
    PwaKitError::Platform(describe(value))
}

fn bytes(buffer: &ArrayBuffer) -> Vec<u8> {
    Uint8Array::new(buffer).to_vec()
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), PwaKitError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| platform_error(&e))
}

fn set_bytes(target: &JsValue, key: &str, value: &[u8]) -> Result<(), PwaKitError> {
    set(target, key, &Uint8Array::from(value).into())
}

/// Converts decoded options into the JS dictionary the platform expects, with every
/// binary field as a `Uint8Array`.
fn to_js_options<T: Serialize>(options: &T) -> Result<JsValue, PwaKitError> {
    options
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| PwaKitError::InvalidOptions(e.to_string()))
}

fn set_descriptor_ids(
    public_key: &JsValue,
    key: &str,
    descriptors: Option<&[PublicKeyCredentialDescriptor]>,
) -> Result<(), PwaKitError> {
    let Some(descriptors) = descriptors else {
        return Ok(());
    };
    let list = Reflect::get(public_key, &JsValue::from_str(key)).map_err(|e| platform_error(&e))?;
    let list = Array::from(&list);
    for (entry, descriptor) in list.iter().zip(descriptors) {
        set_bytes(&entry, "id", descriptor.id.as_bytes())?;
    }
    Ok(())
}

fn wrap_public_key(public_key: &JsValue) -> Result<Object, PwaKitError> {
    let request = Object::new();
    set(&request, "publicKey", public_key)?;
    Ok(request)
}

/// Reads the `PublicKeyCredential` a ceremony resolved with, if any.
fn credential(value: JsValue) -> Result<Option<PublicKeyCredential>, PwaKitError> {
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    value
        .dyn_into::<PublicKeyCredential>()
        .map(Some)
        .map_err(|_| PwaKitError::Platform("unexpected credential type".to_string()))
}

/// `navigator.credentials` of the current window.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserAuthenticator;

impl BrowserAuthenticator {
    fn credentials() -> Result<web_sys::CredentialsContainer, PwaKitError> {
        web_sys::window()
            .map(|window| window.navigator().credentials())
            .ok_or_else(|| PwaKitError::Unsupported {
                capability: "window".to_string(),
            })
    }
}

#[async_trait(?Send)]
impl CredentialPlatform for BrowserAuthenticator {
    fn supports_public_key_credentials(&self) -> bool {
        web_sys::window().is_some_and(|window| {
            Reflect::get(&window, &JsValue::from_str("PublicKeyCredential"))
                .is_ok_and(|value| value.is_truthy())
        })
    }

    async fn create(
        &self,
        options: &PublicKeyCredentialCreationOptions,
    ) -> Result<Option<RegistrationCredential>, PwaKitError> {
        let public_key = to_js_options(options)?;
        set_bytes(&public_key, "challenge", options.challenge.as_bytes())?;
        let user = Reflect::get(&public_key, &JsValue::from_str("user"))
            .map_err(|e| platform_error(&e))?;
        set_bytes(&user, "id", options.user.id.as_bytes())?;
        set_descriptor_ids(
            &public_key,
            "excludeCredentials",
            options.exclude_credentials.as_deref(),
        )?;

        let request: CredentialCreationOptions = wrap_public_key(&public_key)?.unchecked_into();
        let pending = Self::credentials()?
            .create_with_options(&request)
            .map_err(|e| platform_error(&e))?;
        let created = JsFuture::from(pending)
            .await
            .map_err(|e| platform_error(&e))?;

        let Some(credential) = credential(created)? else {
            return Ok(None);
        };
        let response = credential
            .response()
            .dyn_into::<AuthenticatorAttestationResponse>()
            .map_err(|_| PwaKitError::Platform("expected an attestation response".to_string()))?;

        Ok(Some(RegistrationCredential {
            id: credential.id(),
            raw_id: bytes(&credential.raw_id()),
            type_: credential.type_(),
            client_data_json: bytes(&response.client_data_json()),
            attestation_object: bytes(&response.attestation_object()),
        }))
    }

    async fn get(
        &self,
        options: &PublicKeyCredentialRequestOptions,
    ) -> Result<Option<AuthenticationCredential>, PwaKitError> {
        let public_key = to_js_options(options)?;
        set_bytes(&public_key, "challenge", options.challenge.as_bytes())?;
        set_descriptor_ids(
            &public_key,
            "allowCredentials",
            options.allow_credentials.as_deref(),
        )?;

        let request: CredentialRequestOptions = wrap_public_key(&public_key)?.unchecked_into();
        let pending = Self::credentials()?
            .get_with_options(&request)
            .map_err(|e| platform_error(&e))?;
        let asserted = JsFuture::from(pending)
            .await
            .map_err(|e| platform_error(&e))?;

        let Some(credential) = credential(asserted)? else {
            return Ok(None);
        };
        let response = credential
            .response()
            .dyn_into::<AuthenticatorAssertionResponse>()
            .map_err(|_| PwaKitError::Platform("expected an assertion response".to_string()))?;

        Ok(Some(AuthenticationCredential {
            id: credential.id(),
            raw_id: bytes(&credential.raw_id()),
            type_: credential.type_(),
            client_data_json: bytes(&response.client_data_json()),
            authenticator_data: bytes(&response.authenticator_data()),
            signature: bytes(&response.signature()),
            user_handle: response.user_handle().as_ref().map(bytes),
        }))
    }
}

fn ceremony_client() -> Result<CeremonyClient<BrowserAuthenticator>, PwaKitError> {
    let origin = web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .ok_or_else(|| PwaKitError::Unsupported {
            capability: "window.location".to_string(),
        })?;
    CeremonyClient::new(BrowserAuthenticator, CeremonyConfig::for_origin(&origin))
}

fn reject(context: &str, err: &PwaKitError) -> JsValue {
    log::warn!("{context} failed: {err}");
    js_sys::Error::new(&err.user_message()).into()
}

/// Registers a passkey for the signed-in user.
///
/// # Errors
/// Rejects with an `Error` whose message can be shown to the user.
#[wasm_bindgen(js_name = registerWebAuthnCredential)]
pub async fn register_webauthn_credential() -> Result<bool, JsValue> {
    let client = ceremony_client().map_err(|e| reject("registration", &e))?;
    client
        .register()
        .await
        .map(|()| true)
        .map_err(|e| reject("registration", &e))
}

/// Signs in the employee `personalnummer` with a passkey.
///
/// # Errors
/// Rejects with an `Error` whose message can be shown to the user.
#[wasm_bindgen(js_name = loginWithWebAuthn)]
pub async fn login_with_webauthn(personalnummer: String) -> Result<bool, JsValue> {
    let client = ceremony_client().map_err(|e| reject("login", &e))?;
    client
        .login(&personalnummer)
        .await
        .map(|()| true)
        .map_err(|e| reject("login", &e))
}
