//! Wire types exchanged with the relying party and the platform authenticator.
//!
//! Option types decode only the binary fields the platform needs as raw bytes (challenge,
//! user id, credential ids). Every other field the server sends is kept verbatim in `extra`
//! and handed to the platform unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::base64url::{self, Base64UrlBytes};

/// Options responses wrap the actual options in a `publicKey` member.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionsEnvelope {
    /// Undecoded options.
    #[serde(rename = "publicKey")]
    pub public_key: Value,
}

/// User account the new credential is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyCredentialUserEntity {
    /// Opaque user handle.
    pub id: Base64UrlBytes,
    /// `name`, `displayName` and anything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to an existing credential in an exclusion or allow list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    /// Credential type, normally `public-key`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Credential id.
    pub id: Base64UrlBytes,
    /// Transport hints, passed through as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

/// Decoded options for `navigator.credentials.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    /// Server challenge.
    pub challenge: Base64UrlBytes,
    /// Account being registered.
    pub user: PublicKeyCredentialUserEntity,
    /// Credentials the authenticator must not already hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,
    /// `rp`, `pubKeyCredParams`, `timeout`, `attestation`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded options for `navigator.credentials.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// Server challenge.
    pub challenge: Base64UrlBytes,
    /// Credentials acceptable for this subject; absent for discoverable credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,
    /// `rpId`, `timeout`, `userVerification`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Credential produced by the platform during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCredential {
    /// Credential id as reported by the platform (already base64url).
    pub id: String,
    /// Raw credential id.
    pub raw_id: Vec<u8>,
    /// Credential type.
    pub type_: String,
    /// `clientDataJSON` bytes.
    pub client_data_json: Vec<u8>,
    /// Attestation object bytes.
    pub attestation_object: Vec<u8>,
}

/// Assertion produced by the platform during login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationCredential {
    /// Credential id as reported by the platform (already base64url).
    pub id: String,
    /// Raw credential id.
    pub raw_id: Vec<u8>,
    /// Credential type.
    pub type_: String,
    /// `clientDataJSON` bytes.
    pub client_data_json: Vec<u8>,
    /// Authenticator data bytes.
    pub authenticator_data: Vec<u8>,
    /// Assertion signature.
    pub signature: Vec<u8>,
    /// User handle; only discoverable credentials return one.
    pub user_handle: Option<Vec<u8>>,
}

/// Body posted to the registration verify endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationVerifyPayload {
    /// Credential id as reported by the platform.
    pub id: String,
    /// Raw credential id, base64url.
    pub raw_id: String,
    /// Credential type.
    #[serde(rename = "type")]
    pub type_: String,
    /// `clientDataJSON`, base64url.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// Attestation object, base64url.
    pub attestation_object: String,
    /// Label stored with the credential on the server.
    pub label: String,
}

impl RegistrationVerifyPayload {
    /// Re-encodes a platform credential for the JSON transport.
    #[must_use]
    pub fn new(credential: &RegistrationCredential, label: &str) -> Self {
        Self {
            id: credential.id.clone(),
            raw_id: base64url::encode(&credential.raw_id),
            type_: credential.type_.clone(),
            client_data_json: base64url::encode(&credential.client_data_json),
            attestation_object: base64url::encode(&credential.attestation_object),
            label: label.to_string(),
        }
    }
}

/// Body posted to the login verify endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationVerifyPayload {
    /// Credential id as reported by the platform.
    pub id: String,
    /// Raw credential id, base64url.
    pub raw_id: String,
    /// Credential type.
    #[serde(rename = "type")]
    pub type_: String,
    /// `clientDataJSON`, base64url.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// Authenticator data, base64url.
    pub authenticator_data: String,
    /// Assertion signature, base64url.
    pub signature: String,
    /// Serialized as `null`, never omitted, when the authenticator returned no handle.
    pub user_handle: Option<String>,
}

impl From<&AuthenticationCredential> for AuthenticationVerifyPayload {
    fn from(assertion: &AuthenticationCredential) -> Self {
        Self {
            id: assertion.id.clone(),
            raw_id: base64url::encode(&assertion.raw_id),
            type_: assertion.type_.clone(),
            client_data_json: base64url::encode(&assertion.client_data_json),
            authenticator_data: base64url::encode(&assertion.authenticator_data),
            signature: base64url::encode(&assertion.signature),
            user_handle: assertion
                .user_handle
                .as_deref()
                .filter(|handle| !handle.is_empty())
                .map(base64url::encode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_creation_options_decode_binary_fields_and_keep_the_rest() {
        let options: PublicKeyCredentialCreationOptions = serde_json::from_value(json!({
            "challenge": "YQ",
            "rp": {"name": "BIS", "id": "bis.local"},
            "user": {"id": "Yg", "name": "4711", "displayName": "M. Muster"},
            "pubKeyCredParams": [{"type": "public-key", "alg": -7}],
            "excludeCredentials": [
                {"type": "public-key", "id": "AQI", "transports": ["internal", "hybrid"]}
            ],
            "timeout": 60000
        }))
        .unwrap();

        assert_eq!(options.challenge.as_bytes(), b"a");
        assert_eq!(options.user.id.as_bytes(), b"b");
        assert_eq!(options.user.extra["displayName"], "M. Muster");
        assert_eq!(options.extra["rp"]["id"], "bis.local");
        assert_eq!(options.extra["timeout"], 60000);

        let excluded = options.exclude_credentials.as_deref().unwrap();
        assert_eq!(excluded[0].id.as_bytes(), &[1, 2]);
        assert_eq!(excluded[0].type_, "public-key");
        assert_eq!(
            excluded[0].transports.as_deref(),
            Some(&["internal".to_string(), "hybrid".to_string()][..])
        );
    }

    #[test]
    fn test_request_options_without_allow_list() {
        let options: PublicKeyCredentialRequestOptions =
            serde_json::from_value(json!({"challenge": "YQ", "userVerification": "required"}))
                .unwrap();
        assert!(options.allow_credentials.is_none());
        assert_eq!(options.extra["userVerification"], "required");
    }

    #[test]
    fn test_options_reject_invalid_challenge() {
        let result = serde_json::from_value::<PublicKeyCredentialRequestOptions>(
            json!({"challenge": "***"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_registration_payload_field_names() {
        let credential = RegistrationCredential {
            id: "AQI".to_string(),
            raw_id: vec![1, 2],
            type_: "public-key".to_string(),
            client_data_json: b"{}".to_vec(),
            attestation_object: vec![0xa0],
        };
        let payload = serde_json::to_value(RegistrationVerifyPayload::new(&credential, "Laptop"))
            .unwrap();
        assert_eq!(
            payload,
            json!({
                "id": "AQI",
                "rawId": "AQI",
                "type": "public-key",
                "clientDataJSON": "e30",
                "attestationObject": "oA",
                "label": "Laptop"
            })
        );
    }

    #[test]
    fn test_missing_user_handle_serializes_as_null() {
        let assertion = AuthenticationCredential {
            id: "AQI".to_string(),
            raw_id: vec![1, 2],
            type_: "public-key".to_string(),
            client_data_json: b"{}".to_vec(),
            authenticator_data: vec![5],
            signature: vec![6],
            user_handle: None,
        };
        let payload = serde_json::to_value(AuthenticationVerifyPayload::from(&assertion)).unwrap();
        assert_eq!(payload["userHandle"], Value::Null);
        assert!(payload.as_object().unwrap().contains_key("userHandle"));

        let with_handle = AuthenticationCredential {
            user_handle: Some(b"b".to_vec()),
            ..assertion
        };
        let payload = serde_json::to_value(AuthenticationVerifyPayload::from(&with_handle)).unwrap();
        assert_eq!(payload["userHandle"], "Yg");
    }
}
