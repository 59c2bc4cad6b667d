use serde_json::json;

use super::types::{PublicKeyCredentialCreationOptions, RegistrationVerifyPayload};
use super::{CeremonyClient, CeremonyStage, CredentialPlatform};
use crate::error::PwaKitError;

const CEREMONY: &str = "registration";

impl<P: CredentialPlatform> CeremonyClient<P> {
    /// Registers a new platform credential for the signed-in user.
    ///
    /// # Errors
    ///
    /// - [`PwaKitError::Unsupported`] before any request is made, if the platform has no
    ///   public-key credentials.
    /// - [`PwaKitError::Remote`] with the server message if an endpoint reports failure.
    /// - [`PwaKitError::NoCredential`] if the authenticator produced nothing.
    /// - [`PwaKitError::Platform`] if the authenticator rejected the request.
    pub async fn register(&self) -> Result<(), PwaKitError> {
        self.ensure_supported(CEREMONY)?;

        let options: PublicKeyCredentialCreationOptions = self
            .fetch_options(CEREMONY, &self.config.register_options_path, &json!({}))
            .await?;

        Self::stage(CEREMONY, CeremonyStage::PlatformCreate);
        let credential = self
            .platform
            .create(&options)
            .await?
            .ok_or_else(|| PwaKitError::NoCredential("Kein Credential erstellt.".to_string()))?;

        Self::stage(CEREMONY, CeremonyStage::ResultEncode);
        let payload = RegistrationVerifyPayload::new(&credential, &self.config.credential_label);

        self.verify(CEREMONY, &self.config.register_verify_path, &payload)
            .await?;
        log::info!("registered credential {}", credential.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::super::testing::FakeAuthenticator;
    use super::super::types::RegistrationCredential;
    use super::*;
    use crate::base64url;
    use crate::config::CeremonyConfig;

    fn credential() -> RegistrationCredential {
        RegistrationCredential {
            id: "q83v".to_string(),
            raw_id: vec![0xab, 0xcd, 0xef],
            type_: "public-key".to_string(),
            client_data_json: br#"{"type":"webauthn.create","challenge":"YQ"}"#.to_vec(),
            attestation_object: vec![0xa3, 0x63, 0x66, 0x6d, 0x74, 0xfb, 0xff],
        }
    }

    fn client(server: &Server, platform: FakeAuthenticator) -> CeremonyClient<FakeAuthenticator> {
        CeremonyClient::new(platform, CeremonyConfig::for_origin(&server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut server = Server::new_async().await;

        let options_mock = server
            .mock("POST", "/webauthn/register/options")
            .match_body(Matcher::Json(json!({})))
            .with_status(200)
            .with_body(
                r#"{"success": true, "publicKey": {
                    "challenge": "YQ",
                    "rp": {"name": "BIS"},
                    "user": {"id": "Yg", "name": "4711"},
                    "excludeCredentials": [{"type": "public-key", "id": "AQI", "transports": ["usb"]}]
                }}"#,
            )
            .create_async()
            .await;

        let expected = credential();
        let verify_mock = server
            .mock("POST", "/webauthn/register/verify")
            .match_body(Matcher::Json(json!({
                "id": "q83v",
                "rawId": "q83v",
                "type": "public-key",
                "clientDataJSON": base64url::encode(&expected.client_data_json),
                "attestationObject": base64url::encode(&expected.attestation_object),
                "label": "Biometrisches Gerät"
            })))
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let platform = FakeAuthenticator {
            registration: Some(credential()),
            ..FakeAuthenticator::default()
        };
        let client = client(&server, platform);

        client.register().await.unwrap();

        options_mock.assert_async().await;
        verify_mock.assert_async().await;

        let calls = client.platform.create_calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].challenge.as_bytes(), b"a");
        assert_eq!(calls[0].user.id.as_bytes(), b"b");
        assert_eq!(calls[0].extra["rp"]["name"], "BIS");
        let excluded = calls[0].exclude_credentials.as_deref().unwrap();
        assert_eq!(excluded[0].id.as_bytes(), &[1, 2]);
        assert_eq!(excluded[0].transports.as_deref(), Some(&["usb".to_string()][..]));
    }

    #[tokio::test]
    async fn test_encoded_fields_decode_to_platform_bytes() {
        let mut server = Server::new_async().await;
        let _options = server
            .mock("POST", "/webauthn/register/options")
            .with_body(r#"{"publicKey": {"challenge": "YQ", "user": {"id": "Yg"}}}"#)
            .create_async()
            .await;
        let verify_mock = server
            .mock("POST", "/webauthn/register/verify")
            .match_body(Matcher::PartialJson(json!({
                "clientDataJSON": "e30",
                "attestationObject": "oA"
            })))
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let platform = FakeAuthenticator {
            registration: Some(RegistrationCredential {
                client_data_json: b"{}".to_vec(),
                attestation_object: vec![0xa0],
                ..credential()
            }),
            ..FakeAuthenticator::default()
        };
        client(&server, platform).register().await.unwrap();
        verify_mock.assert_async().await;

        assert_eq!(base64url::decode("e30").unwrap(), b"{}");
        assert_eq!(base64url::decode("oA").unwrap(), [0xa0]);
    }

    #[tokio::test]
    async fn test_unsupported_platform_makes_no_request() {
        let mut server = Server::new_async().await;
        let options_mock = server
            .mock("POST", "/webauthn/register/options")
            .expect(0)
            .create_async()
            .await;

        let platform = FakeAuthenticator {
            unsupported: true,
            ..FakeAuthenticator::default()
        };
        let err = client(&server, platform).register().await.unwrap_err();

        assert!(err.is_unsupported());
        assert_eq!(err.user_message(), "WebAuthn wird von diesem Browser nicht unterstützt.");
        options_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_options_failure_message_is_propagated() {
        let mut server = Server::new_async().await;
        let _options = server
            .mock("POST", "/webauthn/register/options")
            .with_status(401)
            .with_body(r#"{"success": false, "message": "Bitte zuerst anmelden"}"#)
            .create_async()
            .await;

        let platform = FakeAuthenticator::default();
        let client = client(&server, platform);
        let err = client.register().await.unwrap_err();

        assert_eq!(err.user_message(), "Bitte zuerst anmelden");
        assert!(client.platform.create_calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_no_credential_produced() {
        let mut server = Server::new_async().await;
        let _options = server
            .mock("POST", "/webauthn/register/options")
            .with_body(r#"{"publicKey": {"challenge": "YQ", "user": {"id": "Yg"}}}"#)
            .create_async()
            .await;
        let verify_mock = server
            .mock("POST", "/webauthn/register/verify")
            .expect(0)
            .create_async()
            .await;

        let err = client(&server, FakeAuthenticator::default())
            .register()
            .await
            .unwrap_err();

        assert!(matches!(err, PwaKitError::NoCredential(_)));
        verify_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_undecodable_options() {
        let mut server = Server::new_async().await;
        let _options = server
            .mock("POST", "/webauthn/register/options")
            .with_body(r#"{"publicKey": {"challenge": "%%%", "user": {"id": "Yg"}}}"#)
            .create_async()
            .await;

        let err = client(&server, FakeAuthenticator::default())
            .register()
            .await
            .unwrap_err();

        assert!(matches!(err, PwaKitError::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn test_verify_rejection() {
        let mut server = Server::new_async().await;
        let _options = server
            .mock("POST", "/webauthn/register/options")
            .with_body(r#"{"publicKey": {"challenge": "YQ", "user": {"id": "Yg"}}}"#)
            .create_async()
            .await;
        let _verify = server
            .mock("POST", "/webauthn/register/verify")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let platform = FakeAuthenticator {
            registration: Some(credential()),
            ..FakeAuthenticator::default()
        };
        let err = client(&server, platform).register().await.unwrap_err();

        assert_eq!(err.user_message(), "HTTP-Fehler 500");
    }
}
