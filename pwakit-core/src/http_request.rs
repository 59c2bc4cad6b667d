use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PwaKitError;

/// Failure flag and message every relying-party endpoint may report alongside its payload.
///
/// Read field by field so a malformed `message` never hides a failure flag.
#[derive(Debug)]
struct ApiStatus {
    failed: bool,
    message: Option<String>,
}

impl ApiStatus {
    fn read(body: &Value) -> Self {
        let message = match body.get("message") {
            None | Some(Value::Null | Value::Bool(false)) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            failed: body.get("success") == Some(&Value::Bool(false)),
            message,
        }
    }
}

/// A thin wrapper on an HTTP client for the relying-party JSON endpoints.
///
/// Requests are sent once: no retries and no client-side timeout, so a failed attempt
/// surfaces directly to the ceremony that issued it.
#[derive(Debug, Clone)]
pub struct Request {
    client: Client,
    base_url: Url,
}

impl Request {
    /// Initializes a new `Request` resolving paths against `base_url`.
    pub(crate) fn new(base_url: &str) -> Result<Self, PwaKitError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PwaKitError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Resolves an endpoint path against the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, PwaKitError> {
        self.base_url
            .join(path)
            .map_err(|e| PwaKitError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Creates a request builder with defaults applied.
    fn req(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Accept", "application/json")
    }

    /// POSTs `payload` as JSON to `path` and parses the JSON answer.
    ///
    /// Fails whenever the status is not a success or the body carries `success: false`;
    /// the error message is the server's `message` when present and `HTTP-Fehler <status>`
    /// otherwise.
    pub(crate) async fn post_json<P, T>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<T, PwaKitError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self
            .req(Method::POST, url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|err| PwaKitError::NetworkError {
                url: url.to_string(),
                status: None,
                error: format!("request failed: {err}"),
            })?;

        let status = response.status();
        let body = response.text().await?;
        parse_json_response(url.as_str(), status, &body)
    }
}

/// Interprets a relying-party response. Split from the transport so the failure rules can be
/// checked without a server.
fn parse_json_response<T: DeserializeOwned>(
    url: &str,
    status: StatusCode,
    body: &str,
) -> Result<T, PwaKitError> {
    let remote_error = |message: Option<String>| PwaKitError::Remote {
        url: url.to_string(),
        status: status.as_u16(),
        message: message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP-Fehler {}", status.as_u16())),
    };

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => return Err(remote_error(None)),
        Err(e) => {
            return Err(PwaKitError::SerializationError {
                error: format!("invalid json from {url}: {e}"),
            })
        }
    };

    let api_status = ApiStatus::read(&value);
    if !status.is_success() || api_status.failed {
        return Err(remote_error(api_status.message));
    }

    serde_json::from_value(value).map_err(|e| PwaKitError::SerializationError {
        error: format!("unexpected response from {url}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    const URL: &str = "https://bis.local/webauthn/login/options";

    #[test]
    fn test_success_flag_false_uses_server_message() {
        let result = parse_json_response::<Value>(
            URL,
            StatusCode::OK,
            r#"{"success": false, "message": "Kein Passkey registriert"}"#,
        );
        match result.unwrap_err() {
            PwaKitError::Remote {
                status, message, ..
            } => {
                assert_eq!(status, 200);
                assert_eq!(message, "Kein Passkey registriert");
            }
            err => panic!("Expected Remote, got: {err:?}"),
        }
    }

    #[test]
    fn test_error_status_without_message() {
        let result =
            parse_json_response::<Value>(URL, StatusCode::FORBIDDEN, r#"{"success": false}"#);
        match result.unwrap_err() {
            PwaKitError::Remote { message, .. } => assert_eq!(message, "HTTP-Fehler 403"),
            err => panic!("Expected Remote, got: {err:?}"),
        }
    }

    #[test]
    fn test_error_status_with_non_json_body() {
        let result = parse_json_response::<Value>(
            URL,
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>Internal Server Error</html>",
        );
        match result.unwrap_err() {
            PwaKitError::Remote { message, .. } => assert_eq!(message, "HTTP-Fehler 500"),
            err => panic!("Expected Remote, got: {err:?}"),
        }
    }

    #[test]
    fn test_ok_status_with_non_json_body() {
        let result = parse_json_response::<Value>(URL, StatusCode::OK, "not json");
        assert!(matches!(
            result,
            Err(PwaKitError::SerializationError { .. })
        ));
    }

    #[test]
    fn test_payload_without_flag_is_success() {
        let value: Value =
            parse_json_response(URL, StatusCode::OK, r#"{"publicKey": {"challenge": "YQ"}}"#)
                .unwrap();
        assert_eq!(value, json!({"publicKey": {"challenge": "YQ"}}));
    }

    #[test_case(r#"{"success": false, "message": 42}"#, "42" ; "numeric message")]
    #[test_case(r#"{"success": false, "message": {"code": 7}}"#, r#"{"code":7}"# ; "object message")]
    #[test_case(r#"{"success": false, "message": null}"#, "HTTP-Fehler 200" ; "null message")]
    #[test_case(r#"{"success": false, "message": ""}"#, "HTTP-Fehler 200" ; "empty message")]
    #[test_case(r#"{"success": false, "message": false}"#, "HTTP-Fehler 200" ; "false message")]
    fn test_failure_flag_with_odd_message(body: &str, expected: &str) {
        let result = parse_json_response::<Value>(URL, StatusCode::OK, body);
        match result.unwrap_err() {
            PwaKitError::Remote { message, .. } => assert_eq!(message, expected),
            err => panic!("Expected Remote, got: {err:?}"),
        }
    }

    #[test_case(r#"{"success": "false"}"# ; "string flag")]
    #[test_case(r#"{"success": 0}"# ; "numeric flag")]
    #[test_case(r#"{"success": null, "message": 42}"# ; "null flag")]
    #[test_case(r#"[1, 2]"# ; "array body")]
    fn test_only_boolean_false_is_a_failure_flag(body: &str) {
        assert!(parse_json_response::<Value>(URL, StatusCode::OK, body).is_ok());
    }

    #[test]
    fn test_url_resolution() {
        let request = Request::new("https://bis.local").unwrap();
        assert_eq!(
            request.url("/webauthn/register/verify").unwrap().as_str(),
            "https://bis.local/webauthn/register/verify"
        );
        assert!(matches!(
            Request::new("not a url"),
            Err(PwaKitError::InvalidUrl(_))
        ));
    }
}
