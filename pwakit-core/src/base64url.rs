//! base64url codec used at the boundary between the platform credential API (raw bytes)
//! and the JSON transport (text).

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PwaKitError;

/// Standard alphabet engine that ignores non-zero bits after the last full byte, as `atob` does.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Encodes bytes as unpadded base64url text.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes base64url text into bytes.
///
/// The URL-safe alphabet is mapped back onto the standard one and the input is padded to a
/// multiple of four before decoding, so padded, unpadded and standard-alphabet input are all
/// accepted.
///
/// # Errors
/// Returns [`PwaKitError::InvalidEncoding`] if the text is not valid base64.
pub fn decode(text: &str) -> Result<Vec<u8>, PwaKitError> {
    let mut standard: String = text
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat_n('=', padding));

    LENIENT
        .decode(standard.as_bytes())
        .map_err(|e| PwaKitError::InvalidEncoding(format!("{text:?}: {e}")))
}

/// Binary field carried as base64url text on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64UrlBytes(pub Vec<u8>);

impl Base64UrlBytes {
    /// Returns the decoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the wrapper and returns the decoded bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Base64UrlBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Base64UrlBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Base64UrlBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64UrlBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Base64UrlVisitor;

        impl Visitor<'_> for Base64UrlVisitor {
            type Value = Base64UrlBytes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a base64url encoded string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                decode(value).map(Base64UrlBytes).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Base64UrlVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("YQ", b"a" ; "two chars unpadded")]
    #[test_case("YQ==", b"a" ; "two chars padded")]
    #[test_case("Yg", b"b" ; "user id")]
    #[test_case("-_8", &[0xfb, 0xff] ; "url safe alphabet")]
    #[test_case("+/8=", &[0xfb, 0xff] ; "standard alphabet")]
    #[test_case("", b"" ; "empty")]
    #[test_case("YR", b"a" ; "non canonical trailing bits")]
    #[test_case("AQJ", &[1, 2] ; "non canonical three chars")]
    fn test_decode(text: &str, expected: &[u8]) {
        assert_eq!(decode(text).unwrap(), expected);
    }

    #[test]
    fn test_encode_strips_padding_and_uses_url_alphabet() {
        assert_eq!(encode(b"a"), "YQ");
        assert_eq!(encode(&[0xfb, 0xff]), "-_8");
        assert_eq!(encode(b""), "");
    }

    #[test]
    fn test_round_trip_all_lengths() {
        let bytes: Vec<u8> = (0..=255).collect();
        for len in 0..bytes.len() {
            let slice = &bytes[..len];
            let text = encode(slice);
            assert!(!text.contains('='));
            assert_eq!(decode(&text).unwrap(), slice);

            let padding = (4 - text.len() % 4) % 4;
            let padded = format!("{text}{}", "=".repeat(padding));
            assert_eq!(decode(&padded).unwrap(), slice);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("a"),
            Err(PwaKitError::InvalidEncoding(_))
        ));
        assert!(decode("not base64!").is_err());
    }

    #[test]
    fn test_serde_wrapper() {
        let value: Base64UrlBytes = serde_json::from_str("\"YQ\"").unwrap();
        assert_eq!(value.as_bytes(), b"a");
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"YQ\"");
        assert!(serde_json::from_str::<Base64UrlBytes>("\"%%\"").is_err());
    }
}
