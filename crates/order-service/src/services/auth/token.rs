//! HMAC-signed bearer token verification.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url
//! without padding) signed with HS256, HS384 or HS512 over the shared secret.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Sha256, Sha384, Sha512};
use tracing::debug;

use order_service_core::{Role, UserId};

use super::TokenError;
use crate::models::AuthenticatedIdentity;

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Hs256,
    Hs384,
    Hs512,
}

impl Algorithm {
    fn parse(alg: &str) -> Result<Self, TokenError> {
        match alg {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(TokenError::UnsupportedAlgorithm(other.to_owned())),
        }
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    fn verify(self, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Hs256 => verify_mac::<Hmac<Sha256>>(key, message, signature),
            Self::Hs384 => verify_mac::<Hmac<Sha384>>(key, message, signature),
            Self::Hs512 => verify_mac::<Hmac<Sha512>>(key, message, signature),
        }
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) fn sign(self, key: &[u8], message: &[u8]) -> Vec<u8> {
        match self {
            Self::Hs256 => sign_mac::<Hmac<Sha256>>(key, message),
            Self::Hs384 => sign_mac::<Hmac<Sha384>>(key, message),
            Self::Hs512 => sign_mac::<Hmac<Sha512>>(key, message),
        }
    }
}

fn verify_mac<M: Mac + KeyInit>(key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    // Constant-time comparison
    mac.verify_slice(signature).is_ok()
}

#[cfg(any(test, feature = "testing"))]
fn sign_mac<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    <M as KeyInit>::new_from_slice(key).map_or_else(
        |_| Vec::new(),
        |mut mac| {
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        },
    )
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// The user ID claim. Issuers emit either a string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdClaim {
    Text(String),
    Number(i64),
}

/// NumericDate claims may be fractional.
#[derive(Deserialize)]
struct Claims {
    id: IdClaim,
    #[serde(default)]
    role: Option<serde_json::Value>,
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    nbf: Option<f64>,
}

impl Claims {
    /// Only the string `"admin"` grants admin; any other value is a user.
    fn role(&self) -> Role {
        match &self.role {
            Some(serde_json::Value::String(role)) if role == "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Verifies bearer tokens against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: SecretString,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Derive an identity from a raw bearer token.
    ///
    /// Returns `None` for any token that fails verification. Failures are
    /// logged at `debug` and never surface to the caller.
    #[must_use]
    pub fn authenticate(&self, token: &str) -> Option<AuthenticatedIdentity> {
        match self.verify(token, chrono::Utc::now().timestamp()) {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(error = %e, "Bearer token rejected");
                None
            }
        }
    }

    /// Verify a token as of `now` (seconds since the Unix epoch).
    ///
    /// # Errors
    ///
    /// Returns the first verification failure encountered.
    pub fn verify(&self, token: &str, now: i64) -> Result<AuthenticatedIdentity, TokenError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed("expected three segments"));
        };

        let header: Header = decode_json(header_b64)?;
        let algorithm = Algorithm::parse(&header.alg)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed("signature is not base64url"))?;
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];

        if !algorithm.verify(
            self.secret.expose_secret().as_bytes(),
            signing_input.as_bytes(),
            &signature,
        ) {
            return Err(TokenError::InvalidSignature);
        }

        let claims: Claims = decode_json(payload_b64)?;

        // Epoch seconds fit exactly in an f64 mantissa
        #[allow(clippy::cast_precision_loss)]
        let now_secs = now as f64;
        if claims.exp.is_some_and(|exp| now_secs >= exp) {
            return Err(TokenError::Expired);
        }
        if claims.nbf.is_some_and(|nbf| nbf > now_secs) {
            return Err(TokenError::NotYetValid);
        }

        let role = claims.role();
        let id = match claims.id {
            IdClaim::Text(id) if !id.is_empty() => id,
            IdClaim::Text(_) => return Err(TokenError::InvalidClaims("empty id".to_string())),
            IdClaim::Number(id) => id.to_string(),
        };

        Ok(AuthenticatedIdentity {
            id: UserId::new(id),
            role,
        })
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed("segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::InvalidClaims(e.to_string()))
}

/// Encode and sign a token. Used to mint tokens in tests.
#[cfg(any(test, feature = "testing"))]
pub(crate) fn encode(algorithm: Algorithm, secret: &str, claims: &serde_json::Value) -> String {
    let header = serde_json::json!({ "alg": algorithm.as_str(), "typ": "JWT" });
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let signature = algorithm.sign(secret.as_bytes(), signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    const SECRET: &str = "kT9#mQ2$vL8@xR4!pW6^nZ1&cF3*hJ7%";
    const NOW: i64 = 1_800_000_000;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SecretString::from(SECRET.to_string()))
    }

    #[test]
    fn test_verify_string_id_and_role() {
        let token = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "role": "admin" }));
        let identity = verifier().verify(&token, NOW).unwrap();
        assert_eq!(identity.id, UserId::new("u1"));
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn test_verify_numeric_id_defaults_to_user() {
        let token = encode(Algorithm::Hs512, SECRET, &json!({ "id": 42 }));
        let identity = verifier().verify(&token, NOW).unwrap();
        assert_eq!(identity.id, UserId::new("42"));
        assert_eq!(identity.role, Role::User);
    }

    #[test]
    fn test_verify_all_hmac_algorithms() {
        for algorithm in [Algorithm::Hs256, Algorithm::Hs384, Algorithm::Hs512] {
            let token = encode(algorithm, SECRET, &json!({ "id": "u1" }));
            assert!(verifier().verify(&token, NOW).is_ok(), "{}", algorithm.as_str());
        }
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = encode(Algorithm::Hs256, "a-different-secret", &json!({ "id": "u1" }));
        assert_eq!(
            verifier().verify(&token, NOW).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let token = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "role": "user" }));
        let forged = URL_SAFE_NO_PAD.encode(json!({ "id": "u1", "role": "admin" }).to_string());
        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{forged}.{}", parts[0], parts[2]);
        assert_eq!(
            verifier().verify(&tampered, NOW).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_rejects_alg_none() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"id":"u1","role":"admin"}"#);
        let token = format!("{header}.{payload}.");
        assert_eq!(
            verifier().verify(&token, NOW).unwrap_err(),
            TokenError::UnsupportedAlgorithm("none".to_string())
        );
    }

    #[test]
    fn test_rejects_expired_and_not_yet_valid() {
        let expired = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "exp": NOW }));
        assert_eq!(verifier().verify(&expired, NOW).unwrap_err(), TokenError::Expired);

        let future = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "nbf": NOW + 60 }));
        assert_eq!(
            verifier().verify(&future, NOW).unwrap_err(),
            TokenError::NotYetValid
        );

        let valid = encode(
            Algorithm::Hs256,
            SECRET,
            &json!({ "id": "u1", "nbf": NOW, "exp": NOW + 60 }),
        );
        assert!(verifier().verify(&valid, NOW).is_ok());
    }

    #[test]
    fn test_fractional_timestamps() {
        let token = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "exp": 1.9e9 }));
        assert!(verifier().verify(&token, NOW).is_ok());

        let token = encode(
            Algorithm::Hs256,
            SECRET,
            &json!({ "id": "u1", "nbf": 1_799_999_999.5, "exp": 1_800_000_000.5 }),
        );
        assert!(verifier().verify(&token, NOW).is_ok());

        let token = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "exp": 1_799_999_999.5 }));
        assert_eq!(verifier().verify(&token, NOW).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_non_admin_role_values_are_users() {
        for role in [json!(5), json!(null), json!(["admin"]), json!("ADMIN"), json!("editor")] {
            let token = encode(Algorithm::Hs256, SECRET, &json!({ "id": "u1", "role": role }));
            let identity = verifier().verify(&token, NOW).unwrap();
            assert_eq!(identity.role, Role::User, "{role}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(verifier().verify(token, NOW).is_err(), "{token}");
        }
    }

    #[test]
    fn test_rejects_missing_id() {
        let token = encode(Algorithm::Hs256, SECRET, &json!({ "role": "admin" }));
        assert!(matches!(
            verifier().verify(&token, NOW),
            Err(TokenError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_authenticate_swallows_errors() {
        assert!(verifier().authenticate("not-a-token").is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", verifier());
        assert!(!debug.contains(SECRET));
    }
}
