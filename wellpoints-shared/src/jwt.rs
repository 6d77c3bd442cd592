use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{self, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Decode(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Decode the claims without verifying the signature. Useful for clients
/// that want to inspect their own token (e.g. expiry); never trust this
/// server-side.
pub fn decode_unverified(token: &str) -> Result<JwtClaims, JwtError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() < 2 {
        return Err(JwtError::Decode("invalid JWT format".into()));
    }
    let payload_b64 = parts[1];
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| JwtError::Decode(format!("invalid base64 payload: {e}")))?;
    serde_json::from_slice::<JwtClaims>(&payload_bytes)
        .map_err(|e| JwtError::Decode(format!("invalid json payload: {e}")))
}

pub fn decode_and_verify(token: &str, secret: &[u8]) -> Result<JwtClaims, JwtError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<JwtClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::Decode(e.to_string()))
}

pub fn encode(claims: &JwtClaims, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> JwtClaims {
        JwtClaims {
            sub: "jane".into(),
            jti: "abc-123".into(),
            exp: 4_102_444_800, // far future
            role: Role::User,
        }
    }

    #[test]
    fn roundtrip_encode_verify() {
        let token = encode(&claims(), b"secret").unwrap();
        let decoded = decode_and_verify(&token, b"secret").unwrap();
        assert_eq!(decoded.sub, "jane");
        assert_eq!(decoded.role, Role::User);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = encode(&claims(), b"secret").unwrap();
        assert!(decode_and_verify(&token, b"other").is_err());
    }

    #[test]
    fn unverified_decode_reads_payload() {
        let token = encode(&claims(), b"secret").unwrap();
        let peeked = decode_unverified(&token).unwrap();
        assert_eq!(peeked.jti, "abc-123");
    }
}
