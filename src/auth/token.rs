use crate::error::AppError;
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Authenticated identity decoded from a JWT.
///
/// Forwarded untouched through every service and DAO call so writes can be
/// attributed to a user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Token {
    /// Subject of the token, the user's unique identifier.
    pub sub: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Generates a JWT for a given user id, valid for 24 hours.
///
/// Token issuance belongs to the identity provider; this exists for local
/// development and tests.
pub fn generate_token(keys: &JwtKeys, user_id: i64) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(24))
        .ok_or_else(|| AppError::InternalServerError("Invalid token expiry".into()))?
        .timestamp() as usize;

    let claims = Token {
        sub: user_id,
        exp: expiration,
        email: None,
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a JWT string and decodes its claims.
///
/// Returns `AppError::Unauthorized` if the token is malformed, its signature
/// is invalid, or it has expired.
pub fn verify_token(keys: &JwtKeys, token: &str) -> Result<Token, AppError> {
    decode::<Token>(token, &keys.decoding, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Reads the bearer token from the request headers and verifies it.
pub fn check_jwt(headers: &HeaderMap, keys: &JwtKeys) -> Result<Token, AppError> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
    let token = raw
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must use the Bearer scheme".into()))?;
    verify_token(keys, token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn keys() -> JwtKeys {
        JwtKeys::from_secret("test_secret_for_gen_verify")
    }

    #[test]
    fn test_token_generation_and_verification() {
        let token = generate_token(&keys(), 1).unwrap();
        let claims = verify_token(&keys(), &token).unwrap();
        assert_eq!(claims.sub, 1);
    }

    #[test]
    fn test_token_expiration() {
        let expiration = chrono::Utc::now()
            .checked_sub_signed(chrono::Duration::hours(2))
            .expect("valid timestamp")
            .timestamp() as usize;

        let claims_expired = Token {
            sub: 2,
            exp: expiration,
            email: None,
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret("test_secret_for_gen_verify".as_bytes()),
        )
        .unwrap();

        match verify_token(&keys(), &expired_token) {
            Err(AppError::Unauthorized(msg)) => {
                assert!(msg.contains("ExpiredSignature"));
            }
            other => panic!("Token should have been rejected as expired: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = generate_token(&JwtKeys::from_secret("a_completely_different_secret"), 3).unwrap();
        assert!(matches!(
            verify_token(&keys(), &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_check_jwt_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            check_jwt(&headers, &keys()),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            check_jwt(&headers, &keys()),
            Err(AppError::Unauthorized(_))
        ));

        let token = generate_token(&keys(), 9).unwrap();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(check_jwt(&headers, &keys()).unwrap().sub, 9);
    }
}
