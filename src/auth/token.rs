use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, UnclassifiedError};

/// Which kind of account a token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Vendor,
}

/// Represents the claims encoded within a JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user or vendor the token was issued to.
    pub sub: Uuid,
    pub role: Role,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
}

/// Signs and verifies HS256 tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issues a token for `subject` that expires after the configured lifetime.
    pub fn issue(&self, subject: Uuid, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AppError::from(UnclassifiedError::new(
                "TokenError",
                "Token expiration is out of range",
            ))
        })?;

        let claims = Claims {
            sub: subject,
            role,
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| UnclassifiedError::from_error("TokenError", &e).into())
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    /// Any failure is an `Unauthorized` domain error.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_token_generation_and_verification() {
        let issuer = TokenIssuer::new("test_secret_for_gen_verify", 24);
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id, Role::Vendor).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Vendor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_expiration() {
        let issuer = TokenIssuer::new("test_secret_for_expiration", 24);
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            exp: (now - Duration::hours(2)).timestamp() as usize,
            iat: (now - Duration::hours(3)).timestamp() as usize,
        };
        let expired_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
        )
        .unwrap();

        let err = issuer.verify(&expired_token).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_token_signature() {
        let issued = TokenIssuer::new("one_secret", 24)
            .issue(Uuid::new_v4(), Role::User)
            .unwrap();

        match TokenIssuer::new("a_completely_different_secret", 24).verify(&issued) {
            Err(AppError::Domain(err)) => {
                assert_eq!(err.name, "Unauthorized");
                assert!(err.metadata["reason"].as_str().unwrap().contains("InvalidSignature"));
            }
            other => panic!("Unexpected result for invalid signature: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        let err = TokenIssuer::new("secret", 1).verify("not-a-jwt").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
