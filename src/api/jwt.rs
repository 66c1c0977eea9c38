use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SessionConfig;
use crate::storage::OwnerId;

/// Owner session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerClaims {
    /// Owner id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issues and validates the signed owner cookie
pub struct OwnerTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_hours: u64,
}

impl OwnerTokenService {
    pub fn new(secret: &str, token_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_hours,
        }
    }

    /// Create the service from the `[session]` section
    pub fn from_config(config: &SessionConfig) -> Self {
        // 未配置时生成随机 secret，重启后旧 cookie 全部失效
        let secret = if config.jwt_secret.is_empty() {
            warn!("session.jwt_secret not configured, generating a random one");
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        } else {
            config.jwt_secret.clone()
        };

        Self::new(&secret, config.token_hours)
    }

    pub fn token_hours(&self) -> u64 {
        self.token_hours
    }

    pub fn issue(&self, owner: OwnerId) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = OwnerClaims {
            sub: owner.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.token_hours as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate a token and return the owner it was issued for.
    pub fn validate(&self, token: &str) -> Result<OwnerId, jsonwebtoken::errors::Error> {
        let token_data = decode::<OwnerClaims>(token, &self.decoding_key, &Validation::default())?;

        match token_data.claims.sub.parse::<OwnerId>() {
            Ok(owner) if owner > 0 => Ok(owner),
            _ => Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidSubject,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> OwnerTokenService {
        OwnerTokenService::new("test_secret_key_32_bytes_long!!", 5)
    }

    #[test]
    fn test_issue_and_validate() {
        let service = create_test_service();
        let token = service.issue(42).unwrap();
        assert_eq!(service.validate(&token).unwrap(), 42);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let service = create_test_service();
        assert!(service.validate("invalid.token.here").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service1 = create_test_service();
        let service2 = OwnerTokenService::new("different_secret_key_32_bytes!!", 5);

        let token = service1.issue(7).unwrap();
        assert!(service2.validate(&token).is_err());
    }

    #[test]
    fn test_non_positive_subject_rejected() {
        let now = Utc::now();
        let claims = OwnerClaims {
            sub: "0".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let encoding_key = EncodingKey::from_secret(b"test_secret_key_32_bytes_long!!");
        let token = encode(&Header::default(), &claims, &encoding_key).unwrap();

        assert!(create_test_service().validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let claims = OwnerClaims {
            sub: "9".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let encoding_key = EncodingKey::from_secret(b"test_secret_key_32_bytes_long!!");
        let token = encode(&Header::default(), &claims, &encoding_key).unwrap();

        let result = create_test_service().validate(&token);
        assert!(result.is_err(), "Expected expired token to be rejected, got {:?}", result);
    }

    #[test]
    fn test_random_secret_when_unconfigured() {
        let config = SessionConfig::default();
        let a = OwnerTokenService::from_config(&config);
        let b = OwnerTokenService::from_config(&config);
        let token = a.issue(1).unwrap();
        assert!(b.validate(&token).is_err());
    }
}
