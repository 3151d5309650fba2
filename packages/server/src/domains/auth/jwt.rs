use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Role, UserId};

const ACCESS_TOKEN: &str = "access";
const VERIFICATION_TOKEN: &str = "verify_email";

/// How long an email verification token stays valid
pub const VERIFICATION_TTL_HOURS: i64 = 24;

/// JWT Claims - data stored in an access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // Subject (user_id as string)
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub csrf: String,     // Double-submit value mirrored in the csrf cookie
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

/// Claims of an email verification token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerificationClaims {
    pub user_email: String,
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// A freshly minted access token
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub csrf: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT Service - creates and verifies signed tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String, access_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            access_ttl: Duration::days(access_ttl_days),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation
    }

    /// Create a new access token for a user
    pub fn create_token(&self, user_id: UserId, username: &str, role: Role) -> Result<AccessToken> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let csrf = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            username: username.to_string(),
            role,
            csrf: csrf.clone(),
            typ: ACCESS_TOKEN.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(AccessToken {
            token,
            csrf,
            expires_at,
        })
    }

    /// Verify and decode an access token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation())?.claims;
        if claims.typ != ACCESS_TOKEN {
            bail!("not an access token");
        }
        Ok(claims)
    }

    /// Create an email verification token that expires after 24 hours
    pub fn create_verification_token(&self, email: &str) -> Result<String> {
        self.create_verification_token_with_ttl(email, Duration::hours(VERIFICATION_TTL_HOURS))
    }

    pub(crate) fn create_verification_token_with_ttl(
        &self,
        email: &str,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = VerificationClaims {
            user_email: email.to_string(),
            typ: VERIFICATION_TOKEN.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Returns the email the verification token was issued for
    pub fn verify_verification_token(&self, token: &str) -> Result<String> {
        let claims =
            decode::<VerificationClaims>(token, &self.decoding_key, &self.validation())?.claims;
        if claims.typ != VERIFICATION_TOKEN {
            bail!("not a verification token");
        }
        Ok(claims.user_email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test_secret_key", "test_issuer".to_string(), 364)
    }

    #[test]
    fn test_create_and_verify_token() {
        let service = service();
        let user_id = UserId::new();

        let issued = service.create_token(user_id, "dev", Role::Admin).unwrap();
        let claims = service.verify_token(&issued.token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "dev");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.csrf, issued.csrf);
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_access_token_lifetime() {
        let service = service();
        let issued = service.create_token(UserId::new(), "dev", Role::Member).unwrap();
        let claims = service.verify_token(&issued.token).unwrap();

        let expires_in = claims.exp - Utc::now().timestamp();
        assert!(expires_in > 363 * 24 * 3600);
        assert!(expires_in <= 364 * 24 * 3600);
    }

    #[test]
    fn test_wrong_secret() {
        let other = JwtService::new("secret2", "test_issuer".to_string(), 364);
        let issued = service()
            .create_token(UserId::new(), "dev", Role::Member)
            .unwrap();

        assert!(other.verify_token(&issued.token).is_err());
    }

    #[test]
    fn test_verification_round_trip() {
        let service = service();
        let token = service.create_verification_token("dev@local.host").unwrap();
        assert_eq!(
            service.verify_verification_token(&token).unwrap(),
            "dev@local.host"
        );
    }

    #[test]
    fn test_expired_verification_token() {
        let service = service();
        let token = service
            .create_verification_token_with_ttl("dev@local.host", Duration::hours(-2))
            .unwrap();
        assert!(service.verify_verification_token(&token).is_err());
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let service = service();
        let access = service
            .create_token(UserId::new(), "dev", Role::Member)
            .unwrap();
        let verification = service.create_verification_token("dev@local.host").unwrap();

        assert!(service.verify_verification_token(&access.token).is_err());
        assert!(service.verify_token(&verification).is_err());
    }
}
