use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{AuthUser, Claims};
use super::role::Role;
use crate::config::JwtConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed or its signature does not verify")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token lacks user id or role")]
    ClaimsMissing,
}

/// Signing and verification keys plus the fixed token policy.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            issuer: cfg.issuer.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    pub fn issue(&self, user_id: i64, role: Role) -> anyhow::Result<String> {
        self.issue_at(user_id, role, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: i64, role: Role, now: OffsetDateTime) -> anyhow::Result<String> {
        let claims = Claims {
            iss: self.issuer.clone(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
            user_id: Some(user_id),
            role: Some(role.as_str().to_string()),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(user_id, %role, "jwt signed");
        Ok(token)
    }

    /// Verifies signature, header algorithm, issuer and expiry, then the
    /// identity claims.
    pub fn parse(&self, token: &str) -> Result<AuthUser, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let Claims { user_id, role, .. } = data.claims;
        let user_id = user_id.ok_or(TokenError::ClaimsMissing)?;
        let role = role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .ok_or(TokenError::ClaimsMissing)?;
        debug!(user_id, %role, "jwt verified");
        Ok(AuthUser { user_id, role })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        ttl_minutes: 60,
        algorithm: Algorithm::HS256,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys() -> JwtKeys {
        JwtKeys::new(&test_config())
    }

    fn sign_raw(payload: serde_json::Value, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> i64 {
        (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp()
    }

    #[test]
    fn issue_then_parse_recovers_identity() {
        let keys = keys();
        for role in Role::ALL {
            let token = keys.issue(42, role).expect("sign");
            let user = keys.parse(&token).expect("verify");
            assert_eq!(user, AuthUser { user_id: 42, role });
        }
    }

    #[test]
    fn token_past_ttl_is_expired() {
        let keys = keys();
        let two_hours_ago = OffsetDateTime::now_utc() - Duration::hours(2);
        let token = keys.issue_at(7, Role::Admin, two_hours_ago).unwrap();
        assert_eq!(keys.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = keys().issue(1, Role::Customer).unwrap();
        let other = JwtKeys::new(&JwtConfig {
            secret: "another-secret".into(),
            ..test_config()
        });
        assert_eq!(other.parse(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let token = keys().issue(1, Role::Customer).unwrap();
        let other = JwtKeys::new(&JwtConfig {
            issuer: "someone-else".into(),
            ..test_config()
        });
        assert_eq!(other.parse(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn header_algorithm_must_match_configuration() {
        let token = sign_raw(
            json!({"iss": "test-issuer", "iat": 0, "exp": future_exp(), "userId": 1, "role": "admin"}),
            Algorithm::HS512,
            "test-secret",
        );
        assert_eq!(keys().parse(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(keys().parse("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(keys().parse(""), Err(TokenError::Invalid));
    }

    #[test]
    fn missing_role_is_claims_missing() {
        let token = sign_raw(
            json!({"iss": "test-issuer", "iat": 0, "exp": future_exp(), "userId": 1}),
            Algorithm::HS256,
            "test-secret",
        );
        assert_eq!(keys().parse(&token), Err(TokenError::ClaimsMissing));
    }

    #[test]
    fn missing_user_id_is_claims_missing() {
        let token = sign_raw(
            json!({"iss": "test-issuer", "iat": 0, "exp": future_exp(), "role": "admin"}),
            Algorithm::HS256,
            "test-secret",
        );
        assert_eq!(keys().parse(&token), Err(TokenError::ClaimsMissing));
    }

    #[test]
    fn unknown_role_is_claims_missing() {
        let token = sign_raw(
            json!({"iss": "test-issuer", "iat": 0, "exp": future_exp(), "userId": 1, "role": "Admin"}),
            Algorithm::HS256,
            "test-secret",
        );
        assert_eq!(keys().parse(&token), Err(TokenError::ClaimsMissing));
    }
}
