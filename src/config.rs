use std::str::FromStr;

use anyhow::{bail, Context};
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
    pub algorithm: Algorithm,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub cookie_secure: bool,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60)?,
            algorithm: parse_algorithm(
                &std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            )?,
        };
        if jwt.ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive");
        }
        Ok(Self {
            database_url,
            max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 8080)?,
            cookie_secure: parse_or("COOKIE_SECURE", false)?,
            jwt,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Only the HMAC family is usable with a shared secret.
pub(crate) fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    let alg = Algorithm::from_str(raw.trim())
        .with_context(|| format!("unknown JWT_ALGORITHM {raw:?}"))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => bail!("JWT_ALGORITHM {other:?} needs a key pair; use HS256, HS384 or HS512"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hmac_algorithms() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm(" HS512 ").unwrap(), Algorithm::HS512);
    }

    #[test]
    fn rejects_asymmetric_and_unknown_algorithms() {
        assert!(parse_algorithm("RS256").is_err());
        assert!(parse_algorithm("none").is_err());
    }
}
