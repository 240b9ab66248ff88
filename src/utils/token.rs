use chrono::{Duration, Utc};
use derive_more::Display;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::services::database::user::Role;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    MalformedClaims,
    ParseFailure,
    InvalidSignature,
    SigningFailure,
}

/// Claims carried by short-lived access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

/// Refresh tokens carry only a subject and an expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
}

/// Signs and parses bearer tokens with HS256. Any token presented with a
/// different algorithm is rejected outright, regardless of its payload.
#[derive(Clone)]
pub struct TokenCodec {
    access_secret: String,
    refresh_secret: String,
}

impl TokenCodec {
    pub fn new(access_secret: String, refresh_secret: String) -> Self {
        Self {
            access_secret,
            refresh_secret,
        }
    }

    pub fn issue_access(
        &self,
        subject: &str,
        role: Role,
        ttl_minutes: i64,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: subject.to_string(),
            role,
            exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp(),
        };
        sign(&claims, &self.access_secret)
    }

    pub fn issue_refresh(&self, subject: &str, ttl_days: i64) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            sub: subject.to_string(),
            exp: (Utc::now() + Duration::days(ttl_days)).timestamp(),
        };
        sign(&claims, &self.refresh_secret)
    }

    pub fn parse_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = parse(token, &self.access_secret)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    pub fn parse_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = parse(token, &self.refresh_secret)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::SigningFailure)
}

fn parse<T: serde::de::DeserializeOwned>(token: &str, secret: &str) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::MalformedClaims,
        _ => TokenError::ParseFailure,
    })
}
