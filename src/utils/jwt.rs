use std::collections::HashSet;

use jsonwebtoken::{
    decode, encode, errors::Error, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    TokenData, Validation,
};
use thiserror::Error;
use time::OffsetDateTime;

use crate::routes::auth::claims::Claims;

/// Minimum acceptable size for the JWT secret in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_UNIQUE_JWT_BYTES: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwtSecretError {
    #[error("JWT_SECRET must be set")]
    Missing,
    #[error("JWT_SECRET must be at least {required} bytes, but {actual} bytes were provided")]
    TooShort { actual: usize, required: usize },
    #[error("JWT_SECRET needs at least {required} unique bytes; only {actual} found")]
    LowEntropy { actual: usize, required: usize },
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Result<Self, JwtSecretError> {
        let bytes = secret.as_ref();
        if bytes.is_empty() {
            return Err(JwtSecretError::Missing);
        }
        validate_secret(bytes)?;

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Implemented by router state so the session extractor can validate tokens
/// without knowing the concrete state type.
pub trait JwtKeyProvider {
    fn jwt_keys(&self) -> &JwtKeys;
    fn jwt_issuer(&self) -> &str;
    fn jwt_audience(&self) -> &str;
}

fn validate_secret(secret: &[u8]) -> Result<(), JwtSecretError> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(JwtSecretError::TooShort {
            actual: secret.len(),
            required: MIN_JWT_SECRET_LENGTH,
        });
    }

    let unique = secret.iter().copied().collect::<HashSet<_>>().len();
    if unique < MIN_UNIQUE_JWT_BYTES {
        return Err(JwtSecretError::LowEntropy {
            actual: unique,
            required: MIN_UNIQUE_JWT_BYTES,
        });
    }

    Ok(())
}

pub fn create_jwt(
    mut claims: Claims,
    keys: &JwtKeys,
    issuer: &str,
    audience: &str,
) -> Result<String, Error> {
    claims.iss = issuer.to_owned();
    claims.aud = audience.to_owned();
    encode(&Header::default(), &claims, keys.encoding_key())
}

pub fn decode_jwt(
    token: &str,
    keys: &JwtKeys,
    issuer: &str,
    audience: &str,
) -> Result<TokenData<Claims>, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);
    validation.iss = Some(HashSet::from([issuer.to_owned()]));
    validation.validate_exp = true;
    validation.required_spec_claims.insert("exp".to_string());
    let data = decode::<Claims>(token, keys.decoding_key(), &validation)?;

    // jsonwebtoken allows 60s of leeway; sessions end exactly at exp.
    if data.claims.exp as i64 <= OffsetDateTime::now_utc().unix_timestamp() {
        return Err(Error::from(ErrorKind::ExpiredSignature));
    }

    Ok(data)
}
