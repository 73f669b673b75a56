use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use kindred_types::api::Claims;

const TOKEN_LIFETIME_DAYS: i64 = 1;

/// Signs and checks HS512 bearer tokens. Validation covers the signature
/// and expiry; there is no issuer or audience.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS512),
        }
    }

    /// Token for a freshly authenticated user, valid for one day.
    pub fn issue(&self, user_id: i64, username: &str) -> anyhow::Result<String> {
        let claims = Claims {
            nameid: user_id,
            unique_name: username.to_string(),
            exp: (Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        let token = encode(&Header::new(Algorithm::HS512), claims, &self.encoding)?;
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}
