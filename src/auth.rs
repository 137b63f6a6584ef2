use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Authenticated user id.
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

/// HS256 signing material, registered as app data.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::hours(24),
        }
    }

    /// Issue a token for a user. Used by development tooling and tests;
    /// the service itself never logs anyone in.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (chrono::Utc::now() + self.ttl).timestamp().max(0) as usize;
        let claims = Claims { sub: user_id.to_string(), username: username.to_string(), exp };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Validate a JWT and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

/// Extractor yielding validated `Claims`. Rejects with 401 before the
/// handler body runs.
pub struct Auth(pub Claims);

impl Auth {
    pub fn user_id(&self) -> &str { &self.0.sub }
}

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(keys) = req.app_data::<web::Data<TokenKeys>>() else {
            tracing::error!("TokenKeys not registered as app data");
            return ready(Err(ApiError::Internal));
        };
        // Delegate to BearerAuth to parse the header.
        let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() else {
            return ready(Err(ApiError::Unauthorized("Missing authentication".into())));
        };
        ready(match keys.verify(bearer.token()) {
            Ok(claims) => Ok(Auth(claims)),
            Err(e) => {
                tracing::debug!(error = %e, "rejected bearer token");
                Err(ApiError::Unauthorized("Invalid token".into()))
            }
        })
    }
}
