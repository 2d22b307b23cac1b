//! Service-account authentication for the Google APIs
//!
//! Exchanges a signed JWT assertion for a short-lived bearer token using
//! the OAuth2 JWT-bearer grant.

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::FetchError;

/// Token endpoint used when the credentials blob does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to spreadsheets
pub const SPREADSHEETS_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/spreadsheets.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion, in seconds
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file this service needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    /// Account identity, used as the assertion issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    private_key: String,
    /// Key identifier, forwarded as the JWT `kid`
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Where assertions are exchanged for tokens
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccount {
    /// Parses a service-account key file.
    ///
    /// Invalid JSON or missing fields are configuration errors; the service
    /// cannot recover from them without a new credentials blob.
    pub fn from_json(raw: &str) -> Result<Self, FetchError> {
        serde_json::from_str(raw)
            .map_err(|e| FetchError::Configuration(format!("error getting credentials: {e}")))
    }

    /// Builds an RS256-signed assertion for `scope`, issued at `issued_at` (unix seconds).
    pub fn assertion(&self, scope: &str, issued_at: i64) -> Result<String, FetchError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| FetchError::Configuration(format!("invalid private key: {e}")))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| FetchError::Configuration(format!("error signing assertion: {e}")))
    }

    /// Exchanges a fresh assertion for a bearer token.
    pub async fn access_token(&self, client: &Client, scope: &str) -> Result<String, FetchError> {
        let assertion = self.assertion(scope, Utc::now().timestamp())?;

        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream(format!(
                "token request failed with {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(FetchError::Upstream(
                "token response has an empty access_token".to_string(),
            ));
        }
        Ok(token.access_token)
    }
}
