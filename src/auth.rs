use jwt_simple::prelude::{Claims, Duration as JwtDuration, RS256KeyPair, RSAKeyPairLike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: u64 = 3600;

/// Service account key file as issued by the provider console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credentials {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid credentials {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ServiceAccount {
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("service account private key is not a valid RSA PEM key")]
    InvalidKey,
    #[error("failed to sign token assertion")]
    Signing,
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("token response carried no access_token")]
    MissingToken,
}

#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScopeClaims {
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

pub(crate) fn sign_assertion(account: &ServiceAccount) -> Result<String, AuthError> {
    let key = RS256KeyPair::from_pem(&account.private_key).map_err(|_| AuthError::InvalidKey)?;
    let claims = Claims::with_custom_claims(
        ScopeClaims {
            scope: DATASTORE_SCOPE.to_string(),
        },
        JwtDuration::from_secs(ASSERTION_TTL_SECS),
    )
    .with_issuer(&account.client_email)
    .with_subject(&account.client_email)
    .with_audience(&account.token_uri);
    key.sign(claims).map_err(|_| AuthError::Signing)
}

/// Exchanges a signed assertion for a bearer token at the account's token endpoint.
pub async fn fetch_access_token(
    http: &reqwest::Client,
    account: &ServiceAccount,
) -> Result<AccessToken, AuthError> {
    let assertion = sign_assertion(account)?;
    let response = http
        .post(&account.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    token
        .access_token
        .filter(|token| !token.is_empty())
        .map(AccessToken)
        .ok_or(AuthError::MissingToken)
}
