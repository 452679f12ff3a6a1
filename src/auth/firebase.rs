//! Firebase ID token verification
//!
//! Tokens are RS256 JWTs signed by Google's securetoken service. Signing keys
//! come from a JWKS document, fetched on demand and cached.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::AuthSection;
use crate::{Error, Result};

use super::{IdentityVerifier, VerificationError};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fields of a service-account key file the verifier relies on
#[derive(Debug, Deserialize)]
struct ServiceAccount {
    #[serde(rename = "type")]
    account_type: String,
    #[serde(default)]
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
}

enum KeySource {
    Static(JwkSet),
    Remote {
        url: String,
        http: reqwest::Client,
        refresh_ttl: Duration,
        cache: RwLock<KeyCache>,
    },
}

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

/// Verifies Firebase ID tokens for one project
pub struct FirebaseVerifier {
    project_id: String,
    issuer: String,
    leeway: u64,
    keys: KeySource,
}

impl FirebaseVerifier {
    /// Build a verifier from the service-account JSON in `config`.
    ///
    /// No network call is made here; keys are fetched on first use.
    pub fn from_config(config: &AuthSection) -> Result<Self> {
        let raw = config
            .service_account_json
            .as_deref()
            .ok_or_else(|| Error::config("FIREBASE_SERVICE_ACCOUNT_JSON not set"))?;

        let account: ServiceAccount = serde_json::from_str(raw)?;
        if account.account_type != "service_account" {
            return Err(Error::config(format!(
                "credential type must be 'service_account', got '{}'",
                account.account_type
            )));
        }
        if account.project_id.trim().is_empty() {
            return Err(Error::config("service account is missing project_id"));
        }

        let keys = match config.jwks_json.as_deref() {
            Some(json) => KeySource::Static(serde_json::from_str(json)?),
            None => {
                let http = reqwest::Client::builder()
                    .timeout(JWKS_FETCH_TIMEOUT)
                    .build()
                    .map_err(|e| Error::internal(format!("failed to build JWKS client: {}", e)))?;
                KeySource::Remote {
                    url: config.jwks_url.clone(),
                    http,
                    refresh_ttl: Duration::from_secs(config.jwks_refresh_secs),
                    cache: RwLock::new(KeyCache::default()),
                }
            }
        };

        let project_id = account.project_id.trim().to_string();
        Ok(Self {
            issuer: format!("{}{}", ISSUER_PREFIX, project_id),
            project_id,
            leeway: config.clock_skew_secs,
            keys,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn decoding_key(&self, kid: &str) -> std::result::Result<DecodingKey, VerificationError> {
        let jwk = match &self.keys {
            KeySource::Static(set) => set.find(kid).cloned(),
            KeySource::Remote {
                url,
                http,
                refresh_ttl,
                cache,
            } => {
                let stale = {
                    let cache = cache.read().await;
                    if let Some(jwk) = cache.keys.as_ref().and_then(|set| set.find(kid)) {
                        return to_decoding_key(jwk);
                    }
                    cache
                        .fetched_at
                        .map(|t| t.elapsed() > *refresh_ttl)
                        .unwrap_or(true)
                };

                if !stale {
                    None
                } else {
                    // Fetch without holding the lock; a concurrent refresh is harmless.
                    let set = fetch_jwks(http, url).await?;
                    let jwk = set.find(kid).cloned();

                    let mut cache = cache.write().await;
                    cache.keys = Some(set);
                    cache.fetched_at = Some(Instant::now());
                    jwk
                }
            }
        };

        match jwk {
            Some(jwk) => to_decoding_key(&jwk),
            None => Err(VerificationError::Rejected(format!(
                "no signing key for kid '{}'",
                kid
            ))),
        }
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> std::result::Result<String, VerificationError> {
        let header =
            decode_header(token).map_err(|e| VerificationError::Malformed(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(VerificationError::Malformed(format!(
                "unsupported alg {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| VerificationError::Malformed("missing kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;

        let decoded = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| VerificationError::Rejected(e.to_string()))?;

        let subject = decoded.claims.sub.trim();
        if subject.is_empty() {
            return Err(VerificationError::Rejected("empty subject".to_string()));
        }

        Ok(subject.to_string())
    }
}

fn to_decoding_key(
    jwk: &jsonwebtoken::jwk::Jwk,
) -> std::result::Result<DecodingKey, VerificationError> {
    DecodingKey::from_jwk(jwk).map_err(|e| VerificationError::KeysUnavailable(e.to_string()))
}

async fn fetch_jwks(
    http: &reqwest::Client,
    url: &str,
) -> std::result::Result<JwkSet, VerificationError> {
    tracing::debug!(%url, "Refreshing token signing keys");

    http.get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| VerificationError::KeysUnavailable(e.to_string()))?
        .json::<JwkSet>()
        .await
        .map_err(|e| VerificationError::KeysUnavailable(e.to_string()))
}
