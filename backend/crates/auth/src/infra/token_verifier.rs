//! Provider Token Verification
//!
//! ID tokens and session cookies are RS256 JWTs signed by two different
//! rotating key sets. The key id in the header decides which set (and so
//! which issuer) applies. Public keys are fetched on demand and cached for
//! as long as the endpoint's `Cache-Control: max-age` allows.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::identity::{ProviderError, VerifiedAssertion};
use crate::infra::service_account::transport_error;

pub const DEFAULT_ID_TOKEN_KEYS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const DEFAULT_SESSION_COOKIE_KEYS_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/sessionCookiePublicKeys";

/// Used when the key endpoint sends no usable max-age
const FALLBACK_KEY_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    IdToken,
    SessionCookie,
}

impl TokenKind {
    fn issuer(&self, project_id: &str) -> String {
        match self {
            TokenKind::IdToken => format!("https://securetoken.google.com/{project_id}"),
            TokenKind::SessionCookie => format!("https://session.firebase.google.com/{project_id}"),
        }
    }
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    expires_at: Instant,
}

struct KeySet {
    url: String,
    cache: RwLock<Option<CachedKeys>>,
}

impl KeySet {
    fn new(url: String) -> Self {
        Self {
            url,
            cache: RwLock::new(None),
        }
    }

    async fn find(&self, http: &reqwest::Client, kid: &str) -> Result<Option<DecodingKey>, ProviderError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| Instant::now() < c.expires_at) {
                return Ok(cached.keys.get(kid).cloned());
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref().filter(|c| Instant::now() < c.expires_at) {
            return Ok(cached.keys.get(kid).cloned());
        }

        let fetched = self.fetch(http).await?;
        let key = fetched.keys.get(kid).cloned();
        *cache = Some(fetched);
        Ok(key)
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<CachedKeys, ProviderError> {
        let response = http.get(&self.url).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "public key endpoint returned {status}"
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(FALLBACK_KEY_TTL);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in set.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => tracing::warn!(kid = %jwk.kid, error = %e, "Skipping unusable public key"),
            }
        }

        tracing::debug!(url = %self.url, keys = keys.len(), ttl_secs = ttl.as_secs(), "Public keys refreshed");

        Ok(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Verifies provider ID tokens and session cookies
pub struct TokenVerifier {
    http: reqwest::Client,
    project_id: String,
    id_token_keys: KeySet,
    session_cookie_keys: KeySet,
}

impl TokenVerifier {
    pub fn new(
        http: reqwest::Client,
        project_id: impl Into<String>,
        id_token_keys_url: impl Into<String>,
        session_cookie_keys_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            project_id: project_id.into(),
            id_token_keys: KeySet::new(id_token_keys_url.into()),
            session_cookie_keys: KeySet::new(session_cookie_keys_url.into()),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedAssertion, ProviderError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| ProviderError::InvalidAssertion(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::InvalidAssertion(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| ProviderError::InvalidAssertion("missing key id".into()))?;

        let (kind, key) = match self.id_token_keys.find(&self.http, &kid).await? {
            Some(key) => (TokenKind::IdToken, key),
            None => match self.session_cookie_keys.find(&self.http, &kid).await? {
                Some(key) => (TokenKind::SessionCookie, key),
                None => {
                    return Err(ProviderError::InvalidAssertion(format!("unknown key id {kid}")));
                }
            },
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[kind.issuer(&self.project_id)]);

        let claims = jsonwebtoken::decode::<Claims>(token, &key, &validation)
            .map_err(|e| ProviderError::InvalidAssertion(e.to_string()))?
            .claims;

        if claims.sub.is_empty() {
            return Err(ProviderError::InvalidAssertion("empty subject".into()));
        }

        Ok(VerifiedAssertion {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../tests/fixtures/service_account_key.pem");
    const TEST_JWKS: &str = include_str!("../tests/fixtures/jwks.json");
    const PROJECT: &str = "demo-project";

    fn sign(kid: &str, issuer: &str, exp_offset: i64) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let now = Utc::now().timestamp();
        let claims = json!({
            "iss": issuer,
            "aud": PROJECT,
            "sub": "uid-alice",
            "iat": now,
            "exp": now + exp_offset,
            "email": "alice@example.com",
            "email_verified": true,
        });
        let key = EncodingKey::from_rsa_pem(TEST_KEY.as_bytes()).unwrap();
        jsonwebtoken::encode(&header, &claims, &key).unwrap()
    }

    async fn verifier_with(id_keys: &str, session_keys: &str) -> (MockServer, TokenVerifier) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/id-keys"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=19845, must-revalidate")
                    .set_body_raw(id_keys.to_string(), "application/json"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session-keys"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(session_keys.to_string(), "application/json"),
            )
            .mount(&server)
            .await;

        let verifier = TokenVerifier::new(
            reqwest::Client::new(),
            PROJECT,
            format!("{}/id-keys", server.uri()),
            format!("{}/session-keys", server.uri()),
        );
        (server, verifier)
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(
            parse_max_age("public, max-age=19845, must-revalidate"),
            Some(Duration::from_secs(19845))
        );
        assert_eq!(parse_max_age("no-cache"), None);
    }

    #[tokio::test]
    async fn test_valid_id_token() {
        let (_server, verifier) = verifier_with(TEST_JWKS, r#"{"keys":[]}"#).await;
        let token = sign("test-key-1", "https://securetoken.google.com/demo-project", 3600);

        let assertion = verifier.verify(&token).await.unwrap();
        assert_eq!(assertion.uid, "uid-alice");
        assert_eq!(assertion.email.as_deref(), Some("alice@example.com"));
        assert!(assertion.email_verified);
    }

    #[tokio::test]
    async fn test_session_cookie_uses_session_issuer() {
        let (_server, verifier) = verifier_with(r#"{"keys":[]}"#, TEST_JWKS).await;

        let cookie = sign("test-key-1", "https://session.firebase.google.com/demo-project", 3600);
        assert!(verifier.verify(&cookie).await.is_ok());

        // Session key set but ID-token issuer
        let mixed = sign("test-key-1", "https://securetoken.google.com/demo-project", 3600);
        assert!(matches!(
            verifier.verify(&mixed).await,
            Err(ProviderError::InvalidAssertion(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (_server, verifier) = verifier_with(TEST_JWKS, r#"{"keys":[]}"#).await;
        let token = sign("test-key-1", "https://securetoken.google.com/demo-project", -3600);

        assert!(matches!(
            verifier.verify(&token).await,
            Err(ProviderError::InvalidAssertion(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_kid_and_garbage() {
        let (_server, verifier) = verifier_with(TEST_JWKS, r#"{"keys":[]}"#).await;
        let token = sign("rotated-away", "https://securetoken.google.com/demo-project", 3600);

        assert!(matches!(
            verifier.verify(&token).await,
            Err(ProviderError::InvalidAssertion(_))
        ));
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(ProviderError::InvalidAssertion(_))
        ));
    }

    #[tokio::test]
    async fn test_keys_are_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/id-keys"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(TEST_JWKS, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let verifier = TokenVerifier::new(
            reqwest::Client::new(),
            PROJECT,
            format!("{}/id-keys", server.uri()),
            format!("{}/session-keys", server.uri()),
        );
        let token = sign("test-key-1", "https://securetoken.google.com/demo-project", 3600);

        verifier.verify(&token).await.unwrap();
        verifier.verify(&token).await.unwrap();
    }
}
