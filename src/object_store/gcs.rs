use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

use super::{ObjectStore, ObjectStoreError};

/// Google Cloud Storage object store backend.
///
/// Uploads and deletes go through the JSON API with OAuth bearer tokens.
/// Access URLs are V4-signed query URLs when a service account key is
/// available; with metadata-server credentials the bucket stays private and
/// callers resolve the authenticated media URL through their own identity.
pub struct GcsStore {
    bucket: String,
    client: Client,
    access_token: tokio::sync::RwLock<CachedToken>,
    service_account: Option<ServiceAccountKey>,
}

#[derive(Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_expiry")]
    expires_in: u64,
}

fn default_token_expiry() -> u64 {
    3600
}

/// An OAuth access token with its expiry. Tokens last about an hour and
/// must be re-fetched before they lapse.
#[derive(Default)]
struct CachedToken {
    token: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CachedToken {
    /// Fresh means at least a minute of validity left.
    fn is_fresh(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + chrono::Duration::seconds(60) < expires_at,
            None => false,
        }
    }
}

impl GcsStore {
    pub async fn new(bucket: &str, credentials_file: Option<&str>) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;

        let service_account = match credentials_file {
            Some(path) => {
                let key_json = tokio::fs::read_to_string(path).await?;
                Some(serde_json::from_str::<ServiceAccountKey>(&key_json)?)
            }
            None => None,
        };

        let store = Self {
            bucket: bucket.to_string(),
            client,
            access_token: tokio::sync::RwLock::new(CachedToken::default()),
            service_account,
        };

        // Prime the token so credential problems surface at startup
        store.token().await?;
        Ok(store)
    }

    /// Return the cached access token, refreshing it when stale.
    async fn token(&self) -> Result<String, anyhow::Error> {
        let now = chrono::Utc::now();
        {
            let cached = self.access_token.read().await;
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        let mut cached = self.access_token.write().await;
        // A concurrent caller may have refreshed while we waited for the lock
        if cached.is_fresh(now) {
            return Ok(cached.token.clone());
        }

        let resp = if let Some(ref key) = self.service_account {
            self.token_from_service_account(key).await?
        } else {
            self.token_from_metadata_server().await?
        };

        cached.token = resp.access_token.clone();
        cached.expires_at = Some(now + chrono::Duration::seconds(resp.expires_in as i64));
        Ok(resp.access_token)
    }

    async fn token_from_service_account(
        &self,
        key: &ServiceAccountKey,
    ) -> Result<TokenResponse, anyhow::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/devstorage.read_write",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        // Build JWT (header.claims.signature)
        let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
        let unsigned = format!("{header}.{payload}");

        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

        let resp: TokenResponse = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(resp)
    }

    async fn token_from_metadata_server(&self) -> Result<TokenResponse, anyhow::Error> {
        let resp: TokenResponse = self
            .client
            .get("http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token")
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .json()
            .await?;

        Ok(resp)
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            percent_encode(key)
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}?alt=media",
            self.bucket,
            percent_encode(key)
        )
    }

    fn delete_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}",
            self.bucket,
            percent_encode(key)
        )
    }

    fn metadata_url(&self, key: &str) -> String {
        format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}",
            self.bucket,
            percent_encode(key)
        )
    }

    /// Build a V4-signed GET URL valid for `expires_in`.
    fn signed_url(
        &self,
        key: &ServiceAccountKey,
        object_key: &str,
        expires_in: Duration,
    ) -> Result<String, anyhow::Error> {
        let now = chrono::Utc::now();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let datestamp = now.format("%Y%m%d").to_string();
        let scope = format!("{datestamp}/auto/storage/goog4_request");
        let credential = format!("{}/{scope}", key.client_email);

        // Slashes separate path segments and stay unencoded in the canonical URI
        let encoded_path: String = object_key
            .split('/')
            .map(percent_encode)
            .collect::<Vec<_>>()
            .join("/");
        let canonical_uri = format!("/{}/{encoded_path}", self.bucket);

        // Query parameters sorted by name, values percent-encoded
        let canonical_query = format!(
            "X-Goog-Algorithm=GOOG4-RSA-SHA256\
             &X-Goog-Credential={}\
             &X-Goog-Date={timestamp}\
             &X-Goog-Expires={}\
             &X-Goog-SignedHeaders=host",
            percent_encode(&credential),
            expires_in.as_secs(),
        );

        let canonical_request = format!(
            "GET\n{canonical_uri}\n{canonical_query}\n\
             host:storage.googleapis.com\n\nhost\nUNSIGNED-PAYLOAD"
        );

        let request_hash = hex::encode(ring::digest::digest(
            &ring::digest::SHA256,
            canonical_request.as_bytes(),
        ));
        let string_to_sign =
            format!("GOOG4-RSA-SHA256\n{timestamp}\n{scope}\n{request_hash}");

        let signature = hex::encode(sign_rs256(string_to_sign.as_bytes(), &key.private_key)?);

        Ok(format!(
            "https://storage.googleapis.com{canonical_uri}?{canonical_query}&X-Goog-Signature={signature}"
        ))
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let token = self
            .token()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };

        let resp = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(&token)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS upload failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let token = self
            .token()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let resp = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS download failed ({status}): {body}"
            )));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        Ok(data)
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let token = self
            .token()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let resp = self
            .client
            .delete(self.delete_url(key))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        // 404 is fine -- object already gone
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS delete failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let token = self
            .token()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let resp = self
            .client
            .get(self.metadata_url(key))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        Ok(resp.status().is_success())
    }

    async fn access_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError> {
        match self.service_account {
            Some(ref sa) => self
                .signed_url(sa, key, expires_in)
                .map_err(|e| ObjectStoreError::Backend(e.to_string())),
            // Metadata-server credentials cannot sign. The media URL still
            // requires the caller's own IAM identity; nothing is public.
            None => Ok(self.object_url(key)),
        }
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Percent-encode everything outside the unreserved set.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    // Strip PEM headers and decode base64
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

    // Use ring for RSA signing
    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::CachedToken;

    #[test]
    fn test_cached_token_freshness() {
        let now = chrono::Utc::now();

        // No token yet: always stale
        assert!(!CachedToken::default().is_fresh(now));

        let valid = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now + chrono::Duration::seconds(3600)),
        };
        assert!(valid.is_fresh(now));

        // Under a minute left counts as stale so in-flight requests never
        // carry a token that lapses mid-call
        let expiring = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now + chrono::Duration::seconds(30)),
        };
        assert!(!expiring.is_fresh(now));

        let expired = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now - chrono::Duration::seconds(1)),
        };
        assert!(!expired.is_fresh(now));
    }
}
