use crate::config::RemoteSettings;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Remote backend rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl RemoteError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, RemoteError::InvalidCredentials)
    }
}

/// Identity record as the remote auth subsystem reports it. Profile fields
/// (name, role, avatar) live in the free-form metadata object.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSession {
    pub access_token: String,
    pub user: RemoteUser,
}

/// HTTP client for the managed backend: one table per entity collection
/// under `/rest/v1`, password-grant auth under `/auth/v1`, and a blob
/// bucket under `/storage/v1`.
pub struct RemoteBackend {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    storage_bucket: String,
}

impl RemoteBackend {
    pub fn new(settings: RemoteSettings) -> Self {
        RemoteBackend {
            http: reqwest::Client::new(),
            url: settings.url,
            anon_key: settings.anon_key,
            storage_bucket: settings.storage_bucket,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    fn with_keys(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn expect_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    // --- Collection operations ---

    pub async fn fetch_all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, RemoteError> {
        let response = self
            .with_keys(self.http.get(self.rest_url(table)))
            .query(&[("select", "*")])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    pub async fn insert<T: Serialize>(&self, table: &str, record: &T) -> Result<(), RemoteError> {
        let response = self
            .with_keys(self.http.post(self.rest_url(table)))
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
    ) -> Result<(), RemoteError> {
        let response = self
            .with_keys(self.http.patch(self.rest_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        let response = self
            .with_keys(self.http.delete(self.rest_url(table)))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    /// Targeted patch for the site-content table, addressed by its natural
    /// (section, key) uniqueness key instead of the id.
    pub async fn update_by_section_key<T: Serialize>(
        &self,
        table: &str,
        section: &str,
        key: &str,
        patch: &T,
    ) -> Result<(), RemoteError> {
        let response = self
            .with_keys(self.http.patch(self.rest_url(table)))
            .query(&[
                ("section", format!("eq.{}", section)),
                ("key", format!("eq.{}", key)),
            ])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    // --- Auth operations ---

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<RemoteSession, RemoteError> {
        let response = self
            .with_keys(
                self.http
                    .post(format!("{}/auth/v1/token", self.url))
                    .query(&[("grant_type", "password")]),
            )
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            // The auth subsystem reports rejected credentials on these
            // statuses; anything else is a genuine backend failure.
            return Err(RemoteError::InvalidCredentials);
        }
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: &str,
    ) -> Result<(), RemoteError> {
        let response = self
            .with_keys(self.http.post(format!("{}/auth/v1/signup", self.url)))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "name": name, "role": role },
            }))
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    /// Validates a stored access token and returns the user it belongs to.
    pub async fn get_user(&self, access_token: &str) -> Result<RemoteUser, RemoteError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    // --- Storage operations ---

    /// Uploads a blob into the media bucket and returns its public URL.
    pub async fn upload_object(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, RemoteError> {
        let response = self
            .with_keys(self.http.post(format!(
                "{}/storage/v1/object/{}/{}",
                self.url, self.storage_bucket, filename
            )))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url, self.storage_bucket, filename
        ))
    }
}

impl RemoteUser {
    /// Field from the metadata object, when the signup stored one.
    pub fn metadata_str(&self, field: &str) -> Option<String> {
        self.user_metadata
            .get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteSettings;

    fn unreachable_backend() -> RemoteBackend {
        // Loopback port 1 refuses connections immediately.
        RemoteBackend::new(RemoteSettings {
            url: "http://127.0.0.1:1".to_string(),
            anon_key: "anon".to_string(),
            storage_bucket: "media".to_string(),
        })
    }

    #[actix_web::test]
    async fn unreachable_backend_reports_transport_error() {
        let backend = unreachable_backend();
        let result = backend
            .fetch_all::<serde_json::Value>("services")
            .await;
        assert!(matches!(result, Err(RemoteError::Transport(_))));
    }

    #[test]
    fn metadata_lookup() {
        let user = RemoteUser {
            id: "u1".to_string(),
            email: Some("a@b.c".to_string()),
            user_metadata: serde_json::json!({ "name": "Ari", "role": "admin" }),
            created_at: None,
        };
        assert_eq!(user.metadata_str("name").as_deref(), Some("Ari"));
        assert_eq!(user.metadata_str("missing"), None);
    }
}
