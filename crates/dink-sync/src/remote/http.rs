//! REST client for the remote store.
//!
//! Entity collections live under `{base_url}/{collection}`; every call
//! carries the session's bearer token and the backend applies row-level
//! security on its side. 401/403 map to [`RemoteError::Unauthorized`],
//! everything else that fails maps to [`RemoteError::Unavailable`].

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::StatusCode;

use crate::model::{Entity, Profile};

use super::{ProfileDirectory, RemoteError, RemoteStore, SyncScope};

/// HTTP-backed remote store.
#[derive(Debug)]
pub struct HttpRemoteStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    /// Create a client for the given base URL, authenticating with the
    /// session's access token when one is present.
    pub fn new(
        base_url: &str,
        access_token: Option<&str>,
        timeout: std::time::Duration,
    ) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| RemoteError::Unavailable("invalid access token format".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        // reqwest is built with rustls-no-provider; Err means a
        // provider was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.base_url)
    }

    fn check_status(status: StatusCode) -> Result<(), RemoteError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }
        if !status.is_success() {
            return Err(RemoteError::Unavailable(format!(
                "remote returned {status}"
            )));
        }
        Ok(())
    }
}

fn transport(e: &reqwest::Error) -> RemoteError {
    RemoteError::Unavailable(e.to_string())
}

impl<E: Entity> RemoteStore<E> for HttpRemoteStore {
    async fn fetch_all(&self, scope: &SyncScope) -> Result<Vec<E>, RemoteError> {
        let resp = self
            .http
            .get(self.collection_url(E::COLLECTION))
            .query(&[("owner", scope.user_id.as_str())])
            .send()
            .await
            .map_err(|e| transport(&e))?;

        Self::check_status(resp.status())?;
        resp.json::<Vec<E>>().await.map_err(|e| transport(&e))
    }

    async fn upsert(&self, entity: &E) -> Result<E, RemoteError> {
        let resp = self
            .http
            .put(format!(
                "{}/{}",
                self.collection_url(E::COLLECTION),
                entity.id()
            ))
            .json(entity)
            .send()
            .await
            .map_err(|e| transport(&e))?;

        Self::check_status(resp.status())?;
        resp.json::<E>().await.map_err(|e| transport(&e))
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let resp = self
            .http
            .delete(format!("{}/{id}", self.collection_url(E::COLLECTION)))
            .send()
            .await
            .map_err(|e| transport(&e))?;

        Self::check_status(resp.status())
    }
}

impl ProfileDirectory for HttpRemoteStore {
    async fn fetch_by_owner(&self, owner_id: &str) -> Result<Option<Profile>, RemoteError> {
        let resp = self
            .http
            .get(format!("{}/by-owner/{owner_id}", self.collection_url(Profile::COLLECTION)))
            .send()
            .await
            .map_err(|e| transport(&e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check_status(resp.status())?;
        resp.json::<Profile>().await.map(Some).map_err(|e| transport(&e))
    }
}
