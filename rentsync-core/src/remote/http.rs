//! REST implementation of [`RemoteClient`].
//!
//! Resources live at `{base_url}/{entity_type}`:
//! - `POST   /vehicles`       create, responds with the stored record (`id` required);
//!   the local id travels in the `Idempotency-Key` header
//! - `PUT    /vehicles/{id}`  update
//! - `DELETE /vehicles/{id}`  delete (404 counts as already deleted)
//! - `GET    /vehicles`       list all

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::marker::PhantomData;
use std::time::Duration;

use super::{RemoteClient, RemoteError, RemoteRecord, IDEMPOTENCY_KEY_HEADER};
use crate::entity::Entity;
use crate::record::{LocalId, RemoteId};

/// Timeout for the reachability probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Deserialize)]
struct CreatedResponse {
    id: RemoteId,
}

/// Builds the HTTP client shared by every [`HttpRemote`].
pub fn http_client(timeout: Duration) -> Result<Client, RemoteError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RemoteError::Unavailable(e.to_string()))
}

/// Returns true if the backend answers its health endpoint.
pub async fn check_server(server_url: &str) -> bool {
    let client = match http_client(HEALTH_TIMEOUT) {
        Ok(client) => client,
        Err(_) => return false,
    };
    let url = format!("{}/health", normalize_base_url(server_url));
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Remote client for one entity type over the REST API.
#[derive(Debug)]
pub struct HttpRemote<T> {
    client: Client,
    base_url: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpRemote<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> HttpRemote<T> {
    pub fn new(client: Client, server_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(server_url),
            _entity: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, T::ENTITY_TYPE.as_str())
    }

    fn item_url(&self, remote_id: &RemoteId) -> String {
        format!("{}/{}", self.collection_url(), remote_id)
    }
}

#[async_trait]
impl<T: Entity> RemoteClient<T> for HttpRemote<T> {
    async fn create(&self, local_id: LocalId, entity: &T) -> Result<RemoteId, RemoteError> {
        let response = self
            .client
            .post(self.collection_url())
            .header(IDEMPOTENCY_KEY_HEADER, local_id.to_string())
            .json(entity)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let created: CreatedResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        Ok(created.id)
    }

    async fn update(&self, remote_id: &RemoteId, entity: &T) -> Result<(), RemoteError> {
        let response = self
            .client
            .put(self.item_url(remote_id))
            .json(entity)
            .send()
            .await
            .map_err(classify_transport_error)?;

        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, remote_id: &RemoteId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.item_url(remote_id))
            .send()
            .await
            .map_err(classify_transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<RemoteRecord<T>>, RemoteError> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(classify_transport_error)?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

fn classify_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_decode() {
        RemoteError::Malformed(e.to_string())
    } else {
        RemoteError::Unavailable(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if is_transient(status) {
        return Err(RemoteError::Unavailable(format!(
            "server returned status {}",
            status
        )));
    }

    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Adds a scheme if missing and strips trailing slashes.
fn normalize_base_url(server_url: &str) -> String {
    let trimmed = server_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
