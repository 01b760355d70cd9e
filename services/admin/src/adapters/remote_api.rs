//! services/admin/src/adapters/remote_api.rs
//!
//! This module contains the adapter for the remote recruitment REST API.
//! It implements the `AuthApi` and `ResourceApi` ports from the `core` crate.

use async_trait::async_trait;
use lam_phuong_core::domain::{Credentials, ResourceKind, SignInResponse};
use lam_phuong_core::ports::{AuthApi, PortError, PortResult, ResourceApi};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to the remote API over HTTP.
#[derive(Clone)]
pub struct RemoteApiAdapter {
    client: Client,
    base_url: String,
}

impl RemoteApiAdapter {
    /// Creates a new `RemoteApiAdapter`. `base_url` must not end with a slash.
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        request.send().await.map_err(transport_error)
    }
}

/// The API answers either with a bare payload or wrapped in `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response
        .json::<Envelope<T>>()
        .await
        .map(Envelope::into_inner)
        .map_err(|e| PortError::Unexpected(format!("Malformed response body: {}", e)))
}

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Network(e.to_string())
}

async fn status_error(response: Response) -> PortError {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(response.url().path().to_string()),
        _ => {
            let body = response.text().await.unwrap_or_default();
            PortError::Unexpected(format!("{}: {}", status, body))
        }
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl AuthApi for RemoteApiAdapter {
    async fn sign_in(&self, credentials: &Credentials) -> PortResult<SignInResponse> {
        let response = self
            .send(self.client.post(self.url("auth/login")).json(credentials))
            .await?;

        // A malformed or rejected login is reported as bad credentials.
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(PortError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        decode(response).await
    }

    async fn sign_out(&self, token: &str) -> PortResult<()> {
        let response = self
            .send(self.client.post(self.url("auth/logout")).bearer_auth(token))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already invalid on the remote side; nothing left to end.
            StatusCode::UNAUTHORIZED => {
                debug!("Remote session was already invalid at sign-out");
                Ok(())
            }
            _ => Err(status_error(response).await),
        }
    }
}

#[async_trait]
impl ResourceApi for RemoteApiAdapter {
    async fn list(&self, kind: ResourceKind, token: Option<&str>) -> PortResult<Vec<Value>> {
        let mut request = self.client.get(self.url(kind.slug()));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        decode(response).await
    }
}
