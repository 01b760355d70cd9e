//! crates/lam_phuong_core/src/resources.rs
//!
//! Loads CRUD lists for pages. Reference data goes through the local
//! response cache; everything else is fetched every time.
//!
//! Cached lists are scoped to the bearer token that fetched them, so a token
//! only ever sees lists the remote API already served to that same token.

use chrono::Duration;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::LocalResponseCache;
use crate::domain::ResourceKind;
use crate::ports::{PortError, ResourceApi};

/// The remote API refused the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("The remote API rejected the session token")]
pub struct TokenRejected;

/// Cache namespace for one token: the first 16 bytes of its SHA-256, hex encoded.
fn token_scope(token: Option<&str>) -> String {
    match token {
        Some(token) => {
            let digest = Sha256::digest(token.as_bytes());
            hex::encode(&digest[..16])
        }
        None => "anonymous".to_string(),
    }
}

fn scoped_key(kind: ResourceKind, token: Option<&str>) -> String {
    format!("{}_{}", token_scope(token), kind.cache_key())
}

pub struct ResourceLoader {
    api: Arc<dyn ResourceApi>,
    cache: Arc<LocalResponseCache>,
    expiry: Duration,
}

impl ResourceLoader {
    pub fn new(api: Arc<dyn ResourceApi>, cache: Arc<LocalResponseCache>, expiry: Duration) -> Self {
        Self { api, cache, expiry }
    }

    /// Returns the list for `kind`.
    ///
    /// A rejected token is the only error; every other remote failure is
    /// logged and degrades to an empty list so the page still renders.
    pub async fn load_list(
        &self,
        kind: ResourceKind,
        token: Option<&str>,
    ) -> Result<Vec<Value>, TokenRejected> {
        let key = scoped_key(kind, token);

        if kind.is_reference_data() {
            if let Some(items) = self.cache.get::<Vec<Value>>(&key, self.expiry).await {
                debug!("Serving {} from cache", kind.slug());
                return Ok(items);
            }
        }

        match self.api.list(kind, token).await {
            Ok(items) => {
                if kind.is_reference_data() {
                    self.cache.set(&key, &items).await;
                }
                Ok(items)
            }
            Err(PortError::Unauthorized) => Err(TokenRejected),
            Err(e) => {
                warn!("Failed to load {}: {}", kind.slug(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Drops the cached list for `kind` held for `token`, e.g. after it was edited.
    pub async fn invalidate(&self, kind: ResourceKind, token: Option<&str>) {
        self.cache.delete(&scoped_key(kind, token)).await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.clear().await;
    }
}
