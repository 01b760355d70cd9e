//! crates/lam_phuong_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! session and cache logic to stay independent of cookies, disks, HTTP
//! clients and browsers.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Credentials, ResourceKind, SignInResponse};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (storage, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports
//=========================================================================================

/// A flat string key/value store: a cookie jar, browser local storage, a
/// directory on disk, or a plain map.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> PortResult<()>;

    async fn keys(&self) -> PortResult<Vec<String>>;
}

//=========================================================================================
// Remote API Ports
//=========================================================================================

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges credentials for a bearer token and user profile.
    /// Rejected credentials surface as `PortError::Unauthorized`.
    async fn sign_in(&self, credentials: &Credentials) -> PortResult<SignInResponse>;

    /// Invalidates the remote session behind `token`.
    async fn sign_out(&self, token: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Fetches the full list for one resource kind.
    async fn list(&self, kind: ResourceKind, token: Option<&str>) -> PortResult<Vec<Value>>;
}

//=========================================================================================
// Navigation Port
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Full page load; discards every piece of in-memory and rendered state.
    Hard,
    /// In-place history replacement.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: String,
    pub mode: NavigationMode,
}

/// Whatever drives the user agent's location.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str, mode: NavigationMode);
}
