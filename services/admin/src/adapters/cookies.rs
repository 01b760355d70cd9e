//! services/admin/src/adapters/cookies.rs
//!
//! The cookie channel of the session store, scoped to one HTTP request.
//!
//! Reads come from the request's `Cookie` header; writes are collected and
//! turned into `Set-Cookie` headers on the response.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use lam_phuong_core::ports::{KeyValueStore, PortResult};
use lam_phuong_core::session_store::TOKEN_KEY;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub max_age: Duration,
    pub secure: bool,
}

/// Parses every `Cookie` header into a name/value map.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Reads a single non-empty cookie value.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    parse_cookies(headers).remove(name).filter(|v| !v.is_empty())
}

pub struct CookieChannel {
    incoming: HashMap<String, String>,
    /// `None` marks a removal.
    changes: Mutex<BTreeMap<String, Option<String>>>,
    settings: CookieSettings,
}

impl CookieChannel {
    pub fn from_headers(headers: &HeaderMap, settings: CookieSettings) -> Self {
        Self {
            incoming: parse_cookies(headers),
            changes: Mutex::new(BTreeMap::new()),
            settings,
        }
    }

    /// One `Set-Cookie` value per cookie written or removed during the request.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let changes = self.changes.lock().unwrap_or_else(|e| e.into_inner());
        changes
            .iter()
            .map(|(name, value)| match value {
                Some(value) => self.set_cookie(name, value, self.settings.max_age.as_secs()),
                None => self.set_cookie(name, "", 0),
            })
            .collect()
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: u64) -> String {
        let mut cookie = format!("{}={}; Path=/; SameSite=Lax; Max-Age={}", name, value, max_age);
        // The token never needs to be readable from page scripts.
        if name == TOKEN_KEY {
            cookie.push_str("; HttpOnly");
        }
        if self.settings.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn changes(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Option<String>>> {
        self.changes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for CookieChannel {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        if let Some(change) = self.changes().get(key) {
            return Ok(change.clone());
        }
        Ok(self.incoming.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.changes().insert(key.to_string(), Some(value.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.changes().insert(key.to_string(), None);
        Ok(())
    }

    async fn keys(&self) -> PortResult<Vec<String>> {
        let changes = self.changes();
        let mut keys: Vec<String> = self
            .incoming
            .keys()
            .filter(|k| !changes.contains_key(*k))
            .cloned()
            .collect();
        keys.extend(
            changes
                .iter()
                .filter(|(_, v)| v.is_some())
                .map(|(k, _)| k.clone()),
        );
        keys.sort();
        Ok(keys)
    }
}
