//! crates/lam_phuong_core/src/session_store.rs
//!
//! The Token/User Store: reads and writes the persisted session over two
//! named channels.
//!
//! The cookie channel is what the edge gate can see on every request; the
//! local-storage channel covers contexts where only client storage exists.
//! The store holds no policy beyond channel order: cookie first, local
//! storage second.

use chrono::{DateTime, Duration, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::clock::Clock;
use crate::domain::{Session, User};
use crate::ports::{KeyValueStore, PortResult};

pub const TOKEN_KEY: &str = "lp_auth_token";
pub const USER_KEY: &str = "lp_auth_user";
/// Only written to local storage; cookies expire through `Max-Age`.
pub const EXPIRES_AT_KEY: &str = "lp_auth_expires_at";

/// The characters `encodeURIComponent` leaves alone, so cookies written here
/// and cookies written by the browser decode the same way.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChannel {
    Cookie,
    LocalStorage,
}

/// Which channels currently hold a complete (token + user) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelPresence {
    pub cookie: bool,
    pub local: bool,
}

impl ChannelPresence {
    /// Route guard rule: a session in either channel counts.
    pub fn any(self) -> bool {
        self.cookie || self.local
    }

    pub fn has(self, channel: SessionChannel) -> bool {
        match channel {
            SessionChannel::Cookie => self.cookie,
            SessionChannel::LocalStorage => self.local,
        }
    }
}

//=========================================================================================
// TokenUserStore
//=========================================================================================

pub struct TokenUserStore {
    cookie: Arc<dyn KeyValueStore>,
    local: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
    /// Serializes every read and write so a half-written session is never observed.
    lock: Mutex<()>,
}

impl TokenUserStore {
    pub fn new(
        cookie: Arc<dyn KeyValueStore>,
        local: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        lifetime: Duration,
    ) -> Self {
        Self {
            cookie,
            local,
            clock,
            lifetime,
            lock: Mutex::new(()),
        }
    }

    /// Reads the bearer token, preferring the cookie channel.
    pub async fn get_token(&self) -> Option<String> {
        let _guard = self.lock.lock().await;
        match self.read_token(SessionChannel::Cookie).await {
            Some(token) => Some(token),
            None => self.read_token(SessionChannel::LocalStorage).await,
        }
    }

    /// Reads the user profile, preferring the cookie channel. Malformed data is absent.
    pub async fn get_user(&self) -> Option<User> {
        let _guard = self.lock.lock().await;
        match self.read_user(SessionChannel::Cookie).await {
            Some(user) => Some(user),
            None => self.read_user(SessionChannel::LocalStorage).await,
        }
    }

    /// The first channel holding both halves of a session wins. Halves are
    /// never mixed across channels.
    pub async fn get_session(&self) -> Option<Session> {
        let _guard = self.lock.lock().await;
        for channel in [SessionChannel::Cookie, SessionChannel::LocalStorage] {
            if let Some(session) = self.read_session(channel).await {
                return Some(session);
            }
        }
        None
    }

    pub async fn presence(&self) -> ChannelPresence {
        let _guard = self.lock.lock().await;
        ChannelPresence {
            cookie: self.read_session(SessionChannel::Cookie).await.is_some(),
            local: self.read_session(SessionChannel::LocalStorage).await.is_some(),
        }
    }

    /// Persists the session to both channels. If any write fails, whatever was
    /// written is removed again before the error is returned.
    pub async fn set_session(&self, session: &Session) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let result = self.write_session(session).await;
        if let Err(e) = &result {
            warn!("Failed to persist session, rolling back: {}", e);
            if let Err(e) = self.remove_all().await {
                warn!("Rollback after failed session write was incomplete: {}", e);
            }
        }
        result
    }

    /// Removes every persisted copy. Safe to call when nothing is stored.
    pub async fn clear_session(&self) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        self.remove_all().await
    }

    //=====================================================================================
    // Channel helpers (callers hold `lock`)
    //=====================================================================================

    fn channel(&self, channel: SessionChannel) -> &dyn KeyValueStore {
        match channel {
            SessionChannel::Cookie => self.cookie.as_ref(),
            SessionChannel::LocalStorage => self.local.as_ref(),
        }
    }

    async fn read_raw(&self, channel: SessionChannel, key: &str) -> Option<String> {
        match self.channel(channel).get(key).await {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                warn!("Session storage read of '{}' failed on {:?}: {}", key, channel, e);
                None
            }
        }
    }

    async fn read_token(&self, channel: SessionChannel) -> Option<String> {
        if channel == SessionChannel::LocalStorage && self.local_copy_expired().await {
            return None;
        }
        self.read_raw(channel, TOKEN_KEY).await
    }

    async fn read_user(&self, channel: SessionChannel) -> Option<User> {
        if channel == SessionChannel::LocalStorage && self.local_copy_expired().await {
            return None;
        }
        let raw = self.read_raw(channel, USER_KEY).await?;
        let json = match channel {
            SessionChannel::Cookie => percent_decode_str(&raw).decode_utf8().ok()?.into_owned(),
            SessionChannel::LocalStorage => raw,
        };
        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring malformed user profile on {:?}: {}", channel, e);
                None
            }
        }
    }

    async fn read_session(&self, channel: SessionChannel) -> Option<Session> {
        let token = self.read_token(channel).await?;
        let user = self.read_user(channel).await?;
        Some(Session { token, user })
    }

    /// Purges the local copy once its stamp has passed.
    async fn local_copy_expired(&self) -> bool {
        let Some(raw) = self.read_raw(SessionChannel::LocalStorage, EXPIRES_AT_KEY).await else {
            return false;
        };
        let expired = match DateTime::parse_from_rfc3339(&raw) {
            Ok(expires_at) => self.clock.now() >= expires_at.with_timezone(&Utc),
            Err(_) => true,
        };
        if expired {
            for key in [TOKEN_KEY, USER_KEY, EXPIRES_AT_KEY] {
                if let Err(e) = self.local.remove(key).await {
                    warn!("Failed to purge expired local session key '{}': {}", key, e);
                }
            }
        }
        expired
    }

    async fn write_session(&self, session: &Session) -> PortResult<()> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| crate::ports::PortError::Unexpected(e.to_string()))?;
        let encoded_user = utf8_percent_encode(&user_json, URI_COMPONENT).to_string();
        let expires_at = (self.clock.now() + self.lifetime).to_rfc3339();

        self.cookie.set(TOKEN_KEY, &session.token).await?;
        self.cookie.set(USER_KEY, &encoded_user).await?;
        self.local.set(TOKEN_KEY, &session.token).await?;
        self.local.set(USER_KEY, &user_json).await?;
        self.local.set(EXPIRES_AT_KEY, &expires_at).await?;
        Ok(())
    }

    /// Attempts every removal and reports the first failure.
    async fn remove_all(&self) -> PortResult<()> {
        let mut first_error = None;
        let removals = [
            (SessionChannel::Cookie, TOKEN_KEY),
            (SessionChannel::Cookie, USER_KEY),
            (SessionChannel::LocalStorage, TOKEN_KEY),
            (SessionChannel::LocalStorage, USER_KEY),
            (SessionChannel::LocalStorage, EXPIRES_AT_KEY),
        ];
        for (channel, key) in removals {
            if let Err(e) = self.channel(channel).remove(key).await {
                warn!("Failed to remove '{}' from {:?}: {}", key, channel, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
