//! crates/lam_phuong_core/src/session.rs
//!
//! The Auth Session Manager: the single in-memory authority for who is
//! signed in.
//!
//! The manager only touches the `TokenUserStore` at three points: bootstrap,
//! sign-in and sign-out (plus the forced sign-out taken on an Unauthorized
//! response). Everything else reads the in-memory state.

use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

use crate::domain::{Credentials, Session, User};
use crate::guard::AuthRoutes;
use crate::ports::{AuthApi, NavigationMode, Navigator, PortError};
use crate::session_store::TokenUserStore;
use crate::validation::{validate_credentials, ValidationErrors};

//=========================================================================================
// Errors and State
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid sign-in input: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Could not reach the authentication service: {0}")]
    Network(String),
    #[error("Authentication service error: {0}")]
    Server(String),
    #[error("Failed to persist the session: {0}")]
    Storage(String),
}

impl From<PortError> for AuthError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Unauthorized => AuthError::InvalidCredentials,
            PortError::Network(msg) => AuthError::Network(msg),
            PortError::Storage(msg) => AuthError::Storage(msg),
            PortError::NotFound(msg) | PortError::Unexpected(msg) => AuthError::Server(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Authenticated(Session),
    Unauthenticated,
}

/// Observable flags published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_loading: bool,
    pub is_authenticated: bool,
}

impl From<&AuthState> for SessionStatus {
    fn from(state: &AuthState) -> Self {
        Self {
            is_loading: matches!(state, AuthState::Initializing),
            is_authenticated: matches!(state, AuthState::Authenticated(_)),
        }
    }
}

//=========================================================================================
// AuthSessionManager
//=========================================================================================

pub struct AuthSessionManager {
    store: Arc<TokenUserStore>,
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    routes: AuthRoutes,
    state: RwLock<AuthState>,
    status: watch::Sender<SessionStatus>,
}

impl AuthSessionManager {
    pub fn new(
        store: Arc<TokenUserStore>,
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        routes: AuthRoutes,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::from(&AuthState::Initializing));
        Self {
            store,
            api,
            navigator,
            routes,
            state: RwLock::new(AuthState::Initializing),
            status,
        }
    }

    pub fn store(&self) -> &Arc<TokenUserStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Resolves `Initializing` from the store. Only the first call reads
    /// storage; later calls return the current state.
    pub async fn bootstrap(&self) -> AuthState {
        let mut state = self.state.write().await;
        if *state != AuthState::Initializing {
            return state.clone();
        }

        *state = match self.store.get_session().await {
            Some(session) => {
                info!("Restored session for user {}", session.user.id);
                AuthState::Authenticated(session)
            }
            None => AuthState::Unauthenticated,
        };
        self.publish(&state);
        state.clone()
    }

    /// Validates locally, authenticates remotely, persists, then transitions.
    ///
    /// Validation and remote failures touch nothing. A failed store write is
    /// rolled back by the store, which also removes any earlier session; the
    /// earlier session is written back, and if that fails too the manager
    /// signs out so memory never claims a session storage no longer holds.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        // 1. Local validation; nothing invalid reaches the remote API.
        validate_credentials(credentials)?;

        // 2. Remote authentication
        let session: Session = self
            .api
            .sign_in(credentials)
            .await
            .map_err(|e| {
                warn!("Sign-in rejected: {}", e);
                AuthError::from(e)
            })?
            .into();

        // 3. Persist before anyone can observe the new in-memory state.
        if let Err(e) = self.store.set_session(&session).await {
            error!("Failed to persist session: {}", e);
            self.restore_previous_session().await;
            return Err(AuthError::Storage(e.to_string()));
        }

        // 4. Transition
        let mut state = self.state.write().await;
        *state = AuthState::Authenticated(session.clone());
        self.publish(&state);
        info!("User {} signed in", session.user.id);

        Ok(session)
    }

    /// Ends the session and hard-navigates to the sign-in page so that no
    /// protected content stays rendered.
    pub async fn sign_out(&self) {
        let token = match self.current_session().await {
            Some(session) => Some(session.token),
            None => self.store.get_token().await,
        };

        // 1. Remote invalidation is best effort.
        if let Some(token) = token {
            if let Err(e) = self.api.sign_out(&token).await {
                warn!("Remote sign-out failed, clearing local session anyway: {}", e);
            }
        }

        // 2. Clear storage before navigating.
        if let Err(e) = self.store.clear_session().await {
            error!("Failed to clear persisted session: {}", e);
        }

        // 3. Transition and leave.
        self.transition_to_signed_out().await;
        info!("Signed out");
        self.navigator
            .navigate(&self.routes.sign_in_path, NavigationMode::Hard);
    }

    /// The only path by which a data-layer Unauthorized turns into navigation.
    pub async fn handle_unauthorized(&self, current_path: &str) {
        warn!("Session rejected while loading {}", current_path);
        if let Err(e) = self.store.clear_session().await {
            error!("Failed to clear rejected session: {}", e);
        }
        self.transition_to_signed_out().await;
        let target = self.routes.sign_in_url(Some(current_path), true);
        self.navigator.navigate(&target, NavigationMode::Hard);
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn current_session(&self) -> Option<Session> {
        match &*self.state.read().await {
            AuthState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current_session().await.map(|s| s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.status.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.status.borrow().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Drops an in-memory session whose persisted copy has disappeared, e.g.
    /// an expired cookie noticed by the route guard.
    pub async fn forget_session(&self) {
        if self.is_authenticated() {
            warn!("Persisted session is gone, signing out in memory");
            self.transition_to_signed_out().await;
        }
    }

    async fn restore_previous_session(&self) {
        let Some(previous) = self.current_session().await else {
            return;
        };
        if let Err(e) = self.store.set_session(&previous).await {
            error!("Could not restore the previous session: {}", e);
            self.transition_to_signed_out().await;
        }
    }

    async fn transition_to_signed_out(&self) {
        let mut state = self.state.write().await;
        *state = AuthState::Unauthenticated;
        self.publish(&state);
    }

    fn publish(&self, state: &AuthState) {
        let next = SessionStatus::from(state);
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
