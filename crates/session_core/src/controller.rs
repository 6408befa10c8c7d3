use std::sync::Arc;

use identity::{token_for, IdentityProvider};
use shared::{
    domain::{Credentials, ProfilePatch, Registration, UserProfile},
    error::{ApiError, AuthError, ErrorCode},
};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::token_slot::TokenSlot;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Startup check has not completed yet.
    Unknown,
    Anonymous,
    Authenticated(UserProfile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn current_user(&self) -> Option<&UserProfile> {
        match &self.phase {
            SessionPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated(_))
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Unknown,
            loading: true,
            last_error: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("session token storage failed: {0:#}")]
    TokenSlot(anyhow::Error),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Auth(err) => err.code(),
            Self::TokenSlot(_) => ErrorCode::Internal,
        }
    }

    pub fn auth(&self) -> Option<AuthError> {
        match self {
            Self::Auth(err) => Some(*err),
            Self::TokenSlot(_) => None,
        }
    }
}

impl From<&SessionError> for ApiError {
    fn from(err: &SessionError) -> Self {
        ApiError::new(err.code(), err.to_string())
    }
}

/// Owns the observable session state and the persisted token for one application.
pub struct SessionController {
    provider: Arc<dyn IdentityProvider>,
    slot: Arc<dyn TokenSlot>,
    state: RwLock<SessionSnapshot>,
    events: broadcast::Sender<SessionSnapshot>,
}

impl SessionController {
    pub fn new(provider: Arc<dyn IdentityProvider>, slot: Arc<dyn TokenSlot>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            slot,
            state: RwLock::new(SessionSnapshot::default()),
            events,
        }
    }

    /// Builds a controller and runs the startup check before handing it out.
    pub async fn initialize(
        provider: Arc<dyn IdentityProvider>,
        slot: Arc<dyn TokenSlot>,
    ) -> Arc<Self> {
        let controller = Arc::new(Self::new(provider, slot));
        controller.restore().await;
        controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.state.read().await.current_user().cloned()
    }

    /// Resolves the persisted token, if any, into the starting session.
    pub async fn restore(&self) -> SessionSnapshot {
        let token = match self.slot.load().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "failed to read persisted session token");
                None
            }
        };

        let user = match &token {
            Some(token) => self.provider.resolve_token(token).await,
            None => None,
        };

        if token.is_some() && user.is_none() {
            info!("discarding stale session token");
            if let Err(err) = self.slot.clear().await {
                warn!(error = %err, "failed to clear stale session token");
            }
        }

        if let Some(user) = &user {
            info!(user_id = %user.id, "restored session");
        }

        self.apply(|state| {
            state.phase = match user {
                Some(user) => SessionPhase::Authenticated(user),
                None => SessionPhase::Anonymous,
            };
            state.loading = false;
        })
        .await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, SessionError> {
        self.begin().await;
        let outcome = match self
            .provider
            .authenticate(&credentials.email, &credentials.password)
            .await
        {
            Ok(user) => self.persist_session(user).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = &outcome {
            warn!(email = %credentials.email, error = %err, "login failed");
        }
        self.finish_sign_in(outcome).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, SessionError> {
        self.begin().await;
        let outcome = match self
            .provider
            .create(
                &registration.email,
                &registration.password,
                &registration.name,
            )
            .await
        {
            Ok(user) => self.persist_session(user).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = &outcome {
            warn!(email = %registration.email, error = %err, "registration failed");
        }
        self.finish_sign_in(outcome).await
    }

    /// Always ends anonymous; a token slot failure is only recorded.
    pub async fn logout(&self) {
        self.apply(|state| state.loading = true).await;
        let cleared = self.slot.clear().await;
        if let Err(err) = &cleared {
            warn!(error = %err, "failed to clear session token during logout");
        }
        self.apply(|state| {
            if let Some(user) = state.current_user() {
                info!(user_id = %user.id, "signed out");
            }
            state.phase = SessionPhase::Anonymous;
            state.loading = false;
            if let Err(err) = cleared {
                state.last_error = Some(SessionError::TokenSlot(err).to_string());
            }
        })
        .await;
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, SessionError> {
        let Some(user_id) = self.current_user().await.map(|user| user.id) else {
            let err = SessionError::from(AuthError::NotAuthenticated);
            let message = err.to_string();
            self.apply(|state| state.last_error = Some(message)).await;
            return Err(err);
        };

        self.begin().await;
        let outcome = self
            .provider
            .update(&user_id, patch)
            .await
            .map_err(SessionError::from);

        let message = outcome.as_ref().err().map(ToString::to_string);
        let updated = outcome.as_ref().ok().cloned();
        self.apply(|state| {
            state.loading = false;
            match updated {
                Some(user) if state.current_user().is_some_and(|u| u.id == user.id) => {
                    state.phase = SessionPhase::Authenticated(user);
                }
                Some(user) => {
                    debug!(user_id = %user.id, "session changed during profile update");
                }
                None => state.last_error = message,
            }
        })
        .await;
        outcome
    }

    pub async fn clear_error(&self) {
        self.apply(|state| state.last_error = None).await;
    }

    async fn persist_session(&self, user: UserProfile) -> Result<UserProfile, SessionError> {
        self.slot
            .store(&token_for(&user.id))
            .await
            .map_err(SessionError::TokenSlot)?;
        info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    async fn begin(&self) {
        self.apply(|state| {
            state.loading = true;
            state.last_error = None;
        })
        .await;
    }

    async fn finish_sign_in(
        &self,
        outcome: Result<UserProfile, SessionError>,
    ) -> Result<UserProfile, SessionError> {
        let message = outcome.as_ref().err().map(ToString::to_string);
        let user = outcome.as_ref().ok().cloned();
        self.apply(|state| {
            state.loading = false;
            match user {
                Some(user) => state.phase = SessionPhase::Authenticated(user),
                None => state.last_error = message,
            }
        })
        .await;
        outcome
    }

    /// Mutates the state and publishes the result under one write lock.
    async fn apply(&self, mutate: impl FnOnce(&mut SessionSnapshot)) -> SessionSnapshot {
        let mut state = self.state.write().await;
        mutate(&mut *state);
        let snapshot = state.clone();
        let _ = self.events.send(snapshot.clone());
        snapshot
    }
}
