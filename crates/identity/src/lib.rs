use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{ProfilePatch, TrainingGoal, UserId, UserProfile},
    error::AuthError,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const TOKEN_PREFIX: &str = "token-";

const DEFAULT_AUTH_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_LOOKUP_DELAY: Duration = Duration::from_millis(300);

pub fn token_for(user_id: &UserId) -> String {
    format!("{TOKEN_PREFIX}{user_id}")
}

pub fn user_id_from_token(token: &str) -> Option<UserId> {
    token
        .strip_prefix(TOKEN_PREFIX)
        .filter(|id| !id.is_empty())
        .map(UserId::new)
}

/// Operations the session controller needs from an account backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Option<UserProfile>;
    async fn authenticate(&self, email: &str, secret: &str) -> Result<UserProfile, AuthError>;
    async fn create(&self, email: &str, secret: &str, name: &str)
        -> Result<UserProfile, AuthError>;
    async fn resolve_token(&self, token: &str) -> Option<UserProfile>;
    async fn update(&self, id: &UserId, patch: &ProfilePatch) -> Result<UserProfile, AuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    /// Applied to authenticate, create and update.
    pub auth: Duration,
    /// Applied to resolve_token and find_by_email.
    pub lookup: Duration,
}

impl Latency {
    pub fn none() -> Self {
        Self {
            auth: Duration::ZERO,
            lookup: Duration::ZERO,
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            auth: DEFAULT_AUTH_DELAY,
            lookup: DEFAULT_LOOKUP_DELAY,
        }
    }
}

struct StoredUser {
    profile: UserProfile,
    secret: String,
}

#[derive(Default)]
struct Registry {
    users: HashMap<UserId, StoredUser>,
}

impl Registry {
    fn by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.values().find(|user| user.profile.email == email)
    }

    fn next_id(&self) -> UserId {
        UserId(format!("user{}", self.users.len() + 1))
    }
}

#[derive(Clone)]
pub struct IdentityStore {
    registry: Arc<RwLock<Registry>>,
    latency: Latency,
}

impl IdentityStore {
    pub fn new(latency: Latency) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            latency,
        }
    }

    pub fn without_latency() -> Self {
        Self::new(Latency::none())
    }

    /// Registry preloaded with the demo account `john@example.com` / `password123`.
    pub fn with_demo_user(latency: Latency) -> Self {
        let id = UserId::new("user1");
        let demo = StoredUser {
            profile: UserProfile {
                id: id.clone(),
                email: "john@example.com".into(),
                name: "John Fitness".into(),
                weight: Some("185 lbs".into()),
                height: Some("6'0\"".into()),
                goal: TrainingGoal::Bulking,
            },
            secret: "password123".into(),
        };
        let mut registry = Registry::default();
        registry.users.insert(id, demo);
        Self {
            registry: Arc::new(RwLock::new(registry)),
            latency,
        }
    }

    pub async fn user_count(&self) -> usize {
        self.registry.read().await.users.len()
    }

    async fn simulate(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityStore {
    async fn find_by_email(&self, email: &str) -> Option<UserProfile> {
        self.simulate(self.latency.lookup).await;
        let registry = self.registry.read().await;
        registry.by_email(email).map(|user| user.profile.clone())
    }

    async fn authenticate(&self, email: &str, secret: &str) -> Result<UserProfile, AuthError> {
        self.simulate(self.latency.auth).await;
        let registry = self.registry.read().await;
        match registry.by_email(email) {
            Some(user) if user.secret == secret => {
                debug!(user_id = %user.profile.id, "credentials accepted");
                Ok(user.profile.clone())
            }
            _ => {
                debug!(%email, "credentials rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn create(
        &self,
        email: &str,
        secret: &str,
        name: &str,
    ) -> Result<UserProfile, AuthError> {
        self.simulate(self.latency.auth).await;
        let mut registry = self.registry.write().await;
        if registry.by_email(email).is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let profile = UserProfile {
            id: registry.next_id(),
            email: email.to_string(),
            name: name.to_string(),
            weight: None,
            height: None,
            goal: TrainingGoal::default(),
        };
        registry.users.insert(
            profile.id.clone(),
            StoredUser {
                profile: profile.clone(),
                secret: secret.to_string(),
            },
        );
        info!(user_id = %profile.id, %email, "registered user");
        Ok(profile)
    }

    async fn resolve_token(&self, token: &str) -> Option<UserProfile> {
        self.simulate(self.latency.lookup).await;
        let user_id = user_id_from_token(token)?;
        let registry = self.registry.read().await;
        registry.users.get(&user_id).map(|user| user.profile.clone())
    }

    async fn update(&self, id: &UserId, patch: &ProfilePatch) -> Result<UserProfile, AuthError> {
        self.simulate(self.latency.auth).await;
        let mut registry = self.registry.write().await;
        if !registry.users.contains_key(id) {
            return Err(AuthError::UserNotFound);
        }
        if let Some(email) = &patch.email {
            let taken = registry
                .by_email(email)
                .is_some_and(|other| &other.profile.id != id);
            if taken {
                return Err(AuthError::DuplicateEmail);
            }
        }

        let user = registry.users.get_mut(id).ok_or(AuthError::UserNotFound)?;
        patch.apply_to(&mut user.profile);
        info!(user_id = %id, "updated profile");
        Ok(user.profile.clone())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
