use async_trait::async_trait;
use quiz_core::model::{Identity, UserId};
use tokio::sync::watch;

use crate::error::IdentityError;

/// Who is playing.
///
/// Subscribers see every sign-in and sign-out as a new value; dropping the
/// receiver unsubscribes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate and return the signed-in identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if authentication fails. The caller may retry.
    async fn sign_in(&self) -> Result<Identity, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError` if the provider could not end the session.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    fn current(&self) -> Option<Identity>;

    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Offline provider: a player name from configuration and a random id per sign-in.
#[derive(Debug)]
pub struct LocalIdentityProvider {
    display_name: Option<String>,
    user_id: Option<UserId>,
    state: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new(display_name: Option<String>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            display_name: display_name.filter(|name| !name.trim().is_empty()),
            user_id: None,
            state,
        }
    }

    /// Reuse the same id on every sign-in instead of generating one.
    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self) -> Result<Identity, IdentityError> {
        if let Some(existing) = self.current() {
            return Ok(existing);
        }
        let id = self.user_id.clone().unwrap_or_else(UserId::random);
        let identity = Identity::new(id, self.display_name.clone());
        tracing::info!(
            user_id = %identity.id,
            name = identity.display_name_or_anonymous(),
            "signed in"
        );
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if let Some(previous) = self.state.send_replace(None) {
            tracing::info!(user_id = %previous.id, "signed out");
        }
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}
