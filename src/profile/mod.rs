//! Display names bound to identities.
//!
//! A profile row is written once at sign-up and only ever read afterwards.

mod home_page;

use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{FetchError, SubmitError},
    identity::Identity,
    provider::DataStore,
};

pub use home_page::get_home_page;

/// The display name of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The identity the profile belongs to, also the row's primary key.
    pub id: Identity,
    /// The name shown in greetings.
    pub name: String,
}

/// Reads and creates profile rows.
#[derive(Clone)]
pub struct ProfileBinder {
    store: Arc<dyn DataStore>,
}

impl ProfileBinder {
    /// Create a binder that keeps profiles in `store`.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Get the display name for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [FetchError::NotFound] if `identity` has no profile, which
    /// happens when sign-up created the identity but not the profile.
    pub async fn get_display_name(&self, identity: Identity) -> Result<String, FetchError> {
        self.store
            .select_profile(&identity)
            .await?
            .map(|profile| profile.name)
            .ok_or(FetchError::NotFound)
    }

    /// Bind `name` to `identity`.
    ///
    /// # Errors
    ///
    /// Returns a [SubmitError] if the provider refuses the row, e.g. because
    /// the identity already has a profile.
    pub async fn create_profile(&self, identity: Identity, name: &str) -> Result<(), SubmitError> {
        let profile = Profile {
            id: identity,
            name: name.trim().to_owned(),
        };

        self.store.insert_profile(&profile).await?;
        tracing::debug!("created profile for {identity}");

        Ok(())
    }
}

impl FromRef<AppState> for ProfileBinder {
    fn from_ref(state: &AppState) -> Self {
        state.profiles.clone()
    }
}
