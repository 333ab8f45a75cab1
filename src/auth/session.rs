//! The session manager: who is signed in, and whether they may see a page.

use std::sync::Arc;

use crate::{
    endpoints,
    error::{AuthError, ProviderError, SignUpError},
    identity::{Credentials, Identity, Session, SessionToken},
    profile::ProfileBinder,
    provider::AuthProvider,
};

/// The pages of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The landing page with links to sign up and log in.
    Welcome,
    /// The sign-up form.
    SignUp,
    /// The log-in form.
    LogIn,
    /// The greeting page shown after logging in.
    Home,
    /// The balance and the deposit and withdraw form.
    Dashboard,
    /// The list of past transactions.
    History,
}

impl Route {
    /// The URL path of the page.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Welcome => endpoints::ROOT,
            Route::SignUp => endpoints::SIGN_UP_VIEW,
            Route::LogIn => endpoints::LOG_IN_VIEW,
            Route::Home => endpoints::HOME_VIEW,
            Route::Dashboard => endpoints::DASHBOARD_VIEW,
            Route::History => endpoints::HISTORY_VIEW,
        }
    }

    /// The page served at `path`, if any.
    pub fn from_path(path: &str) -> Option<Self> {
        [
            Route::Welcome,
            Route::SignUp,
            Route::LogIn,
            Route::Home,
            Route::Dashboard,
            Route::History,
        ]
        .into_iter()
        .find(|route| route.path() == path)
    }

    /// Whether the page needs a signed-in user.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Home | Route::Dashboard | Route::History)
    }
}

/// The outcome of checking a request for a protected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The request belongs to this identity and may proceed.
    Granted(Identity),
    /// The request must not proceed and the client should be sent here.
    Redirect(Route),
}

/// Signs users up, in and out, and resolves session tokens to identities.
#[derive(Clone)]
pub struct SessionManager {
    auth: Arc<dyn AuthProvider>,
    profiles: ProfileBinder,
}

impl SessionManager {
    /// Create a session manager that creates identities with `auth` and binds
    /// display names to them with `profiles`.
    pub fn new(auth: Arc<dyn AuthProvider>, profiles: ProfileBinder) -> Self {
        Self { auth, profiles }
    }

    /// Create an identity and then its profile.
    ///
    /// The profile is only attempted once the identity exists. If it fails the
    /// identity is left without a profile, which is reported but not repaired.
    ///
    /// # Errors
    ///
    /// Returns [SignUpError::EmptyName] before contacting the provider if
    /// `display_name` is blank, [SignUpError::Auth] if the identity could not
    /// be created and [SignUpError::ProfileNotCreated] if the profile could
    /// not be created.
    pub async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: &str,
    ) -> Result<Identity, SignUpError> {
        if display_name.trim().is_empty() {
            return Err(SignUpError::EmptyName);
        }

        let identity = self.auth.sign_up(credentials).await?;

        if let Err(error) = self.profiles.create_profile(identity, display_name).await {
            tracing::error!("account {identity} was created without a profile: {error}");
            return Err(SignUpError::ProfileNotCreated { identity, error });
        }

        tracing::info!("signed up {identity}");

        Ok(identity)
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns the provider's [AuthError], e.g. [AuthError::InvalidCredentials].
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let session = self.auth.sign_in(credentials).await?;
        tracing::info!("signed in {}", session.identity);

        Ok(session)
    }

    /// The identity the session token belongs to.
    ///
    /// No token, an unknown or expired token and a provider failure all give
    /// `None`. Provider failures are logged.
    pub async fn current_user(&self, token: Option<&SessionToken>) -> Option<Identity> {
        let token = token?;

        match self.auth.get_current_user(token).await {
            Ok(identity) => identity,
            Err(error) => {
                tracing::warn!("could not look up session: {error}");
                None
            }
        }
    }

    /// Revoke a session at the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the session could not be revoked.
    pub async fn sign_out(&self, token: &SessionToken) -> Result<(), ProviderError> {
        self.auth.sign_out(token).await
    }

    /// Decide whether a request for `requested` may proceed.
    pub async fn guard(&self, token: Option<&SessionToken>, requested: Route) -> Access {
        match self.current_user(token).await {
            Some(identity) => Access::Granted(identity),
            None => {
                tracing::debug!(
                    "no valid session for {}, redirecting to log in",
                    requested.path()
                );
                Access::Redirect(Route::LogIn)
            }
        }
    }
}
