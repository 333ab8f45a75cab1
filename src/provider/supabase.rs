//! A provider that talks to a hosted Supabase project over its REST API.
//!
//! Auth requests go to GoTrue under `/auth/v1` with the anonymous key and
//! table requests go to PostgREST under `/rest/v1` with the service key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{AuthError, ProviderError},
    identity::{Credentials, Identity, Session, SessionToken},
    ledger::{NewTransaction, Transaction},
    profile::Profile,
    provider::{AuthProvider, DataStore, SortOrder, TransactionQuery},
};

/// Where the Supabase project lives and the keys used to talk to it.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// The project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// The public anonymous key, used for auth requests.
    pub anon_key: String,
    /// The service role key, used for table requests.
    pub service_key: String,
    /// How long to wait for a response before giving up.
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"********")
            .field("service_key", &"********")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Provider backed by a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseProvider {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseProvider {
    /// Create a provider for the project described by `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| ProviderError::Unreachable(error.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{path}", self.base_url()))
            .header("apikey", &self.config.anon_key)
    }

    fn table_request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{table}", self.base_url()))
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }
}

/// An error response from GoTrue or PostgREST.
#[derive(Debug, Clone, PartialEq)]
struct ApiError {
    status: StatusCode,
    code: Option<String>,
    message: String,
}

impl ApiError {
    /// Read the error out of a response body.
    ///
    /// GoTrue uses `msg` or `error_description` and PostgREST uses `message`.
    /// The machine readable code is `error_code`, `error` or a string `code`.
    async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

        let field = |name: &str| json.get(name).and_then(Value::as_str).map(str::to_owned);

        let message = field("msg")
            .or_else(|| field("error_description"))
            .or_else(|| field("message"))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.clone()
                }
            });
        let code = field("error_code")
            .or_else(|| field("error"))
            .or_else(|| field("code"));

        Self {
            status,
            code,
            message,
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(value: ApiError) -> Self {
        ProviderError::Rejected {
            status: Some(value.status.as_u16()),
            message: value.message,
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(value: ApiError) -> Self {
        match value.code.as_deref() {
            Some("invalid_credentials" | "invalid_grant") => AuthError::InvalidCredentials,
            Some("user_already_exists" | "email_exists") => AuthError::DuplicateAccount,
            Some("email_address_invalid") => AuthError::InvalidEmail,
            Some("weak_password") => AuthError::WeakPassword(value.message),
            _ => match value.message.as_str() {
                "Invalid login credentials" => AuthError::InvalidCredentials,
                "User already registered" => AuthError::DuplicateAccount,
                _ => AuthError::Provider(value.message),
            },
        }
    }
}

/// Send `request` and turn a non-success status into an error.
async fn send<E>(request: RequestBuilder) -> Result<Response, E>
where
    E: From<ApiError> + From<ProviderError>,
{
    let response = request.send().await.map_err(ProviderError::from)?;

    if response.status().is_success() {
        Ok(response)
    } else {
        let error = ApiError::from_response(response).await;
        tracing::debug!("provider rejected request: {error:?}");
        Err(error.into())
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
}

/// The sign-up response is the user itself, or a session wrapping the user
/// when email confirmation is turned off.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    id: Option<Uuid>,
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for PasswordGrant<'a> {
    fn from(value: &'a Credentials) -> Self {
        Self {
            email: value.email.trim(),
            password: &value.password,
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let response: SignUpResponse = send::<AuthError>(
            self.auth_request(Method::POST, "signup")
                .bearer_auth(&self.config.anon_key)
                .json(&PasswordGrant::from(credentials)),
        )
        .await?
        .json()
        .await
        .map_err(ProviderError::from)?;

        response
            .id
            .or(response.user.map(|user| user.id))
            .map(Identity::new)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("sign up response has no user ID".to_owned()).into()
            })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let response: TokenResponse = send::<AuthError>(
            self.auth_request(Method::POST, "token")
                .query(&[("grant_type", "password")])
                .bearer_auth(&self.config.anon_key)
                .json(&PasswordGrant::from(credentials)),
        )
        .await?
        .json()
        .await
        .map_err(ProviderError::from)?;

        let expires_at = response
            .expires_at
            .and_then(|timestamp| OffsetDateTime::from_unix_timestamp(timestamp).ok())
            .unwrap_or_else(|| {
                OffsetDateTime::now_utc() + time::Duration::seconds(response.expires_in)
            });

        Ok(Session {
            token: SessionToken::new(response.access_token),
            identity: Identity::new(response.user.id),
            expires_at,
        })
    }

    async fn get_current_user(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Identity>, ProviderError> {
        let response = self
            .auth_request(Method::GET, "user")
            .bearer_auth(token.as_str())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserResponse = response.json().await?;
                Ok(Some(Identity::new(user.id)))
            }
            _ => Err(ApiError::from_response(response).await.into()),
        }
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), ProviderError> {
        send::<ProviderError>(
            self.auth_request(Method::POST, "logout")
                .bearer_auth(token.as_str()),
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DataStore for SupabaseProvider {
    async fn insert_profile(&self, profile: &Profile) -> Result<(), ProviderError> {
        send::<ProviderError>(
            self.table_request(Method::POST, "profiles")
                .header("Prefer", "return=minimal")
                .json(profile),
        )
        .await?;

        Ok(())
    }

    async fn select_profile(&self, id: &Identity) -> Result<Option<Profile>, ProviderError> {
        let profiles: Vec<Profile> = send::<ProviderError>(
            self.table_request(Method::GET, "profiles")
                .query(&[("select", "id,name".to_owned()), ("id", format!("eq.{id}"))]),
        )
        .await?
        .json()
        .await?;

        Ok(profiles.into_iter().next())
    }

    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<Transaction, ProviderError> {
        let rows: Vec<Transaction> = send::<ProviderError>(
            self.table_request(Method::POST, "transactions")
                .header("Prefer", "return=representation")
                .json(transaction),
        )
        .await?
        .json()
        .await?;

        rows.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("insert returned no rows".to_owned())
        })
    }

    async fn select_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let mut params = vec![
            ("select", "*".to_owned()),
            ("user_id", format!("eq.{}", query.user_id)),
        ];

        match query.order {
            Some(SortOrder::Ascending) => params.push(("order", "created_at.asc,id.asc".to_owned())),
            Some(SortOrder::Descending) => {
                params.push(("order", "created_at.desc,id.desc".to_owned()))
            }
            None => {}
        }

        let transactions = send::<ProviderError>(
            self.table_request(Method::GET, "transactions").query(&params),
        )
        .await?
        .json()
        .await?;

        Ok(transactions)
    }
}
