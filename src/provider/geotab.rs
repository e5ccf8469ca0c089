// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geotab JSON-RPC provider.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::runtime::Handle;

use crate::error::ProviderError;
use crate::model::Device;
use crate::provider::{BatchResults, EntityType, Query, QueryProvider};

/// Exception name the backend uses for rejected credentials or sessions.
const INVALID_USER: &str = "InvalidUserException";

/// `path` value meaning "keep using the server you authenticated against".
const THIS_SERVER: &str = "ThisServer";

// ============================================================================
// GeotabConfig
// ============================================================================

/// Connection settings for a Geotab account.
///
/// # Examples
///
/// ```
/// use geotab_fleet::provider::GeotabConfig;
/// use std::time::Duration;
///
/// let config = GeotabConfig::new("fleet@example.com", "secret")
///     .with_database("acme")
///     .with_timeout(Duration::from_secs(20));
///
/// assert_eq!(config.base_url(), "https://my.geotab.com");
/// assert_eq!(config.database(), Some("acme"));
/// ```
#[derive(Clone)]
pub struct GeotabConfig {
    server: String,
    database: Option<String>,
    username: String,
    password: String,
    use_https: bool,
    timeout: Duration,
}

impl GeotabConfig {
    /// Default federation server.
    pub const DEFAULT_SERVER: &'static str = "my.geotab.com";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a configuration for the default server.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            server: Self::DEFAULT_SERVER.to_string(),
            database: None,
            username: username.into(),
            password: password.into(),
            use_https: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the server host. A leading `http://` or `https://` is kept as is.
    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Uses plain HTTP for hosts given without a scheme.
    #[must_use]
    pub fn without_https(mut self) -> Self {
        self.use_https = false;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the database name.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        server_url(&self.server, self.scheme())
    }

    fn scheme(&self) -> &'static str {
        if self.use_https { "https" } else { "http" }
    }

    /// Creates a `GeotabClient` from this configuration.
    ///
    /// Must be called from within a tokio runtime: the client drives its
    /// requests on that runtime when used through [`QueryProvider`].
    ///
    /// # Errors
    ///
    /// Returns error if there is no current runtime or the HTTP client
    /// cannot be created.
    pub fn into_client(self) -> Result<GeotabClient, ProviderError> {
        let runtime = Handle::try_current()
            .map_err(|e| ProviderError::Transport(format!("no async runtime: {e}")))?;

        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProviderError::Http)?;

        Ok(GeotabClient {
            base_url: self.base_url(),
            scheme: self.scheme(),
            config: self,
            http,
            runtime,
            session: Mutex::new(None),
        })
    }
}

impl std::fmt::Debug for GeotabConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeotabConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("use_https", &self.use_https)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn server_url(server: &str, scheme: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("{scheme}://{}", server.trim_end_matches('/'))
    }
}

// ============================================================================
// GeotabClient
// ============================================================================

/// An authenticated session: credentials to attach to calls and the
/// server that owns the database.
#[derive(Debug, Clone)]
struct Session {
    credentials: Value,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<RpcErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl From<RpcError> for ProviderError {
    fn from(err: RpcError) -> Self {
        let (name, message) = match err.errors.into_iter().next() {
            Some(detail) => (detail.name, detail.message),
            None => (err.name, err.message),
        };
        if name == INVALID_USER {
            Self::Authentication(message)
        } else {
            Self::Api { name, message }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthenticateResult {
    credentials: Value,
    #[serde(default)]
    path: Option<String>,
}

/// JSON-RPC client for the Geotab API.
///
/// Authenticates lazily on first use and caches the session. When a call
/// is rejected because the cached session expired, the client
/// re-authenticates once and repeats the call.
///
/// The async methods can be used directly; the [`QueryProvider`]
/// implementation blocks on them and must therefore be called from a
/// worker thread, never from inside an async task.
///
/// # Examples
///
/// ```no_run
/// use geotab_fleet::provider::GeotabConfig;
///
/// # async fn example() -> Result<(), geotab_fleet::ProviderError> {
/// let client = GeotabConfig::new("fleet@example.com", "secret")
///     .with_database("acme")
///     .into_client()?;
///
/// client.authenticate().await?;
/// let devices = client.get_devices().await?;
/// println!("{} devices", devices.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GeotabClient {
    config: GeotabConfig,
    base_url: String,
    scheme: &'static str,
    http: Client,
    runtime: Handle,
    session: Mutex<Option<Session>>,
}

impl GeotabClient {
    /// Returns the URL of the server the client authenticates against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticates and caches a new session.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Authentication` if the credentials are
    /// rejected, or another variant if the backend cannot be reached.
    pub async fn authenticate(&self) -> Result<(), ProviderError> {
        self.open_session().await.map(drop)
    }

    /// Fetches the device listing.
    ///
    /// Entries that don't decode as a device are skipped, so one bad entry
    /// never hides the rest of the fleet.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the call fails or the reply is malformed.
    pub async fn get_devices(&self) -> Result<Vec<Device>, ProviderError> {
        let entities = self.get(&Query::new(EntityType::Device)).await?;
        let total = entities.len();
        let devices: Vec<Device> = entities
            .into_iter()
            .filter_map(|entity| serde_json::from_value(entity).ok())
            .collect();

        if devices.len() < total {
            tracing::debug!(
                skipped = total - devices.len(),
                "Skipping malformed device entries"
            );
        }
        Ok(devices)
    }

    /// Runs a single `Get` query.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the call fails or the reply is malformed.
    pub async fn get(&self, query: &Query) -> Result<Vec<Value>, ProviderError> {
        let result = self.call("Get", object(query.to_params())).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Runs several `Get` queries in one `ExecuteMultiCall` round trip.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the call fails or the reply is malformed.
    pub async fn multi_call(&self, queries: &[Query]) -> Result<BatchResults, ProviderError> {
        let calls: Vec<Value> = queries
            .iter()
            .map(|query| json!({"method": "Get", "params": query.to_params()}))
            .collect();

        let mut params = Map::new();
        params.insert("calls".to_string(), Value::Array(calls));

        let result = self.call("ExecuteMultiCall", params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Calls `method` with the session credentials attached.
    async fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value, ProviderError> {
        let cached = self.session.lock().clone();
        let reused = cached.is_some();
        let session = match cached {
            Some(session) => session,
            None => self.open_session().await?,
        };

        match self.post_with(&session, method, params.clone()).await {
            Err(ProviderError::Authentication(message)) if reused => {
                tracing::debug!(method, reason = %message, "Session rejected, re-authenticating");
                self.session.lock().take();
                let session = self.open_session().await?;
                self.post_with(&session, method, params).await
            }
            other => other,
        }
    }

    async fn post_with(
        &self,
        session: &Session,
        method: &str,
        mut params: Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        params.insert("credentials".to_string(), session.credentials.clone());
        self.post(&session.base_url, method, Value::Object(params))
            .await
    }

    async fn open_session(&self) -> Result<Session, ProviderError> {
        let mut params = Map::new();
        if let Some(database) = &self.config.database {
            params.insert("database".to_string(), Value::from(database.as_str()));
        }
        params.insert(
            "userName".to_string(),
            Value::from(self.config.username.as_str()),
        );
        params.insert(
            "password".to_string(),
            Value::from(self.config.password.as_str()),
        );

        let result = self
            .post(&self.base_url, "Authenticate", Value::Object(params))
            .await?;
        let auth: AuthenticateResult = serde_json::from_value(result)?;

        let base_url = match auth.path.as_deref() {
            None | Some("" | THIS_SERVER) => self.base_url.clone(),
            Some(server) => server_url(server, self.scheme),
        };

        tracing::debug!(server = %base_url, "Authenticated with Geotab");

        let session = Session {
            credentials: auth.credentials,
            base_url,
        };
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }

    async fn post(
        &self,
        base_url: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderError> {
        let url = format!("{base_url}/apiv1");

        tracing::debug!(url = %url, method, "Sending JSON-RPC request");

        let response = self
            .http
            .post(&url)
            .json(&json!({"method": method, "params": params}))
            .send()
            .await
            .map_err(ProviderError::Http)?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "HTTP {} - {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.bytes().await.map_err(ProviderError::Http)?;
        let reply: RpcReply = serde_json::from_slice(&body)?;

        if let Some(error) = reply.error {
            return Err(error.into());
        }
        reply
            .result
            .ok_or_else(|| ProviderError::Malformed(format!("{method} reply has no result")))
    }
}

impl QueryProvider for GeotabClient {
    fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        self.runtime.block_on(self.get_devices())
    }

    fn run_batch(&self, queries: &[Query]) -> Result<BatchResults, ProviderError> {
        self.runtime.block_on(self.multi_call(queries))
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_to_https() {
        let config = GeotabConfig::new("user", "pass");
        assert_eq!(config.base_url(), "https://my.geotab.com");
    }

    #[test]
    fn base_url_without_https() {
        let config = GeotabConfig::new("user", "pass")
            .with_server("127.0.0.1:8080")
            .without_https();
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn base_url_keeps_explicit_scheme() {
        let config = GeotabConfig::new("user", "pass").with_server("http://localhost:9000/");
        assert_eq!(config.base_url(), "http://localhost:9000");
    }

    #[test]
    fn debug_hides_password() {
        let config = GeotabConfig::new("user", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn invalid_user_is_authentication_error() {
        let err: ProviderError = serde_json::from_value::<RpcError>(json!({
            "name": "JSONRPCError",
            "message": "Incorrect login credentials",
            "errors": [{"name": "InvalidUserException", "message": "Incorrect login credentials"}]
        }))
        .unwrap()
        .into();
        assert!(matches!(err, ProviderError::Authentication(_)));
    }

    #[test]
    fn other_exceptions_are_api_errors() {
        let err: ProviderError = serde_json::from_value::<RpcError>(json!({
            "name": "JSONRPCError",
            "message": "Database unavailable",
            "errors": [{"name": "DbUnavailableException", "message": "Database unavailable"}]
        }))
        .unwrap()
        .into();
        assert!(matches!(
            err,
            ProviderError::Api { ref name, .. } if name == "DbUnavailableException"
        ));
    }

    #[test]
    fn into_client_requires_runtime() {
        let result = GeotabConfig::new("user", "pass").into_client();
        assert!(matches!(result, Err(ProviderError::Transport(_))));
    }
}
