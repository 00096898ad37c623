//! SynBioHub registry over HTTP.
//!
//! Existence is a plain `GET` on the collection URL: 2xx means present,
//! 404 means absent, anything else is an error. When a spoofing prefix is
//! configured the collection URI lives in the spoofed namespace and the
//! request is redirected to the configured server.

use super::{Registry, RegistryError};
use crate::config::RegistryConfig;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Header SynBioHub reads the session token from.
const AUTH_HEADER: &str = "X-authorization";

/// Registry backed by a SynBioHub server.
#[derive(Debug)]
pub struct HttpRegistry {
    client: Client,
    server: String,
    collection: String,
    spoofing: Option<String>,
    credentials: Option<(String, String)>,
    /// Session token from the last successful login.
    token: Mutex<Option<String>>,
}

impl HttpRegistry {
    /// Build a registry client from configuration.
    ///
    /// A `timeout_secs` of zero leaves requests without a timeout.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let collection = config
            .collection
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or(RegistryError::NotConfigured("registry.collection"))?;

        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        let credentials = match (&config.login, &config.password) {
            (Some(login), Some(password)) => Some((login.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            client: builder.build()?,
            server: config.server.trim_end_matches('/').to_string(),
            collection,
            spoofing: config
                .spoofing
                .as_deref()
                .map(|s| s.trim_end_matches('/').to_string()),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// URL actually requested for the collection.
    pub fn request_url(&self) -> String {
        resolve_url(&self.collection, &self.server, self.spoofing.as_deref())
    }

    fn session(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log in if credentials are configured and no session is cached.
    async fn ensure_login(&self) -> Result<Option<String>, RegistryError> {
        let cached = self.session().clone();
        if let Some(token) = cached {
            return Ok(Some(token));
        }
        let Some((login, password)) = &self.credentials else {
            return Ok(None);
        };

        let url = format!("{}/login", self.server);
        tracing::debug!("Logging in to {} as {}", url, login);
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "text/plain")
            .form(&[("email", login.as_str()), ("password", password.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::LoginRejected {
                login: login.clone(),
                status: status.as_u16(),
            });
        }

        let token = response.text().await?.trim().to_string();
        *self.session() = Some(token.clone());
        Ok(Some(token))
    }
}

/// Map a collection URI onto the server that actually hosts it.
fn resolve_url(collection: &str, server: &str, spoofing: Option<&str>) -> String {
    match spoofing.and_then(|prefix| collection.strip_prefix(prefix)) {
        Some(rest) => format!("{}{}", server, rest),
        None => collection.to_string(),
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn collection_exists(&self) -> Result<bool, RegistryError> {
        let token = self.ensure_login().await?;
        let url = self.request_url();

        let mut request = self.client.get(&url);
        if let Some(token) = token {
            request = request.header(AUTH_HEADER, token);
        }
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RegistryError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            }),
        }
    }

    async fn collection_id(&self) -> Result<Option<String>, RegistryError> {
        Ok(Some(self.collection.clone()))
    }

    fn restart(&self) {
        *self.session() = None;
    }
}
