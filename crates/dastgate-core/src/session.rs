//! Authenticated-session setup: context, login method, user, forced-user mode.

use crate::client::ScannerApi;
use crate::clock::Clock;
use crate::config::{Credentials, SessionSettings};
use crate::error::{DastError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::form_urlencoded;

pub const JSON_AUTH_METHOD: &str = "jsonBasedAuthentication";

/// Ids the scanner assigned to this run's context and user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub context_id: String,
    pub user_id: String,
}

/// JSON field names of the application's login request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFields {
    pub username: String,
    pub password: String,
}

impl CredentialFields {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self {
            username: settings.username_field.clone(),
            password: settings.password_field.clone(),
        }
    }
}

/// Context include patterns: everything under the target, plus its API subpath.
pub fn include_patterns(target: &str, api_subpath: &str) -> [String; 2] {
    let root = regex::escape(target);
    [
        format!("{root}.*"),
        format!("{root}{}.*", regex::escape(api_subpath)),
    ]
}

/// `authMethodConfigParams` for JSON-body login with scanner placeholders.
pub fn login_request_config(login_url: &str, fields: &CredentialFields) -> String {
    let mut body = Map::new();
    body.insert(fields.username.clone(), Value::from("{%username%}"));
    body.insert(fields.password.clone(), Value::from("{%password%}"));
    form_urlencoded::Serializer::new(String::new())
        .append_pair("loginUrl", login_url)
        .append_pair("loginRequestData", &Value::Object(body).to_string())
        .finish()
}

/// `authCredentialsConfigParams` for a scanner user.
pub fn credentials_config(username: &str, password: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("username", username)
        .append_pair("password", password)
        .finish()
}

/// Drives the scanner's context and user APIs so later scans run as one identity.
pub struct SessionConfigurator<'a, C: ?Sized, K: ?Sized> {
    client: &'a C,
    clock: &'a K,
    settings: SessionSettings,
}

impl<'a, C, K> SessionConfigurator<'a, C, K>
where
    C: ScannerApi + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(client: &'a C, clock: &'a K, settings: &SessionSettings) -> Self {
        Self {
            client,
            clock,
            settings: settings.clone(),
        }
    }

    /// Delete any context called `name`, create it again, and scope it to `target`.
    pub async fn reset_context(&self, name: &str, target: &str) -> Result<String> {
        for existing in self.client.context_list().await? {
            if existing == name {
                self.client.remove_context(&existing).await?;
                info!("Removed existing context '{name}'");
            }
        }

        let context_id = self.client.new_context(name).await?;
        for pattern in include_patterns(target, &self.settings.api_subpath) {
            self.client.include_in_context(name, &pattern).await?;
            debug!("Included '{pattern}' in context '{name}'");
        }
        info!("Context '{name}' created (id {context_id})");
        Ok(context_id)
    }

    pub async fn configure_authentication(
        &self,
        context_id: &str,
        login_url: &str,
        fields: &CredentialFields,
        logged_in_indicator: &str,
        logged_out_indicator: &str,
    ) -> Result<()> {
        self.client
            .set_authentication_method(
                context_id,
                JSON_AUTH_METHOD,
                &login_request_config(login_url, fields),
            )
            .await?;
        self.client
            .set_logged_in_indicator(context_id, logged_in_indicator)
            .await?;
        self.client
            .set_logged_out_indicator(context_id, logged_out_indicator)
            .await?;
        info!("Authentication configured against {login_url}");
        Ok(())
    }

    /// Leave exactly one enabled user in the context.
    pub async fn provision_user(
        &self,
        context_id: &str,
        username: &str,
        password: &str,
    ) -> Result<String> {
        for user_id in self.client.users_list(context_id).await? {
            self.client.remove_user(context_id, &user_id).await?;
            debug!("Removed user {user_id} from context {context_id}");
        }

        let user_id = self
            .client
            .new_user(context_id, &self.settings.scanner_user)
            .await?;
        self.client
            .set_authentication_credentials(
                context_id,
                &user_id,
                &credentials_config(username, password),
            )
            .await?;
        self.client
            .set_user_enabled(context_id, &user_id, true)
            .await?;
        info!(
            "User '{}' created (id {user_id})",
            self.settings.scanner_user
        );
        Ok(user_id)
    }

    pub async fn enable_forced_user_mode(&self, context_id: &str, user_id: &str) -> Result<()> {
        self.client.set_forced_user(context_id, user_id).await?;
        self.client.set_forced_user_mode_enabled(true).await?;
        info!("Forced user mode enabled");
        Ok(())
    }

    /// Request the target root so the scanner logs in before crawling.
    pub async fn prime_session(&self, target: &str) -> Result<()> {
        info!("Priming authenticated session");
        self.client.access_url(target, true).await?;
        self.clock
            .sleep(Duration::from_secs(self.settings.prime_wait_secs))
            .await;
        Ok(())
    }

    /// Visit an authenticated-only page and look for the failure marker in the report.
    ///
    /// This is a heuristic: `false` means the marker showed up, not that the
    /// session is provably anonymous.
    pub async fn verify_authentication(
        &self,
        target: &str,
        profile_path: &str,
        failure_marker: &str,
    ) -> Result<bool> {
        let url = format!("{target}{profile_path}");
        self.client.access_url(&url, true).await?;
        self.clock
            .sleep(Duration::from_secs(self.settings.verify_wait_secs))
            .await;
        let report = self.client.html_report().await?;
        Ok(!report.contains(failure_marker))
    }

    /// Full setup in order. A failed verification is fatal.
    pub async fn establish(&self, target: &str, credentials: &Credentials) -> Result<SessionHandle> {
        let context_id = self
            .reset_context(&self.settings.context_name, target)
            .await?;
        self.configure_authentication(
            &context_id,
            &credentials.login_url,
            &CredentialFields::from_settings(&self.settings),
            &credentials.logged_in_indicator,
            &credentials.logged_out_indicator,
        )
        .await?;
        let user_id = self
            .provision_user(&context_id, &credentials.username, &credentials.password)
            .await?;
        self.enable_forced_user_mode(&context_id, &user_id).await?;
        self.prime_session(target).await?;

        let marker = &self.settings.failure_marker;
        if !self
            .verify_authentication(target, &self.settings.profile_path, marker)
            .await?
        {
            warn!("Authentication check failed: '{marker}' present in report");
            return Err(DastError::AuthVerification {
                url: format!("{target}{}", self.settings.profile_path),
                marker: marker.clone(),
            });
        }
        info!("Authentication verified");
        Ok(SessionHandle {
            context_id,
            user_id,
        })
    }
}
