//! Scanner control API surface.
//!
//! [`ScannerApi`] lists one method per remote call the workflow needs.
//! [`zap::ZapClient`] is the HTTP implementation; tests substitute an
//! in-memory fake.

pub mod zap;

use crate::alerts::Alert;
use crate::error::Result;
use async_trait::async_trait;

pub use zap::ZapClient;

/// Logical operations exposed by the remote scanner.
///
/// Scan-start and status methods return the raw string the scanner sent.
/// When the scanner answers with an error object instead (for example
/// `does_not_exist` for an evicted scan), its code is returned as that raw
/// string so callers can treat it as a non-numeric handle or status.
#[async_trait]
pub trait ScannerApi: Send + Sync {
    /// Request `url` through the scanner so it enters the site tree.
    async fn access_url(&self, url: &str, follow_redirects: bool) -> Result<()>;

    async fn spider_scan(&self, url: &str) -> Result<String>;

    async fn spider_scan_as_user(
        &self,
        context_id: &str,
        user_id: &str,
        url: &str,
        recurse: bool,
    ) -> Result<String>;

    async fn spider_status(&self, scan_id: &str) -> Result<String>;

    async fn ajax_spider_scan(&self, url: &str) -> Result<()>;

    /// `running` or `stopped`.
    async fn ajax_spider_status(&self) -> Result<String>;

    async fn active_scan(&self, url: &str) -> Result<String>;

    async fn active_scan_status(&self, scan_id: &str) -> Result<String>;

    async fn set_attack_policy(&self, policy: &str) -> Result<()>;

    async fn set_handle_anti_csrf_tokens(&self, enabled: bool) -> Result<()>;

    async fn set_threads_per_host(&self, threads: u32) -> Result<()>;

    /// Records still queued for the passive scanner.
    async fn records_to_scan(&self) -> Result<u64>;

    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>>;

    async fn html_report(&self) -> Result<String>;

    async fn context_list(&self) -> Result<Vec<String>>;

    /// Returns the new context id.
    async fn new_context(&self, name: &str) -> Result<String>;

    async fn remove_context(&self, name: &str) -> Result<()>;

    async fn include_in_context(&self, name: &str, regex: &str) -> Result<()>;

    async fn set_authentication_method(
        &self,
        context_id: &str,
        method: &str,
        config_params: &str,
    ) -> Result<()>;

    async fn set_logged_in_indicator(&self, context_id: &str, regex: &str) -> Result<()>;

    async fn set_logged_out_indicator(&self, context_id: &str, regex: &str) -> Result<()>;

    /// Ids of the users defined in the context.
    async fn users_list(&self, context_id: &str) -> Result<Vec<String>>;

    /// Returns the new user id.
    async fn new_user(&self, context_id: &str, name: &str) -> Result<String>;

    async fn remove_user(&self, context_id: &str, user_id: &str) -> Result<()>;

    async fn set_authentication_credentials(
        &self,
        context_id: &str,
        user_id: &str,
        config_params: &str,
    ) -> Result<()>;

    async fn set_user_enabled(&self, context_id: &str, user_id: &str, enabled: bool)
        -> Result<()>;

    async fn set_forced_user(&self, context_id: &str, user_id: &str) -> Result<()>;

    async fn set_forced_user_mode_enabled(&self, enabled: bool) -> Result<()>;
}
