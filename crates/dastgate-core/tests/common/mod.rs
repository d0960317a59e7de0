//! Scripted in-memory scanner shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dastgate_core::alerts::Alert;
use dastgate_core::client::ScannerApi;
use dastgate_core::config::{Credentials, EnvConfig, RunConfig, Settings};
use dastgate_core::error::{DastError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A queue of replies; the last one repeats forever.
#[derive(Default)]
pub struct Script(VecDeque<String>);

impl Script {
    pub fn of(replies: &[&str]) -> Self {
        Self(replies.iter().map(|r| r.to_string()).collect())
    }

    fn next(&mut self, fallback: &str) -> String {
        if self.0.len() > 1 {
            self.0.pop_front().unwrap_or_default()
        } else {
            self.0.front().cloned().unwrap_or_else(|| fallback.to_string())
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<String>,
    refused: Vec<String>,
    spider_handle: Option<String>,
    spider_status: Script,
    ajax_status: Script,
    active_handles: HashMap<String, String>,
    active_status: HashMap<String, Script>,
    next_scan_id: u32,
    records: Script,
    alerts: Vec<Alert>,
    html_report: String,
    contexts: Vec<(String, String)>,
    users: Vec<String>,
    next_id: u32,
}

#[derive(Default)]
pub struct MockScanner {
    state: Mutex<State>,
}

impl MockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn log(&self, call: String) {
        self.with_state(|s| s.calls.push(call));
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    /// Names of the calls made, without arguments.
    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.call_names().iter().filter(|c| *c == name).count()
    }

    pub fn script_spider(&self, handle: &str, statuses: &[&str]) {
        self.with_state(|s| {
            s.spider_handle = Some(handle.to_string());
            s.spider_status = Script::of(statuses);
        });
    }

    /// `access_url` for `url` answers with a scanner error object.
    pub fn refuse_access(&self, url: &str) {
        self.with_state(|s| s.refused.push(url.to_string()));
    }

    pub fn script_ajax(&self, statuses: &[&str]) {
        self.with_state(|s| s.ajax_status = Script::of(statuses));
    }

    /// Start reply for an active scan of `url`; numeric handles get the given statuses.
    pub fn script_active(&self, url: &str, handle: &str, statuses: &[&str]) {
        self.with_state(|s| {
            s.active_handles.insert(url.to_string(), handle.to_string());
            s.active_status.insert(handle.to_string(), Script::of(statuses));
        });
    }

    pub fn script_records(&self, remaining: &[&str]) {
        self.with_state(|s| s.records = Script::of(remaining));
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        self.with_state(|s| s.alerts = alerts);
    }

    pub fn set_html_report(&self, html: &str) {
        self.with_state(|s| s.html_report = html.to_string());
    }

    pub fn add_context(&self, name: &str) {
        self.with_state(|s| {
            s.next_id += 1;
            let id = s.next_id.to_string();
            s.contexts.push((name.to_string(), id));
        });
    }

    pub fn contexts_named(&self, name: &str) -> usize {
        self.with_state(|s| s.contexts.iter().filter(|(n, _)| n == name).count())
    }

    pub fn add_user(&self, id: &str) {
        self.with_state(|s| s.users.push(id.to_string()));
    }

    pub fn users(&self) -> Vec<String> {
        self.with_state(|s| s.users.clone())
    }
}

#[async_trait]
impl ScannerApi for MockScanner {
    async fn access_url(&self, url: &str, _follow_redirects: bool) -> Result<()> {
        self.log(format!("access_url {url}"));
        if self.with_state(|s| s.refused.iter().any(|r| r == url)) {
            return Err(DastError::Api {
                endpoint: "core/action/accessUrl".to_string(),
                code: "url_not_found".to_string(),
                message: "URL Not Found".to_string(),
            });
        }
        Ok(())
    }

    async fn spider_scan(&self, url: &str) -> Result<String> {
        self.log(format!("spider_scan {url}"));
        Ok(self.with_state(|s| s.spider_handle.clone().unwrap_or_else(|| "0".into())))
    }

    async fn spider_scan_as_user(
        &self,
        context_id: &str,
        user_id: &str,
        url: &str,
        recurse: bool,
    ) -> Result<String> {
        self.log(format!(
            "spider_scan_as_user {context_id} {user_id} {url} {recurse}"
        ));
        Ok(self.with_state(|s| s.spider_handle.clone().unwrap_or_else(|| "0".into())))
    }

    async fn spider_status(&self, scan_id: &str) -> Result<String> {
        self.log(format!("spider_status {scan_id}"));
        Ok(self.with_state(|s| s.spider_status.next("100")))
    }

    async fn ajax_spider_scan(&self, url: &str) -> Result<()> {
        self.log(format!("ajax_spider_scan {url}"));
        Ok(())
    }

    async fn ajax_spider_status(&self) -> Result<String> {
        self.log("ajax_spider_status".to_string());
        Ok(self.with_state(|s| s.ajax_status.next("stopped")))
    }

    async fn active_scan(&self, url: &str) -> Result<String> {
        self.log(format!("active_scan {url}"));
        Ok(self.with_state(|s| match s.active_handles.get(url) {
            Some(handle) => handle.clone(),
            None => {
                s.next_scan_id += 100;
                s.next_scan_id.to_string()
            }
        }))
    }

    async fn active_scan_status(&self, scan_id: &str) -> Result<String> {
        self.log(format!("active_scan_status {scan_id}"));
        Ok(self.with_state(|s| {
            s.active_status
                .get_mut(scan_id)
                .map(|script| script.next("100"))
                .unwrap_or_else(|| "100".to_string())
        }))
    }

    async fn set_attack_policy(&self, policy: &str) -> Result<()> {
        self.log(format!("set_attack_policy {policy}"));
        Ok(())
    }

    async fn set_handle_anti_csrf_tokens(&self, enabled: bool) -> Result<()> {
        self.log(format!("set_handle_anti_csrf_tokens {enabled}"));
        Ok(())
    }

    async fn set_threads_per_host(&self, threads: u32) -> Result<()> {
        self.log(format!("set_threads_per_host {threads}"));
        Ok(())
    }

    async fn records_to_scan(&self) -> Result<u64> {
        self.log("records_to_scan".to_string());
        Ok(self.with_state(|s| s.records.next("0")).parse().unwrap_or(0))
    }

    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>> {
        self.log(format!("alerts {base_url}"));
        Ok(self.with_state(|s| s.alerts.clone()))
    }

    async fn html_report(&self) -> Result<String> {
        self.log("html_report".to_string());
        Ok(self.with_state(|s| s.html_report.clone()))
    }

    async fn context_list(&self) -> Result<Vec<String>> {
        self.log("context_list".to_string());
        Ok(self.with_state(|s| s.contexts.iter().map(|(n, _)| n.clone()).collect()))
    }

    async fn new_context(&self, name: &str) -> Result<String> {
        self.log(format!("new_context {name}"));
        Ok(self.with_state(|s| {
            s.next_id += 1;
            let id = s.next_id.to_string();
            s.contexts.push((name.to_string(), id.clone()));
            id
        }))
    }

    async fn remove_context(&self, name: &str) -> Result<()> {
        self.log(format!("remove_context {name}"));
        self.with_state(|s| s.contexts.retain(|(n, _)| n != name));
        Ok(())
    }

    async fn include_in_context(&self, name: &str, regex: &str) -> Result<()> {
        self.log(format!("include_in_context {name} {regex}"));
        Ok(())
    }

    async fn set_authentication_method(
        &self,
        context_id: &str,
        method: &str,
        _config_params: &str,
    ) -> Result<()> {
        self.log(format!("set_authentication_method {context_id} {method}"));
        Ok(())
    }

    async fn set_logged_in_indicator(&self, context_id: &str, regex: &str) -> Result<()> {
        self.log(format!("set_logged_in_indicator {context_id} {regex}"));
        Ok(())
    }

    async fn set_logged_out_indicator(&self, context_id: &str, regex: &str) -> Result<()> {
        self.log(format!("set_logged_out_indicator {context_id} {regex}"));
        Ok(())
    }

    async fn users_list(&self, context_id: &str) -> Result<Vec<String>> {
        self.log(format!("users_list {context_id}"));
        Ok(self.users())
    }

    async fn new_user(&self, context_id: &str, name: &str) -> Result<String> {
        self.log(format!("new_user {context_id} {name}"));
        Ok(self.with_state(|s| {
            s.next_id += 1;
            let id = s.next_id.to_string();
            s.users.push(id.clone());
            id
        }))
    }

    async fn remove_user(&self, context_id: &str, user_id: &str) -> Result<()> {
        self.log(format!("remove_user {context_id} {user_id}"));
        self.with_state(|s| s.users.retain(|u| u != user_id));
        Ok(())
    }

    async fn set_authentication_credentials(
        &self,
        context_id: &str,
        user_id: &str,
        _config_params: &str,
    ) -> Result<()> {
        self.log(format!("set_authentication_credentials {context_id} {user_id}"));
        Ok(())
    }

    async fn set_user_enabled(&self, context_id: &str, user_id: &str, enabled: bool) -> Result<()> {
        self.log(format!("set_user_enabled {context_id} {user_id} {enabled}"));
        Ok(())
    }

    async fn set_forced_user(&self, context_id: &str, user_id: &str) -> Result<()> {
        self.log(format!("set_forced_user {context_id} {user_id}"));
        Ok(())
    }

    async fn set_forced_user_mode_enabled(&self, enabled: bool) -> Result<()> {
        self.log(format!("set_forced_user_mode_enabled {enabled}"));
        Ok(())
    }
}

pub const TARGET: &str = "http://juice-shop:3000";

pub fn credentials() -> Credentials {
    Credentials {
        login_url: format!("{TARGET}/rest/user/login"),
        username: "admin@juice-sh.op".to_string(),
        password: "admin123".to_string(),
        logged_in_indicator: "authentication".to_string(),
        logged_out_indicator: "Login".to_string(),
    }
}

/// Run configuration pointing at `TARGET` with the given seed file.
pub fn run_config(seed_file: &std::path::Path) -> RunConfig {
    let env = EnvConfig {
        api_key: "SECUREKEY123".to_string(),
        target_url: TARGET.to_string(),
        credentials: Some(credentials()),
        proxy: None,
        seed_file: Some(seed_file.to_path_buf()),
        context_name: None,
    };
    RunConfig::assemble(env, Settings::default())
}
