//! Run configuration: required environment inputs plus an optional
//! `dastgate.toml` settings file with the scanner tunables.

use crate::error::{DastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const ENV_API_KEY: &str = "ZAP_API_KEY";
pub const ENV_TARGET_URL: &str = "TARGET_URL";
pub const ENV_LOGIN_URL: &str = "LOGIN_URL";
pub const ENV_USERNAME: &str = "USERNAME";
pub const ENV_PASSWORD: &str = "PASSWORD";
pub const ENV_LOGGED_IN_INDICATOR: &str = "LOGGED_IN_INDICATOR";
pub const ENV_LOGGED_OUT_INDICATOR: &str = "LOGGED_OUT_INDICATOR";
pub const ENV_PROXY: &str = "ZAP_PROXY";
pub const ENV_SEED_FILE: &str = "SEED_FILE";
pub const ENV_CONTEXT_NAME: &str = "CONTEXT_NAME";

/// Settings file picked up from the working directory when no `--config` is given.
pub const DEFAULT_SETTINGS_FILE: &str = "dastgate.toml";

/// Which workflow the configuration is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Authenticated spider + AJAX spider + active scan.
    Authenticated,
    /// Spider and passive scan only, no login.
    Baseline,
}

impl RunMode {
    pub fn required_vars(&self) -> &'static [&'static str] {
        match self {
            RunMode::Authenticated => &[
                ENV_API_KEY,
                ENV_TARGET_URL,
                ENV_LOGIN_URL,
                ENV_USERNAME,
                ENV_PASSWORD,
                ENV_LOGGED_IN_INDICATOR,
                ENV_LOGGED_OUT_INDICATOR,
            ],
            RunMode::Baseline => &[ENV_API_KEY, ENV_TARGET_URL],
        }
    }
}

/// Login details for the scanner user.
#[derive(Clone)]
pub struct Credentials {
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub logged_in_indicator: String,
    pub logged_out_indicator: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("logged_in_indicator", &self.logged_in_indicator)
            .field("logged_out_indicator", &self.logged_out_indicator)
            .finish()
    }
}

/// Values read from the process environment, validated once at startup.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_key: String,
    pub target_url: String,
    pub credentials: Option<Credentials>,
    pub proxy: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub context_name: Option<String>,
}

impl EnvConfig {
    pub fn from_env(mode: RunMode) -> Result<Self> {
        Self::from_lookup(mode, |key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Every missing required name is reported at once.
    pub fn from_lookup<F>(mode: RunMode, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = mode
            .required_vars()
            .iter()
            .filter(|key| get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DastError::MissingEnv(missing));
        }

        // Presence was checked above.
        let require = |key: &str| get(key).unwrap_or_default();

        let target_url = normalize_target(&require(ENV_TARGET_URL))?;

        let credentials = match mode {
            RunMode::Authenticated => Some(Credentials {
                login_url: require(ENV_LOGIN_URL),
                username: require(ENV_USERNAME),
                password: require(ENV_PASSWORD),
                logged_in_indicator: require(ENV_LOGGED_IN_INDICATOR),
                logged_out_indicator: require(ENV_LOGGED_OUT_INDICATOR),
            }),
            RunMode::Baseline => None,
        };

        Ok(Self {
            api_key: require(ENV_API_KEY),
            target_url,
            credentials,
            proxy: get(ENV_PROXY),
            seed_file: get(ENV_SEED_FILE).map(PathBuf::from),
            context_name: get(ENV_CONTEXT_NAME),
        })
    }
}

/// Validate an http(s) URL and strip the trailing slash.
pub fn normalize_target(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DastError::Config(format!(
                "target URL must be http or https, got '{other}'"
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(DastError::Config(format!("target URL '{trimmed}' has no host")));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Tunables loaded from `dastgate.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub scanner: ScannerSettings,
    pub session: SessionSettings,
    pub timing: TimingSettings,
    pub active_scan: ActiveScanSettings,
    pub seeds: SeedSettings,
    pub reports: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Scanner proxy endpoint that also serves the control API.
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8090".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub context_name: String,
    /// Second include pattern, appended to the target root.
    pub api_subpath: String,
    /// JSON field names the login endpoint expects.
    pub username_field: String,
    pub password_field: String,
    pub scanner_user: String,
    pub profile_path: String,
    /// Text whose presence in the report means the login did not stick.
    pub failure_marker: String,
    pub prime_wait_secs: u64,
    pub verify_wait_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            context_name: "dastgate-context".to_string(),
            api_subpath: "/rest/".to_string(),
            username_field: "email".to_string(),
            password_field: "password".to_string(),
            scanner_user: "scanner-user".to_string(),
            profile_path: "/#/profile".to_string(),
            failure_marker: "Login".to_string(),
            prime_wait_secs: 5,
            verify_wait_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub spider_interval_secs: u64,
    pub ajax_interval_secs: u64,
    pub ajax_timeout_secs: u64,
    pub active_interval_secs: u64,
    pub passive_interval_secs: u64,
    pub baseline_warmup_secs: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            spider_interval_secs: 2,
            ajax_interval_secs: 5,
            ajax_timeout_secs: 120,
            active_interval_secs: 5,
            passive_interval_secs: 2,
            baseline_warmup_secs: 2,
        }
    }
}

impl TimingSettings {
    pub fn spider_interval(&self) -> Duration {
        Duration::from_secs(self.spider_interval_secs)
    }

    pub fn ajax_interval(&self) -> Duration {
        Duration::from_secs(self.ajax_interval_secs)
    }

    pub fn ajax_timeout(&self) -> Duration {
        Duration::from_secs(self.ajax_timeout_secs)
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_secs(self.active_interval_secs)
    }

    pub fn passive_interval(&self) -> Duration {
        Duration::from_secs(self.passive_interval_secs)
    }

    pub fn baseline_warmup(&self) -> Duration {
        Duration::from_secs(self.baseline_warmup_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveScanSettings {
    pub attack_policy: String,
    pub handle_anti_csrf_tokens: bool,
    pub threads_per_host: u32,
}

impl Default for ActiveScanSettings {
    fn default() -> Self {
        Self {
            attack_policy: "Default Policy".to_string(),
            handle_anti_csrf_tokens: true,
            threads_per_host: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    pub file: PathBuf,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from("seeds/api_endpoints.txt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub alerts_json: PathBuf,
    pub html: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sarif: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            alerts_json: PathBuf::from("zap-alerts.json"),
            html: PathBuf::from("zap-report.html"),
            sarif: None,
        }
    }
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DastError::Config(format!("failed to read settings file '{}': {e}", path.display()))
    })?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}

/// An explicit path must exist; otherwise `dastgate.toml` is used when present.
pub fn resolve_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => load_settings(path),
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.exists() {
                load_settings(default_path)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

/// Starter settings file with every default spelled out.
pub fn generate_default_settings() -> String {
    let body = toml::to_string_pretty(&Settings::default()).unwrap_or_default();
    format!("# dastgate settings\n# Environment variables override [scanner].endpoint, [seeds].file and [session].context_name.\n\n{body}")
}

/// Validated environment merged with file settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api_key: String,
    pub target_url: String,
    pub credentials: Option<Credentials>,
    pub settings: Settings,
}

impl RunConfig {
    pub fn assemble(env: EnvConfig, mut settings: Settings) -> Self {
        if let Some(proxy) = env.proxy {
            settings.scanner.endpoint = proxy;
        }
        if let Some(seed_file) = env.seed_file {
            settings.seeds.file = seed_file;
        }
        if let Some(context_name) = env.context_name {
            settings.session.context_name = context_name;
        }
        Self {
            api_key: env.api_key,
            target_url: env.target_url,
            credentials: env.credentials,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_API_KEY, "SECUREKEY123".to_string()),
            (ENV_TARGET_URL, "http://juice-shop:3000/".to_string()),
            (ENV_LOGIN_URL, "http://juice-shop:3000/rest/user/login".to_string()),
            (ENV_USERNAME, "admin@juice-sh.op".to_string()),
            (ENV_PASSWORD, "admin123".to_string()),
            (ENV_LOGGED_IN_INDICATOR, "authentication".to_string()),
            (ENV_LOGGED_OUT_INDICATOR, "Login".to_string()),
        ])
    }

    fn lookup<'a>(env: &'a HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| env.get(key).cloned()
    }

    #[test]
    fn test_complete_env_parses() {
        let env = full_env();
        let config = EnvConfig::from_lookup(RunMode::Authenticated, lookup(&env)).unwrap();
        assert_eq!(config.target_url, "http://juice-shop:3000");
        let creds = config.credentials.unwrap();
        assert_eq!(creds.username, "admin@juice-sh.op");
        assert!(!format!("{creds:?}").contains("admin123"));
    }

    #[test]
    fn test_each_missing_var_is_named_exactly() {
        for key in RunMode::Authenticated.required_vars() {
            let mut env = full_env();
            env.remove(key);
            match EnvConfig::from_lookup(RunMode::Authenticated, lookup(&env)) {
                Err(DastError::MissingEnv(missing)) => assert_eq!(missing, vec![key.to_string()]),
                other => panic!("expected MissingEnv for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_all_missing_names_reported_together() {
        let mut env = full_env();
        env.remove(ENV_PASSWORD);
        env.insert(ENV_USERNAME, "   ".to_string());
        let err = EnvConfig::from_lookup(RunMode::Authenticated, lookup(&env)).unwrap_err();
        match err {
            DastError::MissingEnv(missing) => {
                assert_eq!(missing, vec![ENV_USERNAME.to_string(), ENV_PASSWORD.to_string()])
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_baseline_needs_only_key_and_target() {
        let env = HashMap::from([
            (ENV_API_KEY, "k".to_string()),
            (ENV_TARGET_URL, "https://testphp.vulnweb.com".to_string()),
        ]);
        let config = EnvConfig::from_lookup(RunMode::Baseline, lookup(&env)).unwrap();
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_rejects_non_http_target() {
        assert!(matches!(
            normalize_target("ftp://example.com"),
            Err(DastError::Config(_))
        ));
        assert!(normalize_target("not a url").is_err());
    }

    #[test]
    fn test_env_overrides_settings() {
        let mut env = full_env();
        env.insert(ENV_PROXY, "http://zap:8080".to_string());
        env.insert(ENV_CONTEXT_NAME, "shop".to_string());
        let env_config = EnvConfig::from_lookup(RunMode::Authenticated, lookup(&env)).unwrap();
        let config = RunConfig::assemble(env_config, Settings::default());
        assert_eq!(config.settings.scanner.endpoint, "http://zap:8080");
        assert_eq!(config.settings.session.context_name, "shop");
        assert_eq!(config.settings.seeds.file, PathBuf::from("seeds/api_endpoints.txt"));
    }

    #[test]
    fn test_partial_settings_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [timing]
            ajax_timeout_secs = 30

            [active_scan]
            threads_per_host = 2
            "#,
        )
        .unwrap();
        assert_eq!(settings.timing.ajax_timeout(), Duration::from_secs(30));
        assert_eq!(settings.timing.spider_interval_secs, 2);
        assert_eq!(settings.active_scan.threads_per_host, 2);
        assert_eq!(settings.active_scan.attack_policy, "Default Policy");
    }

    #[test]
    fn test_generated_settings_round_trip() {
        let text = generate_default_settings();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.session.failure_marker, "Login");
        assert_eq!(parsed.reports.html, PathBuf::from("zap-report.html"));
    }
}
