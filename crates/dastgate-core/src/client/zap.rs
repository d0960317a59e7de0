use crate::alerts::Alert;
use crate::client::ScannerApi;
use crate::config::RunConfig;
use crate::error::{DastError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "X-ZAP-API-Key";

/// ZAP-compatible JSON API client.
pub struct ZapClient {
    client: reqwest::Client,
    base_url: String,
}

impl ZapClient {
    /// Create a client for the scanner listening at `endpoint`.
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("dastgate/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key)
                .map_err(|e| DastError::Config(format!("invalid API key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DastError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Self::new(
            &config.settings.scanner.endpoint,
            &config.api_key,
            Duration::from_secs(config.settings.scanner.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a JSON API call and return the status code and parsed body.
    async fn call(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<(u16, Value)> {
        let url = format!("{}/JSON/{}/", self.base_url, endpoint);
        debug!("GET {url} {:?}", param_names(params));

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|source| DastError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|source| DastError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok((status, body)),
            Err(_) if !(200..300).contains(&status) => Err(DastError::Http {
                endpoint: endpoint.to_string(),
                status,
                body: truncate(&text),
            }),
            Err(e) => Err(DastError::Malformed {
                endpoint: endpoint.to_string(),
                detail: format!("body is not JSON: {e}"),
            }),
        }
    }

    /// Call that must succeed; scanner error objects become `DastError::Api`.
    async fn strict(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let (status, body) = self.call(endpoint, params).await?;
        if let Some(code) = error_code(&body) {
            return Err(DastError::Api {
                endpoint: endpoint.to_string(),
                code,
                message: body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        if !(200..300).contains(&status) {
            return Err(DastError::Http {
                endpoint: endpoint.to_string(),
                status,
                body: truncate(&body.to_string()),
            });
        }
        Ok(body)
    }

    /// Call whose answer is a single scalar; an error object yields its code instead.
    async fn lenient(&self, endpoint: &str, params: &[(&str, &str)], key: &str) -> Result<String> {
        let (_, body) = self.call(endpoint, params).await?;
        if let Some(value) = body.get(key).and_then(scalar) {
            return Ok(value);
        }
        if let Some(code) = error_code(&body) {
            debug!("{endpoint} answered with error code '{code}'");
            return Ok(code);
        }
        Err(DastError::Malformed {
            endpoint: endpoint.to_string(),
            detail: format!("missing '{key}' in {}", truncate(&body.to_string())),
        })
    }

    async fn action(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<()> {
        self.strict(endpoint, params).await.map(|_| ())
    }

    async fn scalar_view(&self, endpoint: &str, params: &[(&str, &str)], key: &str) -> Result<String> {
        let body = self.strict(endpoint, params).await?;
        body.get(key).and_then(scalar).ok_or_else(|| DastError::Malformed {
            endpoint: endpoint.to_string(),
            detail: format!("missing '{key}'"),
        })
    }
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Strings and numbers both show up for ids and percentages.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn error_code(body: &Value) -> Option<String> {
    body.get("code").and_then(scalar)
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{cut}...")
    }
}

// Parameter values may carry credentials; only names are logged.
fn param_names<'a>(params: &'a [(&'a str, &'a str)]) -> Vec<&'a str> {
    params.iter().map(|(k, _)| *k).collect()
}

/// `contextList` is an array in current releases and a `"[a, b]"` string in older ones.
fn parse_name_list(endpoint: &str, value: Option<&Value>) -> Result<Vec<String>> {
    match value {
        Some(Value::Array(items)) => Ok(items.iter().filter_map(scalar).collect()),
        Some(Value::String(s)) => Ok(s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()),
        _ => Err(DastError::Malformed {
            endpoint: endpoint.to_string(),
            detail: "expected a list".to_string(),
        }),
    }
}

#[async_trait]
impl ScannerApi for ZapClient {
    async fn access_url(&self, url: &str, follow_redirects: bool) -> Result<()> {
        self.action(
            "core/action/accessUrl",
            &[("url", url), ("followRedirects", bool_param(follow_redirects))],
        )
        .await
    }

    async fn spider_scan(&self, url: &str) -> Result<String> {
        self.lenient("spider/action/scan", &[("url", url)], "scan").await
    }

    async fn spider_scan_as_user(
        &self,
        context_id: &str,
        user_id: &str,
        url: &str,
        recurse: bool,
    ) -> Result<String> {
        self.lenient(
            "spider/action/scanAsUser",
            &[
                ("contextId", context_id),
                ("userId", user_id),
                ("url", url),
                ("recurse", bool_param(recurse)),
            ],
            "scanAsUser",
        )
        .await
    }

    async fn spider_status(&self, scan_id: &str) -> Result<String> {
        self.lenient("spider/view/status", &[("scanId", scan_id)], "status")
            .await
    }

    async fn ajax_spider_scan(&self, url: &str) -> Result<()> {
        self.action("ajaxSpider/action/scan", &[("url", url)]).await
    }

    async fn ajax_spider_status(&self) -> Result<String> {
        self.lenient("ajaxSpider/view/status", &[], "status").await
    }

    async fn active_scan(&self, url: &str) -> Result<String> {
        self.lenient("ascan/action/scan", &[("url", url), ("recurse", "true")], "scan")
            .await
    }

    async fn active_scan_status(&self, scan_id: &str) -> Result<String> {
        self.lenient("ascan/view/status", &[("scanId", scan_id)], "status")
            .await
    }

    async fn set_attack_policy(&self, policy: &str) -> Result<()> {
        self.action("ascan/action/setOptionAttackPolicy", &[("String", policy)])
            .await
    }

    async fn set_handle_anti_csrf_tokens(&self, enabled: bool) -> Result<()> {
        self.action(
            "ascan/action/setOptionHandleAntiCSRFTokens",
            &[("Boolean", bool_param(enabled))],
        )
        .await
    }

    async fn set_threads_per_host(&self, threads: u32) -> Result<()> {
        let threads = threads.to_string();
        self.action("ascan/action/setOptionThreadPerHost", &[("Integer", threads.as_str())])
            .await
    }

    async fn records_to_scan(&self) -> Result<u64> {
        let endpoint = "pscan/view/recordsToScan";
        let raw = self.scalar_view(endpoint, &[], "recordsToScan").await?;
        raw.trim().parse().map_err(|_| DastError::Malformed {
            endpoint: endpoint.to_string(),
            detail: format!("'{raw}' is not a record count"),
        })
    }

    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>> {
        let endpoint = "core/view/alerts";
        let mut body = self.strict(endpoint, &[("baseurl", base_url)]).await?;
        let raw = body.get_mut("alerts").map(Value::take).ok_or_else(|| DastError::Malformed {
            endpoint: endpoint.to_string(),
            detail: "missing 'alerts'".to_string(),
        })?;
        serde_json::from_value(raw).map_err(|e| DastError::Malformed {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })
    }

    async fn html_report(&self) -> Result<String> {
        let endpoint = "core/other/htmlreport";
        let url = format!("{}/OTHER/{}/", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/html")
            .send()
            .await
            .map_err(|source| DastError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|source| DastError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !(200..300).contains(&status) {
            return Err(DastError::Http {
                endpoint: endpoint.to_string(),
                status,
                body: truncate(&text),
            });
        }
        Ok(text)
    }

    async fn context_list(&self) -> Result<Vec<String>> {
        let endpoint = "context/view/contextList";
        let body = self.strict(endpoint, &[]).await?;
        parse_name_list(endpoint, body.get("contextList"))
    }

    async fn new_context(&self, name: &str) -> Result<String> {
        self.scalar_view("context/action/newContext", &[("contextName", name)], "contextId")
            .await
    }

    async fn remove_context(&self, name: &str) -> Result<()> {
        self.action("context/action/removeContext", &[("contextName", name)])
            .await
    }

    async fn include_in_context(&self, name: &str, regex: &str) -> Result<()> {
        self.action(
            "context/action/includeInContext",
            &[("contextName", name), ("regex", regex)],
        )
        .await
    }

    async fn set_authentication_method(
        &self,
        context_id: &str,
        method: &str,
        config_params: &str,
    ) -> Result<()> {
        self.action(
            "authentication/action/setAuthenticationMethod",
            &[
                ("contextId", context_id),
                ("authMethodName", method),
                ("authMethodConfigParams", config_params),
            ],
        )
        .await
    }

    async fn set_logged_in_indicator(&self, context_id: &str, regex: &str) -> Result<()> {
        self.action(
            "authentication/action/setLoggedInIndicator",
            &[("contextId", context_id), ("loggedInIndicatorRegex", regex)],
        )
        .await
    }

    async fn set_logged_out_indicator(&self, context_id: &str, regex: &str) -> Result<()> {
        self.action(
            "authentication/action/setLoggedOutIndicator",
            &[("contextId", context_id), ("loggedOutIndicatorRegex", regex)],
        )
        .await
    }

    async fn users_list(&self, context_id: &str) -> Result<Vec<String>> {
        let endpoint = "users/view/usersList";
        let body = self.strict(endpoint, &[("contextId", context_id)]).await?;
        match body.get("usersList") {
            Some(Value::Array(users)) => Ok(users
                .iter()
                .filter_map(|u| u.get("id").and_then(scalar).or_else(|| scalar(u)))
                .collect()),
            _ => Err(DastError::Malformed {
                endpoint: endpoint.to_string(),
                detail: "expected 'usersList' array".to_string(),
            }),
        }
    }

    async fn new_user(&self, context_id: &str, name: &str) -> Result<String> {
        self.scalar_view(
            "users/action/newUser",
            &[("contextId", context_id), ("name", name)],
            "userId",
        )
        .await
    }

    async fn remove_user(&self, context_id: &str, user_id: &str) -> Result<()> {
        self.action(
            "users/action/removeUser",
            &[("contextId", context_id), ("userId", user_id)],
        )
        .await
    }

    async fn set_authentication_credentials(
        &self,
        context_id: &str,
        user_id: &str,
        config_params: &str,
    ) -> Result<()> {
        self.action(
            "users/action/setAuthenticationCredentials",
            &[
                ("contextId", context_id),
                ("userId", user_id),
                ("authCredentialsConfigParams", config_params),
            ],
        )
        .await
    }

    async fn set_user_enabled(
        &self,
        context_id: &str,
        user_id: &str,
        enabled: bool,
    ) -> Result<()> {
        self.action(
            "users/action/setUserEnabled",
            &[
                ("contextId", context_id),
                ("userId", user_id),
                ("enabled", bool_param(enabled)),
            ],
        )
        .await
    }

    async fn set_forced_user(&self, context_id: &str, user_id: &str) -> Result<()> {
        self.action(
            "forcedUser/action/setForcedUser",
            &[("contextId", context_id), ("userId", user_id)],
        )
        .await
    }

    async fn set_forced_user_mode_enabled(&self, enabled: bool) -> Result<()> {
        self.action(
            "forcedUser/action/setForcedUserModeEnabled",
            &[("boolean", bool_param(enabled))],
        )
        .await
    }
}
