use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk level the scanner assigns to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum RiskLevel {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
        RiskLevel::Informational,
    ];

    pub fn priority(&self) -> u8 {
        match self {
            RiskLevel::Critical => 5,
            RiskLevel::High => 4,
            RiskLevel::Medium => 3,
            RiskLevel::Low => 2,
            RiskLevel::Informational => 1,
        }
    }

    /// Label exactly as the scanner spells it.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
            RiskLevel::Informational => "Informational",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
            RiskLevel::Informational => "INFO",
        }
    }

    /// Parse a user-supplied threshold such as `high` or `info`.
    pub fn parse_threshold(value: &str) -> Option<RiskLevel> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(RiskLevel::Critical),
            "high" => Some(RiskLevel::High),
            "medium" => Some(RiskLevel::Medium),
            "low" => Some(RiskLevel::Low),
            "info" | "informational" => Some(RiskLevel::Informational),
            _ => None,
        }
    }
}

// Anything the scanner sends that we do not recognise is treated as informational.
impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        RiskLevel::parse_threshold(&value).unwrap_or(RiskLevel::Informational)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single alert raised by the remote scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScannerAlert")]
pub struct Alert {
    #[serde(rename = "alert")]
    pub name: String,
    pub risk: RiskLevel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, rename = "cweid", skip_serializing_if = "Option::is_none")]
    pub cwe_id: Option<String>,
    #[serde(default, rename = "pluginId", skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

// Current scanners send both `alert` and `name`; older dumps carry only one.
#[derive(Deserialize)]
struct ScannerAlert {
    #[serde(default)]
    alert: Option<String>,
    #[serde(default)]
    name: Option<String>,
    risk: RiskLevel,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default, rename = "cweid")]
    cwe_id: Option<String>,
    #[serde(default, rename = "pluginId")]
    plugin_id: Option<String>,
    #[serde(default)]
    solution: Option<String>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    evidence: Option<String>,
}

impl From<ScannerAlert> for Alert {
    fn from(raw: ScannerAlert) -> Self {
        Self {
            name: raw.alert.or(raw.name).unwrap_or_default(),
            risk: raw.risk,
            description: raw.description,
            url: raw.url,
            confidence: raw.confidence,
            cwe_id: raw.cwe_id,
            plugin_id: raw.plugin_id,
            solution: raw.solution,
            param: raw.param,
            evidence: raw.evidence,
        }
    }
}

impl Alert {
    pub fn new(name: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            name: name.into(),
            risk,
            description: String::new(),
            url: String::new(),
            confidence: None,
            cwe_id: None,
            plugin_id: None,
            solution: None,
            param: None,
            evidence: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// `"SQL Injection (High)"`
    pub fn headline(&self) -> String {
        format!("{} ({})", self.name, self.risk)
    }
}

/// Count alerts at exactly the given risk level.
pub fn count_at(alerts: &[Alert], risk: RiskLevel) -> usize {
    alerts.iter().filter(|a| a.risk == risk).count()
}
