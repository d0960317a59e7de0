use crate::alerts::{Alert, RiskLevel};
use crate::error::Result;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Generate a SARIF 2.1.0 log from scanner alerts.
/// Rules are keyed by scanner plugin id (or alert name when absent), so
/// repeated alerts of the same kind share one rule.
pub fn to_sarif(target: &str, alerts: &[Alert]) -> serde_json::Value {
    let mut rules: BTreeMap<String, &Alert> = BTreeMap::new();
    for alert in alerts {
        rules.entry(rule_id(alert)).or_insert(alert);
    }

    let rules: Vec<serde_json::Value> = rules
        .iter()
        .map(|(id, alert)| sarif_rule(id, alert))
        .collect();

    let results: Vec<serde_json::Value> = alerts
        .iter()
        .map(|alert| sarif_result(alert, target))
        .collect();

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "dastgate",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                }
            },
            "results": results,
            "invocations": [{
                "executionSuccessful": true,
                "toolExecutionNotifications": [],
            }]
        }]
    })
}

pub fn export(target: &str, alerts: &[Alert], output_path: &Path) -> Result<()> {
    let sarif = serde_json::to_string_pretty(&to_sarif(target, alerts))?;
    std::fs::write(output_path, sarif)?;
    info!("SARIF report saved to {}", output_path.display());
    Ok(())
}

fn level(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Critical | RiskLevel::High => "error",
        RiskLevel::Medium => "warning",
        RiskLevel::Low | RiskLevel::Informational => "note",
    }
}

fn rule_id(alert: &Alert) -> String {
    match &alert.plugin_id {
        Some(id) if !id.is_empty() => format!("ZAP-{id}"),
        _ => format!("ZAP-{}", alert.name.replace(' ', "-").to_lowercase()),
    }
}

fn sarif_rule(id: &str, alert: &Alert) -> serde_json::Value {
    let mut rule = json!({
        "id": id,
        "name": alert.name.clone(),
        "shortDescription": {
            "text": alert.name.clone(),
        },
        "fullDescription": {
            "text": if alert.description.is_empty() { alert.name.clone() } else { alert.description.clone() },
        },
        "defaultConfiguration": {
            "level": level(alert.risk),
        },
        "properties": {
            "risk": alert.risk.label(),
        }
    });

    if let Some(solution) = &alert.solution {
        rule["help"] = json!({ "text": solution });
    }
    if let Some(cwe) = alert.cwe_id.as_deref().filter(|c| !c.is_empty() && *c != "-1") {
        rule["properties"]["tags"] = json!([format!("CWE-{cwe}")]);
    }

    rule
}

fn sarif_result(alert: &Alert, target: &str) -> serde_json::Value {
    let uri = if alert.url.is_empty() {
        target
    } else {
        alert.url.as_str()
    };

    let mut result = json!({
        "ruleId": rule_id(alert),
        "level": level(alert.risk),
        "message": {
            "text": alert.headline(),
        },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": {
                    "uri": uri,
                }
            }
        }],
    });

    if let Some(evidence) = alert.evidence.as_deref().filter(|e| !e.is_empty()) {
        result["properties"] = json!({ "evidence": evidence });
    }

    result
}
