//! Alert dump written next to the HTML report.

use crate::alerts::Alert;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsDocument {
    pub target: String,
    pub generated_at: DateTime<Utc>,
    pub alerts: Vec<Alert>,
}

impl AlertsDocument {
    pub fn new(target: &str, alerts: &[Alert]) -> Self {
        Self {
            target: target.to_string(),
            generated_at: Utc::now(),
            alerts: alerts.to_vec(),
        }
    }
}

// Saved documents and raw scanner alert arrays are both accepted on load.
#[derive(Deserialize)]
#[serde(untagged)]
enum AlertsFile {
    Document(AlertsDocument),
    Bare(Vec<Alert>),
}

pub fn export(target: &str, alerts: &[Alert], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&AlertsDocument::new(target, alerts))?;
    std::fs::write(output_path, json)?;
    info!("Alerts saved to {}", output_path.display());
    Ok(())
}

pub fn load_alerts(input_path: &Path) -> Result<Vec<Alert>> {
    let content = std::fs::read_to_string(input_path)?;
    Ok(match serde_json::from_str::<AlertsFile>(&content)? {
        AlertsFile::Document(doc) => doc.alerts,
        AlertsFile::Bare(alerts) => alerts,
    })
}
