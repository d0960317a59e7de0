//! Run artifacts: alerts JSON, the scanner's HTML report, and optional SARIF.

pub mod html;
pub mod json;
pub mod sarif;

use crate::alerts::Alert;
use crate::client::ScannerApi;
use crate::config::ReportSettings;
use std::path::PathBuf;
use tracing::warn;

/// Write every configured artifact. Failures are logged and skipped so the
/// gate decision still goes out. Returns the paths actually written.
pub async fn write_artifacts<C: ScannerApi + ?Sized>(
    client: &C,
    target: &str,
    alerts: &[Alert],
    settings: &ReportSettings,
) -> Vec<PathBuf> {
    let mut written = Vec::new();

    match json::export(target, alerts, &settings.alerts_json) {
        Ok(()) => written.push(settings.alerts_json.clone()),
        Err(e) => warn!("Could not write {}: {e}", settings.alerts_json.display()),
    }

    match html::export(client, &settings.html).await {
        Ok(()) => written.push(settings.html.clone()),
        Err(e) => warn!("Could not write {}: {e}", settings.html.display()),
    }

    if let Some(path) = &settings.sarif {
        match sarif::export(target, alerts, path) {
            Ok(()) => written.push(path.clone()),
            Err(e) => warn!("Could not write {}: {e}", path.display()),
        }
    }

    written
}
