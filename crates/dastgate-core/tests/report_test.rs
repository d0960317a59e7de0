//! Artifacts written at the end of a run.

mod common;

use common::{MockScanner, TARGET};
use dastgate_core::alerts::{Alert, RiskLevel};
use dastgate_core::config::ReportSettings;
use dastgate_core::gate::{GateReport, Verdict};
use dastgate_core::report;

#[tokio::test]
async fn test_artifacts_written_and_reloadable() {
    let dir = tempfile::tempdir().unwrap();
    let scanner = MockScanner::new();
    scanner.set_html_report("<html>ZAP Scanning Report</html>");
    let settings = ReportSettings {
        alerts_json: dir.path().join("zap-alerts.json"),
        html: dir.path().join("zap-report.html"),
        sarif: Some(dir.path().join("zap.sarif")),
    };
    let alerts = vec![
        Alert::new("SQL Injection", RiskLevel::High).with_url(format!("{TARGET}/rest/products")),
        Alert::new("Content Security Policy (CSP) Header Not Set", RiskLevel::Medium),
    ];

    let written = report::write_artifacts(&scanner, TARGET, &alerts, &settings).await;

    assert_eq!(written.len(), 3);
    let html = std::fs::read_to_string(&settings.html).unwrap();
    assert!(html.contains("ZAP Scanning Report"));

    let reloaded = report::json::load_alerts(&settings.alerts_json).unwrap();
    assert_eq!(reloaded, alerts);
    let gate = GateReport::evaluate(&reloaded);
    assert_eq!(gate.verdict, Verdict::Fail);
    assert_eq!(gate.failing_lines(), vec!["SQL Injection (High)"]);

    let sarif: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("zap.sarif")).unwrap())
            .unwrap();
    assert_eq!(sarif["runs"][0]["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unwritable_artifact_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    let scanner = MockScanner::new();
    let settings = ReportSettings {
        alerts_json: dir.path().join("missing-dir").join("zap-alerts.json"),
        html: dir.path().join("zap-report.html"),
        sarif: None,
    };

    let written = report::write_artifacts(&scanner, TARGET, &[], &settings).await;

    assert_eq!(written, vec![settings.html.clone()]);
}
