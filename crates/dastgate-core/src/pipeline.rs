//! End-to-end scan workflows built from the session and orchestrator phases.

use crate::alerts::Alert;
use crate::client::ScannerApi;
use crate::clock::Clock;
use crate::config::RunConfig;
use crate::error::{DastError, Result};
use crate::orchestrator::{Orchestrator, PhaseRecord};
use crate::seeds;
use crate::session::{SessionConfigurator, SessionHandle};
use serde::Serialize;
use tracing::info;

/// Everything a run produced, in phase order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionHandle>,
    pub seeded: usize,
    pub phases: Vec<PhaseRecord>,
    pub seed_scans: Vec<PhaseRecord>,
    pub passive_polls: u32,
    pub alerts: Vec<Alert>,
}

impl RunSummary {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            session: None,
            seeded: 0,
            phases: Vec::new(),
            seed_scans: Vec::new(),
            passive_polls: 0,
            alerts: Vec::new(),
        }
    }
}

/// Session setup, seeding, spider, AJAX spider, active scans, passive wait, alerts.
pub async fn run_authenticated<C, K>(client: &C, clock: &K, config: &RunConfig) -> Result<RunSummary>
where
    C: ScannerApi + ?Sized,
    K: Clock + ?Sized,
{
    let target = config.target_url.as_str();
    let settings = &config.settings;
    let credentials = config.credentials.as_ref().ok_or_else(|| {
        DastError::Config("authenticated scan requires login credentials".to_string())
    })?;
    let mut summary = RunSummary::new(target);

    info!("Configuring authenticated session for {target}");
    let session = SessionConfigurator::new(client, clock, &settings.session)
        .establish(target, credentials)
        .await?;

    let orchestrator = Orchestrator::new(client, clock, &settings.timing);

    let seed_urls = seeds::read_seed_file(&settings.seeds.file)?.unwrap_or_default();
    summary.seeded = orchestrator.seed(&seed_urls).await?;

    summary
        .phases
        .push(orchestrator.spider_as_user(&session, target).await?);
    summary.phases.push(orchestrator.ajax_spider(target).await?);

    orchestrator.configure_active_scan(&settings.active_scan).await?;
    summary.seed_scans = orchestrator.active_scan_seeds(&seed_urls).await?;
    summary.phases.push(orchestrator.active_scan(target).await?);

    summary.passive_polls = orchestrator.wait_for_passive_scan().await?;
    summary.alerts = orchestrator.collect_alerts(target).await?;
    summary.session = Some(session);
    Ok(summary)
}

/// Unauthenticated crawl plus passive scan; no attack traffic.
pub async fn run_baseline<C, K>(client: &C, clock: &K, config: &RunConfig) -> Result<RunSummary>
where
    C: ScannerApi + ?Sized,
    K: Clock + ?Sized,
{
    let target = config.target_url.as_str();
    let timing = &config.settings.timing;
    let mut summary = RunSummary::new(target);
    let orchestrator = Orchestrator::new(client, clock, timing);

    info!("Starting baseline scan of {target}");
    client.access_url(target, true).await?;
    clock.sleep(timing.baseline_warmup()).await;

    summary.phases.push(orchestrator.spider(target).await?);
    summary.passive_polls = orchestrator.wait_for_passive_scan().await?;
    summary.alerts = orchestrator.collect_alerts(target).await?;
    Ok(summary)
}
