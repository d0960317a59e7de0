//! Sequential scan phases, each polled to a terminal state before the next starts.

pub mod job;

use crate::alerts::Alert;
use crate::client::ScannerApi;
use crate::clock::Clock;
use crate::config::{ActiveScanSettings, TimingSettings};
use crate::error::{DastError, Result};
use crate::session::SessionHandle;
use job::{JobKind, JobState, PhaseOutcome, ScanJob, StatusReading};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One finished phase, kept for the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub kind: JobKind,
    pub target: String,
    pub outcome: PhaseOutcome,
}

/// Runs scan phases against the scanner, waiting on each.
pub struct Orchestrator<'a, C: ?Sized, K: ?Sized> {
    client: &'a C,
    clock: &'a K,
    timing: TimingSettings,
}

impl<'a, C, K> Orchestrator<'a, C, K>
where
    C: ScannerApi + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(client: &'a C, clock: &'a K, timing: &TimingSettings) -> Self {
        Self {
            client,
            clock,
            timing: timing.clone(),
        }
    }

    /// Request each seed directly so it lands in the site tree before crawling.
    /// A seed the scanner refuses is skipped; transport failures still abort.
    /// Returns the number of seeds accepted.
    pub async fn seed(&self, urls: &[String]) -> Result<usize> {
        info!("Seeding {} endpoints", urls.len());
        let mut accepted = 0;
        for url in urls {
            match self.client.access_url(url, true).await {
                Ok(()) => {
                    accepted += 1;
                    debug!("Seeded {url}");
                }
                Err(DastError::Api { code, .. }) => {
                    warn!("Scanner refused seed {url} ({code}), skipping")
                }
                Err(e) => return Err(e),
            }
        }
        info!("Seeded {accepted}/{} endpoints", urls.len());
        Ok(accepted)
    }

    pub async fn spider(&self, target: &str) -> Result<PhaseRecord> {
        info!("Starting spider on {target}");
        let handle = self.client.spider_scan(target).await?;
        self.run_started(JobKind::Spider, target, &handle).await
    }

    pub async fn spider_as_user(&self, session: &SessionHandle, target: &str) -> Result<PhaseRecord> {
        info!(
            "Starting authenticated spider on {target} as user {}",
            session.user_id
        );
        let handle = self
            .client
            .spider_scan_as_user(&session.context_id, &session.user_id, target, true)
            .await?;
        self.run_started(JobKind::Spider, target, &handle).await
    }

    /// The AJAX spider has no reliable completion signal, so it runs under a ceiling.
    pub async fn ajax_spider(&self, target: &str) -> Result<PhaseRecord> {
        info!("Starting AJAX spider on {target}");
        self.client.ajax_spider_scan(target).await?;
        let job = ScanJob::ajax(target);
        let outcome = self.track(&job).await?;
        Ok(self.record(job.kind, target, outcome))
    }

    pub async fn configure_active_scan(&self, options: &ActiveScanSettings) -> Result<()> {
        self.client.set_attack_policy(&options.attack_policy).await?;
        self.client
            .set_handle_anti_csrf_tokens(options.handle_anti_csrf_tokens)
            .await?;
        self.client
            .set_threads_per_host(options.threads_per_host)
            .await?;
        debug!(
            "Active scan options: policy='{}' anti_csrf={} threads_per_host={}",
            options.attack_policy, options.handle_anti_csrf_tokens, options.threads_per_host
        );
        Ok(())
    }

    pub async fn active_scan(&self, url: &str) -> Result<PhaseRecord> {
        info!("Starting active scan for {url}");
        let handle = self.client.active_scan(url).await?;
        self.run_started(JobKind::ActiveScan, url, &handle).await
    }

    /// Scan every seed on its own; one seed failing to start does not stop the rest.
    pub async fn active_scan_seeds(&self, urls: &[String]) -> Result<Vec<PhaseRecord>> {
        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            records.push(self.active_scan(url).await?);
        }
        let completed = records.iter().filter(|r| r.outcome.is_completed()).count();
        info!(
            "Seeded active scans: {completed}/{} completed",
            records.len()
        );
        Ok(records)
    }

    /// Wait until the passive scanner has drained its queue. Returns the number of reads.
    pub async fn wait_for_passive_scan(&self) -> Result<u32> {
        let mut polls = 0;
        loop {
            let remaining = self.client.records_to_scan().await?;
            polls += 1;
            if remaining == 0 {
                break;
            }
            info!("Passive scan records remaining: {remaining}");
            self.clock.sleep(self.timing.passive_interval()).await;
        }
        info!("Passive scan completed");
        Ok(polls)
    }

    pub async fn collect_alerts(&self, base_url: &str) -> Result<Vec<Alert>> {
        let alerts = self.client.alerts(base_url).await?;
        info!("Collected {} alerts for {base_url}", alerts.len());
        Ok(alerts)
    }

    async fn run_started(&self, kind: JobKind, target: &str, handle: &str) -> Result<PhaseRecord> {
        let outcome = match ScanJob::from_handle(kind, target, handle) {
            Some(job) => self.track(&job).await?,
            None => PhaseOutcome::NotStarted {
                handle: handle.to_string(),
            },
        };
        Ok(self.record(kind, target, outcome))
    }

    fn record(&self, kind: JobKind, target: &str, outcome: PhaseOutcome) -> PhaseRecord {
        match &outcome {
            PhaseOutcome::NotStarted { handle } => {
                warn!("{kind} NOT started for {target} (handle='{handle}')")
            }
            PhaseOutcome::Completed { polls } => {
                info!("{kind} completed for {target} after {polls} status reads")
            }
            PhaseOutcome::Vanished { status, .. } => {
                warn!("{kind} disappeared for {target} (status='{status}')")
            }
            PhaseOutcome::TimedOut { elapsed_secs, .. } => {
                warn!("{kind} still running after {elapsed_secs}s for {target}, moving on")
            }
        }
        PhaseRecord {
            kind,
            target: target.to_string(),
            outcome,
        }
    }

    fn interval(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Spider => self.timing.spider_interval(),
            JobKind::AjaxSpider => self.timing.ajax_interval(),
            JobKind::ActiveScan => self.timing.active_interval(),
        }
    }

    fn ceiling(&self, kind: JobKind) -> Option<Duration> {
        match kind {
            JobKind::AjaxSpider => Some(self.timing.ajax_timeout()),
            JobKind::Spider | JobKind::ActiveScan => None,
        }
    }

    async fn read_status(&self, job: &ScanJob) -> Result<String> {
        match job.kind {
            JobKind::Spider => self.client.spider_status(&job.id).await,
            JobKind::AjaxSpider => self.client.ajax_spider_status().await,
            JobKind::ActiveScan => self.client.active_scan_status(&job.id).await,
        }
    }

    /// Poll `job` until it completes, vanishes, or exceeds its ceiling.
    pub async fn track(&self, job: &ScanJob) -> Result<PhaseOutcome> {
        let started = self.clock.elapsed();
        let interval = self.interval(job.kind);
        let ceiling = self.ceiling(job.kind);
        let mut state = JobState::start();

        loop {
            let raw = self.read_status(job).await?;
            let reading = StatusReading::parse(job.kind, &raw);
            if let (StatusReading::Progress(pct), Some(prev)) = (&reading, state.progress()) {
                if *pct < prev {
                    debug!("{} {} reported {pct}% after {prev}%, keeping {prev}%", job.kind, job.id);
                }
            }
            state = state.observe(reading);
            if state.is_terminal() {
                break;
            }

            match state.progress() {
                Some(pct) => info!("{} progress: {pct}%", job.kind),
                None => info!("{} running...", job.kind),
            }

            let elapsed = self.clock.elapsed().saturating_sub(started);
            if ceiling.is_some_and(|limit| elapsed > limit) {
                state = state.time_out();
                break;
            }
            self.clock.sleep(interval).await;
        }

        let elapsed_secs = self.clock.elapsed().saturating_sub(started).as_secs();
        Ok(match state {
            JobState::Completed { polls } => PhaseOutcome::Completed { polls },
            JobState::Vanished { status, polls } => PhaseOutcome::Vanished { status, polls },
            JobState::TimedOut { polls } => PhaseOutcome::TimedOut {
                polls,
                elapsed_secs,
            },
            // The loop only exits on a terminal state.
            JobState::NotStarted | JobState::Running { .. } => PhaseOutcome::NotStarted {
                handle: job.id.clone(),
            },
        })
    }
}
