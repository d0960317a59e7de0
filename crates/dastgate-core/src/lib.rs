pub mod alerts;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod seeds;
pub mod session;

pub use alerts::{Alert, RiskLevel};
pub use client::{ScannerApi, ZapClient};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{EnvConfig, RunConfig, RunMode, Settings};
pub use error::{DastError, Result};
pub use gate::{decide, decide_at, GateReport, Verdict};
pub use orchestrator::{Orchestrator, PhaseRecord};
pub use pipeline::{run_authenticated, run_baseline, RunSummary};
pub use session::{SessionConfigurator, SessionHandle};
