use crate::alerts::{count_at, Alert, RiskLevel};
use serde::{Deserialize, Serialize};

/// Outcome of the security gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Verdict::Pass => "PASSED",
            Verdict::Fail => "FAILED",
        }
    }
}

/// Per-risk alert count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCount {
    pub risk: RiskLevel,
    pub count: usize,
}

/// Gate result with everything needed to print an itemised summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateReport {
    pub verdict: Verdict,
    pub threshold: RiskLevel,
    pub total_alerts: usize,
    pub counts: Vec<RiskCount>,
    pub failing: Vec<Alert>,
}

impl GateReport {
    /// Evaluate alerts against the default High/Critical threshold.
    pub fn evaluate(alerts: &[Alert]) -> Self {
        Self::evaluate_at(alerts, RiskLevel::High)
    }

    pub fn evaluate_at(alerts: &[Alert], threshold: RiskLevel) -> Self {
        let mut failing: Vec<Alert> = alerts
            .iter()
            .filter(|a| a.risk >= threshold)
            .cloned()
            .collect();
        failing.sort_by_key(|a| std::cmp::Reverse(a.risk.priority()));

        let counts = RiskLevel::ALL
            .iter()
            .map(|&risk| RiskCount {
                risk,
                count: count_at(alerts, risk),
            })
            .collect();

        Self {
            verdict: if failing.is_empty() {
                Verdict::Pass
            } else {
                Verdict::Fail
            },
            threshold,
            total_alerts: alerts.len(),
            counts,
            failing,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code()
    }

    pub fn count(&self, risk: RiskLevel) -> usize {
        self.counts
            .iter()
            .find(|c| c.risk == risk)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// One line per failing alert, e.g. `SQL Injection (High)`.
    pub fn failing_lines(&self) -> Vec<String> {
        self.failing.iter().map(Alert::headline).collect()
    }
}

/// Fail iff at least one alert is High or Critical.
pub fn decide(alerts: &[Alert]) -> Verdict {
    decide_at(alerts, RiskLevel::High)
}

/// Fail iff at least one alert is at or above `threshold`.
pub fn decide_at(alerts: &[Alert], threshold: RiskLevel) -> Verdict {
    if alerts.iter().any(|a| a.risk >= threshold) {
        Verdict::Fail
    } else {
        Verdict::Pass
    }
}
