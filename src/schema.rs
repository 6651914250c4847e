use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Time window a report run covers. The platform expects unix-second
/// strings on the wire and `YYYY-MM-DD HH:MM:SS` strings in the job
/// listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportScope {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl ReportScope {
    /// Full-day window for the given calendar date.
    pub fn for_day(date: NaiveDate) -> Self {
        let start = Local
            .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
            .unwrap();
        let end = Local
            .from_local_datetime(&date.and_hms_opt(23, 59, 59).unwrap())
            .unwrap();
        Self { start, end }
    }

    pub fn today() -> Self {
        Self::for_day(Local::now().date_naive())
    }

    pub fn start_unix(&self) -> String {
        self.start.timestamp().to_string()
    }

    pub fn end_unix(&self) -> String {
        self.end.timestamp().to_string()
    }
}

/// One performance row as the platform reports it. Numeric fields stay
/// raw strings (thousands separators, trailing `%`); parsing is owned by
/// the reconciliation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPerformanceRow {
    pub advertiser_id: String,
    pub advertiser_name: String,
    /// Free-text account label encoding `subject-port-provider-task`.
    pub remark: String,
    pub cost: String,
    pub cash_cost: String,
    pub impressions: String,
    pub clicks: String,
    pub ctr: String,
    pub conversions: String,
    pub conversion_cost: String,
    pub conversion_rate: String,
}

/// Why a row was excluded from reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    MalformedRemark,
    NoRebateConfig,
    NoFeeConfig,
    NoTaskConfig,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::MalformedRemark => "malformed_remark",
            SkipReason::NoRebateConfig => "no_rebate_config",
            SkipReason::NoFeeConfig => "no_fee_config",
            SkipReason::NoTaskConfig => "no_task_config",
        };
        write!(f, "skipped:{}", reason)
    }
}

/// A fully reconciled row: normalized fields plus the computed financial
/// metrics. Only rows that passed all three configuration lookups become
/// records; everything else is a [`SkipReason`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub advertiser_id: String,
    pub advertiser_name: String,
    pub subject: String,
    pub port: String,
    pub provider: String,
    pub task_name: String,
    pub cost: f64,
    pub cash_cost: f64,
    pub rebate_cost: f64,
    pub impressions: i64,
    pub clicks: i64,
    /// Raw platform string, echoed into the artifact untouched.
    pub ctr: String,
    pub conversions: i64,
    pub conversion_cost: String,
    pub conversion_rate: String,
    pub service_fee_cost: f64,
    pub revenue: f64,
    pub profit: f64,
    pub profit_rate: f64,
}

/// Where the rendered artifact landed and how a browser reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocator {
    pub path: PathBuf,
    pub download_url: String,
}

/// Run-level totals over the valid records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub cost: f64,
    pub cash_cost: f64,
    pub rebate_cost: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub conversion_cost: f64,
    pub service_fee_cost: f64,
    pub revenue: f64,
    pub profit: f64,
    /// clicks / impressions * 100, 0 when there were no impressions.
    pub avg_ctr: f64,
    /// conversion cost / conversions, 0 when there were no conversions.
    pub avg_conversion_cost: f64,
    /// conversions / clicks * 100, 0 when there were no clicks.
    pub avg_conversion_rate: f64,
    /// profit / revenue * 100, 0 when there was no revenue.
    pub profit_rate_pct: f64,
}

/// The one long-lived output of a run besides the artifact file itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub totals: RunTotals,
    pub total_accounts: usize,
    pub skipped_accounts: usize,
    pub artifact: Option<ArtifactLocator>,
    /// True when at least one page fetch failed and its rows were omitted.
    pub partial: bool,
}

/// Session credential for the platform's business console.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub cookie: String,
    pub csrf_token: String,
}

impl Credential {
    pub fn is_complete(&self) -> bool {
        !self.cookie.is_empty() && !self.csrf_token.is_empty()
    }
}

/// Rebate rate configured per subject + port pair, e.g. 0.025 for 2.5%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateEntry {
    pub subject: String,
    pub port: String,
    pub rebate_rate: f64,
}

/// Pass-through operating fee configured per service provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceFeeEntry {
    pub provider: String,
    pub fee_rate: f64,
}

/// Settlement unit price configured per task type. Disabled entries are
/// excluded when the snapshot is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTypeEntry {
    pub name: String,
    pub settlement_price: f64,
    pub enabled: bool,
}

/// Where artifacts are written and how download links are formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub directory: PathBuf,
    pub base_url: String,
    pub file_prefix: String,
}

/// Run-wide settings handed to the pipeline by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub artifact: ArtifactConfig,
    pub notification_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_for_day_spans_whole_day() {
        let scope = ReportScope::for_day(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(scope.start.date_naive(), scope.end.date_naive());
        assert_eq!(scope.start.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!(scope.end.format("%H:%M:%S").to_string(), "23:59:59");
        assert!(scope.start_unix().parse::<i64>().unwrap() < scope.end_unix().parse::<i64>().unwrap());
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::MalformedRemark.to_string(), "skipped:malformed_remark");
        assert_eq!(SkipReason::NoRebateConfig.to_string(), "skipped:no_rebate_config");
        assert_eq!(SkipReason::NoFeeConfig.to_string(), "skipped:no_fee_config");
        assert_eq!(SkipReason::NoTaskConfig.to_string(), "skipped:no_task_config");
    }

    #[test]
    fn test_credential_completeness() {
        assert!(!Credential::default().is_complete());
        let partial = Credential {
            cookie: "session=abc".to_string(),
            csrf_token: String::new(),
        };
        assert!(!partial.is_complete());
        let full = Credential {
            cookie: "session=abc".to_string(),
            csrf_token: "tok".to_string(),
        };
        assert!(full.is_complete());
    }
}
