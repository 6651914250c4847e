use crate::config::ConfigSnapshot;
use crate::error::Result;
use crate::schema::{Credential, RawPerformanceRow, ReportScope};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rows requested per page of the account report.
pub const PAGE_SIZE: usize = 100;
/// Scheduler status the platform reports for a finished export job.
pub const JOB_STATUS_SUCCESS: i64 = 2;
/// Job-kind discriminator for promotion-management exports.
pub const JOB_KIND_PROMOTION_EXPORT: i64 = 5;
/// Vendor prefix on freshly issued export task ids; the job listing
/// reports the id without it.
pub const EXPORT_TASK_ID_PREFIX: &str = "V3";

/// One page of the paginated account report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPage {
    pub rows: Vec<RawPerformanceRow>,
    /// Total row count across all pages, as reported by the platform.
    pub total: usize,
}

/// Filter the orchestrator polls the job registry with. The listing
/// endpoint returns every concurrent job matching the filter, not just
/// the caller's, so matching on task id happens client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobListFilter {
    pub statuses: Vec<i64>,
    pub kinds: Vec<i64>,
    /// Window bounds formatted `YYYY-MM-DD HH:MM:SS`.
    pub window_start: String,
    pub window_end: String,
    pub page: usize,
    pub page_size: usize,
}

impl JobListFilter {
    /// Filter for finished promotion exports inside the run's window.
    pub fn finished_exports(scope: &ReportScope) -> Self {
        Self {
            statuses: vec![JOB_STATUS_SUCCESS],
            kinds: vec![JOB_KIND_PROMOTION_EXPORT],
            window_start: scope.start.format("%Y-%m-%d %H:%M:%S").to_string(),
            window_end: scope.end.format("%Y-%m-%d %H:%M:%S").to_string(),
            page: 1,
            page_size: 20,
        }
    }
}

/// One entry from the export-job registry listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJobEntry {
    pub task_id: String,
    pub scheduler_id: i64,
    pub status: i64,
}

/// Paginated report retrieval, bulk-export workflow and artifact download
/// against the advertising platform.
pub trait PlatformApi {
    fn fetch_report_page(
        &self,
        scope: &ReportScope,
        page: usize,
    ) -> impl std::future::Future<Output = Result<ReportPage>>;

    /// Submits a bulk-export request and returns the external task id as
    /// issued by the platform (vendor prefix included).
    fn submit_export_job(
        &self,
        scope: &ReportScope,
    ) -> impl std::future::Future<Output = Result<String>>;

    fn list_export_jobs(
        &self,
        filter: &JobListFilter,
    ) -> impl std::future::Future<Output = Result<Vec<ExportJobEntry>>>;

    fn download_artifact(
        &self,
        scheduler_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>>;
}

/// Collaborator over configuration persistence. CRUD on the underlying
/// tables is out of scope; the pipeline only ever reads a snapshot.
pub trait ConfigStore {
    fn load_snapshot(&self) -> impl std::future::Future<Output = Result<ConfigSnapshot>>;
}

/// Optional attribution-adjustment data, keyed by advertiser id.
pub trait AttributionSource {
    fn deduction_counts(
        &self,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<HashMap<String, i64>>>;
}

/// Outbound alerting channel for the run summary.
pub trait Notifier {
    fn send_markdown(
        &self,
        title: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<()>>;
}

/// Collaborator over credential storage for the platform session.
pub trait CredentialStore {
    fn current_credential(&self) -> impl std::future::Future<Output = Result<Credential>>;
}
