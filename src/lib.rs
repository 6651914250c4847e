//! # Media Report Reconciler
//!
//! A library for reconciling ad-platform performance reports against locally
//! configured business rules (rebate rates, service-fee rates, settlement
//! prices) and materializing the result as a downloadable spreadsheet plus a
//! summary notification.
//!
//! ## Core Concepts
//!
//! - **Retrieval**: rows come in either through direct paginated API calls
//!   ([`RemoteReportFetcher`], bounded to 10 concurrent page requests) or
//!   through the platform's asynchronous bulk-export workflow
//!   ([`ExportJobOrchestrator`]: submit, poll, download, then parse).
//! - **Remark encoding**: each account's free-text remark encodes
//!   `subject-port-provider-task`, the join key into all three configuration
//!   maps.
//! - **Skip-on-missing-configuration**: a row joins the report only when all
//!   three lookups succeed; everything else is counted and excluded, and a
//!   row-level problem can never abort a run.
//! - **ConfigSnapshot**: the three lookup maps are loaded once per run and
//!   shared read-only by every row.
//!
//! ## Example
//!
//! ```rust,ignore
//! use media_report_reconciler::*;
//!
//! let credential = Credential { cookie, csrf_token };
//! let api = PlatformHttpClient::new("https://business.example-platform.com", &credential)?;
//! let notifier = WebhookNotifier::new(webhook_url, true);
//! let attribution = HttpAttributionSource::new("http://attribution.internal");
//!
//! let pipeline = ReportPipeline::new(api, config_store, attribution, notifier, ReportSettings {
//!     artifact: ArtifactConfig {
//!         directory: "/var/reports".into(),
//!         base_url: "https://reports.example.com".to_string(),
//!         file_prefix: "media_report".to_string(),
//!     },
//!     notification_title: "Hourly Media Report".to_string(),
//! });
//!
//! let summary = pipeline.run_export(ReportScope::today()).await?;
//! println!("{} accounts, profit {:.2}", summary.total_accounts, summary.totals.profit);
//! ```

pub mod aggregate;
pub mod api;
pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod ingest;
pub mod notify;
pub mod pool;
pub mod reconcile;
pub mod schema;

pub use aggregate::aggregate;
pub use api::*;
pub use artifact::write_report;
pub use client::{HttpAttributionSource, PlatformHttpClient, WebhookNotifier};
pub use config::ConfigSnapshot;
pub use error::{ReportError, Result};
pub use export::{ExportJobOrchestrator, JobHandle, JobState};
pub use fetcher::{FetchOutcome, RemoteReportFetcher};
pub use ingest::read_rows;
pub use notify::format_summary;
pub use reconcile::{ReconcileOutcome, ReconciliationEngine, PLATFORM_SHARE};
pub use schema::*;

use log::{info, warn};
use std::collections::HashMap;

/// One run of the reconciliation pipeline: retrieval, rule join, metric
/// computation, aggregation, artifact rendering, notification. Owns its
/// collaborators; holds no state between runs.
pub struct ReportPipeline<A, C, D, N> {
    api: A,
    configs: C,
    attribution: D,
    notifier: N,
    settings: ReportSettings,
}

impl<A, C, D, N> ReportPipeline<A, C, D, N>
where
    A: PlatformApi,
    C: ConfigStore,
    D: AttributionSource,
    N: Notifier,
{
    pub fn new(api: A, configs: C, attribution: D, notifier: N, settings: ReportSettings) -> Self {
        Self {
            api,
            configs,
            attribution,
            notifier,
            settings,
        }
    }

    /// Export-based run: submit a bulk export, poll until ready, download
    /// and parse the artifact, then reconcile. A poll timeout or download
    /// failure aborts with no artifact.
    pub async fn run_export(&self, scope: ReportScope) -> Result<RunSummary> {
        info!("starting export-based reconciliation run");

        let snapshot = self.configs.load_snapshot().await?;
        let deductions = self.load_deductions(&scope).await;

        let orchestrator = ExportJobOrchestrator::new(&self.api);
        let downloaded = orchestrator
            .retrieve(&scope, &self.settings.artifact.directory)
            .await?;
        let rows = ingest::read_rows(&downloaded)?;

        self.finish(rows, false, &snapshot, &deductions).await
    }

    /// Pagination-based run: fetch every page of the account report
    /// directly. Pages that fail are omitted and surfaced through
    /// `RunSummary::partial`.
    pub async fn run_paginated(&self, scope: ReportScope) -> Result<RunSummary> {
        info!("starting pagination-based reconciliation run");

        let snapshot = self.configs.load_snapshot().await?;
        let deductions = self.load_deductions(&scope).await;

        let fetched = RemoteReportFetcher::new(&self.api).fetch_all(&scope).await?;
        let partial = fetched.failed_pages > 0;

        self.finish(fetched.rows, partial, &snapshot, &deductions).await
    }

    /// Attribution data is an optional adjustment: a lookup failure
    /// degrades every deduction to zero instead of failing the run.
    async fn load_deductions(&self, scope: &ReportScope) -> HashMap<String, i64> {
        match self.attribution.deduction_counts(scope.start.date_naive()).await {
            Ok(counts) => counts,
            Err(err) => {
                warn!("attribution lookup failed, deductions default to zero: {}", err);
                HashMap::new()
            }
        }
    }

    async fn finish(
        &self,
        rows: Vec<RawPerformanceRow>,
        partial: bool,
        snapshot: &ConfigSnapshot,
        deductions: &HashMap<String, i64>,
    ) -> Result<RunSummary> {
        let engine = ReconciliationEngine::new(snapshot, deductions);
        let outcome = engine.reconcile(&rows);
        let skipped_accounts = outcome.skipped_count();

        if outcome.records.is_empty() {
            info!("run produced no valid records ({} skipped), nothing to report", skipped_accounts);
            return Ok(RunSummary {
                skipped_accounts,
                partial,
                ..RunSummary::default()
            });
        }

        let totals = aggregate::aggregate(&outcome.records);
        let artifact = artifact::write_report(&outcome.records, &totals, &self.settings.artifact)?;

        let summary = RunSummary {
            totals,
            total_accounts: outcome.records.len(),
            skipped_accounts,
            artifact,
            partial,
        };

        notify::deliver(&self.notifier, &self.settings.notification_title, &summary).await;

        info!(
            "reconciliation run complete: {} accounts, {} skipped",
            summary.total_accounts, summary.skipped_accounts
        );
        Ok(summary)
    }
}
