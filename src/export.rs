use crate::api::{JobListFilter, PlatformApi, EXPORT_TASK_ID_PREFIX, JOB_STATUS_SUCCESS};
use crate::error::{ReportError, Result};
use crate::schema::ReportScope;
use chrono::Local;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;

/// Poll budget: 60 attempts, 5 s apart, a five minute wall-clock ceiling.
const MAX_POLL_ATTEMPTS: u32 = 60;
const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling,
    Ready,
    Downloaded,
    TimedOut,
}

/// Tracks one export job from submission to download. Exists only for
/// the duration of the orchestrator's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// External task id with the vendor prefix already stripped; this is
    /// the comparison key against the job listing.
    pub task_id: String,
    pub scheduler_id: Option<i64>,
    pub state: JobState,
    pub attempts: u32,
}

/// Sequential submit → poll → download state machine for the platform's
/// asynchronous bulk-export workflow. One instance per run.
pub struct ExportJobOrchestrator<'a, A> {
    api: &'a A,
    poll_interval: Duration,
}

impl<'a, A: PlatformApi> ExportJobOrchestrator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Same machine with a custom poll interval. Tests drive the loop
    /// with `Duration::ZERO`.
    pub fn with_poll_interval(api: &'a A, poll_interval: Duration) -> Self {
        Self { api, poll_interval }
    }

    /// Submits the export request. Failure to obtain a task id is fatal.
    pub async fn submit(&self, scope: &ReportScope) -> Result<JobHandle> {
        let raw_id = self.api.submit_export_job(scope).await?;
        let task_id = raw_id
            .strip_prefix(EXPORT_TASK_ID_PREFIX)
            .unwrap_or(&raw_id)
            .to_string();
        if task_id.is_empty() {
            return Err(ReportError::ExportSubmission(
                "platform returned no export task id".to_string(),
            ));
        }

        info!("export job submitted, task id {}", task_id);
        Ok(JobHandle {
            task_id,
            scheduler_id: None,
            state: JobState::Submitted,
            attempts: 0,
        })
    }

    /// Polls the job registry until an entry matches both the task id and
    /// the success status. The listing returns every concurrent job in the
    /// window, so absence of a match is normal while the export runs.
    /// Transport errors count toward the attempt budget but do not abort.
    pub async fn await_ready(&self, handle: &mut JobHandle, scope: &ReportScope) -> Result<i64> {
        let filter = JobListFilter::finished_exports(scope);
        handle.state = JobState::Polling;

        for attempt in 1..=MAX_POLL_ATTEMPTS {
            handle.attempts = attempt;

            match self.api.list_export_jobs(&filter).await {
                Ok(entries) => {
                    if let Some(entry) = entries
                        .iter()
                        .find(|e| e.task_id == handle.task_id && e.status == JOB_STATUS_SUCCESS)
                    {
                        info!(
                            "export job {} ready, scheduler id {} (attempt {})",
                            handle.task_id, entry.scheduler_id, attempt
                        );
                        handle.scheduler_id = Some(entry.scheduler_id);
                        handle.state = JobState::Ready;
                        return Ok(entry.scheduler_id);
                    }
                    info!(
                        "export job {} not ready (attempt {}/{})",
                        handle.task_id, attempt, MAX_POLL_ATTEMPTS
                    );
                }
                Err(err) => {
                    warn!(
                        "job listing poll failed (attempt {}/{}): {}",
                        attempt, MAX_POLL_ATTEMPTS, err
                    );
                }
            }

            if attempt < MAX_POLL_ATTEMPTS {
                sleep(self.poll_interval).await;
            }
        }

        handle.state = JobState::TimedOut;
        Err(ReportError::JobTimeout {
            task_id: handle.task_id.clone(),
            attempts: MAX_POLL_ATTEMPTS,
        })
    }

    /// Downloads the finished artifact into `dir`. Any I/O error here is
    /// fatal to the run.
    pub async fn download(&self, handle: &mut JobHandle, dir: &Path) -> Result<PathBuf> {
        let scheduler_id = handle.scheduler_id.ok_or_else(|| {
            ReportError::ExportSubmission(format!(
                "export job {} has no scheduler id to download",
                handle.task_id
            ))
        })?;

        let bytes = self.api.download_artifact(scheduler_id).await?;

        tokio::fs::create_dir_all(dir).await?;
        let filename = format!("platform_export_{}.csv", Local::now().format("%Y%m%d%H%M%S"));
        let path = dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;

        handle.state = JobState::Downloaded;
        info!("export artifact downloaded to {}", path.display());
        Ok(path)
    }

    /// Runs the whole machine: submit, wait, download.
    pub async fn retrieve(&self, scope: &ReportScope, dir: &Path) -> Result<PathBuf> {
        let mut handle = self.submit(scope).await?;
        self.await_ready(&mut handle, scope).await?;
        self.download(&mut handle, dir).await
    }
}
