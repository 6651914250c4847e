use crate::api::{PlatformApi, PAGE_SIZE};
use crate::error::Result;
use crate::pool::map_bounded;
use crate::schema::{RawPerformanceRow, ReportScope};
use log::{error, info};

/// Upper bound on concurrently in-flight page requests. The platform
/// rate-limits aggressively above this.
const MAX_CONCURRENT_PAGE_FETCHES: usize = 10;

/// Rows gathered from every page that succeeded, in page order, plus the
/// number of pages that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub rows: Vec<RawPerformanceRow>,
    pub failed_pages: usize,
}

/// Paginated retrieval of raw performance rows straight from the report
/// API. Page 1 is fetched up front to learn the total count; the rest go
/// through the bounded pool.
pub struct RemoteReportFetcher<'a, A> {
    api: &'a A,
}

impl<'a, A: PlatformApi> RemoteReportFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Fetches the full row set for the scope. A failed page is logged
    /// and its rows omitted; only a page-1 failure aborts.
    pub async fn fetch_all(&self, scope: &ReportScope) -> Result<FetchOutcome> {
        let first = self.api.fetch_report_page(scope, 1).await?;

        let total = first.total;
        if total == 0 {
            info!("no account rows in scope");
            return Ok(FetchOutcome::default());
        }

        let total_pages = (total + PAGE_SIZE - 1) / PAGE_SIZE;
        info!("{} account rows across {} pages", total, total_pages);

        let mut rows = first.rows;
        let mut failed_pages = 0;

        let page_results = map_bounded(MAX_CONCURRENT_PAGE_FETCHES, 2..=total_pages, |page| async move {
            (page, self.api.fetch_report_page(scope, page).await)
        })
        .await;

        for (page, result) in page_results {
            match result {
                Ok(fetched) => {
                    info!("page {}/{} fetched, {} rows", page, total_pages, fetched.rows.len());
                    rows.extend(fetched.rows);
                }
                Err(err) => {
                    error!("page {}/{} fetch failed, rows omitted: {}", page, total_pages, err);
                    failed_pages += 1;
                }
            }
        }

        Ok(FetchOutcome { rows, failed_pages })
    }
}
