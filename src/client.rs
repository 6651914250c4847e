use crate::api::{
    AttributionSource, CredentialStore, ExportJobEntry, JobListFilter, Notifier, PlatformApi,
    ReportPage, JOB_KIND_PROMOTION_EXPORT, PAGE_SIZE,
};
use crate::error::{ReportError, Result};
use crate::schema::{Credential, RawPerformanceRow, ReportScope};
use chrono::NaiveDate;
use log::info;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const ACCOUNT_LIST_PATH: &str = "/nbs/api/bm/promotion/ad/get_account_list";
const JOB_LIST_PATH: &str = "/nbs/api/bm/task_center/download/list";
const DOWNLOAD_PATH: &str = "/nbs/api/bm/task_center/download/download_operation/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cascade metadata columns requested alongside the metrics.
const CASCADE_METRICS: [&str; 7] = [
    "advertiser_name",
    "advertiser_id",
    "advertiser_status",
    "advertiser_remark",
    "advertiser_agent_name",
    "advertiser_agent_id",
    "advertiser_followed",
];

const REPORT_FIELDS: [&str; 8] = [
    "stat_cost",
    "stat_cash_cost",
    "show_cnt",
    "click_cnt",
    "ctr",
    "convert_cnt",
    "conversion_cost",
    "conversion_rate",
];

/// Metric key carrying the attribution deduction counter.
const DEDUCTION_METRIC: &str = "advertiser_rate_false_4";

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct AccountListFilter {
    advertiser: Empty,
    group: Empty,
    #[serde(rename = "pricingCategory")]
    pricing_category: [i32; 1],
    campaign: Empty,
    is_active: bool,
}

impl Default for AccountListFilter {
    fn default() -> Self {
        Self {
            advertiser: Empty {},
            group: Empty {},
            pricing_category: [2],
            campaign: Empty {},
            is_active: true,
        }
    }
}

#[derive(Serialize)]
struct AccountListRequest {
    start_time: String,
    end_time: String,
    /// Page number; the platform calls it an offset.
    offset: usize,
    limit: usize,
    order_type: i32,
    account_type: i32,
    cascade_metrics: [&'static str; 7],
    fields: [&'static str; 8],
    filter: AccountListFilter,
    ocean_white: bool,
    order_field: &'static str,
    platform_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    download: Option<bool>,
}

impl AccountListRequest {
    fn page(scope: &ReportScope, page: usize) -> Self {
        Self {
            start_time: scope.start_unix(),
            end_time: scope.end_unix(),
            offset: page,
            limit: PAGE_SIZE,
            order_type: 1,
            account_type: 0,
            cascade_metrics: CASCADE_METRICS,
            fields: REPORT_FIELDS,
            filter: AccountListFilter::default(),
            ocean_white: true,
            order_field: "stat_cost",
            platform_version: "2.0",
            download: None,
        }
    }

    fn export(scope: &ReportScope) -> Self {
        Self {
            download: Some(true),
            ..Self::page(scope, 1)
        }
    }
}

#[derive(Serialize)]
struct JobOrder {
    #[serde(rename = "orderField")]
    order_field: &'static str,
    #[serde(rename = "orderType")]
    order_type: i32,
}

#[derive(Serialize)]
struct JobListRequest<'a> {
    status: &'a [i64],
    #[serde(rename = "type")]
    kind: &'a [i64],
    st: &'a str,
    et: &'a str,
    order: [JobOrder; 1],
    page: usize,
    size: usize,
}

impl<'a> JobListRequest<'a> {
    fn from_filter(filter: &'a JobListFilter) -> Self {
        Self {
            status: &filter.statuses,
            kind: &filter.kinds,
            st: &filter.window_start,
            et: &filter.window_end,
            order: [JobOrder {
                order_field: "task_create_time",
                order_type: 1,
            }],
            page: filter.page,
            size: filter.page_size,
        }
    }
}

#[derive(Serialize)]
struct DownloadRequest {
    operation: i32,
    #[serde(rename = "schedulerType")]
    scheduler_type: i64,
    #[serde(rename = "schedulerId")]
    scheduler_id: String,
}

/// Envelope every platform endpoint wraps its payload in.
#[derive(Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default, alias = "message")]
    msg: String,
    data: Option<T>,
}

#[derive(Deserialize, Default)]
struct Pagination {
    #[serde(default)]
    total: usize,
}

#[derive(Deserialize)]
struct AccountEntry {
    advertiser_id: i64,
    advertiser_name: String,
    #[serde(default)]
    advertiser_remark: String,
    stat_cost: String,
    stat_cash_cost: String,
    show_cnt: String,
    click_cnt: String,
    ctr: String,
    convert_cnt: String,
    conversion_cost: String,
    conversion_rate: String,
}

impl From<AccountEntry> for RawPerformanceRow {
    fn from(entry: AccountEntry) -> Self {
        RawPerformanceRow {
            advertiser_id: entry.advertiser_id.to_string(),
            advertiser_name: entry.advertiser_name,
            remark: entry.advertiser_remark,
            cost: entry.stat_cost,
            cash_cost: entry.stat_cash_cost,
            impressions: entry.show_cnt,
            clicks: entry.click_cnt,
            ctr: entry.ctr,
            conversions: entry.convert_cnt,
            conversion_cost: entry.conversion_cost,
            conversion_rate: entry.conversion_rate,
        }
    }
}

#[derive(Deserialize, Default)]
struct AccountListData {
    #[serde(default)]
    pagination: Pagination,
    #[serde(default)]
    data_list: Vec<AccountEntry>,
    #[serde(default)]
    download_id: String,
}

#[derive(Deserialize)]
struct JobEntryPayload {
    task_id: String,
    scheduler_id: i64,
    scheduler_status: i64,
}

#[derive(Deserialize, Default)]
struct JobListData {
    #[serde(default)]
    list: Vec<JobEntryPayload>,
}

#[derive(Deserialize, Default)]
struct AttributionData {
    #[serde(default)]
    error_counts: HashMap<String, HashMap<String, i64>>,
}

/// HTTP implementation of [`PlatformApi`] against the ad platform's
/// business console, authenticated by session cookie + csrf token.
#[derive(Clone)]
pub struct PlatformHttpClient {
    client: Client,
    base_url: String,
}

impl PlatformHttpClient {
    pub fn new(base_url: impl Into<String>, credential: &Credential) -> Result<Self> {
        if !credential.is_complete() {
            return Err(ReportError::MissingCredential);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "Cookie",
            HeaderValue::from_str(&credential.cookie).map_err(|_| ReportError::MissingCredential)?,
        );
        headers.insert(
            "x-csrftoken",
            HeaderValue::from_str(&credential.csrf_token)
                .map_err(|_| ReportError::MissingCredential)?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Builds the client from the credential collaborator.
    pub async fn from_store<S: CredentialStore>(
        base_url: impl Into<String>,
        store: &S,
    ) -> Result<Self> {
        let credential = store.current_credential().await?;
        Self::new(base_url, &credential)
    }

    /// Posts a JSON body and unwraps the platform envelope. A non-2xx
    /// status, a non-zero envelope code and an undecodable payload are
    /// three distinct failures.
    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::Platform {
                code: i64::from(status.as_u16()),
                message: text,
            });
        }

        let text = response.text().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&text).map_err(|err| {
            ReportError::MalformedPayload(format!("{} (endpoint {})", err, path))
        })?;

        if envelope.code != 0 {
            return Err(ReportError::Platform {
                code: envelope.code,
                message: envelope.msg,
            });
        }

        envelope.data.ok_or_else(|| {
            ReportError::MalformedPayload(format!("envelope carried no data (endpoint {})", path))
        })
    }
}

impl PlatformApi for PlatformHttpClient {
    async fn fetch_report_page(&self, scope: &ReportScope, page: usize) -> Result<ReportPage> {
        let request = AccountListRequest::page(scope, page);
        let data: AccountListData = self.post_json(ACCOUNT_LIST_PATH, &request).await?;

        Ok(ReportPage {
            total: data.pagination.total,
            rows: data.data_list.into_iter().map(Into::into).collect(),
        })
    }

    async fn submit_export_job(&self, scope: &ReportScope) -> Result<String> {
        let request = AccountListRequest::export(scope);
        let data: AccountListData = self.post_json(ACCOUNT_LIST_PATH, &request).await?;
        Ok(data.download_id)
    }

    async fn list_export_jobs(&self, filter: &JobListFilter) -> Result<Vec<ExportJobEntry>> {
        let request = JobListRequest::from_filter(filter);
        let data: JobListData = self.post_json(JOB_LIST_PATH, &request).await?;

        Ok(data
            .list
            .into_iter()
            .map(|entry| ExportJobEntry {
                task_id: entry.task_id,
                scheduler_id: entry.scheduler_id,
                status: entry.scheduler_status,
            })
            .collect())
    }

    async fn download_artifact(&self, scheduler_id: i64) -> Result<Vec<u8>> {
        let request = DownloadRequest {
            operation: 1,
            scheduler_type: JOB_KIND_PROMOTION_EXPORT,
            scheduler_id: scheduler_id.to_string(),
        };

        let url = format!("{}{}", self.base_url, DOWNLOAD_PATH);
        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::Platform {
                code: i64::from(status.as_u16()),
                message: text,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct MarkdownMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

/// Webhook implementation of [`Notifier`] posting the markdown envelope
/// the alerting channel expects. A disabled or unconfigured channel is a
/// silent no-op.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
    enabled: bool,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, enabled: bool) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            enabled,
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn send_markdown(&self, title: &str, text: &str) -> Result<()> {
        if !self.enabled || self.webhook_url.is_empty() {
            info!("notifications disabled, skipping delivery");
            return Ok(());
        }

        let message = MarkdownMessage {
            msgtype: "markdown",
            markdown: MarkdownBody { title, text },
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|err| ReportError::Notification(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Notification(format!(
                "webhook returned status {}",
                status
            )));
        }
        Ok(())
    }
}

/// HTTP implementation of [`AttributionSource`] over the attribution
/// service's aggregate endpoint.
#[derive(Clone)]
pub struct HttpAttributionSource {
    client: Client,
    base_url: String,
}

impl HttpAttributionSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl AttributionSource for HttpAttributionSource {
    async fn deduction_counts(&self, date: NaiveDate) -> Result<HashMap<String, i64>> {
        let url = format!("{}/attribution/data", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::Platform {
                code: i64::from(status.as_u16()),
                message: text,
            });
        }

        let text = response.text().await?;
        let envelope: ApiEnvelope<AttributionData> = serde_json::from_str(&text)
            .map_err(|err| ReportError::MalformedPayload(err.to_string()))?;

        if envelope.code != 0 {
            return Err(ReportError::Platform {
                code: envelope.code,
                message: envelope.msg,
            });
        }

        let data = envelope.data.unwrap_or_default();
        let counts: HashMap<String, i64> = data
            .error_counts
            .into_iter()
            .filter_map(|(advertiser_id, metrics)| {
                metrics
                    .get(DEDUCTION_METRIC)
                    .map(|&count| (advertiser_id, count))
            })
            .collect();

        info!("{} advertisers carry attribution deductions", counts.len());
        Ok(counts)
    }
}
