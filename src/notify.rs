use crate::api::Notifier;
use crate::schema::RunSummary;
use chrono::Local;
use log::{error, info};

/// Renders the fixed markdown summary the alert channel expects: run
/// totals, the skip count and the artifact link.
pub fn format_summary(title: &str, summary: &RunSummary) -> String {
    let totals = &summary.totals;
    let link = summary
        .artifact
        .as_ref()
        .map(|artifact| format!("Full account detail: [download]({})", artifact.download_url))
        .unwrap_or_else(|| "No artifact was produced for this run.".to_string());

    format!(
        "#### {}  \n---\n\
         **Time**: {}  \n\
         **Accounts**: {}  \n\
         **Total Cost**: {:.2}  \n\
         **Cash Cost**: {:.2}  \n\
         **Rebate Cost**: {:.2}  \n\
         **Impressions**: {}  \n\
         **Clicks**: {}  \n\
         **CTR**: {:.2}%  \n\
         **Conversions**: {}  \n\
         **Conversion Cost**: {:.2}  \n\
         **Conversion Rate**: {:.2}%  \n\
         **Service Fee Cost**: {:.2}  \n\
         **Revenue**: {:.2}  \n\
         **Profit**: {:.2}  \n\
         **Profit Rate**: {:.2}%  \n\
         **Accounts skipped for nonstandard remarks**: {}  \n\n\
         {}",
        title,
        Local::now().format("%Y-%m-%d %H:00"),
        summary.total_accounts,
        totals.cost,
        totals.cash_cost,
        totals.rebate_cost,
        totals.impressions,
        totals.clicks,
        totals.avg_ctr,
        totals.conversions,
        totals.avg_conversion_cost,
        totals.avg_conversion_rate,
        totals.service_fee_cost,
        totals.revenue,
        totals.profit,
        totals.profit_rate_pct,
        summary.skipped_accounts,
        link,
    )
}

/// Formats and delivers the summary. Delivery failure is logged and
/// swallowed; the run already succeeded by the time this fires.
pub async fn deliver<N: Notifier>(notifier: &N, title: &str, summary: &RunSummary) {
    let text = format_summary(title, summary);
    match notifier.send_markdown(title, &text).await {
        Ok(()) => info!("run summary notification delivered"),
        Err(err) => error!("notification delivery failed: {}", err),
    }
}
