use crate::error::Result;
use crate::schema::{ArtifactConfig, ArtifactLocator, ReconciledRecord, RunTotals};
use chrono::Local;
use log::{info, warn};

/// Fixed column order of the rendered report.
const HEADERS: [&str; 18] = [
    "Account ID",
    "Account Name",
    "Subject",
    "Task",
    "Provider",
    "Cost",
    "Cash Cost",
    "Rebate Cost",
    "Impressions",
    "Clicks",
    "CTR",
    "Conversions",
    "Conversion Cost",
    "Conversion Rate",
    "Service Fee Cost",
    "Revenue",
    "Profit",
    "Profit Rate",
];

/// Renders the reconciled records into a downloadable spreadsheet: one
/// header row, one row per valid record, exactly one totals row. With no
/// valid records nothing is written and the caller gets `None`.
pub fn write_report(
    records: &[ReconciledRecord],
    totals: &RunTotals,
    config: &ArtifactConfig,
) -> Result<Option<ArtifactLocator>> {
    if records.is_empty() {
        warn!("no valid records, skipping artifact generation");
        return Ok(None);
    }

    std::fs::create_dir_all(&config.directory)?;

    let filename = format!(
        "{}_{}.csv",
        config.file_prefix,
        Local::now().format("%Y%m%d%H%M%S")
    );
    let path = config.directory.join(&filename);

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(HEADERS)?;

    for record in records {
        writer.write_record(&[
            record.advertiser_id.clone(),
            record.advertiser_name.clone(),
            record.subject.clone(),
            record.task_name.clone(),
            record.provider.clone(),
            format!("{:.2}", record.cost),
            format!("{:.2}", record.cash_cost),
            format!("{:.2}", record.rebate_cost),
            record.impressions.to_string(),
            record.clicks.to_string(),
            record.ctr.clone(),
            record.conversions.to_string(),
            record.conversion_cost.clone(),
            record.conversion_rate.clone(),
            format!("{:.2}", record.service_fee_cost),
            format!("{:.2}", record.revenue),
            format!("{:.2}", record.profit),
            format!("{:.2}%", record.profit_rate * 100.0),
        ])?;
    }

    writer.write_record(&[
        String::new(),
        "Total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        format!("{:.2}", totals.cost),
        format!("{:.2}", totals.cash_cost),
        format!("{:.2}", totals.rebate_cost),
        totals.impressions.to_string(),
        totals.clicks.to_string(),
        format!("{:.2}%", totals.avg_ctr),
        totals.conversions.to_string(),
        format!("{:.2}", totals.avg_conversion_cost),
        format!("{:.2}%", totals.avg_conversion_rate),
        format!("{:.2}", totals.service_fee_cost),
        format!("{:.2}", totals.revenue),
        format!("{:.2}", totals.profit),
        format!("{:.2}%", totals.profit_rate_pct),
    ])?;

    writer.flush()?;

    let download_url = format!(
        "{}/download/{}",
        config.base_url.trim_end_matches('/'),
        filename
    );
    info!("report artifact written to {}", path.display());

    Ok(Some(ArtifactLocator { path, download_url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;

    fn sample_record(id: &str) -> ReconciledRecord {
        ReconciledRecord {
            advertiser_id: id.to_string(),
            advertiser_name: format!("Account {}", id),
            subject: "Alpha".to_string(),
            port: "P1".to_string(),
            provider: "Transit".to_string(),
            task_name: "app".to_string(),
            cost: 100.0,
            cash_cost: 90.0,
            rebate_cost: 96.153846,
            impressions: 1000,
            clicks: 50,
            ctr: "5.00%".to_string(),
            conversions: 4,
            conversion_cost: "25.00".to_string(),
            conversion_rate: "8.00%".to_string(),
            service_fee_cost: 2.0,
            revenue: 40.0,
            profit: -60.15,
            profit_rate: -1.5,
        }
    }

    fn config(tag: &str) -> ArtifactConfig {
        ArtifactConfig {
            directory: std::env::temp_dir().join(format!("mrr_artifact_{}_{}", tag, std::process::id())),
            base_url: "https://reports.example.com/".to_string(),
            file_prefix: "media_report".to_string(),
        }
    }

    #[test]
    fn test_row_count_is_records_plus_header_and_totals() {
        let records = vec![sample_record("1"), sample_record("2"), sample_record("3")];
        let totals = aggregate(&records);
        let config = config("count");

        let locator = write_report(&records, &totals, &config).unwrap().unwrap();

        let contents = std::fs::read_to_string(&locator.path).unwrap();
        assert_eq!(contents.lines().count(), records.len() + 2);
        std::fs::remove_dir_all(&config.directory).unwrap();
    }

    #[test]
    fn test_totals_row_and_locator_shape() {
        let records = vec![sample_record("1")];
        let totals = aggregate(&records);
        let config = config("shape");

        let locator = write_report(&records, &totals, &config).unwrap().unwrap();

        let contents = std::fs::read_to_string(&locator.path).unwrap();
        let last = contents.lines().last().unwrap();
        assert!(last.starts_with(",Total,"), "totals row was: {}", last);

        let filename = locator.path.file_name().unwrap().to_str().unwrap();
        assert!(filename.starts_with("media_report_"));
        assert!(filename.ends_with(".csv"));
        assert_eq!(
            locator.download_url,
            format!("https://reports.example.com/download/{}", filename)
        );
        std::fs::remove_dir_all(&config.directory).unwrap();
    }

    #[test]
    fn test_zero_valid_records_produce_no_artifact() {
        let config = config("empty");
        let locator = write_report(&[], &RunTotals::default(), &config).unwrap();
        assert!(locator.is_none());
        assert!(!config.directory.exists());
    }

    #[test]
    fn test_header_order_is_fixed() {
        let records = vec![sample_record("1")];
        let totals = aggregate(&records);
        let config = config("headers");

        let locator = write_report(&records, &totals, &config).unwrap().unwrap();
        let contents = std::fs::read_to_string(&locator.path).unwrap();
        let header = contents.lines().next().unwrap();
        assert_eq!(header, HEADERS.join(","));
        std::fs::remove_dir_all(&config.directory).unwrap();
    }
}
