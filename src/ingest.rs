use crate::error::Result;
use crate::schema::RawPerformanceRow;
use log::info;
use std::collections::HashMap;
use std::path::Path;

/// Header names the platform writes into its export artifact. Column
/// order is not guaranteed, so lookup is by name.
pub const COL_ACCOUNT_ID: &str = "Account ID";
pub const COL_ACCOUNT_NAME: &str = "Account Name";
pub const COL_ACCOUNT_REMARK: &str = "Account Remark";
pub const COL_COST: &str = "Cost";
pub const COL_CASH_COST: &str = "Cash Cost";
pub const COL_IMPRESSIONS: &str = "Impressions";
pub const COL_CLICKS: &str = "Clicks";
pub const COL_CTR: &str = "CTR(%)";
pub const COL_CONVERSIONS: &str = "Conversions";
pub const COL_CONVERSION_COST: &str = "Conversion Cost";
pub const COL_CONVERSION_RATE: &str = "Conversion Rate(%)";

/// Parses a downloaded (or API-returned) tabular artifact into raw rows.
/// Row 1 is the header; every other row becomes a [`RawPerformanceRow`]
/// unless all of its cells are blank. No numeric coercion happens here;
/// the reconciliation engine owns parsing.
pub fn read_rows(path: &Path) -> Result<Vec<RawPerformanceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)?;

    let mut records = reader.records();
    let header = match records.next() {
        Some(header) => header?,
        None => return Ok(Vec::new()),
    };

    let columns: HashMap<String, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_string(), idx))
        .collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        rows.push(RawPerformanceRow {
            advertiser_id: cell(&record, &columns, COL_ACCOUNT_ID),
            advertiser_name: cell(&record, &columns, COL_ACCOUNT_NAME),
            remark: cell(&record, &columns, COL_ACCOUNT_REMARK),
            cost: cell(&record, &columns, COL_COST),
            cash_cost: cell(&record, &columns, COL_CASH_COST),
            impressions: cell(&record, &columns, COL_IMPRESSIONS),
            clicks: cell(&record, &columns, COL_CLICKS),
            ctr: cell(&record, &columns, COL_CTR),
            conversions: cell(&record, &columns, COL_CONVERSIONS),
            conversion_cost: cell(&record, &columns, COL_CONVERSION_COST),
            conversion_rate: cell(&record, &columns, COL_CONVERSION_RATE),
        });
    }

    info!("ingested {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Missing columns and short records both read as empty. Absent data is
/// a reconciliation concern, not a parse failure.
fn cell(record: &csv::StringRecord, columns: &HashMap<String, usize>, name: &str) -> String {
    columns
        .get(name)
        .and_then(|&idx| record.get(idx))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_fixture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mrr_ingest_{}_{}.csv", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_headers_are_matched_by_name_not_position() {
        // Remark before id, metrics shuffled.
        let path = write_fixture(
            "shuffled",
            "Account Remark,Account ID,Conversions,Account Name,Cost\n\
             Alpha-P1-Transit-app,1001,3,First Account,\"1,234.56\"\n",
        );
        let rows = read_rows(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].advertiser_id, "1001");
        assert_eq!(rows[0].advertiser_name, "First Account");
        assert_eq!(rows[0].remark, "Alpha-P1-Transit-app");
        assert_eq!(rows[0].cost, "1,234.56");
        assert_eq!(rows[0].conversions, "3");
        // Columns missing from the artifact read as empty.
        assert_eq!(rows[0].cash_cost, "");
    }

    #[test]
    fn test_blank_rows_are_skipped_silently() {
        let path = write_fixture(
            "blanks",
            "Account ID,Account Name,Account Remark\n\
             1001,First,Alpha-P1-Transit-app\n\
             ,,\n\
             1002,Second,Beta-P2-Transit-app\n",
        );
        let rows = read_rows(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].advertiser_id, "1001");
        assert_eq!(rows[1].advertiser_id, "1002");
    }

    #[test]
    fn test_no_numeric_coercion_happens_here() {
        let path = write_fixture(
            "raw",
            "Account ID,Account Name,Account Remark,Cost,CTR(%),Conversion Rate(%)\n\
             1001,First,Alpha-P1-Transit-app,not-a-number,12.34%,0.56%\n",
        );
        let rows = read_rows(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rows[0].cost, "not-a-number");
        assert_eq!(rows[0].ctr, "12.34%");
        assert_eq!(rows[0].conversion_rate, "0.56%");
    }

    #[test]
    fn test_header_only_artifact_yields_no_rows() {
        let path = write_fixture("empty", "Account ID,Account Name,Account Remark\n");
        let rows = read_rows(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(rows.is_empty());
    }
}
