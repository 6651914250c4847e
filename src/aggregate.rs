use crate::reconcile::parse_decimal;
use crate::schema::{ReconciledRecord, RunTotals};

/// Sums run-level totals across the valid records and derives the
/// averaged rates. Every divide-by-zero guard yields 0: a run with no
/// impressions, clicks, conversions or revenue reports zeros, never an
/// error or a NaN.
pub fn aggregate(records: &[ReconciledRecord]) -> RunTotals {
    let mut totals = RunTotals::default();

    for record in records {
        totals.cost += record.cost;
        totals.cash_cost += record.cash_cost;
        totals.rebate_cost += record.rebate_cost;
        totals.impressions += record.impressions;
        totals.clicks += record.clicks;
        totals.conversions += record.conversions;
        totals.conversion_cost += parse_decimal(&record.conversion_cost);
        totals.service_fee_cost += record.service_fee_cost;
        totals.revenue += record.revenue;
        totals.profit += record.profit;
    }

    if totals.impressions > 0 {
        totals.avg_ctr = totals.clicks as f64 / totals.impressions as f64 * 100.0;
    }
    if totals.conversions > 0 {
        totals.avg_conversion_cost = totals.conversion_cost / totals.conversions as f64;
    }
    if totals.clicks > 0 {
        totals.avg_conversion_rate = totals.conversions as f64 / totals.clicks as f64 * 100.0;
    }
    if totals.revenue > 0.0 {
        totals.profit_rate_pct = totals.profit / totals.revenue * 100.0;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cost: f64, impressions: i64, clicks: i64, conversions: i64) -> ReconciledRecord {
        ReconciledRecord {
            advertiser_id: "1".to_string(),
            advertiser_name: "acct".to_string(),
            subject: "Alpha".to_string(),
            port: "P1".to_string(),
            provider: "Transit".to_string(),
            task_name: "app".to_string(),
            cost,
            cash_cost: cost * 0.9,
            rebate_cost: cost / 1.04,
            impressions,
            clicks,
            ctr: String::new(),
            conversions,
            conversion_cost: "10.00".to_string(),
            conversion_rate: String::new(),
            service_fee_cost: cost * 0.02,
            revenue: conversions as f64 * 10.0,
            profit: conversions as f64 * 10.0 * 0.95 - cost * 0.02 - cost / 1.04,
            profit_rate: 0.0,
        }
    }

    #[test]
    fn test_totals_are_exact_sums_over_records() {
        let records = vec![
            record(100.0, 1000, 50, 4),
            record(200.0, 3000, 150, 10),
            record(50.0, 500, 25, 0),
        ];
        let totals = aggregate(&records);

        assert!((totals.cost - 350.0).abs() < 1e-9);
        assert!((totals.cash_cost - 315.0).abs() < 1e-9);
        assert_eq!(totals.impressions, 4500);
        assert_eq!(totals.clicks, 225);
        assert_eq!(totals.conversions, 14);
        assert!((totals.conversion_cost - 30.0).abs() < 1e-9);
        let expected_rebate: f64 = records.iter().map(|r| r.rebate_cost).sum();
        assert!((totals.rebate_cost - expected_rebate).abs() < 1e-9);
        let expected_profit: f64 = records.iter().map(|r| r.profit).sum();
        assert!((totals.profit - expected_profit).abs() < 1e-9);
    }

    #[test]
    fn test_derived_rates() {
        let totals = aggregate(&[record(100.0, 1000, 50, 4)]);
        assert!((totals.avg_ctr - 5.0).abs() < 1e-9);
        assert!((totals.avg_conversion_cost - 2.5).abs() < 1e-9);
        assert!((totals.avg_conversion_rate - 8.0).abs() < 1e-9);
        assert!((totals.profit_rate_pct - totals.profit / totals.revenue * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_divide_by_zero_guards_yield_zero() {
        let totals = aggregate(&[record(100.0, 0, 0, 0)]);
        assert_eq!(totals.avg_ctr, 0.0);
        assert_eq!(totals.avg_conversion_cost, 0.0);
        assert_eq!(totals.avg_conversion_rate, 0.0);
        assert_eq!(totals.profit_rate_pct, 0.0);
    }

    #[test]
    fn test_empty_input_is_all_zeros() {
        let totals = aggregate(&[]);
        assert_eq!(totals, RunTotals::default());
    }
}
