use crate::config::ConfigSnapshot;
use crate::schema::{RawPerformanceRow, ReconciledRecord, SkipReason};
use log::info;
use std::collections::HashMap;

/// Fraction of estimated revenue retained after the platform's cut.
pub const PLATFORM_SHARE: f64 = 0.95;

/// Result of reconciling one run's rows: valid records plus one entry
/// per skipped row. Skips never abort a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub records: Vec<ReconciledRecord>,
    pub skips: Vec<SkipReason>,
}

impl ReconcileOutcome {
    pub fn skipped_count(&self) -> usize {
        self.skips.len()
    }
}

/// Joins raw rows against the configuration snapshot and computes the
/// per-row financial metrics. Shares the snapshot read-only; nothing
/// here mutates configuration.
pub struct ReconciliationEngine<'a> {
    snapshot: &'a ConfigSnapshot,
    deductions: &'a HashMap<String, i64>,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(snapshot: &'a ConfigSnapshot, deductions: &'a HashMap<String, i64>) -> Self {
        Self {
            snapshot,
            deductions,
        }
    }

    pub fn reconcile(&self, rows: &[RawPerformanceRow]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        for row in rows {
            match self.reconcile_row(row) {
                Ok(record) => outcome.records.push(record),
                Err(reason) => outcome.skips.push(reason),
            }
        }
        info!(
            "reconciled {} rows: {} valid, {} skipped",
            rows.len(),
            outcome.records.len(),
            outcome.skips.len()
        );
        outcome
    }

    /// Classifies a single row. The remark encodes
    /// `subject-port-provider-task`; segments beyond the fourth are
    /// ignored. All three configuration lookups must succeed for the row
    /// to count.
    pub fn reconcile_row(
        &self,
        row: &RawPerformanceRow,
    ) -> std::result::Result<ReconciledRecord, SkipReason> {
        let remark = row.remark.trim();
        let parts: Vec<&str> = remark.split('-').collect();
        if parts.len() < 4 {
            return Err(SkipReason::MalformedRemark);
        }

        let subject = parts[0].trim();
        let port = parts[1].trim();
        let provider = parts[2].trim();
        let task_name = parts[3].trim();

        let cost = parse_decimal(&row.cost);
        let cash_cost = parse_decimal(&row.cash_cost);
        let impressions = parse_count(&row.impressions);
        let clicks = parse_count(&row.clicks);
        let conversions = parse_count(&row.conversions);

        let rebate_rate = self
            .snapshot
            .rebate_rate(subject, port)
            .ok_or(SkipReason::NoRebateConfig)?;
        let service_fee_rate = self
            .snapshot
            .service_fee_rate(provider)
            .ok_or(SkipReason::NoFeeConfig)?;
        let settlement_price = self
            .snapshot
            .settlement_price(task_name)
            .ok_or(SkipReason::NoTaskConfig)?;

        // Rebate-adjusted cost basis: a 4-point rebate means cost / 1.04.
        let rebate_cost = if rebate_rate > 0.0 {
            cost / (1.0 + rebate_rate)
        } else {
            cost
        };

        let service_fee_cost = if service_fee_rate > 0.0 {
            cost * service_fee_rate
        } else {
            cost
        };

        let deduction = self.deductions.get(&row.advertiser_id).copied().unwrap_or(0);

        let revenue = (conversions + deduction) as f64 * settlement_price;
        let profit = revenue * PLATFORM_SHARE - service_fee_cost - rebate_cost;
        let profit_rate = if revenue > 0.0 { profit / revenue } else { 0.0 };

        Ok(ReconciledRecord {
            advertiser_id: row.advertiser_id.clone(),
            advertiser_name: row.advertiser_name.clone(),
            subject: subject.to_string(),
            port: port.to_string(),
            provider: provider.to_string(),
            task_name: task_name.to_string(),
            cost,
            cash_cost,
            rebate_cost,
            impressions,
            clicks,
            ctr: row.ctr.clone(),
            conversions,
            conversion_cost: row.conversion_cost.clone(),
            conversion_rate: row.conversion_rate.clone(),
            service_fee_cost,
            revenue,
            profit,
            profit_rate,
        })
    }
}

/// Parses a locale-formatted decimal: thousands separators and a
/// trailing `%` are stripped; anything unparsable is 0, never an error.
pub fn parse_decimal(value: &str) -> f64 {
    let cleaned = value.replace(',', "");
    let cleaned = cleaned.trim().trim_end_matches('%');
    cleaned.parse().unwrap_or(0.0)
}

/// Parses a locale-formatted integer count; unparsable values are 0.
pub fn parse_count(value: &str) -> i64 {
    let cleaned = value.replace(',', "");
    cleaned.trim().parse().unwrap_or(0)
}
