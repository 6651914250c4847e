use crate::schema::{RebateEntry, ServiceFeeEntry, TaskTypeEntry};
use std::collections::HashMap;

/// Immutable lookup maps loaded once per run. All three maps are private:
/// rows share the snapshot read-only and nothing can mutate an entry after
/// construction.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    rebates: HashMap<String, f64>,
    service_fees: HashMap<String, f64>,
    settlement_prices: HashMap<String, f64>,
}

impl ConfigSnapshot {
    /// Builds the snapshot from typed configuration entries. Task types
    /// that are not enabled never enter the settlement map.
    pub fn from_entries(
        rebates: impl IntoIterator<Item = RebateEntry>,
        service_fees: impl IntoIterator<Item = ServiceFeeEntry>,
        task_types: impl IntoIterator<Item = TaskTypeEntry>,
    ) -> Self {
        let rebates = rebates
            .into_iter()
            .map(|r| (rebate_key(&r.subject, &r.port), r.rebate_rate))
            .collect();
        let service_fees = service_fees
            .into_iter()
            .map(|f| (f.provider, f.fee_rate))
            .collect();
        let settlement_prices = task_types
            .into_iter()
            .filter(|t| t.enabled)
            .map(|t| (t.name, t.settlement_price))
            .collect();
        Self {
            rebates,
            service_fees,
            settlement_prices,
        }
    }

    pub fn rebate_rate(&self, subject: &str, port: &str) -> Option<f64> {
        self.rebates.get(&rebate_key(subject, port)).copied()
    }

    pub fn service_fee_rate(&self, provider: &str) -> Option<f64> {
        self.service_fees.get(provider).copied()
    }

    pub fn settlement_price(&self, task_name: &str) -> Option<f64> {
        self.settlement_prices.get(task_name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rebates.is_empty() && self.service_fees.is_empty() && self.settlement_prices.is_empty()
    }
}

fn rebate_key(subject: &str, port: &str) -> String {
    format!("{}-{}", subject, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> ConfigSnapshot {
        ConfigSnapshot::from_entries(
            vec![RebateEntry {
                subject: "NorthStar".to_string(),
                port: "PortA".to_string(),
                rebate_rate: 0.04,
            }],
            vec![ServiceFeeEntry {
                provider: "Transit".to_string(),
                fee_rate: 0.02,
            }],
            vec![
                TaskTypeEntry {
                    name: "app".to_string(),
                    settlement_price: 15.0,
                    enabled: true,
                },
                TaskTypeEntry {
                    name: "first_purchase".to_string(),
                    settlement_price: 30.0,
                    enabled: false,
                },
            ],
        )
    }

    #[test]
    fn test_lookup_hits_and_misses() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.rebate_rate("NorthStar", "PortA"), Some(0.04));
        assert_eq!(snapshot.rebate_rate("NorthStar", "PortB"), None);
        assert_eq!(snapshot.service_fee_rate("Transit"), Some(0.02));
        assert_eq!(snapshot.service_fee_rate("Unknown"), None);
        assert_eq!(snapshot.settlement_price("app"), Some(15.0));
    }

    #[test]
    fn test_disabled_task_types_are_excluded() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.settlement_price("first_purchase"), None);
    }

    #[test]
    fn test_rebate_key_joins_subject_and_port() {
        // "A-B" + "C" and "A" + "B-C" must not collide on lookup intent:
        // the key format is the platform's remark convention, subject first.
        let snapshot = ConfigSnapshot::from_entries(
            vec![RebateEntry {
                subject: "A".to_string(),
                port: "B".to_string(),
                rebate_rate: 0.1,
            }],
            vec![],
            vec![],
        );
        assert_eq!(snapshot.rebate_rate("A", "B"), Some(0.1));
        assert_eq!(snapshot.rebate_rate("B", "A"), None);
    }
}
