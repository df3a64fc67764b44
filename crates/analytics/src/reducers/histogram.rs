//! Frequency histograms: abandonment reasons, cart sizes, fit feedback.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storefront_core::types::{AbandonmentReason, CartItem, FitFeedback};

use super::{percentage, round1};

/// Fit labels always reported, even with zero responses.
pub const FIT_LABELS: [&str; 3] = ["too_small", "true_to_size", "too_large"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

pub fn abandonment_reasons(reasons: &[AbandonmentReason]) -> Vec<Bucket> {
    histogram(reasons.iter().map(|r| r.reason.trim().to_string()), &[])
}

pub fn size_distribution(cart_items: &[CartItem]) -> Vec<Bucket> {
    histogram(
        cart_items
            .iter()
            .filter_map(|item| item.size.as_deref())
            .map(|size| size.trim().to_ascii_uppercase()),
        &[],
    )
}

pub fn fit_feedback_distribution(feedback: &[FitFeedback]) -> Vec<Bucket> {
    histogram(
        feedback.iter().map(|f| {
            f.fit
                .trim()
                .to_ascii_lowercase()
                .replace(['-', ' '], "_")
        }),
        &FIT_LABELS,
    )
}

/// Fixed labels first in their given order, then discovered labels by
/// count descending and label ascending. Empty labels are ignored.
fn histogram(labels: impl Iterator<Item = String>, fixed: &[&str]) -> Vec<Bucket> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for label in labels.filter(|l| !l.is_empty()) {
        *counts.entry(label).or_insert(0) += 1;
    }
    let total = counts.values().sum::<u64>().max(1) as f64;

    let bucket = |label: String, count: u64| Bucket {
        label,
        count,
        percentage: round1(percentage(count as f64, total)),
    };

    let mut buckets: Vec<Bucket> = fixed
        .iter()
        .map(|label| {
            let count = counts.remove(*label).unwrap_or(0);
            bucket(label.to_string(), count)
        })
        .collect();

    let mut discovered: Vec<(String, u64)> = counts.into_iter().collect();
    discovered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    buckets.extend(discovered.into_iter().map(|(label, count)| bucket(label, count)));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::fixtures::{cart_item, ts};

    fn reason(reason: &str) -> AbandonmentReason {
        AbandonmentReason {
            id: "r".into(),
            session_id: None,
            reason: reason.into(),
            created_at: ts(),
        }
    }

    fn fit(fit: &str) -> FitFeedback {
        FitFeedback {
            id: "f".into(),
            product_id: "p-1".into(),
            size: Some("M".into()),
            fit: fit.into(),
            created_at: ts(),
        }
    }

    #[test]
    fn test_abandonment_reasons() {
        let reasons = vec![
            reason("shipping_cost"),
            reason("shipping_cost"),
            reason("price"),
            reason("  "),
        ];
        let buckets = abandonment_reasons(&reasons);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "shipping_cost");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].percentage, 66.7);
        assert_eq!(buckets[1].percentage, 33.3);
    }

    #[test]
    fn test_size_distribution_normalizes_case() {
        let items = vec![
            cart_item("c-1", "s-1", "p-1", Some("m")),
            cart_item("c-2", "s-2", "p-1", Some("M")),
            cart_item("c-3", "s-3", "p-1", Some("L")),
            cart_item("c-4", "s-4", "p-1", None),
        ];
        let buckets = size_distribution(&items);
        assert_eq!(buckets[0].label, "M");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].label, "L");
        assert_eq!(buckets[1].percentage, 33.3);
    }

    #[test]
    fn test_fit_feedback_keeps_fixed_labels() {
        let feedback = vec![fit("Too Small"), fit("too-small"), fit("runs_long")];
        let buckets = fit_feedback_distribution(&feedback);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["too_small", "true_to_size", "too_large", "runs_long"]);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 0);
        assert_eq!(buckets[1].percentage, 0.0);
    }

    #[test]
    fn test_empty_histograms() {
        assert!(abandonment_reasons(&[]).is_empty());
        let fits = fit_feedback_distribution(&[]);
        assert_eq!(fits.len(), 3);
        assert!(fits.iter().all(|b| b.percentage == 0.0));
    }
}
