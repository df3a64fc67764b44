//! Checkout funnel over a fixed step sequence.
//!
//! When no recorded event in the window matches a funnel step a placeholder
//! curve is emitted instead, and every step is marked `is_synthetic` so widgets can
//! label it as sample data.

use serde::{Deserialize, Serialize};
use storefront_core::types::FunnelEvent;

use super::percentage;

pub const FUNNEL_STEPS: [&str; 7] = [
    "homepage", "product", "cart", "shipping", "payment", "review", "complete",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
    pub step: String,
    pub users: u64,
    /// Previous step's users minus this step's. Negative when a later step
    /// saw more traffic than the one before it.
    pub drop_off: i64,
    /// Whole-number percentage of the previous step that reached this one.
    pub conversion_rate: f64,
    pub is_synthetic: bool,
}

pub fn funnel_steps(events: &[FunnelEvent]) -> Vec<FunnelStep> {
    let mut counts = [0u64; FUNNEL_STEPS.len()];
    for event in events {
        let step = event.step.trim().to_ascii_lowercase();
        if let Some(index) = FUNNEL_STEPS.iter().position(|s| *s == step) {
            counts[index] += 1;
        }
    }

    // Rows with unrecognised step labels count as no data.
    let synthetic = counts.iter().all(|&c| c == 0);
    let users: Vec<u64> = if synthetic {
        (0..FUNNEL_STEPS.len() as u64)
            .map(|index| 100u64.saturating_sub(15 * index))
            .collect()
    } else {
        counts.to_vec()
    };

    users
        .iter()
        .enumerate()
        .map(|(index, &count)| {
            let (drop_off, conversion_rate) = match index.checked_sub(1).map(|p| users[p]) {
                Some(previous) => (
                    previous as i64 - count as i64,
                    percentage(count as f64, previous as f64).round(),
                ),
                None if count > 0 => (0, 100.0),
                None => (0, 0.0),
            };
            FunnelStep {
                step: FUNNEL_STEPS[index].to_string(),
                users: count,
                drop_off,
                conversion_rate,
                is_synthetic: synthetic,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::fixtures::ts;

    fn event(step: &str) -> FunnelEvent {
        FunnelEvent {
            id: format!("f-{step}"),
            session_id: "s-1".into(),
            step: step.into(),
            created_at: ts(),
        }
    }

    #[test]
    fn test_empty_table_yields_flagged_placeholder() {
        let steps = funnel_steps(&[]);
        let users: Vec<u64> = steps.iter().map(|s| s.users).collect();
        assert_eq!(users, vec![100, 85, 70, 55, 40, 25, 10]);
        assert!(steps.iter().all(|s| s.is_synthetic));
        assert_eq!(steps[1].drop_off, 15);
        assert_eq!(steps[1].conversion_rate, 85.0);
        // 10 / 25 = 40%
        assert_eq!(steps[6].conversion_rate, 40.0);
    }

    #[test]
    fn test_unrecognised_steps_yield_placeholder() {
        let events = vec![event("checkout_started"), event("landing")];
        let steps = funnel_steps(&events);
        let users: Vec<u64> = steps.iter().map(|s| s.users).collect();
        assert_eq!(users, vec![100, 85, 70, 55, 40, 25, 10]);
        assert!(steps.iter().all(|s| s.is_synthetic));
    }

    #[test]
    fn test_real_events() {
        let mut events = Vec::new();
        for _ in 0..4 {
            events.push(event("homepage"));
        }
        for _ in 0..3 {
            events.push(event("Product"));
        }
        events.push(event("cart"));
        events.push(event("unknown-step"));

        let steps = funnel_steps(&events);
        assert_eq!(steps.len(), 7);
        assert!(steps.iter().all(|s| !s.is_synthetic));

        assert_eq!(steps[0].users, 4);
        assert_eq!(steps[0].conversion_rate, 100.0);
        assert_eq!(steps[1].users, 3);
        assert_eq!(steps[1].drop_off, 1);
        assert_eq!(steps[1].conversion_rate, 75.0);
        assert_eq!(steps[2].users, 1);
        assert_eq!(steps[2].conversion_rate, 33.0);
        assert_eq!(steps[3].users, 0);
        assert_eq!(steps[4].conversion_rate, 0.0);
    }

    #[test]
    fn test_later_step_larger_than_previous() {
        let events = vec![event("homepage"), event("product"), event("product")];
        let steps = funnel_steps(&events);
        assert_eq!(steps[1].drop_off, -1);
        assert_eq!(steps[1].conversion_rate, 100.0);
    }
}
