//! Edge-triggered subscriber milestone detection.
//!
//! A milestone fires only when a poll observes `previous < threshold <= current`.
//! Named thresholds come from [`NAMED_MILESTONES`]; beyond
//! [`STEP_MILESTONE_FLOOR`] every multiple of [`STEP_MILESTONE_INTERVAL`] is a
//! milestone too, celebrated at [`STEP_MILESTONE_AMOUNT`].

use serde::{Deserialize, Serialize};

/// Subscriber threshold -> celebration amount (dollar-equivalent).
pub const NAMED_MILESTONES: &[(u64, f64)] = &[
    (100, 5.0),
    (500, 10.0),
    (1_000, 15.0),
    (5_000, 25.0),
    (10_000, 50.0),
    (50_000, 75.0),
    (100_000, 100.0),
    (500_000, 200.0),
    (1_000_000, 500.0),
];

pub const STEP_MILESTONE_FLOOR: u64 = 10_000;
pub const STEP_MILESTONE_INTERVAL: u64 = 1_000;
pub const STEP_MILESTONE_AMOUNT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub threshold: u64,
    pub celebration_amount: f64,
    /// False for the unnamed every-1000 milestones past the floor.
    pub named: bool,
}

/// Celebration amount for a threshold, if it is a milestone at all.
pub fn amount_for_threshold(threshold: u64) -> Option<f64> {
    if let Some((_, amount)) = NAMED_MILESTONES.iter().find(|(t, _)| *t == threshold) {
        return Some(*amount);
    }
    if threshold > STEP_MILESTONE_FLOOR && threshold % STEP_MILESTONE_INTERVAL == 0 {
        return Some(STEP_MILESTONE_AMOUNT);
    }
    None
}

/// Detect the highest milestone crossed between two polls.
///
/// Returns `None` when nothing was crossed, including when the count went down
/// or stayed level.
pub fn detect(previous: u64, current: u64) -> Option<Milestone> {
    if current <= previous {
        return None;
    }

    let named = NAMED_MILESTONES
        .iter()
        .rev()
        .find(|(t, _)| previous < *t && *t <= current)
        .map(|(t, amount)| Milestone {
            threshold: *t,
            celebration_amount: *amount,
            named: true,
        });

    // Highest multiple of the interval inside (previous, current].
    let top_step = current - current % STEP_MILESTONE_INTERVAL;
    let step = (top_step > previous && top_step > STEP_MILESTONE_FLOOR).then_some(Milestone {
        threshold: top_step,
        celebration_amount: STEP_MILESTONE_AMOUNT,
        named: false,
    });

    match (named, step) {
        (Some(n), Some(s)) if s.threshold > n.threshold => Some(s),
        (Some(n), _) => Some(n),
        (None, s) => s,
    }
}
