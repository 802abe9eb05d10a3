use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StimulusKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    /// `magnitude` is the payment amount in major currency units.
    Payment,
    /// `magnitude` is the subscriber threshold that was crossed.
    SubscriberMilestone,
    /// `magnitude` is informational (minutes until the event starts).
    CalendarEvent,
}

impl StimulusKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StimulusKind::Payment => "payment",
            StimulusKind::SubscriberMilestone => "subscriber_milestone",
            StimulusKind::CalendarEvent => "calendar_event",
        }
    }
}

impl fmt::Display for StimulusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stimulus
// ---------------------------------------------------------------------------

/// An external occurrence that should cause a celebration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub kind: StimulusKind,
    pub magnitude: f64,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
}

impl Stimulus {
    pub fn new(kind: StimulusKind, magnitude: f64, source: impl Into<String>) -> Self {
        Self {
            kind,
            magnitude,
            source: source.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn payment(amount: f64, source: impl Into<String>) -> Self {
        Self::new(StimulusKind::Payment, amount, source)
    }

    pub fn subscriber_milestone(threshold: u64, source: impl Into<String>) -> Self {
        Self::new(StimulusKind::SubscriberMilestone, threshold as f64, source)
    }

    pub fn calendar_event(minutes_until_start: f64, source: impl Into<String>) -> Self {
        Self::new(StimulusKind::CalendarEvent, minutes_until_start, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&StimulusKind::SubscriberMilestone).unwrap();
        assert_eq!(json, "\"subscriber_milestone\"");
        let kind: StimulusKind = serde_json::from_str("\"calendar_event\"").unwrap();
        assert_eq!(kind, StimulusKind::CalendarEvent);
    }

    #[test]
    fn milestone_constructor_stores_threshold_as_magnitude() {
        let s = Stimulus::subscriber_milestone(5000, "youtube");
        assert_eq!(s.kind, StimulusKind::SubscriberMilestone);
        assert_eq!(s.magnitude, 5000.0);
        assert_eq!(s.source, "youtube");
    }
}
