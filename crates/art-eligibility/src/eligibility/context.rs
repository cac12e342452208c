use std::ops::Bound;

use chrono::{Duration, Months, NaiveDateTime};
use serde::Serialize;

/// Immutable evaluation "now" shared by every subject in a cohort pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationContext {
    now: NaiveDateTime,
    horizon_months: Option<u32>,
    reference_time: NaiveDateTime,
}

impl EvaluationContext {
    /// With a horizon the reference time moves forward by that many months.
    pub fn new(now: NaiveDateTime, horizon_months: Option<u32>) -> Self {
        let reference_time = match horizon_months {
            Some(months) => add_months(now, months),
            None => now,
        };

        Self {
            now,
            horizon_months,
            reference_time,
        }
    }

    /// Unshifted evaluation time; program membership is checked here.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn horizon_months(&self) -> Option<u32> {
        self.horizon_months
    }

    /// Horizon used for observation windows; a missing horizon collapses the window to a day.
    pub fn window_months(&self) -> u32 {
        self.horizon_months.unwrap_or(0)
    }

    /// Instant ages and observation history are read as of.
    pub fn reference_time(&self) -> NaiveDateTime {
        self.reference_time
    }
}

/// Exclusive end of the observation window: enrollment + horizon months + 1 day.
pub fn window_end(enrolled_on: NaiveDateTime, horizon_months: u32) -> NaiveDateTime {
    add_months(enrolled_on, horizon_months)
        .checked_add_signed(Duration::days(1))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Time window an observation must fall in to qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationWindow {
    pub lower: Bound<NaiveDateTime>,
    pub upper: NaiveDateTime,
}

impl ObservationWindow {
    /// `(enrollment - 1 day, window_end)`.
    pub fn cd4(enrolled_on: NaiveDateTime, horizon_months: u32) -> Self {
        Self {
            lower: Bound::Excluded(
                enrolled_on
                    .checked_sub_signed(Duration::days(1))
                    .unwrap_or(NaiveDateTime::MIN),
            ),
            upper: window_end(enrolled_on, horizon_months),
        }
    }

    /// `[enrollment, window_end)`.
    pub fn who_stage(enrolled_on: NaiveDateTime, horizon_months: u32) -> Self {
        Self {
            lower: Bound::Included(enrolled_on),
            upper: window_end(enrolled_on, horizon_months),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let above_lower = match self.lower {
            Bound::Included(lower) => at >= lower,
            Bound::Excluded(lower) => at > lower,
            Bound::Unbounded => true,
        };
        above_lower && at < self.upper
    }
}

fn add_months(at: NaiveDateTime, months: u32) -> NaiveDateTime {
    at.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDateTime::MAX)
}
