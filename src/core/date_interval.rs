use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Closed time interval in milliseconds since the Unix epoch.
///
/// An ongoing interval has no fixed upper bound: its upper bound is "now",
/// supplied by the caller on every query. Stages resolve ongoing intervals
/// once, against the instant they were created, and keep the resolved copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct DateInterval {
    min: i64,
    max: i64,
    ongoing: bool,
}

/// Wire form, validated through the constructors.
#[derive(Deserialize)]
struct RawInterval {
    min: i64,
    max: i64,
    #[serde(default)]
    ongoing: bool,
}

impl TryFrom<RawInterval> for DateInterval {
    type Error = ModelError;

    fn try_from(raw: RawInterval) -> ModelResult<Self> {
        if raw.ongoing {
            return Ok(Self::ongoing(raw.min, raw.max));
        }
        Self::new(raw.min, raw.max)
    }
}

impl DateInterval {
    /// Creates a fixed interval. `min` must not exceed `max`.
    pub fn new(min: i64, max: i64) -> ModelResult<Self> {
        if min > max {
            return Err(ModelError::InvalidInterval { min, max });
        }
        Ok(Self {
            min,
            max,
            ongoing: false,
        })
    }

    /// Creates an interval starting at `min` that extends to "now".
    ///
    /// `max` is the last known upper bound and is only used when "now" falls
    /// before it.
    #[must_use]
    pub fn ongoing(min: i64, max: i64) -> Self {
        Self {
            min,
            max: max.max(min),
            ongoing: true,
        }
    }

    #[must_use]
    pub fn instant(at: i64) -> Self {
        Self {
            min: at,
            max: at,
            ongoing: false,
        }
    }

    #[must_use]
    pub fn min(self) -> i64 {
        self.min
    }

    /// Upper bound, with ongoing intervals pinned to `now`.
    #[must_use]
    pub fn max(self, now: i64) -> i64 {
        if self.ongoing {
            now.max(self.min)
        } else {
            self.max
        }
    }

    #[must_use]
    pub fn is_ongoing(self) -> bool {
        self.ongoing
    }

    /// Returns a fixed copy with the upper bound evaluated at `now`.
    #[must_use]
    pub fn resolved(self, now: i64) -> Self {
        Self {
            min: self.min,
            max: self.max(now),
            ongoing: false,
        }
    }

    #[must_use]
    pub fn size(self, now: i64) -> i64 {
        self.max(now) - self.min
    }

    /// Inclusive overlap test; touching bounds intersect.
    #[must_use]
    pub fn intersects_with(self, other: Self, now: i64) -> bool {
        self.min <= other.max(now) && other.min <= self.max(now)
    }

    /// Common part of both intervals, `None` when they do not overlap.
    #[must_use]
    pub fn intersection(self, other: Self, now: i64) -> Option<Self> {
        let min = self.min.max(other.min);
        let max = self.max(now).min(other.max(now));
        if min > max {
            return None;
        }
        Some(Self {
            min,
            max,
            ongoing: false,
        })
    }

    /// Smallest fixed interval covering both.
    #[must_use]
    pub fn extend_to(self, other: Self, now: i64) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max(now).max(other.max(now)),
            ongoing: false,
        }
    }

    /// `true` when `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(self, other: Self, now: i64) -> bool {
        self.min <= other.min && other.max(now) <= self.max(now)
    }
}

/// Union extent of every interval, resolved at `now`.
///
/// Returns `None` for an empty input.
pub fn union_extent<'a, I>(intervals: I, now: i64) -> Option<DateInterval>
where
    I: IntoIterator<Item = &'a DateInterval>,
{
    intervals
        .into_iter()
        .fold(None, |extent: Option<DateInterval>, interval| {
            Some(match extent {
                Some(extent) => extent.extend_to(*interval, now),
                None => interval.resolved(now),
            })
        })
}
