use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("correct count ({correct}) exceeds study count ({study})")]
pub struct StatsError {
    pub study: u32,
    pub correct: u32,
}

/// Whole-number percentage of `correct` over `total`, rounded half up.
///
/// Returns 0 when `total` is 0.
#[must_use]
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct);
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Cumulative per-card study statistics.
///
/// `correct_count <= study_count` holds for every constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawCardStats", into = "RawCardStats")]
pub struct CardStats {
    study_count: u32,
    correct_count: u32,
    last_studied: Option<DateTime<Utc>>,
}

impl CardStats {
    /// # Errors
    ///
    /// Returns `StatsError` if `correct_count > study_count`.
    pub fn new(
        study_count: u32,
        correct_count: u32,
        last_studied: Option<DateTime<Utc>>,
    ) -> Result<Self, StatsError> {
        if correct_count > study_count {
            return Err(StatsError {
                study: study_count,
                correct: correct_count,
            });
        }
        Ok(Self {
            study_count,
            correct_count,
            last_studied,
        })
    }

    #[must_use]
    pub fn study_count(&self) -> u32 {
        self.study_count
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn last_studied(&self) -> Option<DateTime<Utc>> {
        self.last_studied
    }

    #[must_use]
    pub fn accuracy(&self) -> u32 {
        accuracy_percent(self.correct_count, self.study_count)
    }

    /// Absolute counts after one more answer.
    #[must_use]
    pub fn after_answer(&self, correct: bool, at: DateTime<Utc>) -> Self {
        Self {
            study_count: self.study_count.saturating_add(1),
            correct_count: if correct {
                self.correct_count.saturating_add(1)
            } else {
                self.correct_count
            },
            last_studied: Some(at),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCardStats {
    study_count: u32,
    correct_count: u32,
    last_studied: Option<DateTime<Utc>>,
}

impl TryFrom<RawCardStats> for CardStats {
    type Error = StatsError;

    fn try_from(raw: RawCardStats) -> Result<Self, Self::Error> {
        CardStats::new(raw.study_count, raw.correct_count, raw.last_studied)
    }
}

impl From<CardStats> for RawCardStats {
    fn from(stats: CardStats) -> Self {
        Self {
            study_count: stats.study_count,
            correct_count: stats.correct_count,
            last_studied: stats.last_studied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn accuracy_rounds_half_up() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(3, 4), 75);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(accuracy_percent(1, 8), 13);
        assert_eq!(accuracy_percent(5, 5), 100);
    }

    #[test]
    fn stats_reject_correct_above_study() {
        let err = CardStats::new(2, 3, None).unwrap_err();
        assert_eq!(err, StatsError { study: 2, correct: 3 });
    }

    #[test]
    fn after_answer_produces_absolute_counts() {
        let stats = CardStats::new(4, 2, None).unwrap();
        let next = stats.after_answer(true, fixed_now());
        assert_eq!(next.study_count(), 5);
        assert_eq!(next.correct_count(), 3);
        assert_eq!(next.last_studied(), Some(fixed_now()));

        let wrong = stats.after_answer(false, fixed_now());
        assert_eq!(wrong.study_count(), 5);
        assert_eq!(wrong.correct_count(), 2);
    }
}
