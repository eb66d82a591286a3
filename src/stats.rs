//! Statistics aggregation across sets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::SetStatistics;

/// Totals folded over every set's statistics.
///
/// `days_since_training` is the gap to the most recently trained set;
/// `None` means no set has ever been trained (distinct from trained
/// today, which is `Some(0)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStatistics {
    pub correct_count: i64,
    pub total_asked: i64,
    pub days_since_training: Option<i64>,
}

/// Whole days since this set was last trained, `None` when never trained.
pub fn days_since_trained(stats: &SetStatistics, today: NaiveDate) -> Option<i64> {
    stats.last_trained().map(|date| (today - date).num_days())
}

/// Fold per-set statistics into totals. Sets that have never been
/// trained contribute their counters but not a training date.
pub fn aggregate(all: &[SetStatistics], today: NaiveDate) -> TotalStatistics {
    TotalStatistics {
        correct_count: all.iter().map(|s| s.correct_count).sum(),
        total_asked: all.iter().map(|s| s.total_asked).sum(),
        days_since_training: all
            .iter()
            .filter_map(|s| days_since_trained(s, today))
            .min(),
    }
}
