//! Progress records and the weighted stage arithmetic.
//!
//! Each stage owns a fixed slice of the 0-100 range. Inside a stage,
//! progress advances with `completed / total` units using integer
//! rounding toward the floor, so the value reported for the last unit of
//! a stage is exactly the stage ceiling.

use serde::{Deserialize, Serialize};

use crate::types::RunId;

/// Lowest reportable progress.
pub const PROGRESS_MIN: i16 = 0;

/// Highest reportable progress.
pub const PROGRESS_MAX: i16 = 100;

/// Progress snapshot for one run, as served to polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub run_id: RunId,
    pub progress: i16,
    pub is_complete: bool,
    pub error: Option<String>,
}

impl ProgressRecord {
    /// A fresh record at 0%.
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            progress: PROGRESS_MIN,
            is_complete: false,
            error: None,
        }
    }
}

/// Clamp an arbitrary progress value into `0..=100`.
pub fn clamp_progress(value: i32) -> i16 {
    value.clamp(PROGRESS_MIN as i32, PROGRESS_MAX as i32) as i16
}

/// The `[floor, ceiling]` slice of the progress range owned by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSlice {
    pub floor: i16,
    pub ceiling: i16,
}

impl StageSlice {
    pub const fn new(floor: i16, ceiling: i16) -> Self {
        Self { floor, ceiling }
    }

    pub fn span(self) -> i16 {
        self.ceiling - self.floor
    }

    /// Progress after `completed` of `total` units have settled.
    ///
    /// `total == 0` reports the floor. `completed` beyond `total` is
    /// capped at the ceiling.
    pub fn at(self, completed: usize, total: usize) -> i16 {
        if total == 0 {
            return self.floor;
        }
        let completed = completed.min(total) as i64;
        let advanced = completed * self.span() as i64 / total as i64;
        clamp_progress(self.floor as i32 + advanced as i32)
    }
}

/// Analyze: 0% -> 25%.
pub const ANALYZE_SLICE: StageSlice = StageSlice::new(0, 25);

/// Generate: 25% -> 75%.
pub const GENERATE_SLICE: StageSlice = StageSlice::new(25, 75);

/// Enhance: 75% -> 100%.
pub const ENHANCE_SLICE: StageSlice = StageSlice::new(75, 100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(clamp_progress(-5), 0);
        assert_eq!(clamp_progress(140), 100);
        assert_eq!(clamp_progress(42), 42);
    }

    #[test]
    fn generate_slice_with_three_units() {
        let values: Vec<i16> = (0..=3).map(|done| GENERATE_SLICE.at(done, 3)).collect();
        assert_eq!(values, vec![25, 41, 58, 75]);
    }

    #[test]
    fn enhance_slice_with_two_units() {
        assert_eq!(ENHANCE_SLICE.at(1, 2), 87);
        assert_eq!(ENHANCE_SLICE.at(2, 2), 100);
    }

    #[test]
    fn zero_units_reports_floor() {
        assert_eq!(GENERATE_SLICE.at(0, 0), 25);
    }

    #[test]
    fn overshoot_is_capped_at_ceiling() {
        assert_eq!(ENHANCE_SLICE.at(9, 2), 100);
    }

    #[test]
    fn slices_tile_the_full_range() {
        assert_eq!(ANALYZE_SLICE.floor, PROGRESS_MIN);
        assert_eq!(ANALYZE_SLICE.ceiling, GENERATE_SLICE.floor);
        assert_eq!(GENERATE_SLICE.ceiling, ENHANCE_SLICE.floor);
        assert_eq!(ENHANCE_SLICE.ceiling, PROGRESS_MAX);
    }
}
