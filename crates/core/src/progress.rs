//! Progress arithmetic shared by workers and stores.

/// Progress value of a finished task.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Percentage after `completed` of `total` steps, rounded to the nearest
/// integer and clamped to `0..=100`. A zero `total` counts as complete.
pub fn step_progress(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return PROGRESS_COMPLETE;
    }
    let completed = completed.min(total) as f64;
    let pct = (100.0 * completed / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Combine a stored progress value with a newly reported one without ever
/// moving backwards.
pub fn advance(current: u8, reported: u8) -> u8 {
    current.max(reported.min(PROGRESS_COMPLETE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_percent() {
        assert_eq!(step_progress(1, 3), 33);
        assert_eq!(step_progress(2, 3), 67);
        assert_eq!(step_progress(3, 3), 100);
        assert_eq!(step_progress(1, 2), 50);
        assert_eq!(step_progress(1, 5), 20);
    }

    #[test]
    fn over_completion_is_clamped() {
        assert_eq!(step_progress(7, 4), 100);
        assert_eq!(step_progress(0, 0), 100);
    }

    #[test]
    fn advance_never_goes_backwards() {
        assert_eq!(advance(40, 20), 40);
        assert_eq!(advance(40, 60), 60);
        assert_eq!(advance(10, 250), 100);
    }
}
