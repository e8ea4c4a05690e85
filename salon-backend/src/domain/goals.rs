/// Percentage of `target` reached by `current`.
///
/// Rounded to the nearest integer and clamped to `0..=100`. A zero (or
/// negative) target yields 0.
pub fn calculate_goal_progress(current: i64, target: i64) -> u8 {
    if target <= 0 {
        return 0;
    }
    let pct = (current as f64 * 100.0 / target as f64).round();
    pct.clamp(0.0, 100.0) as u8
}
