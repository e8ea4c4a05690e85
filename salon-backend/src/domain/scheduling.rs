//! Time-slot arithmetic for appointments

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Half-open intervals `[a_start, a_end)` and `[b_start, b_end)` intersect
pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Whether `[start, end)` lies inside a single day's opening hours
pub fn within_opening_hours(
    start: NaiveDateTime,
    end: NaiveDateTime,
    open: NaiveTime,
    close: NaiveTime,
) -> bool {
    start < end
        && start.date() == end.date()
        && start.time() >= open
        && end.time() <= close
}

/// Candidate start times on `date`, every `step_minutes`, whose
/// `duration_minutes` slot fits opening hours and avoids every `busy`
/// interval. Slots starting before `not_before` are skipped.
pub fn available_slots(
    date: NaiveDate,
    open: NaiveTime,
    close: NaiveTime,
    duration_minutes: i64,
    step_minutes: i64,
    busy: &[(NaiveDateTime, NaiveDateTime)],
    not_before: Option<NaiveDateTime>,
) -> Vec<NaiveDateTime> {
    let mut slots = Vec::new();
    if duration_minutes <= 0 || step_minutes <= 0 || open >= close {
        return slots;
    }

    let duration = Duration::minutes(duration_minutes);
    let close_at = date.and_time(close);
    let mut start = date.and_time(open);

    while start + duration <= close_at {
        let end = start + duration;
        let in_future = not_before.map_or(true, |limit| start >= limit);
        let free = !busy
            .iter()
            .any(|(b_start, b_end)| intervals_overlap(start, end, *b_start, *b_end));
        if in_future && free {
            slots.push(start);
        }
        start += Duration::minutes(step_minutes);
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn test_overlap_is_half_open() {
        let d = day();
        assert!(intervals_overlap(d.and_time(t(9, 0)), d.and_time(t(10, 0)), d.and_time(t(9, 30)), d.and_time(t(10, 30))));
        // Back-to-back appointments do not overlap
        assert!(!intervals_overlap(d.and_time(t(9, 0)), d.and_time(t(10, 0)), d.and_time(t(10, 0)), d.and_time(t(11, 0))));
    }

    #[test]
    fn test_opening_hours() {
        let d = day();
        assert!(within_opening_hours(d.and_time(t(9, 0)), d.and_time(t(19, 0)), t(9, 0), t(19, 0)));
        assert!(!within_opening_hours(d.and_time(t(8, 30)), d.and_time(t(9, 30)), t(9, 0), t(19, 0)));
        assert!(!within_opening_hours(d.and_time(t(18, 30)), d.and_time(t(19, 30)), t(9, 0), t(19, 0)));
    }

    #[test]
    fn test_slots_skip_busy_intervals() {
        let d = day();
        let busy = vec![(d.and_time(t(10, 0)), d.and_time(t(11, 0)))];
        let slots = available_slots(d, t(9, 0), t(12, 0), 60, 30, &busy, None);
        let times: Vec<String> = slots.iter().map(|s| s.format("%H:%M").to_string()).collect();
        assert_eq!(times, vec!["09:00", "11:00"]);
    }

    #[test]
    fn test_slots_respect_not_before() {
        let d = day();
        let slots = available_slots(d, t(9, 0), t(11, 0), 30, 30, &[], Some(d.and_time(t(10, 0))));
        let times: Vec<String> = slots.iter().map(|s| s.format("%H:%M").to_string()).collect();
        assert_eq!(times, vec!["10:00", "10:30"]);
    }

    #[test]
    fn test_no_slots_for_invalid_input() {
        assert!(available_slots(day(), t(12, 0), t(9, 0), 30, 30, &[], None).is_empty());
        assert!(available_slots(day(), t(9, 0), t(12, 0), 0, 30, &[], None).is_empty());
    }
}
