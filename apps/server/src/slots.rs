use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::HashSet;

/// Hard cap on generated labels. A misconfigured interval (0 or negative)
/// must terminate with a truncated list instead of looping forever.
pub const MAX_SLOTS: usize = 200;

/// Generate bookable time labels from the configured business-hours window.
///
/// Labels start at `start_time`, step `interval` minutes and stop strictly
/// before `end_time`. Output depends only on the inputs: arithmetic happens on
/// a fixed reference day so only hours and minutes matter. Unparseable times
/// yield an empty list.
pub fn generate_slots(start_time: &str, end_time: &str, interval: i64) -> Vec<String> {
    let (Ok(start), Ok(end)) = (
        NaiveTime::parse_from_str(start_time, "%H:%M"),
        NaiveTime::parse_from_str(end_time, "%H:%M"),
    ) else {
        return Vec::new();
    };

    // Reference day is arbitrary; it only anchors the Duration arithmetic.
    let day = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let end_at = day.and_time(end);

    let mut slots = Vec::new();
    let mut current = day.and_time(start);
    while current < end_at && slots.len() < MAX_SLOTS {
        slots.push(current.format("%H:%M").to_string());
        current += Duration::minutes(interval);
    }
    slots
}

/// Order-preserving partition of a day's slots into available vs booked.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPartition {
    pub available: Vec<String>,
    pub booked: Vec<String>,
}

/// Split `slots` against the times already booked for one date.
///
/// A slot counts as booked iff its label exactly matches a booked time. This
/// is a presentational partition only: it reserves nothing, and two clients
/// racing for the same label is an accepted limitation.
pub fn partition_slots(slots: &[String], booked_times: &[String]) -> SlotPartition {
    let taken: HashSet<&str> = booked_times.iter().map(String::as_str).collect();

    let mut available = Vec::new();
    let mut booked = Vec::new();
    for slot in slots {
        if taken.contains(slot.as_str()) {
            booked.push(slot.clone());
        } else {
            available.push(slot.clone());
        }
    }
    SlotPartition { available, booked }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_of(label: &str) -> i64 {
        let (h, m) = label.split_once(':').unwrap();
        h.parse::<i64>().unwrap() * 60 + m.parse::<i64>().unwrap()
    }

    // ── generate_slots ──

    #[test]
    fn test_generate_basic_window() {
        let slots = generate_slots("10:00", "12:00", 30);
        assert_eq!(slots, vec!["10:00", "10:30", "11:00", "11:30"]);
    }

    #[test]
    fn test_generate_default_settings_window() {
        // 10:00–22:00 every 30 min → 24 labels
        let slots = generate_slots("10:00", "22:00", 30);
        assert_eq!(slots.len(), 24);
        assert_eq!(slots.first().unwrap(), "10:00");
        assert_eq!(slots.last().unwrap(), "21:30");
    }

    #[test]
    fn test_generate_end_excluded() {
        // 11:00 falls exactly on end_time and must not appear
        let slots = generate_slots("10:00", "11:00", 30);
        assert_eq!(slots, vec!["10:00", "10:30"]);
    }

    #[test]
    fn test_generate_strictly_increasing_with_exact_step() {
        let slots = generate_slots("09:15", "18:45", 25);
        assert_eq!(slots[0], "09:15");
        for pair in slots.windows(2) {
            assert_eq!(minutes_of(&pair[1]) - minutes_of(&pair[0]), 25);
        }
        for slot in &slots {
            assert!(minutes_of(slot) < minutes_of("18:45"));
        }
    }

    #[test]
    fn test_generate_no_duplicates() {
        let slots = generate_slots("10:00", "22:00", 5);
        let unique: HashSet<&String> = slots.iter().collect();
        assert_eq!(unique.len(), slots.len());
    }

    #[test]
    fn test_generate_start_equals_end() {
        assert!(generate_slots("10:00", "10:00", 30).is_empty());
    }

    #[test]
    fn test_generate_start_after_end() {
        assert!(generate_slots("22:00", "10:00", 30).is_empty());
    }

    #[test]
    fn test_generate_zero_interval_terminates_at_cap() {
        let slots = generate_slots("10:00", "22:00", 0);
        assert_eq!(slots.len(), MAX_SLOTS);
        // Degraded output: the label repeats, but generation stops.
        assert!(slots.iter().all(|s| s == "10:00"));
    }

    #[test]
    fn test_generate_negative_interval_terminates_at_cap() {
        let slots = generate_slots("10:00", "22:00", -15);
        assert_eq!(slots.len(), MAX_SLOTS);
    }

    #[test]
    fn test_generate_never_exceeds_cap() {
        // 00:00–23:59 every minute would be 1439 labels without the cap
        let slots = generate_slots("00:00", "23:59", 1);
        assert_eq!(slots.len(), MAX_SLOTS);
    }

    #[test]
    fn test_generate_unparseable_times() {
        assert!(generate_slots("ten", "22:00", 30).is_empty());
        assert!(generate_slots("10:00", "", 30).is_empty());
    }

    // ── partition_slots ──

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition_nothing_booked() {
        let slots = labels(&["10:00", "10:30", "11:00"]);
        let p = partition_slots(&slots, &[]);
        assert_eq!(p.available, slots);
        assert!(p.booked.is_empty());
    }

    #[test]
    fn test_partition_everything_booked() {
        let slots = labels(&["10:00", "10:30"]);
        let p = partition_slots(&slots, &labels(&["10:30", "10:00"]));
        assert!(p.available.is_empty());
        assert_eq!(p.booked, slots);
    }

    #[test]
    fn test_partition_covers_all_slots_disjointly() {
        let slots = labels(&["10:00", "10:30", "11:00", "11:30", "12:00"]);
        let p = partition_slots(&slots, &labels(&["10:30", "12:00"]));

        assert_eq!(p.available.len() + p.booked.len(), slots.len());
        for slot in &slots {
            assert_ne!(p.available.contains(slot), p.booked.contains(slot));
        }
    }

    #[test]
    fn test_partition_preserves_generator_order() {
        let slots = labels(&["10:00", "10:30", "11:00", "11:30"]);
        let p = partition_slots(&slots, &labels(&["11:00", "10:00"]));
        assert_eq!(p.available, labels(&["10:30", "11:30"]));
        assert_eq!(p.booked, labels(&["10:00", "11:00"]));
    }

    #[test]
    fn test_partition_exact_string_match_only() {
        // "9:00" does not match the zero-padded "09:00" label
        let slots = labels(&["09:00", "09:30"]);
        let p = partition_slots(&slots, &labels(&["9:00"]));
        assert_eq!(p.available, slots);
        assert!(p.booked.is_empty());
    }

    #[test]
    fn test_partition_booked_time_outside_window_ignored() {
        let slots = labels(&["10:00", "10:30"]);
        let p = partition_slots(&slots, &labels(&["23:45"]));
        assert_eq!(p.available, slots);
        assert!(p.booked.is_empty());
    }
}
