use chrono::{Duration, NaiveTime};

use crate::models::schedule::{minute_of_day, Gap, ScheduleEntry};

const DEFAULT_LOCKED_DWELL_MINUTES: i64 = 90;
const DEFAULT_MIN_GAP_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct GapRules {
    pub day_start_time: NaiveTime,
    pub day_end_time: NaiveTime,
    /// Time a locked entry occupies when it carries no duration of its own
    pub locked_dwell_minutes: i64,
    /// Gaps shorter than this are not worth filling
    pub min_gap_minutes: i64,
}

impl Default for GapRules {
    fn default() -> Self {
        Self {
            day_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            day_end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            locked_dwell_minutes: DEFAULT_LOCKED_DWELL_MINUTES,
            min_gap_minutes: DEFAULT_MIN_GAP_MINUTES,
        }
    }
}

impl GapRules {
    fn dwell_minutes(&self, entry: &ScheduleEntry) -> i64 {
        entry
            .duration_minutes
            .map(i64::from)
            .unwrap_or(self.locked_dwell_minutes)
    }
}

fn time_at(minutes: i64) -> NaiveTime {
    NaiveTime::MIN + Duration::minutes(minutes)
}

/// Free intervals of `day` that locked entries leave open inside the day window.
///
/// Unlocked entries are ignored, they are what re-planning replaces. Each locked
/// entry blocks `[time, time + dwell)`; overlapping blocks merge.
pub fn find_gaps(day: u32, entries: &[ScheduleEntry], rules: &GapRules) -> Vec<Gap> {
    let window_start = minute_of_day(rules.day_start_time);
    let window_end = minute_of_day(rules.day_end_time);

    let mut locked: Vec<&ScheduleEntry> = entries
        .iter()
        .filter(|e| e.day == day && e.locked)
        .collect();
    locked.sort_by_key(|e| e.time);

    let mut gaps = Vec::new();
    let mut push_gap = |start: i64,
                        end: i64,
                        previous: Option<&ScheduleEntry>,
                        next: Option<&ScheduleEntry>| {
        let start = start.max(window_start);
        let end = end.min(window_end);
        let duration = end - start;
        if duration > 0 && duration >= rules.min_gap_minutes {
            gaps.push(Gap {
                day,
                start: time_at(start),
                end: time_at(end),
                duration_minutes: duration,
                previous_locked: previous.map(|e| e.id.clone()),
                next_locked: next.map(|e| e.id.clone()),
            });
        }
    };

    if locked.is_empty() {
        push_gap(window_start, window_end, None, None);
        return gaps;
    }

    let mut cursor = window_start;
    let mut previous: Option<&ScheduleEntry> = None;

    for entry in &locked {
        push_gap(cursor, entry.minute_of_day(), previous, Some(entry));

        let occupied_until = entry.minute_of_day() + rules.dwell_minutes(entry);
        cursor = cursor.max(occupied_until);
        previous = Some(entry);
    }

    push_gap(cursor, window_end, previous, None);

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::Category;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn entry(id: &str, day: u32, time: NaiveTime, locked: bool) -> ScheduleEntry {
        ScheduleEntry {
            id: id.to_string(),
            day,
            time,
            name: id.to_string(),
            category: Category::Sightseeing,
            lat: None,
            lng: None,
            locked,
            indoor: false,
            duration_minutes: None,
            place_id: None,
        }
    }

    #[test]
    fn test_no_locked_entries_gives_whole_window() {
        let entries = vec![entry("a", 1, at(10, 0), false)];
        let gaps = find_gaps(1, &entries, &GapRules::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, at(9, 0));
        assert_eq!(gaps[0].end, at(21, 0));
        assert_eq!(gaps[0].duration_minutes, 720);
        assert_eq!(gaps[0].previous_locked, None);
        assert_eq!(gaps[0].next_locked, None);
    }

    #[test]
    fn test_single_locked_entry_at_noon() {
        let entries = vec![entry("lunch", 1, at(12, 0), true)];
        let gaps = find_gaps(1, &entries, &GapRules::default());

        assert_eq!(gaps.len(), 2);
        assert_eq!((gaps[0].start, gaps[0].end), (at(9, 0), at(12, 0)));
        assert_eq!(gaps[0].duration_minutes, 180);
        assert_eq!(gaps[0].next_locked.as_deref(), Some("lunch"));
        assert_eq!((gaps[1].start, gaps[1].end), (at(13, 30), at(21, 0)));
        assert_eq!(gaps[1].duration_minutes, 450);
        assert_eq!(gaps[1].previous_locked.as_deref(), Some("lunch"));
    }

    #[test]
    fn test_short_slivers_are_dropped() {
        let entries = vec![
            entry("a", 1, at(9, 30), true),
            // 11:00 -> 11:45 is only 45 minutes
            entry("b", 1, at(11, 45), true),
            entry("c", 1, at(20, 0), true),
        ];
        let gaps = find_gaps(1, &entries, &GapRules::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!((gaps[0].start, gaps[0].end), (at(13, 15), at(20, 0)));
    }

    #[test]
    fn test_other_days_and_unsorted_input() {
        let entries = vec![
            entry("late", 1, at(17, 0), true),
            entry("other-day", 2, at(12, 0), true),
            entry("early", 1, at(11, 0), true),
        ];
        let gaps = find_gaps(1, &entries, &GapRules::default());
        let spans: Vec<(NaiveTime, NaiveTime)> = gaps.iter().map(|g| (g.start, g.end)).collect();
        assert_eq!(
            spans,
            vec![
                (at(9, 0), at(11, 0)),
                (at(12, 30), at(17, 0)),
                (at(18, 30), at(21, 0)),
            ]
        );
    }

    #[test]
    fn test_entry_duration_overrides_default_dwell() {
        let mut show = entry("show", 1, at(10, 0), true);
        show.duration_minutes = Some(240);
        let gaps = find_gaps(1, &[show], &GapRules::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, at(14, 0));
    }

    #[test]
    fn test_late_locked_entry_does_not_wrap_past_midnight() {
        let entries = vec![entry("night-market", 1, at(23, 30), true)];
        let gaps = find_gaps(1, &entries, &GapRules::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!((gaps[0].start, gaps[0].end), (at(9, 0), at(21, 0)));
    }

    #[test]
    fn test_gaps_never_overlap_locked_blocks() {
        let mut long = entry("tour", 1, at(10, 0), true);
        long.duration_minutes = Some(300);
        let entries = vec![
            long,
            entry("inside-tour", 1, at(11, 0), true),
            entry("dinner", 1, at(18, 0), true),
        ];
        let rules = GapRules::default();
        let gaps = find_gaps(1, &entries, &rules);

        for gap in &gaps {
            assert!(gap.duration_minutes >= rules.min_gap_minutes);
            for locked in &entries {
                let block_start = locked.minute_of_day();
                let block_end = block_start + rules.dwell_minutes(locked);
                let gap_start = minute_of_day(gap.start);
                let gap_end = minute_of_day(gap.end);
                assert!(gap_end <= block_start || gap_start >= block_end);
            }
        }
        let spans: Vec<(NaiveTime, NaiveTime)> = gaps.iter().map(|g| (g.start, g.end)).collect();
        assert_eq!(
            spans,
            vec![
                (at(9, 0), at(10, 0)),
                (at(15, 0), at(18, 0)),
                (at(19, 30), at(21, 0)),
            ]
        );
    }
}
