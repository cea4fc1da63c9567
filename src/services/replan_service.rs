//! Day Re-planning Service
//!
//! Rebuilds one day of a trip around the entries the traveller locked:
//! everything unlocked on that day is dropped, the free gaps between locked
//! entries are found, and each gap gets a place matching the requested theme.
//!
//! ## Allocation policy
//! Candidates are handed out round-robin in gap order. When there are more
//! gaps than candidates the cycle starts over from the first candidate, so the
//! same place can show up twice in a day. Nothing tries to fit a place to the
//! length of its gap.

use std::sync::Arc;

use crate::models::place::Place;
use crate::models::schedule::{Gap, ScheduleEntry};
use crate::services::gap_analysis_service::{find_gaps, GapRules};
use crate::services::place_service::CandidateSource;

/// One new entry per gap, starting at the gap start. Empty pool, empty result.
pub fn allocate(gaps: &[Gap], candidates: &[Place]) -> Vec<ScheduleEntry> {
    if candidates.is_empty() {
        return Vec::new();
    }

    gaps.iter()
        .enumerate()
        .map(|(i, gap)| candidates[i % candidates.len()].to_schedule_entry(gap.day, gap.start))
        .collect()
}

/// Merge the three groups into one schedule ordered by (day, time).
///
/// The sort is stable: entries sharing a day and time keep the order they were
/// passed in, other days first, then locked, then allocated.
pub fn assemble(
    other_days: &[ScheduleEntry],
    locked: &[ScheduleEntry],
    allocated: &[ScheduleEntry],
) -> Vec<ScheduleEntry> {
    let mut schedule: Vec<ScheduleEntry> = other_days
        .iter()
        .chain(locked.iter())
        .chain(allocated.iter())
        .cloned()
        .collect();

    schedule.sort_by_key(|e| (e.day, e.time));
    schedule
}

pub struct ReplanService {
    candidates: Arc<dyn CandidateSource>,
    rules: GapRules,
}

impl ReplanService {
    pub fn new(candidates: Arc<dyn CandidateSource>) -> Self {
        Self::with_rules(candidates, GapRules::default())
    }

    pub fn with_rules(candidates: Arc<dyn CandidateSource>, rules: GapRules) -> Self {
        Self { candidates, rules }
    }

    /// Gaps for one day of `schedule` under this service's rules.
    pub fn gaps_for_day(&self, schedule: &[ScheduleEntry], day: u32) -> Vec<Gap> {
        find_gaps(day, schedule, &self.rules)
    }

    /// Replace the unlocked entries of `day` with theme matches placed into
    /// the free gaps. Other days and locked entries come back untouched.
    pub async fn regenerate_day(
        &self,
        schedule: &[ScheduleEntry],
        day: u32,
        theme: &str,
    ) -> Vec<ScheduleEntry> {
        let (this_day, other_days): (Vec<ScheduleEntry>, Vec<ScheduleEntry>) =
            schedule.iter().cloned().partition(|e| e.day == day);
        let locked: Vec<ScheduleEntry> = this_day.into_iter().filter(|e| e.locked).collect();

        let gaps = find_gaps(day, &locked, &self.rules);

        let candidates = if gaps.is_empty() {
            Vec::new()
        } else {
            match self.candidates.by_theme(theme).await {
                Ok(places) => places,
                Err(e) => {
                    log::warn!(
                        "Candidate lookup for theme '{}' failed, leaving gaps empty: {}",
                        theme,
                        e
                    );
                    Vec::new()
                }
            }
        };

        let allocated = allocate(&gaps, &candidates);
        log::info!(
            "Day {} re-planned: {} locked, {} gaps, {} filled with theme '{}'",
            day,
            locked.len(),
            gaps.len(),
            allocated.len(),
            theme
        );

        assemble(&other_days, &locked, &allocated)
    }
}
