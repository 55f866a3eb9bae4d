//! Rebalance cooling-period state machine.

use chrono::{Duration, NaiveDateTime};

pub type Timestamp = NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// A rebalance may run now.
    Idle,
    /// The last rebalance was too recent; the next one is allowed at `until`.
    Cooling { until: Timestamp },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceScheduler {
    period: Duration,
    last_rebalance: Option<Timestamp>,
}

impl RebalanceScheduler {
    pub fn new(period: Duration) -> Self {
        RebalanceScheduler {
            period,
            last_rebalance: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn last_rebalance(&self) -> Option<Timestamp> {
        self.last_rebalance
    }

    /// Earliest time the next rebalance is allowed; `None` before the first.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.last_rebalance.map(|last| {
            last.checked_add_signed(self.period)
                .unwrap_or(NaiveDateTime::MAX)
        })
    }

    pub fn state(&self, now: Timestamp) -> SchedulerState {
        match self.next_due() {
            Some(until) if now < until => SchedulerState::Cooling { until },
            _ => SchedulerState::Idle,
        }
    }

    pub fn may_rebalance(&self, now: Timestamp) -> bool {
        self.state(now) == SchedulerState::Idle
    }

    /// Idle -> Cooling. Called only once a rebalance has committed.
    pub fn mark_rebalanced(&mut self, now: Timestamp) {
        self.last_rebalance = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn weekly() -> RebalanceScheduler {
        RebalanceScheduler::new(Duration::days(7))
    }

    #[test]
    fn fresh_scheduler_is_idle() {
        let scheduler = weekly();
        assert_eq!(scheduler.state(at(1, 0)), SchedulerState::Idle);
        assert!(scheduler.may_rebalance(at(1, 0)));
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn rebalance_starts_cooling() {
        let mut scheduler = weekly();
        scheduler.mark_rebalanced(at(1, 12));
        assert_eq!(
            scheduler.state(at(2, 0)),
            SchedulerState::Cooling { until: at(8, 12) }
        );
        assert!(!scheduler.may_rebalance(at(8, 11)));
    }

    #[test]
    fn cooling_ends_exactly_at_period() {
        let mut scheduler = weekly();
        scheduler.mark_rebalanced(at(1, 12));
        assert!(scheduler.may_rebalance(at(8, 12)));
        assert!(scheduler.may_rebalance(at(20, 0)));
    }

    #[test]
    fn clock_going_backwards_stays_cooling() {
        let mut scheduler = weekly();
        scheduler.mark_rebalanced(at(10, 0));
        assert!(!scheduler.may_rebalance(at(3, 0)));
    }

    #[test]
    fn queries_do_not_mutate() {
        let mut scheduler = weekly();
        scheduler.mark_rebalanced(at(1, 0));
        let before = scheduler.clone();
        let _ = scheduler.state(at(30, 0));
        let _ = scheduler.may_rebalance(at(30, 0));
        assert_eq!(scheduler, before);
    }
}
