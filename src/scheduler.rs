// Fixed-period tick scheduler
//
// Non-blocking: the host calls `poll` far more often than the period and it
// answers whether a tick is due. Deadlines advance from the previous deadline
// so a late poll does not shift the phase of later ticks.

#[derive(Debug, Clone)]
pub struct TickScheduler {
    period_ms: u64,
    next_deadline: Option<u64>,
}

impl TickScheduler {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_deadline: None,
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.next_deadline
    }

    /// True when a tick is due at `now_ms`. The first poll ticks immediately
    /// and anchors the phase.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(deadline) = self.next_deadline else {
            self.next_deadline = Some(now_ms.saturating_add(self.period_ms));
            return true;
        };
        if now_ms < deadline {
            return false;
        }

        // Whole periods missed during a stall are dropped rather than replayed,
        // keeping the next deadline on the original phase grid.
        let missed = (now_ms - deadline) / self.period_ms;
        let advance = missed.saturating_add(1).saturating_mul(self.period_ms);
        self.next_deadline = Some(deadline.saturating_add(advance));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_poll_ticks() {
        let mut sched = TickScheduler::new(20);
        assert!(sched.poll(7));
        assert_eq!(sched.next_deadline(), Some(27));
    }

    #[test]
    fn test_early_poll_does_nothing() {
        let mut sched = TickScheduler::new(20);
        assert!(sched.poll(0));
        for now in 1..20 {
            assert!(!sched.poll(now));
        }
        assert_eq!(sched.next_deadline(), Some(20));
        assert!(sched.poll(20));
    }

    #[test]
    fn test_late_tick_keeps_phase() {
        let mut sched = TickScheduler::new(20);
        assert!(sched.poll(0));
        // 7 ms late
        assert!(sched.poll(27));
        assert_eq!(sched.next_deadline(), Some(40));
        assert!(!sched.poll(39));
        assert!(sched.poll(40));
        assert_eq!(sched.next_deadline(), Some(60));
    }

    #[test]
    fn test_stall_skips_missed_periods() {
        let mut sched = TickScheduler::new(20);
        assert!(sched.poll(0));
        assert!(sched.poll(95));
        assert_eq!(sched.next_deadline(), Some(100));
        assert!(!sched.poll(99));
    }

    #[test]
    fn test_huge_period_does_not_overflow() {
        let mut sched = TickScheduler::new(u64::MAX);
        assert!(sched.poll(5));
        assert_eq!(sched.next_deadline(), Some(u64::MAX));
        assert!(!sched.poll(1_000));
    }

    #[test]
    fn test_tick_count_over_one_second() {
        let mut sched = TickScheduler::new(20);
        let ticks = (0..1000).filter(|&now| sched.poll(now)).count();
        assert_eq!(ticks, 50);
    }
}
