//! Progress bookkeeping: one timestamp per unit of progress.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub title: String,
    /// Expected total, 0 when unknown.
    pub limit: u64,
    /// Start time followed by one entry per increment.
    stamps: Vec<Instant>,
}

impl ProgressInfo {
    pub fn new(title: impl Into<String>, limit: u64, start: Instant) -> Self {
        Self {
            title: title.into(),
            limit,
            stamps: vec![start],
        }
    }

    pub fn iter(&self) -> u64 {
        (self.stamps.len() - 1) as u64
    }

    pub fn increment(&mut self, amount: u64, now: Instant) {
        let amount = usize::try_from(amount).unwrap_or(0);
        self.stamps.extend(std::iter::repeat(now).take(amount));
    }

    pub fn is_finished(&self) -> bool {
        self.limit > 0 && self.iter() >= self.limit
    }

    fn start(&self) -> Instant {
        self.stamps[0]
    }

    /// Time since start, truncated to whole seconds.
    pub fn elapsed(&self, now: Instant) -> Duration {
        Duration::from_secs(now.saturating_duration_since(self.start()).as_secs())
    }

    /// Mean time per unit; before the first unit, time since start.
    pub fn avg(&self, now: Instant) -> Duration {
        let iter = self.iter();
        if iter == 0 {
            return now.saturating_duration_since(self.start());
        }
        let total: Duration = self
            .stamps
            .windows(2)
            .map(|pair| pair[1].saturating_duration_since(pair[0]))
            .sum();
        total / u32::try_from(iter).unwrap_or(u32::MAX)
    }

    /// Estimated time left. Zero when finished, unknown or not yet
    /// measurable.
    pub fn eta(&self, now: Instant) -> Duration {
        let iter = self.iter();
        if self.limit == 0 || iter >= self.limit {
            return Duration::ZERO;
        }
        let avg = self.avg(now);
        if avg.is_zero() {
            return Duration::ZERO;
        }
        avg.saturating_mul(u32::try_from(self.limit - iter).unwrap_or(u32::MAX))
    }

    /// Rounded percentage; `None` when the limit is unknown.
    pub fn pct(&self) -> Option<u64> {
        if self.limit == 0 {
            return None;
        }
        let ratio = self.iter() as f64 / self.limit as f64;
        Some((ratio * 100.0).round() as u64)
    }

    /// Completed fraction clamped to `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.iter() as f64 / self.limit as f64).clamp(0.0, 1.0)
    }
}

/// Render whole seconds as `1h2m3s`, `4m0s` or `5s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

/// Round to the nearest second, halves away from zero.
pub fn round_secs(duration: Duration) -> Duration {
    let millis = duration.as_millis();
    Duration::from_secs(u64::try_from((millis + 500) / 1000).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(start: Instant, secs: u64) -> Instant {
        start + Duration::from_secs(secs)
    }

    #[test]
    fn test_iter_counts_increments() {
        let start = Instant::now();
        let mut info = ProgressInfo::new("t", 4, start);
        assert_eq!(info.iter(), 0);
        info.increment(3, at(start, 1));
        assert_eq!(info.iter(), 3);
    }

    #[test]
    fn test_avg_before_first_unit_is_time_since_start() {
        let start = Instant::now();
        let info = ProgressInfo::new("", 10, start);
        assert_eq!(info.avg(at(start, 7)), Duration::from_secs(7));
    }

    #[test]
    fn test_avg_is_mean_gap() {
        let start = Instant::now();
        let mut info = ProgressInfo::new("", 10, start);
        info.increment(1, at(start, 2));
        info.increment(1, at(start, 6));
        assert_eq!(info.avg(at(start, 100)), Duration::from_secs(3));
        assert_eq!(info.eta(at(start, 100)), Duration::from_secs(24));
    }

    #[test]
    fn test_finished_has_zero_eta_and_full_pct() {
        let start = Instant::now();
        let mut info = ProgressInfo::new("", 4, start);
        info.increment(4, at(start, 1));
        assert!(info.is_finished());
        assert_eq!(info.eta(at(start, 2)), Duration::ZERO);
        assert_eq!(info.pct(), Some(100));
    }

    #[test]
    fn test_unknown_limit_has_no_pct() {
        let info = ProgressInfo::new("", 0, Instant::now());
        assert_eq!(info.pct(), None);
        assert_eq!(info.ratio(), 0.0);
    }

    #[test]
    fn test_elapsed_truncates() {
        let start = Instant::now();
        let info = ProgressInfo::new("", 0, start);
        assert_eq!(
            info.elapsed(start + Duration::from_millis(2900)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_duration_format() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
        assert_eq!(format_duration(Duration::from_secs(240)), "4m0s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h2m3s");
        assert_eq!(round_secs(Duration::from_millis(1500)), Duration::from_secs(2));
        assert_eq!(round_secs(Duration::from_millis(1499)), Duration::from_secs(1));
    }

    proptest! {
        #[test]
        fn prop_pct_bounded_and_eta_zero_when_done(limit in 1u64..200, steps in 0u64..400) {
            let start = Instant::now();
            let mut info = ProgressInfo::new("", limit, start);
            let done = steps.min(limit);
            for i in 0..done {
                info.increment(1, start + Duration::from_millis(i * 10 + 5));
            }
            let now = start + Duration::from_secs(10);
            let pct = info.pct().unwrap_or(0);
            prop_assert!(pct <= 100);
            if info.iter() >= limit {
                prop_assert_eq!(info.eta(now), Duration::ZERO);
            }
        }
    }
}
