use std::time::{Duration, Instant};

/// Length of one counting window
pub const REPORT_WINDOW: Duration = Duration::from_secs(1);

/// Whole-frames-per-second counter
///
/// Counts ticks in a wall-clock window. The first tick that arrives after the
/// window has run for more than a second closes it, reports the count, and
/// opens a new window that includes itself. No smoothing.
#[derive(Debug, Clone)]
pub struct ThroughputCounter {
    frame_count: u32,
    window_start: Instant,
    last_rate: Option<u32>,
}

impl ThroughputCounter {
    /// Counter whose first window starts now
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            frame_count: 0,
            window_start: start,
            last_rate: None,
        }
    }

    /// Count one completed frame
    pub fn tick(&mut self) -> Option<u32> {
        self.tick_at(Instant::now())
    }

    /// Count one frame completed at `now`, returning the previous window's
    /// rate if this tick closed it
    pub fn tick_at(&mut self, now: Instant) -> Option<u32> {
        let report = self.roll_window(now);
        self.frame_count += 1;
        report
    }

    /// Close the window without counting a frame, if it has expired
    pub fn roll_window(&mut self, now: Instant) -> Option<u32> {
        if now.saturating_duration_since(self.window_start) <= REPORT_WINDOW {
            return None;
        }

        let rate = self.frame_count;
        self.frame_count = 0;
        self.window_start = now;
        self.last_rate = Some(rate);
        Some(rate)
    }

    /// Frames counted in the current, still open window
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Most recently reported rate
    pub fn last_rate(&self) -> Option<u32> {
        self.last_rate
    }

    pub fn reset(&mut self, now: Instant) {
        self.frame_count = 0;
        self.window_start = now;
    }
}

impl Default for ThroughputCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn thirty_frames_in_a_second_report_thirty() {
        let start = Instant::now();
        let mut counter = ThroughputCounter::starting_at(start);

        for i in 1..=30 {
            assert_eq!(counter.tick_at(start + ms(33 * i)), None);
        }
        assert_eq!(counter.frame_count(), 30);

        // 31st tick past the one second mark closes the window
        assert_eq!(counter.tick_at(start + ms(1010)), Some(30));
        assert_eq!(counter.frame_count(), 1);
        assert_eq!(counter.last_rate(), Some(30));
    }

    #[test]
    fn exactly_one_second_stays_open() {
        let start = Instant::now();
        let mut counter = ThroughputCounter::starting_at(start);
        counter.tick_at(start + ms(500));
        assert_eq!(counter.tick_at(start + ms(1000)), None);
        assert_eq!(counter.frame_count(), 2);
    }

    #[test]
    fn roll_window_reports_without_counting() {
        let start = Instant::now();
        let mut counter = ThroughputCounter::starting_at(start);
        for i in 0..5 {
            counter.tick_at(start + ms(10 * i));
        }
        assert_eq!(counter.roll_window(start + ms(1001)), Some(5));
        assert_eq!(counter.frame_count(), 0);
        assert_eq!(counter.roll_window(start + ms(1500)), None);
    }

    #[test]
    fn idle_window_reports_zero() {
        let start = Instant::now();
        let mut counter = ThroughputCounter::starting_at(start);
        assert_eq!(counter.tick_at(start + ms(2500)), Some(0));
    }
}
