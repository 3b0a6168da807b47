//! Shot clock ticker

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::cues::Cue;

/// Cue announced when the clock reaches `time_left`
pub fn threshold_cue(time_left: i32) -> Option<Cue> {
    match time_left {
        30 => Some(Cue::ThirtySeconds),
        10 => Some(Cue::TenSeconds),
        1..=5 => Some(Cue::Countdown {
            seconds: time_left as u32,
        }),
        0 => Some(Cue::TimeViolation),
        _ => None,
    }
}

/// Repeating ticker that exists only while the shot clock should run.
///
/// The interval is created when [`ShotClock::sync`] is told to run and
/// dropped as soon as it is told to stop, so a stopped clock holds no timer
/// and a running clock is never started twice.
#[derive(Debug)]
pub struct ShotClock {
    period: Duration,
    interval: Option<Interval>,
}

impl ShotClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Start or stop the ticker. Returns `Some(running)` when the state changed.
    pub fn sync(&mut self, should_run: bool) -> Option<bool> {
        match (should_run, self.interval.is_some()) {
            (true, false) => {
                // First tick lands one full period after (re)starting
                let mut interval = interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.interval = Some(interval);
                Some(true)
            }
            (false, true) => {
                self.interval = None;
                Some(false)
            }
            _ => None,
        }
    }

    /// Wait for the next tick. Never completes while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_at_thresholds() {
        assert_eq!(threshold_cue(30), Some(Cue::ThirtySeconds));
        assert_eq!(threshold_cue(10), Some(Cue::TenSeconds));
        assert_eq!(threshold_cue(5), Some(Cue::Countdown { seconds: 5 }));
        assert_eq!(threshold_cue(1), Some(Cue::Countdown { seconds: 1 }));
        assert_eq!(threshold_cue(0), Some(Cue::TimeViolation));
        assert_eq!(threshold_cue(29), None);
        assert_eq!(threshold_cue(6), None);
        assert_eq!(threshold_cue(-1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let mut clock = ShotClock::new(Duration::from_secs(1));
        assert_eq!(clock.sync(true), Some(true));
        assert_eq!(clock.sync(true), None);

        let start = Instant::now();
        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_clock_never_ticks() {
        let mut clock = ShotClock::new(Duration::from_secs(1));
        clock.sync(true);
        assert_eq!(clock.sync(false), Some(false));
        assert_eq!(clock.sync(false), None);

        let waited = tokio::time::timeout(Duration::from_secs(10), clock.tick()).await;
        assert!(waited.is_err());
    }
}
