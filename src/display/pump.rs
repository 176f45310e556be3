use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Fixed-cadence frame clock.
///
/// Late frames are skipped rather than replayed: after a stall the pump
/// fires once and then realigns to the original schedule.
pub struct FramePump {
    interval: Interval,
    period: Duration,
    frames: u64,
}

impl FramePump {
    pub fn new(fps: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            period,
            frames: 0,
        }
    }

    /// Wait for the next frame slot; returns the frame number.
    pub async fn tick(&mut self) -> u64 {
        self.interval.tick().await;
        self.frames += 1;
        self.frames
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Frames per second measured over a sliding one-second window.
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    pub fn frame(&mut self) -> f32 {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = Instant::now();
        }
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_requested_rate() {
        let mut pump = FramePump::new(60);
        let start = Instant::now();
        for _ in 0..61 {
            pump.tick().await;
        }
        assert_eq!(pump.frames(), 61);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(990) && elapsed <= Duration::from_millis(1010));
    }

    #[tokio::test(start_paused = true)]
    async fn stall_does_not_cause_catch_up_burst() {
        let mut pump = FramePump::new(60);
        let period = pump.period();
        pump.tick().await;

        // Simulate a frame that took five and a half periods.
        tokio::time::advance(period * 11 / 2).await;
        pump.tick().await;

        let before = Instant::now();
        pump.tick().await;
        let gap = before.elapsed();

        assert_eq!(pump.frames(), 3);
        assert!(gap > Duration::ZERO, "missed ticks were replayed");
        assert!(gap <= period);
    }

    #[tokio::test(start_paused = true)]
    async fn fps_counter_reports_after_a_second() {
        let mut counter = FpsCounter::new();
        let mut fps = 0.0;
        for _ in 0..30 {
            tokio::time::advance(Duration::from_millis(40)).await;
            fps = counter.frame();
        }
        assert!((fps - 25.0).abs() < 1.0, "fps was {}", fps);
    }
}
