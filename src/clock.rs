//! Frame clock and optional frame pacing
//!
//! Measures wall time and CPU cycles between loop iterations. The numbers
//! are diagnostic; the loop only throttles itself when a [`FramePacer`] is
//! configured.

use std::time::{Duration, Instant};

/// Source of the two counters the clock samples
pub trait TimeSource {
    /// Counter ticks per second. Fixed for the life of the source.
    fn frequency(&self) -> u64;

    /// Monotonic wall-clock counter
    fn counter(&self) -> u64;

    /// CPU cycle counter, or 0 where none is available
    fn cycles(&self) -> u64;
}

/// Nanosecond wall clock plus the processor's timestamp counter
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSource {
    origin: Instant,
}

impl MonotonicSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicSource {
    fn frequency(&self) -> u64 {
        1_000_000_000
    }

    fn counter(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn cycles(&self) -> u64 {
        read_cycle_counter()
    }
}

#[cfg(target_arch = "x86_64")]
#[allow(unused_unsafe)]
fn read_cycle_counter() -> u64 {
    // SAFETY: RDTSC has no preconditions on x86_64.
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[cfg(not(target_arch = "x86_64"))]
fn read_cycle_counter() -> u64 {
    0
}

/// Counter values captured at the end of the previous iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub last_counter: u64,
    pub last_cycles: u64,
    pub counter_frequency: u64,
}

/// What one iteration cost
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub elapsed_seconds: f64,
    pub elapsed_cycles: u64,
}

impl FrameStats {
    pub fn ms_per_frame(&self) -> f64 {
        self.elapsed_seconds * 1000.0
    }

    pub fn fps(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            1.0 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    pub fn megacycles_per_frame(&self) -> f64 {
        self.elapsed_cycles as f64 / 1_000_000.0
    }
}

/// Measures the interval between successive [`FrameClock::tick`] calls.
#[derive(Debug, Clone)]
pub struct FrameClock<T: TimeSource = MonotonicSource> {
    source: T,
    timing: FrameTiming,
}

impl FrameClock<MonotonicSource> {
    pub fn system() -> Self {
        Self::start(MonotonicSource::new())
    }
}

impl<T: TimeSource> FrameClock<T> {
    /// Capture the baseline the first tick is measured against.
    pub fn start(source: T) -> Self {
        let timing = FrameTiming {
            last_counter: source.counter(),
            last_cycles: source.cycles(),
            counter_frequency: source.frequency().max(1),
        };
        Self { source, timing }
    }

    /// Elapsed time and cycles since the previous tick; resets the baseline.
    pub fn tick(&mut self) -> FrameStats {
        let counter = self.source.counter();
        let cycles = self.source.cycles();

        let stats = FrameStats {
            elapsed_seconds: self.seconds_between(self.timing.last_counter, counter),
            elapsed_cycles: cycles.saturating_sub(self.timing.last_cycles),
        };

        self.timing.last_counter = counter;
        self.timing.last_cycles = cycles;
        stats
    }

    /// Seconds since the previous tick, without moving the baseline
    pub fn elapsed_seconds(&self) -> f64 {
        self.seconds_between(self.timing.last_counter, self.source.counter())
    }

    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    fn seconds_between(&self, from: u64, to: u64) -> f64 {
        to.saturating_sub(from) as f64 / self.timing.counter_frequency as f64
    }
}

/// Sleeps away whatever is left of a fixed frame budget.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    budget: Duration,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        Self {
            budget: Duration::from_secs_f64(1.0 / target_fps.max(1) as f64),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time still owed to the budget after `elapsed_seconds` of work
    pub fn remaining(&self, elapsed_seconds: f64) -> Duration {
        self.budget
            .saturating_sub(Duration::from_secs_f64(elapsed_seconds.max(0.0)))
    }

    /// Sleep until the frame budget measured by `clock` is used up.
    pub fn wait<T: TimeSource>(&self, clock: &FrameClock<T>) {
        let remaining = self.remaining(clock.elapsed_seconds());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct FakeSource {
        counter: Rc<Cell<u64>>,
        cycles: Rc<Cell<u64>>,
    }

    impl TimeSource for FakeSource {
        fn frequency(&self) -> u64 {
            1000
        }

        fn counter(&self) -> u64 {
            self.counter.get()
        }

        fn cycles(&self) -> u64 {
            self.cycles.get()
        }
    }

    fn fake() -> FakeSource {
        FakeSource {
            counter: Rc::new(Cell::new(5000)),
            cycles: Rc::new(Cell::new(1_000_000)),
        }
    }

    #[test]
    fn test_tick_measures_since_previous_tick() {
        let source = fake();
        let mut clock = FrameClock::start(source.clone());

        source.counter.set(5033);
        source.cycles.set(3_000_000);
        let stats = clock.tick();
        assert!((stats.elapsed_seconds - 0.033).abs() < 1e-9);
        assert_eq!(stats.elapsed_cycles, 2_000_000);
        assert!((stats.ms_per_frame() - 33.0).abs() < 1e-6);
        assert!((stats.megacycles_per_frame() - 2.0).abs() < 1e-9);

        source.counter.set(5050);
        let stats = clock.tick();
        assert!((stats.elapsed_seconds - 0.017).abs() < 1e-9);
        assert_eq!(stats.elapsed_cycles, 0);
        assert_eq!(clock.timing().last_counter, 5050);
    }

    #[test]
    fn test_elapsed_does_not_reset_baseline() {
        let source = fake();
        let mut clock = FrameClock::start(source.clone());
        source.counter.set(5010);
        assert!((clock.elapsed_seconds() - 0.010).abs() < 1e-9);
        source.counter.set(5020);
        assert!((clock.tick().elapsed_seconds - 0.020).abs() < 1e-9);
    }

    #[test]
    fn test_fps_of_zero_interval() {
        assert_eq!(FrameStats::default().fps(), 0.0);
        let stats = FrameStats {
            elapsed_seconds: 0.025,
            elapsed_cycles: 0,
        };
        assert!((stats.fps() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_pacer_remaining_budget() {
        let pacer = FramePacer::new(50);
        assert_eq!(pacer.budget().as_millis(), 20);
        let remaining = pacer.remaining(0.005).as_secs_f64();
        assert!((remaining - 0.015).abs() < 1e-6);
        assert_eq!(pacer.remaining(0.5), Duration::ZERO);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let mut clock = FrameClock::system();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.tick().elapsed_seconds > 0.0);
    }
}
