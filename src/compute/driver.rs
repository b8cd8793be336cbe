//! Tick driver - monotonic clock and run loop around [`FlowEngine::advance`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use super::{EngineError, FlowEngine, Frame};

/// Nominal animation rate.
pub const TICKS_PER_SECOND: u32 = 60;

/// Monotonically increasing tick counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationClock {
    tick: u64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step the clock and return the new tick.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// Decides when the next tick runs. Returning `false` ends the run.
pub trait FramePacer {
    fn wait(&mut self) -> bool;
}

/// Runs a fixed number of ticks back to back.
#[derive(Debug, Clone, Copy)]
pub struct Unpaced {
    remaining: u64,
}

impl Unpaced {
    pub fn new(ticks: u64) -> Self {
        Self { remaining: ticks }
    }
}

impl FramePacer for Unpaced {
    fn wait(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Sleeps to hold a fixed tick rate, optionally for a limited number of ticks.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct FixedRate {
    interval: std::time::Duration,
    next: Option<std::time::Instant>,
    remaining: Option<u64>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FixedRate {
    pub fn new(ticks_per_second: u32, limit: Option<u64>) -> Self {
        Self {
            interval: std::time::Duration::from_secs(1) / ticks_per_second.max(1),
            next: None,
            remaining: limit,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for FixedRate {
    fn default() -> Self {
        Self::new(TICKS_PER_SECOND, None)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl FramePacer for FixedRate {
    fn wait(&mut self) -> bool {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
        }

        let now = std::time::Instant::now();
        let target = self.next.unwrap_or(now);
        if target > now {
            std::thread::sleep(target - now);
        }
        // Late frames are not made up.
        self.next = Some(target.max(now) + self.interval);
        true
    }
}

/// Drives an engine from a clock until the pacer stops or the run is cancelled.
#[derive(Debug, Default)]
pub struct Driver {
    clock: SimulationClock,
    cancelled: Arc<AtomicBool>,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn clock(&self) -> SimulationClock {
        self.clock
    }

    /// Run ticks, handing each frame to `on_frame`. Returns the last tick run.
    pub fn run<P, F>(
        &mut self,
        engine: &mut FlowEngine,
        pacer: &mut P,
        mut on_frame: F,
    ) -> Result<u64, EngineError>
    where
        P: FramePacer + ?Sized,
        F: FnMut(&Frame),
    {
        let start = self.clock.tick();
        while !self.cancelled.load(Ordering::Relaxed) && pacer.wait() {
            let tick = self.clock.advance();
            let frame = engine.advance(tick)?;
            on_frame(&frame);
        }
        info!("Driver stopped after {} ticks", self.clock.tick() - start);
        Ok(self.clock.tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ColumnLayout;
    use crate::schema::{DatasetShape, EngineConfig, LayoutConfig};

    fn engine() -> FlowEngine {
        let mut engine = FlowEngine::from_json_str(
            r#"{"A": {"males": 5, "females": 5}, "B": {"males": 10}}"#,
            &DatasetShape::default(),
            EngineConfig {
                random_seed: Some(4),
                ..Default::default()
            },
        )
        .unwrap();
        engine.apply_layout(&ColumnLayout::new(LayoutConfig::default()));
        engine
    }

    #[test]
    fn test_clock_monotonic() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn test_unpaced_runs_exact_ticks() {
        let mut engine = engine();
        let mut driver = Driver::new();
        let mut ticks = Vec::new();
        let last = driver
            .run(&mut engine, &mut Unpaced::new(25), |frame| ticks.push(frame.tick))
            .unwrap();
        assert_eq!(last, 25);
        assert_eq!(ticks, (1..=25).collect::<Vec<_>>());

        // A second run continues the same clock.
        let last = driver.run(&mut engine, &mut Unpaced::new(5), |_| {}).unwrap();
        assert_eq!(last, 30);
    }

    #[test]
    fn test_cancellation() {
        let mut engine = engine();
        let mut driver = Driver::new();
        let cancel = driver.cancel_handle();
        cancel.store(true, Ordering::Relaxed);

        let mut frames = 0;
        let last = driver
            .run(&mut engine, &mut Unpaced::new(100), |_| frames += 1)
            .unwrap();
        assert_eq!(last, 0);
        assert_eq!(frames, 0);
    }

    #[test]
    fn test_fixed_rate_limit() {
        let mut pacer = FixedRate::new(1000, Some(3));
        assert!(pacer.wait());
        assert!(pacer.wait());
        assert!(pacer.wait());
        assert!(!pacer.wait());
    }
}
