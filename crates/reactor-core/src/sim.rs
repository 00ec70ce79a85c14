//! Tick scheduling and simulation state.
//!
//! The host calls [`crate::engine::Engine::frame`] once per rendered frame
//! with a millisecond timestamp. The [`TickScheduler`] turns the elapsed
//! time into a tick multiplier:
//!
//! 1. `delta` is the time since the previous frame.
//! 2. With no active ticking cells nothing is simulated. Short gaps are
//!    discarded; gaps longer than the offline threshold are banked.
//! 3. Otherwise `delta / tick_period` is the live multiplier. With time flux
//!    enabled, banked time tops the multiplier up to the clamp.
//! 4. The applied multiplier never exceeds `max_multiplier`; the bank itself
//!    is unbounded and drains across frames.
//!
//! Fractional multipliers are applied as-is by the resolution routine.

use serde::{Deserialize, Serialize};

use crate::reactor::finite_or;

// ---------------------------------------------------------------------------
// Scheduler state
// ---------------------------------------------------------------------------

/// Whether frames are simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulerState {
    #[default]
    Stopped,
    Running,
}

/// Per-frame timing inputs, resolved from config and modifiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub tick_period_ms: f64,
    pub offline_threshold_ms: f64,
    pub max_multiplier: f64,
    pub time_flux: bool,
}

/// What a frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The scheduler is stopped (paused or melted down).
    Stopped,
    /// Nothing to simulate. `banked_ms` is the bank after this frame.
    Idle { banked_ms: f64 },
    /// The resolution routine ran once with this multiplier.
    Ticked { multiplier: f64 },
}

/// Frame-paced scheduler with a banked-time accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickScheduler {
    state: SchedulerState,
    last_timestamp_ms: Option<f64>,
    bank_ms: f64,
    /// Frames that ran the resolution routine.
    frames_ticked: u64,
    /// Sum of every applied multiplier.
    simulated_ticks: f64,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    /// A stopped scheduler with an empty bank.
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Stopped,
            last_timestamp_ms: None,
            bank_ms: 0.0,
            frames_ticked: 0,
            simulated_ticks: 0.0,
        }
    }

    pub fn start(&mut self) {
        if self.state != SchedulerState::Running {
            log::info!("scheduler started");
        }
        self.state = SchedulerState::Running;
    }

    /// Only flips the running flag; the next frame is skipped.
    pub fn stop(&mut self) {
        if self.state != SchedulerState::Stopped {
            log::info!("scheduler stopped");
        }
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Banked time in milliseconds.
    pub fn bank_ms(&self) -> f64 {
        self.bank_ms
    }

    /// Restore the bank (persistence). Non-finite or negative values become
    /// zero.
    pub fn set_bank_ms(&mut self, bank_ms: f64) {
        self.bank_ms = finite_or(bank_ms, 0.0).max(0.0);
    }

    pub fn frames_ticked(&self) -> u64 {
        self.frames_ticked
    }

    pub fn simulated_ticks(&self) -> f64 {
        self.simulated_ticks
    }

    /// Decide what one frame does. Does not run the resolution routine.
    ///
    /// `has_ticking_cells` is true when at least one active tile holds a
    /// component with lifespan remaining.
    pub fn plan_frame(
        &mut self,
        timestamp_ms: f64,
        has_ticking_cells: bool,
        params: FrameParams,
    ) -> FrameOutcome {
        let delta = match self.last_timestamp_ms {
            Some(prev) => finite_or(timestamp_ms - prev, 0.0).max(0.0),
            None => 0.0,
        };
        if timestamp_ms.is_finite() {
            self.last_timestamp_ms = Some(timestamp_ms);
        }

        if !self.is_running() {
            return FrameOutcome::Stopped;
        }

        if !has_ticking_cells {
            if delta > params.offline_threshold_ms {
                self.bank_ms += delta;
                log::debug!("banked {delta} ms of idle time, bank now {} ms", self.bank_ms);
            }
            return FrameOutcome::Idle {
                banked_ms: self.bank_ms,
            };
        }

        let period = if params.tick_period_ms.is_finite() && params.tick_period_ms > 0.0 {
            params.tick_period_ms
        } else {
            crate::config::EngineConfig::DEFAULT_TICK_PERIOD_MS
        };
        let live = delta / period;
        let mut multiplier = live;

        if params.time_flux && self.bank_ms > 0.0 {
            let headroom = (params.max_multiplier - live).max(0.0);
            let drained_ms = self.bank_ms.min(headroom * period);
            self.bank_ms -= drained_ms;
            multiplier += drained_ms / period;
            if drained_ms > 0.0 {
                log::debug!("time flux drained {drained_ms} ms, bank now {} ms", self.bank_ms);
            }
        }

        let multiplier = finite_or(multiplier.min(params.max_multiplier), 0.0);
        if multiplier <= 0.0 {
            return FrameOutcome::Idle {
                banked_ms: self.bank_ms,
            };
        }

        self.frames_ticked += 1;
        self.simulated_ticks += multiplier;
        FrameOutcome::Ticked { multiplier }
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A deterministic FNV-1a (64-bit) hash of simulation state, used to check
/// that identical inputs produce identical results. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Hashes the exact bit pattern, so `0.0` and `-0.0` differ.
    pub fn write_f64(&mut self, v: f64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(time_flux: bool) -> FrameParams {
        FrameParams {
            tick_period_ms: 1000.0,
            offline_threshold_ms: 30_000.0,
            max_multiplier: 10.0,
            time_flux,
        }
    }

    fn running_at(ts: f64) -> TickScheduler {
        let mut s = TickScheduler::new();
        s.start();
        s.plan_frame(ts, false, params(false));
        s
    }

    #[test]
    fn stopped_scheduler_skips_frames() {
        let mut s = TickScheduler::new();
        assert_eq!(s.plan_frame(0.0, true, params(false)), FrameOutcome::Stopped);
        assert_eq!(s.plan_frame(500.0, true, params(false)), FrameOutcome::Stopped);
        assert_eq!(s.frames_ticked(), 0);
    }

    #[test]
    fn stopping_does_not_bank_the_pause() {
        let mut s = running_at(0.0);
        s.stop();
        s.plan_frame(100_000.0, false, params(false));
        s.start();
        s.plan_frame(100_016.0, false, params(false));
        assert_eq!(s.bank_ms(), 0.0);
    }

    #[test]
    fn idle_short_gap_is_discarded() {
        let mut s = running_at(1000.0);
        let out = s.plan_frame(1016.0, false, params(false));
        assert_eq!(out, FrameOutcome::Idle { banked_ms: 0.0 });
        assert_eq!(s.bank_ms(), 0.0);
    }

    #[test]
    fn idle_long_gap_is_banked_in_full() {
        let mut s = running_at(1000.0);
        s.plan_frame(41_000.0, false, params(false));
        assert_eq!(s.bank_ms(), 40_000.0);
    }

    #[test]
    fn gap_at_exact_threshold_is_not_banked() {
        let mut s = running_at(0.0);
        s.plan_frame(30_000.0, false, params(false));
        assert_eq!(s.bank_ms(), 0.0);
    }

    #[test]
    fn live_multiplier_is_fractional() {
        let mut s = running_at(0.0);
        match s.plan_frame(16.0, true, params(false)) {
            FrameOutcome::Ticked { multiplier } => assert!((multiplier - 0.016).abs() < 1e-12),
            other => panic!("expected tick, got {other:?}"),
        }
    }

    #[test]
    fn applied_multiplier_is_clamped() {
        let mut s = running_at(0.0);
        match s.plan_frame(50_000.0, true, params(false)) {
            FrameOutcome::Ticked { multiplier } => assert_eq!(multiplier, 10.0),
            other => panic!("expected tick, got {other:?}"),
        }
    }

    #[test]
    fn bank_untouched_without_time_flux() {
        let mut s = running_at(0.0);
        s.set_bank_ms(5000.0);
        s.plan_frame(16.0, true, params(false));
        assert_eq!(s.bank_ms(), 5000.0);
    }

    #[test]
    fn time_flux_drains_bank_into_multiplier() {
        let mut s = running_at(0.0);
        s.set_bank_ms(5000.0);
        match s.plan_frame(16.0, true, params(true)) {
            FrameOutcome::Ticked { multiplier } => {
                assert!(multiplier >= 5.016 - 1e-9, "multiplier {multiplier}");
                assert!(multiplier <= 10.0);
            }
            other => panic!("expected tick, got {other:?}"),
        }
        assert!(s.bank_ms().abs() < 1e-9);
    }

    #[test]
    fn large_bank_drains_across_frames() {
        let mut s = running_at(0.0);
        s.set_bank_ms(100_000.0);
        let mut ts = 0.0;
        let mut frames = 0;
        while s.bank_ms() > 0.0 && frames < 100 {
            ts += 16.0;
            match s.plan_frame(ts, true, params(true)) {
                FrameOutcome::Ticked { multiplier } => assert!(multiplier <= 10.0),
                other => panic!("expected tick, got {other:?}"),
            }
            frames += 1;
        }
        assert!(frames > 1, "bank must not drain in a single frame");
        assert_eq!(s.bank_ms(), 0.0);
    }

    #[test]
    fn backwards_timestamp_is_zero_delta() {
        let mut s = running_at(1000.0);
        let out = s.plan_frame(500.0, true, params(false));
        assert!(matches!(out, FrameOutcome::Idle { .. }));
    }

    #[test]
    fn state_hash_deterministic_and_order_sensitive() {
        let mut a = StateHash::new();
        a.write_f64(1.5);
        a.write_u32(7);
        let mut b = StateHash::new();
        b.write_f64(1.5);
        b.write_u32(7);
        assert_eq!(a.finish(), b.finish());

        let mut c = StateHash::new();
        c.write_u32(7);
        c.write_f64(1.5);
        assert_ne!(a.finish(), c.finish());
    }
}
