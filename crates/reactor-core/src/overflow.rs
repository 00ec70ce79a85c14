//! Power-overflow-to-heat conversion.
//!
//! Power arrives in separate, ordered increments within one tick. Each
//! increment is clamped against the power already accepted, and whatever
//! does not fit is converted to heat at the overflow ratio. Callers must
//! never pre-sum increments: every increment is evaluated against the
//! already-clamped `current_power` left by the one before it.

use crate::reactor::ReactorState;

/// Apply one power increment. Returns the heat produced by the overflow.
///
/// Non-finite or negative increments are treated as zero. `ratio` is
/// clamped into `[0, 1]`.
pub fn apply_power_increment(reactor: &mut ReactorState, increment: f64, ratio: f64) -> f64 {
    let increment = if increment.is_finite() { increment.max(0.0) } else { 0.0 };
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };

    let potential = reactor.current_power + increment;
    let excess = (potential - reactor.max_power).max(0.0);
    reactor.current_power = potential.min(reactor.max_power);

    let heat = excess * ratio;
    reactor.current_heat += heat;
    heat
}

/// Apply increments in order. Returns the total overflow heat.
pub fn apply_power_increments(reactor: &mut ReactorState, increments: &[f64], ratio: f64) -> f64 {
    increments
        .iter()
        .map(|&inc| apply_power_increment(reactor, inc, ratio))
        .sum()
}
