//! Hysteresis fan duty selection
//!
//! Maps the hotter of CPU and GPU plus the current duty to a new target duty.
//!
//! # How It Works
//!
//! 1. **Snapping**: the current duty is snapped to a canonical level when it
//!    is within ±1 of one, absorbing rounding jitter from the duty register.
//!
//! 2. **Threshold table**: ordered rules (first match wins). Escalation needs a
//!    higher temperature than holding a level does, so the fan does not hunt
//!    at band edges.
//!
//! 3. **Smoothing**: escalations move half way per tick while the gap is
//!    large. De-escalations apply at once.
//!
//! The function keeps no state between calls; the control loop owns it.

use tracing::debug;

use crate::constants::thermal::{
    RuleKind, ThresholdRule, CANONICAL_DUTIES, DUTY_SNAP_TOLERANCE, RULES, SMOOTHING_MIN_GAP,
};

/// Outcome of one evaluation of the threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyDecision {
    /// No rule matched; leave the fan alone
    NoChange,
    /// Command this duty (percent)
    Set(u8),
}

impl DutyDecision {
    pub fn duty(self) -> Option<u8> {
        match self {
            Self::NoChange => None,
            Self::Set(duty) => Some(duty),
        }
    }
}

/// Snap `duty` to a canonical level within tolerance, else return it unchanged
pub fn identify_duty(duty: u8) -> u8 {
    CANONICAL_DUTIES
        .iter()
        .copied()
        .find(|level| duty.abs_diff(*level) <= DUTY_SNAP_TOLERANCE)
        .unwrap_or(duty)
}

impl ThresholdRule {
    fn matches(&self, max_temp: u8, duty: u8) -> bool {
        match self.kind {
            RuleKind::Escalate => max_temp >= self.temp && duty < self.duty_bound,
            RuleKind::DeEscalate => max_temp <= self.temp && duty >= self.duty_bound,
            RuleKind::Stop => max_temp <= self.temp,
        }
    }
}

/// First rule of the table that applies
fn matching_rule(max_temp: u8, duty: u8) -> Option<&'static ThresholdRule> {
    RULES.iter().find(|rule| rule.matches(max_temp, duty))
}

/// Pick the duty for this tick
pub fn next_duty(cpu_temp: u8, gpu_temp: u8, current_duty: u8) -> DutyDecision {
    let max_temp = cpu_temp.max(gpu_temp);
    let snapped = identify_duty(current_duty);

    let Some(rule) = matching_rule(max_temp, snapped) else {
        return DutyDecision::NoChange;
    };

    let target = i32::from(rule.target);
    let current = i32::from(current_duty);
    if target <= current {
        return DutyDecision::Set(rule.target);
    }

    let adjusted = i32::from(snapped) + (target - current) / 2;
    if target - adjusted > SMOOTHING_MIN_GAP {
        debug!("using adjusted new duty={}% (target {}%)", adjusted, target);
        return DutyDecision::Set(adjusted.clamp(0, 100) as u8);
    }
    DutyDecision::Set(rule.target)
}
