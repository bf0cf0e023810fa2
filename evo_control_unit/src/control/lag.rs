//! Lag error monitoring.
//!
//! Computes |target_pos - actual_pos|, compares to lag_error_limit,
//! dispatches per lag_policy (Critical/Unwanted/Neutral/Desired).
//!
//! Operates independently of control algorithm selection (FR-103).

use evo_common::control_unit::error::MotionError;
use evo_common::control_unit::state::LagPolicy;

/// Result of lag error evaluation for a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagResult {
    /// Absolute lag error [mm].
    pub lag_error: f64,
    /// Whether the lag error exceeds the limit.
    pub exceeded: bool,
    /// Motion error flags to set (may be empty).
    pub motion_error: MotionError,
    /// Whether a global SAFETY_STOP is required (Critical policy).
    pub trigger_safety_stop: bool,
    /// Whether the axis should be stopped (Unwanted policy).
    pub trigger_axis_stop: bool,
}

/// Evaluate lag error for a single axis.
///
/// # Arguments
/// - `target_position`: Commanded position [mm].
/// - `actual_position`: Encoder-reported position [mm].
/// - `lag_error_limit`: Maximum allowed lag [mm]. Zero or negative disables.
/// - `lag_policy`: How to react when limit is exceeded.
///
/// # Returns
/// [`LagResult`] with the appropriate error flags and stop triggers.
pub fn evaluate_lag(
    target_position: f64,
    actual_position: f64,
    lag_error_limit: f64,
    lag_policy: LagPolicy,
) -> LagResult {
    let lag_error = (target_position - actual_position).abs();

    // Desired policy suppresses lag monitoring entirely
    if matches!(lag_policy, LagPolicy::Desired) {
        return LagResult {
            lag_error,
            exceeded: false,
            motion_error: MotionError::empty(),
            trigger_safety_stop: false,
            trigger_axis_stop: false,
        };
    }

    // Check if limit is exceeded (disabled if limit <= 0)
    let exceeded = lag_error_limit > 0.0 && lag_error > lag_error_limit;

    if !exceeded {
        return LagResult {
            lag_error,
            exceeded: false,
            motion_error: MotionError::empty(),
            trigger_safety_stop: false,
            trigger_axis_stop: false,
        };
    }

    // Limit exceeded — dispatch by policy
    match lag_policy {
        LagPolicy::Critical => LagResult {
            lag_error,
            exceeded: true,
            motion_error: MotionError::LAG_EXCEED,
            trigger_safety_stop: true,
            trigger_axis_stop: true,
        },
        LagPolicy::Unwanted => LagResult {
            lag_error,
            exceeded: true,
            motion_error: MotionError::LAG_EXCEED,
            trigger_safety_stop: false,
            trigger_axis_stop: true,
        },
        LagPolicy::Neutral => LagResult {
            lag_error,
            exceeded: true,
            motion_error: MotionError::LAG_EXCEED,
            trigger_safety_stop: false,
            trigger_axis_stop: false,
        },
        LagPolicy::Desired => unreachable!(), // handled above
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
