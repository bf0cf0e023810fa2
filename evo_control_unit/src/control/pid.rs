//! PID controller with backward Euler integration, derivative filter (Tf),
//! and anti-windup via back-calculation (Tt).
//!
//! Zero Ki disables integral; zero Kd disables derivative.

/// Internal state of the PID controller.
///
/// Preserves integral accumulator and filtered derivative across cycles.
/// Must be reset (via [`PidState::reset`]) on axis disable or mode change
/// per invariant I-PW-4 / I-OM-4.
#[derive(Debug, Clone, Copy)]
pub struct PidState {
    /// Integral accumulator.
    integral: f64,
    /// Previous position error (for derivative).
    prev_error: f64,
    /// Filtered derivative term (low-pass via Tf).
    derivative_filtered: f64,
    /// Previous raw (unsaturated) PID output — for anti-windup.
    prev_raw_output: f64,
}

impl Default for PidState {
    fn default() -> Self {
        Self {
            integral: 0.0,
            prev_error: 0.0,
            derivative_filtered: 0.0,
            prev_raw_output: 0.0,
        }
    }
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// PID gains — extracted from `UniversalControlParameters` for clarity.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    pub kd: f64,
    /// Derivative filter time constant [s] (0 = unfiltered).
    pub tf: f64,
    /// Anti-windup tracking time constant [s] (0 = disabled).
    pub tt: f64,
    /// Output saturation limit [Nm] — needed for anti-windup.
    pub out_max: f64,
}

/// Compute one PID cycle using backward Euler integration.
///
/// # Arguments
/// - `state`: Mutable PID internal state (integral, derivative, etc.).
/// - `gains`: PID gains for this axis.
/// - `error`: Current position error (target − actual) [mm].
/// - `dt`: Cycle period [s].
///
/// # Returns
/// PID output [Nm] (unsaturated — clamping is done in the output stage).
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    // ── P term ──────────────────────────────────────────────
    let p_term = gains.kp * error;

    // ── I term (backward Euler) ─────────────────────────────
    let i_term = if gains.ki != 0.0 {
        // Anti-windup: back-calculation correction.
        // When the previous raw output was saturated, the difference between
        // saturated and raw is fed back to reduce the integral.
        let anti_windup = if gains.tt > 0.0 && gains.out_max > 0.0 {
            let saturated = state.prev_raw_output.clamp(-gains.out_max, gains.out_max);
            (saturated - state.prev_raw_output) / gains.tt
        } else {
            0.0
        };

        // Backward Euler: integral += (Ki * error + anti_windup) * dt
        state.integral += (gains.ki * error + anti_windup) * dt;
        state.integral
    } else {
        // Ki == 0 → integral disabled, accumulator stays at 0.
        state.integral = 0.0;
        0.0
    };

    // ── D term (with first-order filter) ────────────────────
    let d_term = if gains.kd != 0.0 {
        let raw_derivative = (error - state.prev_error) / dt;

        if gains.tf > 0.0 {
            // First-order low-pass on derivative:
            // alpha = dt / (tf + dt)
            let alpha = dt / (gains.tf + dt);
            state.derivative_filtered += alpha * (raw_derivative - state.derivative_filtered);
            gains.kd * state.derivative_filtered
        } else {
            // No filter — use raw derivative.
            gains.kd * raw_derivative
        }
    } else {
        state.derivative_filtered = 0.0;
        0.0
    };

    state.prev_error = error;

    let raw_output = p_term + i_term + d_term;
    state.prev_raw_output = raw_output;

    raw_output
}

// ─── Tests ──────────────────────────────────────────────────────────
