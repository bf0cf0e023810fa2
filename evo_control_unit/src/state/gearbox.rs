//! GearboxState transitions (T076).
//!
//! Per-axis gearbox: Unknown → Neutral/GearN → Shifting → GearN/GearboxError.
//! NO_GEARSTEP is CRITICAL → SAFETY_STOP (I-GB-2).
//!
//! Gear change ONLY when MotionState == Standstill (I-GB-1).

use evo_common::control_unit::error::GearboxError;
use evo_common::control_unit::state::{GearboxState, MotionState};

/// Event that can trigger a GearboxState transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearboxEvent {
    /// Gear sensor detects a valid gear number (1-4).
    GearDetected(u8),
    /// Gear sensor reads neutral.
    NeutralDetected,
    /// Gear change requested to target gear.
    ShiftRequested(u8),
    /// Shift completed successfully — new gear confirmed.
    ShiftComplete(u8),
    /// Shift timed out.
    ShiftTimeout,
    /// Sensor conflict detected.
    SensorConflict,
    /// Gear lost during motion (CRITICAL).
    GearLostDuringMotion,
}

/// Result of a gearbox transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearboxTransition {
    /// Transition accepted — new state.
    Ok(GearboxState),
    /// Transition rejected — reason.
    Rejected(&'static str),
    /// Critical error — requires SAFETY_STOP.
    Critical(GearboxError),
}

/// Per-axis gearbox state machine.
#[derive(Debug, Clone)]
pub struct GearboxStateMachine {
    state: GearboxState,
    /// Target gear during shifting.
    target_gear: u8,
    /// Shift timeout counter [cycles].
    shift_timeout_cycles: u32,
    /// Max shift timeout [cycles].
    max_shift_timeout: u32,
}

impl GearboxStateMachine {
    /// Create a new gearbox machine.
    ///
    /// - `has_gearbox`: If false, state is permanently NoGearbox.
    /// - `max_shift_timeout`: Max cycles before shift timeout error.
    pub fn new(has_gearbox: bool, max_shift_timeout: u32) -> Self {
        Self {
            state: if has_gearbox {
                GearboxState::Unknown
            } else {
                GearboxState::NoGearbox
            },
            target_gear: 0,
            shift_timeout_cycles: 0,
            max_shift_timeout,
        }
    }

    /// Current gearbox state.
    #[inline]
    pub fn state(&self) -> GearboxState {
        self.state
    }

    /// Returns true if a valid gear is engaged and ready for motion.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.is_gear_engaged() || matches!(self.state, GearboxState::NoGearbox)
    }

    /// Handle a gearbox event.
    ///
    /// `motion_state` is passed to enforce I-GB-1 (shift only in Standstill).
    pub fn handle_event(
        &mut self,
        event: GearboxEvent,
        motion_state: MotionState,
    ) -> GearboxTransition {
        use GearboxEvent::*;

        match event {
            GearDetected(gear) => {
                if let Some(gs) = GearboxState::from_gear_number(gear) {
                    self.state = gs;
                    GearboxTransition::Ok(gs)
                } else {
                    GearboxTransition::Rejected("invalid gear number")
                }
            }

            NeutralDetected => {
                self.state = GearboxState::Neutral;
                GearboxTransition::Ok(GearboxState::Neutral)
            }

            ShiftRequested(target) => {
                // I-GB-1: Only shift in Standstill
                if motion_state != MotionState::Standstill {
                    return GearboxTransition::Rejected("gear shift requires Standstill");
                }

                if GearboxState::from_gear_number(target).is_none() {
                    return GearboxTransition::Rejected("invalid target gear");
                }

                self.target_gear = target;
                self.shift_timeout_cycles = 0;
                self.state = GearboxState::Shifting;
                GearboxTransition::Ok(GearboxState::Shifting)
            }

            ShiftComplete(gear) => {
                if self.state != GearboxState::Shifting {
                    return GearboxTransition::Rejected("not currently shifting");
                }

                if let Some(gs) = GearboxState::from_gear_number(gear) {
                    self.state = gs;
                    GearboxTransition::Ok(gs)
                } else {
                    self.state = GearboxState::GearboxError;
                    GearboxTransition::Ok(GearboxState::GearboxError)
                }
            }

            ShiftTimeout => {
                if self.state == GearboxState::Shifting {
                    self.state = GearboxState::GearboxError;
                    GearboxTransition::Ok(GearboxState::GearboxError)
                } else {
                    GearboxTransition::Rejected("not shifting")
                }
            }

            SensorConflict => {
                self.state = GearboxState::GearboxError;
                GearboxTransition::Ok(GearboxState::GearboxError)
            }

            GearLostDuringMotion => {
                // I-GB-2: NO_GEARSTEP is CRITICAL → SAFETY_STOP
                self.state = GearboxState::GearboxError;
                GearboxTransition::Critical(GearboxError::NO_GEARSTEP)
            }
        }
    }

    /// Tick shift timeout counter. Returns `true` if timeout occurred.
    ///
    /// Call once per cycle when state is Shifting.
    pub fn tick_shift_timeout(&mut self) -> bool {
        if self.state != GearboxState::Shifting {
            return false;
        }

        self.shift_timeout_cycles += 1;
        if self.shift_timeout_cycles >= self.max_shift_timeout {
            self.state = GearboxState::GearboxError;
            true
        } else {
            false
        }
    }

    /// Reset gearbox error — return to Unknown for re-detection.
    pub fn reset_error(&mut self) {
        if self.state == GearboxState::GearboxError {
            self.state = GearboxState::Unknown;
            self.shift_timeout_cycles = 0;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
