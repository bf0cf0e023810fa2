//! LEVEL 1: MachineState transitions (T036).
//!
//! Global machine lifecycle: Stopped → Starting → Idle ↔ Manual/Active → Service → SystemError.
//!
//! Implements the transition table from contracts/state-machines.md §1 with
//! guards and invariants I-MS-1 through I-MS-4.

use evo_common::control_unit::state::MachineState;

/// Result of a MachineState transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded — new state.
    Ok(MachineState),
    /// Transition rejected — reason.
    Rejected(&'static str),
}

/// Machine-level event that can trigger a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// Power-on event received.
    PowerOn,
    /// Config valid, SHM connected, HAL alive.
    InitComplete,
    /// Config invalid or SHM mismatch during starting.
    InitFailed,
    /// First manual command received.
    ManualCommand,
    /// Manual timeout or explicit stop.
    ManualStop,
    /// RE sends first command.
    RecipeStart,
    /// RE sends Nop + all axes in position.
    RecipeComplete,
    /// RE sends Nop + manual command pending.
    RecipeCompleteManualPending,
    /// Service authorization flag set.
    ServiceAuthorize,
    /// Service deauthorized.
    ServiceDeauthorize,
    /// Critical fault or unrecoverable error (→ SystemError).
    CriticalFault,
    /// SafetyState==Safe + all errors cleared + operator reset + authorization.
    ErrorRecovery,
    /// Unrecoverable fault + explicit full-reset.
    FullReset,
}

/// MachineState manager holding the current state (I-MS-1).
#[derive(Debug, Clone)]
pub struct MachineStateMachine {
    state: MachineState,
}

impl MachineStateMachine {
    /// Create a new machine state machine in Stopped state.
    pub const fn new() -> Self {
        Self {
            state: MachineState::Stopped,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    /// Attempt a transition given an event.
    ///
    /// Returns `TransitionResult::Ok(new_state)` on success,
    /// `TransitionResult::Rejected(reason)` if the transition is not valid.
    pub fn handle_event(&mut self, event: MachineEvent) -> TransitionResult {
        use MachineEvent::*;
        use MachineState::*;

        let next = match (self.state, event) {
            // Stopped → Starting
            (Stopped, PowerOn) => Starting,

            // Starting → Idle (success) or SystemError (failure)
            (Starting, InitComplete) => Idle,
            (Starting, InitFailed) => SystemError,

            // Idle → Manual
            (Idle, ManualCommand) => Manual,
            // Manual → Idle
            (Manual, ManualStop) => Idle,

            // Idle/Manual → Active
            (Idle, RecipeStart) => Active,
            (Manual, RecipeStart) => Active,

            // Active → Idle/Manual
            (Active, RecipeComplete) => Idle,
            (Active, RecipeCompleteManualPending) => Manual,

            // any → Service (when authorized)
            (_, ServiceAuthorize) if self.state != SystemError => Service,

            // Service → Idle
            (Service, ServiceDeauthorize) => Idle,

            // any → SystemError (critical fault)
            (_, CriticalFault) => {
                self.state = SystemError;
                return TransitionResult::Ok(SystemError);
            }

            // SystemError → Idle (recovery, I-MS-2)
            (SystemError, ErrorRecovery) => Idle,

            // SystemError → Stopped (unrecoverable, I-MS-2)
            (SystemError, FullReset) => Stopped,

            // All other combinations are invalid.
            _ => {
                return TransitionResult::Rejected(invalid_transition_reason(self.state, event));
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// Force state to SystemError (e.g., from safety subsystem).
    #[inline]
    pub fn force_system_error(&mut self) {
        self.state = MachineState::SystemError;
    }

    /// Check if the machine is in a state that allows axis motion commands.
    #[inline]
    pub const fn allows_motion(&self) -> bool {
        matches!(
            self.state,
            MachineState::Manual | MachineState::Active | MachineState::Service
        )
    }

    /// Check if the machine is in service mode (I-PW-3: NoBrake only in Service).
    #[inline]
    pub const fn is_service(&self) -> bool {
        matches!(self.state, MachineState::Service)
    }
}

fn invalid_transition_reason(state: MachineState, event: MachineEvent) -> &'static str {
    use MachineEvent::*;
    use MachineState::*;
    match (state, event) {
        (SystemError, _) => "SystemError: only ErrorRecovery or FullReset allowed",
        (_, ServiceAuthorize) => "ServiceAuthorize not allowed from SystemError",
        (Stopped, _) => "Stopped: only PowerOn allowed",
        (Starting, _) => "Starting: only InitComplete or InitFailed allowed",
        (Idle, _) => "Idle: invalid event for current state",
        (Manual, _) => "Manual: invalid event for current state",
        (Active, _) => "Active: invalid event for current state",
        (Service, _) => "Service: invalid event for current state",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
