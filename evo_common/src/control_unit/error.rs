//! Error bitflag types for the Control Unit (FR-090).
//!
//! All error types use the `bitflags` crate for compact bitflag representation.
//! Error flags marked CRITICAL trigger global SAFETY_STOP (FR-091, FR-092).

use bitflags::bitflags;

bitflags! {
    /// Power-related error flags (FR-090).
    ///
    /// CRITICAL flags (→ SAFETY_STOP): DRIVE_TAIL_OPEN, DRIVE_LOCK_PIN_LOCKED, DRIVE_BRAKE_LOCKED.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PowerError: u16 {
        /// Brake release/engage timeout.
        const BRAKE_TIMEOUT         = 0x0001;
        /// Locking pin retract/insert timeout.
        const LOCK_PIN_TIMEOUT      = 0x0002;
        /// Drive-reported fault.
        const DRIVE_FAULT           = 0x0004;
        /// Drive not ready within timeout.
        const DRIVE_NOT_READY       = 0x0008;
        /// Motion enable signal lost.
        const MOTION_ENABLE_LOST    = 0x0010;
        /// Tailstock open during motion. **CRITICAL → SAFETY_STOP**.
        const DRIVE_TAIL_OPEN       = 0x0020;
        /// Locking pin locked during motion. **CRITICAL → SAFETY_STOP**.
        const DRIVE_LOCK_PIN_LOCKED = 0x0040;
        /// Brake engaged during motion. **CRITICAL → SAFETY_STOP**.
        const DRIVE_BRAKE_LOCKED    = 0x0080;
    }
}

impl PowerError {
    /// Mask of all CRITICAL flags that trigger SAFETY_STOP.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(
        Self::DRIVE_TAIL_OPEN.bits()
            | Self::DRIVE_LOCK_PIN_LOCKED.bits()
            | Self::DRIVE_BRAKE_LOCKED.bits(),
    );

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for PowerError {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Motion-related error flags (FR-090).
    ///
    /// CRITICAL flags (→ SAFETY_STOP): LAG_CRITICAL, DRIVE_ZEROSPEED, CYCLE_OVERRUN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MotionError: u16 {
        /// Lag error exceeded limit (per lag_policy).
        const LAG_EXCEED           = 0x0001;
        /// Lag critical — SAFETY_STOP for ALL axes. **CRITICAL → SAFETY_STOP**.
        const LAG_CRITICAL         = 0x0002;
        /// Hardware limit switch triggered.
        const HARD_LIMIT           = 0x0004;
        /// Software position limit exceeded.
        const SOFT_LIMIT           = 0x0008;
        /// Overspeed detected.
        const OVERSPEED            = 0x0010;
        /// Acceleration limit exceeded.
        const ACCELERATION_LIMIT   = 0x0020;
        /// Homing procedure failed.
        const HOMING_FAILED        = 0x0040;
        /// Collision detected.
        const COLLISION_DETECTED   = 0x0080;
        /// Encoder fault.
        const ENCODER_FAULT        = 0x0100;
        /// Drive zero-speed signal during motion. **CRITICAL → SAFETY_STOP**.
        const DRIVE_ZEROSPEED      = 0x0200;
        /// Cycle time exceeded budget. **CRITICAL → SAFETY_STOP**.
        const CYCLE_OVERRUN        = 0x0400;
        /// Axis not referenced (informational).
        const NOT_REFERENCED       = 0x0800;
    }
}

impl MotionError {
    /// Mask of all CRITICAL flags that trigger SAFETY_STOP.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(
        Self::LAG_CRITICAL.bits() | Self::DRIVE_ZEROSPEED.bits() | Self::CYCLE_OVERRUN.bits(),
    );

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for MotionError {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Command-related error flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandError: u8 {
        /// Axis is locked by a different command source.
        const SOURCE_LOCKED         = 0x01;
        /// Command source not authorized for this operation.
        const SOURCE_NOT_AUTHORIZED = 0x02;
        /// Source heartbeat stale (FR-130c).
        const SOURCE_TIMEOUT        = 0x04;
    }
}

impl Default for CommandError {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Gearbox-related error flags (FR-060).
    ///
    /// CRITICAL: NO_GEARSTEP → SAFETY_STOP (I-GB-2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GearboxError: u8 {
        /// Gear change timeout.
        const GEAR_TIMEOUT         = 0x01;
        /// Conflicting gear sensor readings.
        const GEAR_SENSOR_CONFLICT = 0x02;
        /// Unexpected gear loss during motion. **CRITICAL → SAFETY_STOP**.
        const NO_GEARSTEP          = 0x04;
        /// Gear change command denied.
        const GEAR_CHANGE_DENIED   = 0x08;
    }
}

impl GearboxError {
    /// Mask of all CRITICAL flags that trigger SAFETY_STOP.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(Self::NO_GEARSTEP.bits());

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for GearboxError {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Coupling-related error flags (FR-050).
    ///
    /// CRITICAL: LAG_DIFF_EXCEED → SAFETY_STOP.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CouplingError: u8 {
        /// Synchronization timeout.
        const SYNC_TIMEOUT     = 0x01;
        /// Slave axis has a fault.
        const SLAVE_FAULT      = 0x02;
        /// Master axis lost/disconnected.
        const MASTER_LOST      = 0x04;
        /// Master-slave lag difference exceeded. **CRITICAL → SAFETY_STOP**.
        const LAG_DIFF_EXCEED  = 0x08;
    }
}

impl CouplingError {
    /// Mask of all CRITICAL flags that trigger SAFETY_STOP.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(Self::LAG_DIFF_EXCEED.bits());

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for CouplingError {
    fn default() -> Self {
        Self::empty()
    }
}

/// Container for all per-axis error flags (FR-090).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisErrorState {
    /// Power-related errors.
    pub power: PowerError,
    /// Motion-related errors.
    pub motion: MotionError,
    /// Command-related errors.
    pub command: CommandError,
    /// Gearbox-related errors.
    pub gearbox: GearboxError,
    /// Coupling-related errors.
    pub coupling: CouplingError,
}

impl AxisErrorState {
    /// Returns true if any CRITICAL error flag is set across all categories.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.power.has_critical()
            || self.motion.has_critical()
            || self.gearbox.has_critical()
            || self.coupling.has_critical()
    }

    /// Returns true if any error flag is set.
    #[inline]
    pub const fn has_any_error(&self) -> bool {
        !self.power.is_empty()
            || !self.motion.is_empty()
            || !self.command.is_empty()
            || !self.gearbox.is_empty()
            || !self.coupling.is_empty()
    }

    /// Clear all error flags.
    #[inline]
    pub fn clear(&mut self) {
        self.power = PowerError::empty();
        self.motion = MotionError::empty();
        self.command = CommandError::empty();
        self.gearbox = GearboxError::empty();
        self.coupling = CouplingError::empty();
    }
}
