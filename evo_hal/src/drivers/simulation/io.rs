//! I/O Simulator for digital and analog I/O simulation.
//!
//! The `IOSimulator` manages:
//! - Digital inputs and outputs with state tracking
//! - Linked DI reactions (DO triggers delayed DI changes)
//! - Analog inputs and outputs with polynomial scaling

use evo_common::hal::config::{AnalogIOConfig, DigitalIOConfig, LinkedDigitalInput};
use evo_common::io::config::AnalogCurve;
use evo_common::hal::types::AnalogValue;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Pending DI change queued by a linked reaction.
#[derive(Debug, Clone)]
struct PendingDiChange {
    /// When this change should be applied
    trigger_time: Instant,
    /// Index of DI to change
    di_index: usize,
    /// New state for the DI
    new_state: bool,
}

/// Analog I/O state with dual representation.
#[derive(Debug, Clone, Copy, Default)]
struct AnalogState {
    /// Normalized value (0.0 - 1.0)
    normalized: f64,
    /// Scaled value in engineering units
    scaled: f64,
}

/// I/O Simulator for digital and analog I/O.
pub struct IOSimulator {
    /// Digital input states
    di_states: Vec<bool>,
    /// Digital output states
    do_states: Vec<bool>,
    /// Linked reactions for each DO (indexed by DO index)
    linked_reactions: Vec<Vec<LinkedDigitalInput>>,
    /// Previous DO states for edge detection
    do_prev_states: Vec<bool>,
    /// Queue of pending DI changes
    pending_changes: VecDeque<PendingDiChange>,

    /// Analog input states
    ai_states: Vec<AnalogState>,
    /// Analog output states
    ao_states: Vec<AnalogState>,
    /// Analog input configurations (for scaling â€” used in test-only methods)
    #[cfg_attr(not(test), allow(dead_code))]
    ai_configs: Vec<AnalogScalingConfig>,
    /// Analog output configurations (for scaling)
    #[cfg_attr(not(test), allow(dead_code))]
    ao_configs: Vec<AnalogScalingConfig>,
}

/// Scaling configuration for an analog I/O point.
#[derive(Debug, Clone)]
struct AnalogScalingConfig {
    min_value: f64,
    max_value: f64,
    curve: AnalogCurve,
}

impl Default for AnalogScalingConfig {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 1.0,
            curve: AnalogCurve::LINEAR,
        }
    }
}

impl IOSimulator {
    /// Create a new IOSimulator with the given configuration.
    pub fn new(
        di_configs: &[DigitalIOConfig],
        do_configs: &[DigitalIOConfig],
        ai_configs: &[AnalogIOConfig],
        ao_configs: &[AnalogIOConfig],
    ) -> Self {
        // Initialize DI states from config
        let di_states: Vec<bool> = di_configs.iter().map(|c| c.initial_value).collect();

        // Initialize DO states to off
        let do_count = do_configs.len();
        let do_states = vec![false; do_count];
        let do_prev_states = vec![false; do_count];

        // Build linked reactions per DO
        let linked_reactions: Vec<Vec<LinkedDigitalInput>> = do_configs
            .iter()
            .map(|c| c.linked_inputs.clone())
            .collect();

        // Initialize AI states from config
        let ai_states: Vec<AnalogState> = ai_configs
            .iter()
            .map(|c| {
                let initial = c.initial_value.unwrap_or(c.min_value);
                let curve = c.curve;
                let normalized = curve.to_normalized(initial, c.min_value, c.max_value);
                AnalogState {
                    normalized,
                    scaled: initial,
                }
            })
            .collect();

        // Initialize AO states
        let ao_states = vec![AnalogState::default(); ao_configs.len()];

        // Build scaling configs
        let ai_scaling: Vec<AnalogScalingConfig> = ai_configs
            .iter()
            .map(|c| AnalogScalingConfig {
                min_value: c.min_value,
                max_value: c.max_value,
                curve: c.curve,
            })
            .collect();

        let ao_scaling: Vec<AnalogScalingConfig> = ao_configs
            .iter()
            .map(|c| AnalogScalingConfig {
                min_value: c.min_value,
                max_value: c.max_value,
                curve: c.curve,
            })
            .collect();

        debug!(
            "IOSimulator initialized: {} DI, {} DO, {} AI, {} AO",
            di_states.len(),
            do_states.len(),
            ai_states.len(),
            ao_states.len()
        );

        Self {
            di_states,
            do_states,
            linked_reactions,
            do_prev_states,
            pending_changes: VecDeque::new(),
            ai_states,
            ao_states,
            ai_configs: ai_scaling,
            ao_configs: ao_scaling,
        }
    }

    /// Update I/O state for one cycle.
    ///
    /// # Arguments
    /// * `do_commands` - Digital output commands from control unit
    /// * `ao_commands` - Analog output commands (normalized 0.0-1.0) from control unit
    /// * `now` - Current instant for processing delayed reactions
    ///
    /// # Returns
    /// Tuple of (digital_inputs, analog_inputs)
    pub fn cycle(
        &mut self,
        do_commands: &[bool],
        ao_commands: &[f64],
        now: Instant,
    ) -> (Vec<bool>, Vec<AnalogValue>) {
        // Update DO states and detect edges
        self.update_do_states(do_commands, now);

        // Process pending DI changes
        self.process_pending_changes(now);

        // Update AO states
        self.update_ao_states(ao_commands);

        // Return current DI and AI states
        let di_result = self.di_states.clone();
        let ai_result: Vec<AnalogValue> = self
            .ai_states
            .iter()
            .map(|s| AnalogValue {
                normalized: s.normalized,
                scaled: s.scaled,
            })
            .collect();

        (di_result, ai_result)
    }

    /// Update digital output states and queue linked reactions on edges.
    fn update_do_states(&mut self, do_commands: &[bool], now: Instant) {
        for (idx, &cmd) in do_commands.iter().enumerate() {
            if idx >= self.do_states.len() {
                break;
            }

            let prev = self.do_prev_states[idx];
            self.do_states[idx] = cmd;

            // Check for edge (state change)
            if cmd != prev {
                self.handle_do_edge(idx, cmd, now);
            }

            self.do_prev_states[idx] = cmd;
        }
    }

    /// Handle DO edge by queueing linked reactions.
    fn handle_do_edge(&mut self, do_idx: usize, new_state: bool, now: Instant) {
        if do_idx >= self.linked_reactions.len() {
            return;
        }

        for reaction in &self.linked_reactions[do_idx] {
            // Check if this reaction triggers on this edge
            if reaction.trigger == new_state {
                let trigger_time = now + Duration::from_secs_f64(reaction.delay_s);
                let pending = PendingDiChange {
                    trigger_time,
                    di_index: reaction.di_index,
                    new_state: reaction.result,
                };

                trace!(
                    "DO[{}] {} -> queued DI[{}] = {} in {:.3}s",
                    do_idx,
                    if new_state { "ON" } else { "OFF" },
                    reaction.di_index,
                    if reaction.result { "ON" } else { "OFF" },
                    reaction.delay_s
                );

                self.pending_changes.push_back(pending);
            }
        }
    }

    /// Process pending DI changes whose time has arrived.
    fn process_pending_changes(&mut self, now: Instant) {
        // Process all pending changes that should trigger now or earlier
        while let Some(front) = self.pending_changes.front() {
            if front.trigger_time <= now {
                let change = self.pending_changes.pop_front().unwrap();
                if change.di_index < self.di_states.len() {
                    let old = self.di_states[change.di_index];
                    self.di_states[change.di_index] = change.new_state;
                    if old != change.new_state {
                        debug!(
                            "DI[{}] changed: {} -> {}",
                            change.di_index,
                            if old { "ON" } else { "OFF" },
                            if change.new_state { "ON" } else { "OFF" }
                        );
                    }
                }
            } else {
                // Queue is time-ordered (mostly), so we can break
                break;
            }
        }
    }

    /// Update analog output states with scaling.
    fn update_ao_states(&mut self, ao_commands: &[f64]) {
        for (idx, &normalized) in ao_commands.iter().enumerate() {
            if idx >= self.ao_states.len() {
                break;
            }

            let config = &self.ao_configs[idx];
            let scaled = config
                .curve
                .to_scaled(normalized, config.min_value, config.max_value);

            self.ao_states[idx] = AnalogState { normalized, scaled };
        }
    }

    /// Get current digital input state.
    #[cfg(test)]
    pub(crate) fn get_di(&self, index: usize) -> Option<bool> {
        self.di_states.get(index).copied()
    }

    /// Set analog input value (normalized).
    #[cfg(test)]
    pub(crate) fn set_ai_normalized(&mut self, index: usize, normalized: f64) {
        if index < self.ai_states.len() {
            let config = &self.ai_configs[index];
            let scaled = config
                .curve
                .to_scaled(normalized, config.min_value, config.max_value);
            self.ai_states[index] = AnalogState { normalized, scaled };
        }
    }

    /// Set analog input value (scaled/engineering units).
    #[cfg(test)]
    pub(crate) fn set_ai_scaled(&mut self, index: usize, scaled: f64) {
        if index < self.ai_states.len() {
            let config = &self.ai_configs[index];
            let normalized = config
                .curve
                .to_normalized(scaled, config.min_value, config.max_value);
            self.ai_states[index] = AnalogState { normalized, scaled };
        }
    }

    /// Get analog input value.
    #[cfg(test)]
    pub(crate) fn get_ai(&self, index: usize) -> Option<AnalogValue> {
        self.ai_states.get(index).map(|s| AnalogValue {
            normalized: s.normalized,
            scaled: s.scaled,
        })
    }

    /// Get analog output value.
    #[cfg(test)]
    pub(crate) fn get_ao(&self, index: usize) -> Option<AnalogValue> {
        self.ao_states.get(index).map(|s| AnalogValue {
            normalized: s.normalized,
            scaled: s.scaled,
        })
    }

    /// Get count of digital inputs.
    #[cfg(test)]
    pub(crate) fn di_count(&self) -> usize {
        self.di_states.len()
    }

    /// Get count of digital outputs.
    #[cfg(test)]
    pub(crate) fn do_count(&self) -> usize {
        self.do_states.len()
    }

    /// Get count of analog inputs.
    #[cfg(test)]
    pub(crate) fn ai_count(&self) -> usize {
        self.ai_states.len()
    }

    /// Get count of analog outputs.
    #[cfg(test)]
    pub(crate) fn ao_count(&self) -> usize {
        self.ao_states.len()
    }
}
