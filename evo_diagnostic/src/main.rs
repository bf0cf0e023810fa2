//! # EVO Diagnostic Service
//!
//! Provides system-level diagnostics, health checks, and telemetry
//! aggregation. This module does NOT use SHM directly — it communicates via:
//!
//! - **gRPC client** → `evo_grpc` for system health queries
//! - **MQTT subscriber** → `evo_mqtt` for real-time diagnostics streams
//!
//! # Responsibilities
//!
//! - Aggregate error codes and safety state across all modules
//! - Provide diagnostic dump on demand (config snapshot, segment health)
//! - Log rotation and telemetry export

use tracing::info;

fn main() {
    tracing_subscriber::fmt().compact().init();
    info!("EVO Diagnostic Service starting...");

    // No SHM segments — communicates via gRPC + MQTT.
    // Placeholder: in full implementation this would start a diagnostic
    // aggregation loop with periodic health reports.

    info!("Diagnostic Service initialized — placeholder (not yet implemented)");
}
