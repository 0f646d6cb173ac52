//! `aproam-runtime` – Main Loop & Telemetry
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]:
//!   the cooperative loop that ticks the
//!   [`ConnectivityManager`][aproam_link::ConnectivityManager] and then every
//!   registered [`LoopTask`][control_loop::LoopTask] (motion, LEDs, buttons).
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   installs the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to export association and
//!   roam spans to any OTLP-compatible collector.

pub mod control_loop;
pub mod telemetry;

pub use control_loop::{ControlLoop, LoopTask};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
