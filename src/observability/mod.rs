//! Observability module
//!
//! This module contains logging setup and log-hygiene helpers:
//! - Tracing subscriber initialisation
//! - Remediation spans
//! - Sanitisation and secret redaction of host-provided text

pub mod telemetry;
