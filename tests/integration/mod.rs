//! Integration tests for uihealth
//!
//! These exercise the binary and the GitHub tracker against a local mock
//! server. No external network access is needed.

mod cli_tests;
mod github_tracker_tests;
mod monitor_flow_tests;
