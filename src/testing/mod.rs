//! Test support
//!
//! - [`mock_tracker::MockTrackerServer`]: local HTTP server speaking the
//!   GitHub issue-creation endpoint
//! - [`RecordingTracker`]: in-process tracker double

pub mod mock_tracker;

pub use crate::tracker::RecordingTracker;
pub use mock_tracker::{MockTrackerResponse, MockTrackerServer, RecordedRequest};
