//! Result acquisition.
//!
//! This module polls the evaluation backend until a run's analysis is
//! available, normalizing the payload once it is.

pub mod poll_loop;
pub mod state;

pub use poll_loop::{ResultPoller, Subscription, DEFAULT_POLL_INTERVAL};
pub use state::{on_fetch_result, AcquisitionEvent, PollState, Transition};
