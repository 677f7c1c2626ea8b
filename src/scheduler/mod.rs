pub mod control;
pub mod job;
mod poll_loop;
pub mod registry;

pub use control::{JobControl, PollRequest, StopJobResponse};
pub use job::JobSpec;
pub use registry::PollingScheduler;
