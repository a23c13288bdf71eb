pub mod clock;
pub mod config;
pub mod dates;
pub mod error;
pub mod extract;
pub mod panels;
pub mod refs;
pub mod storage;
pub mod telemetry;
pub mod workflows;
