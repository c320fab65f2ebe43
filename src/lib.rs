pub mod analysis;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod remote;
pub mod report;
pub mod transcript;
pub mod triage;
pub mod util;
